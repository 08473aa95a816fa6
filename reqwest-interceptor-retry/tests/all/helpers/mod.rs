mod simple_server;

pub use simple_server::{refused_uri, SimpleServer};
