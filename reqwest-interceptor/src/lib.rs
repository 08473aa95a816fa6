//! This crate provides [`Client`], a wrapper around [`reqwest::Client`] which runs every request
//! outcome through a chain of interceptors.
//!
//! Requests are described by a [`RequestConfig`], an owned record that travels with the request
//! across its whole life: it ends up in the [`Response`] of a successful attempt or in the
//! [`Failure`] of a failed one. An interceptor can take the configuration out of a failure and
//! hand it back to [`Client::execute`] to issue the request again.
//!
//! Connections are made through [`Agent`]s, shared handles over `reqwest::Client` connection
//! pools. The client carries default agents in its [`Defaults`]; a request can override them
//! per field ([`AgentField`]).
//!
//! ```
//! use reqwest_interceptor::{Client, ClientBuilder, Failure, Interceptor, Result, Response};
//!
//! struct LoggingInterceptor;
//!
//! #[async_trait::async_trait]
//! impl Interceptor for LoggingInterceptor {
//!     async fn on_success(&self, response: Response, _client: &Client) -> Result<Response> {
//!         println!("Result: {:?}", response);
//!         Ok(response)
//!     }
//!
//!     async fn on_failure(&self, failure: Failure, _client: &Client) -> Result<Response> {
//!         println!("Failure: {}", failure);
//!         Err(failure)
//!     }
//! }
//!
//! async fn run() {
//!     let client = ClientBuilder::new(reqwest::Client::new())
//!         .with(LoggingInterceptor)
//!         .build();
//!     let resp = client.get("https://truelayer.com").send().await.unwrap();
//!     println!("TrueLayer page HTML: {}", resp.text().await.unwrap());
//! }
//! ```
mod agent;
mod client;
mod config;
mod error;
mod interceptor;
mod response;

pub use agent::{Agent, AgentField};
pub use client::{Client, ClientBuilder, Defaults, Pending, RequestBuilder};
pub use config::RequestConfig;
pub use error::{Error, Failure, Result};
pub use interceptor::{BoxFuture, Interceptor};
pub use response::Response;
