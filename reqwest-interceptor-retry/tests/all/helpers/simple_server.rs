use anyhow::anyhow;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// A toy HTTP server answering each connection with the next raw response of a script.
///
/// Once the script is exhausted its last response is repeated. Every connection is closed after
/// the response is written, which lets a test produce responses a well-behaved server never
/// would, such as a status line cut short.
pub struct SimpleServer {
    listener: TcpListener,
    port: u16,
    host: String,
    raw_http_responses: Vec<String>,
    calls: Arc<AtomicU32>,
}

/// Request-Line = Method SP Request-URI SP HTTP-Version CRLF
struct Request<'a> {
    method: &'a str,
    uri: &'a str,
    http_version: &'a str,
}

impl<'a> fmt::Display for Request<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}\r\n", self.method, self.uri, self.http_version)
    }
}

impl SimpleServer {
    pub async fn new(
        host: &str,
        port: Option<u16>,
        raw_http_responses: Vec<String>,
    ) -> Result<Self, anyhow::Error> {
        let listener = TcpListener::bind(format!("{}:{}", host, port.unwrap_or(0))).await?;

        let port = listener.local_addr()?.port();

        Ok(Self {
            listener,
            port,
            host: host.to_string(),
            raw_http_responses,
            calls: Arc::new(AtomicU32::new(0)),
        })
    }

    pub fn uri(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Counts the connections the server accepted, shared with the running server.
    pub fn calls(&self) -> Arc<AtomicU32> {
        self.calls.clone()
    }

    pub async fn start(self) {
        loop {
            let stream = match self.listener.accept().await {
                Ok((stream, _)) => stream,
                Err(e) => {
                    println!("Connection failed: {}", e);
                    continue;
                }
            };

            let call = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            let raw_http_response = self
                .raw_http_responses
                .get(call)
                .or_else(|| self.raw_http_responses.last())
                .cloned()
                .unwrap_or_default();

            if let Err(e) = Self::handle_connection(stream, raw_http_response).await {
                println!("Error handling connection: {}", e);
            }
        }
    }

    async fn handle_connection(
        mut stream: TcpStream,
        raw_http_response: String,
    ) -> Result<(), anyhow::Error> {
        // 1024 bytes is enough for a toy HTTP server
        let mut buffer = [0; 1024];

        let read = stream.read(&mut buffer).await?;

        let request = String::from_utf8_lossy(&buffer[..read]);
        let request_line = request
            .lines()
            .next()
            .ok_or_else(|| anyhow!("Empty request"))?;

        let request = Self::parse_request_line(request_line)?;
        println!("Request: {}", request);

        stream.write_all(raw_http_response.as_bytes()).await?;
        stream.flush().await?;
        stream.shutdown().await?;

        Ok(())
    }

    fn parse_request_line(request: &str) -> Result<Request<'_>, anyhow::Error> {
        let mut parts = request.split_whitespace();

        let method = parts.next().ok_or_else(|| anyhow!("Method not specified"))?;

        let uri = parts.next().ok_or_else(|| anyhow!("URI not specified"))?;

        let http_version = parts
            .next()
            .ok_or_else(|| anyhow!("HTTP version not specified"))?;

        Ok(Request {
            method,
            uri,
            http_version,
        })
    }
}

/// A URI nothing listens on, so connecting to it is refused.
pub async fn refused_uri() -> Result<String, anyhow::Error> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(format!("http://127.0.0.1:{}", port))
}
