use std::sync::Arc;

use crate::client::Client;
use crate::error::{Failure, Result};
use crate::response::Response;

/// When attached to a [`Client`] (generally using [`with`]), an interceptor sees the outcome of
/// every request the client issues, in the order it was attached.
///
/// Each interceptor receives the outcome produced by the previous one: a successful
/// [`Response`] is passed to [`on_success`], a [`Failure`] to [`on_failure`]. Either handler may
/// turn the outcome into the other kind, for example by replaying the request through
/// [`Client::execute`].
///
/// # Example
///
/// ```
/// use reqwest_interceptor::{Client, ClientBuilder, Failure, Interceptor, Result, Response};
///
/// struct LoggingInterceptor;
///
/// #[async_trait::async_trait]
/// impl Interceptor for LoggingInterceptor {
///     async fn on_failure(&self, failure: Failure, _client: &Client) -> Result<Response> {
///         println!("Request failed: {}", failure);
///         Err(failure)
///     }
/// }
///
/// let client = ClientBuilder::new(reqwest::Client::new())
///     .with(LoggingInterceptor)
///     .build();
/// ```
///
/// Attaching the same interceptor twice installs two independent stages.
///
/// [`with`]: crate::ClientBuilder::with
/// [`on_success`]: Interceptor::on_success
/// [`on_failure`]: Interceptor::on_failure
#[async_trait::async_trait]
pub trait Interceptor: 'static + Send + Sync {
    /// Invoked with a successful response. Passes it on unchanged by default.
    async fn on_success(&self, response: Response, _client: &Client) -> Result<Response> {
        Ok(response)
    }

    /// Invoked with a failed attempt. Propagates the failure unchanged by default.
    async fn on_failure(&self, failure: Failure, _client: &Client) -> Result<Response> {
        Err(failure)
    }
}

#[async_trait::async_trait]
impl<F> Interceptor for F
where
    F: Send
        + Sync
        + 'static
        + for<'a> Fn(Failure, &'a Client) -> BoxFuture<'a, Result<Response>>,
{
    async fn on_failure(&self, failure: Failure, client: &Client) -> Result<Response> {
        (self)(failure, client).await
    }
}

pub type BoxFuture<'a, T> = std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// The interceptors an outcome still has to flow through.
pub(crate) struct Chain<'a> {
    client: &'a Client,
    interceptors: &'a [Arc<dyn Interceptor>],
}

impl<'a> Chain<'a> {
    pub(crate) fn new(client: &'a Client, interceptors: &'a [Arc<dyn Interceptor>]) -> Self {
        Chain {
            client,
            interceptors,
        }
    }

    pub(crate) fn run(self, outcome: Result<Response>) -> BoxFuture<'a, Result<Response>> {
        Box::pin(async move {
            let mut outcome = outcome;
            for interceptor in self.interceptors {
                outcome = match outcome {
                    Ok(response) => interceptor.on_success(response, self.client).await,
                    Err(failure) => interceptor.on_failure(failure, self.client).await,
                };
            }
            outcome
        })
    }
}
