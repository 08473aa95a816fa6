//! `RetryInterceptor` replays requests that failed in a way that is safe to retry.

use reqwest_interceptor::{
    Agent, AgentField, Client, Defaults, Failure, Interceptor, RequestConfig, Response, Result,
};

use crate::condition::{DefaultRetryCondition, RetryCondition};
use crate::retryable::is_retry_allowed;

/// How many times a request is replayed when no limit is given.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// `RetryInterceptor` replays failed requests, up to `max_retries` times per request.
///
/// A failure is replayed only if all of the following hold:
/// * it carries the [`RequestConfig`] of the attempt, so there is something to replay;
/// * the [`RetryCondition`] accepts it (by default: no response was received at all);
/// * the request has been replayed fewer than `max_retries` times;
/// * the error is structurally retryable, see [`is_retry_allowed`](crate::is_retry_allowed).
///
/// Otherwise the failure is passed on untouched. Replays happen immediately: there is no delay
/// between attempts.
///
///```rust
///     use reqwest_interceptor::ClientBuilder;
///     use reqwest_interceptor_retry::RetryInterceptor;
///
///     // Replay requests that failed without a response, at most 5 times.
///     let retry_interceptor = RetryInterceptor::new(5);
///     let client = ClientBuilder::new(reqwest::Client::new())
///         .with(retry_interceptor)
///         .build();
///```
///
/// Attach it once per client: every attached instance replays independently.
#[derive(Debug)]
pub struct RetryInterceptor<C: RetryCondition = DefaultRetryCondition> {
    max_retries: u32,
    retry_condition: C,
}

impl RetryInterceptor<DefaultRetryCondition> {
    /// Construct `RetryInterceptor` with the default retry condition.
    pub fn new(max_retries: u32) -> Self {
        Self::new_with_condition(max_retries, DefaultRetryCondition)
    }
}

impl Default for RetryInterceptor<DefaultRetryCondition> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

impl<C: RetryCondition> RetryInterceptor<C> {
    /// Construct `RetryInterceptor` with a custom [`RetryCondition`].
    pub fn new_with_condition(max_retries: u32, retry_condition: C) -> Self {
        Self {
            max_retries,
            retry_condition,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    fn should_retry(&self, failure: &Failure, config: &RequestConfig) -> bool {
        self.retry_condition.should_retry(failure)
            && config.retry_count() < self.max_retries
            && is_retry_allowed(failure.error())
    }
}

#[async_trait::async_trait]
impl<C: RetryCondition> Interceptor for RetryInterceptor<C> {
    async fn on_failure(&self, failure: Failure, client: &Client) -> Result<Response> {
        let should_retry = match failure.config() {
            Some(config) => self.should_retry(&failure, config),
            // Nothing to replay.
            None => false,
        };
        if !should_retry {
            #[cfg(feature = "tracing")]
            tracing::debug!(error = %failure, "Not retrying failed request");
            return Err(failure);
        }

        let mut config = failure.try_into_config()?;
        *config.retry_count_mut() += 1;
        strip_default_agents(&mut config, client.defaults());

        #[cfg(feature = "tracing")]
        tracing::warn!(
            method = %config.method(),
            url = %config.url(),
            "Retry attempt #{} of {}",
            config.retry_count(),
            self.max_retries
        );

        client.execute(config).await
    }
}

/// Removes every agent that is the client's own default for the same field.
///
/// The client merges its defaults back in when the request is dispatched again, so only agents
/// chosen for this request specifically stay on the configuration.
fn strip_default_agents(config: &mut RequestConfig, defaults: &Defaults) {
    for field in AgentField::ALL {
        let is_default = match (config.agent(field), defaults.agent(field)) {
            (Some(agent), Some(default)) => Agent::ptr_eq(agent, default),
            _ => false,
        };
        if is_default {
            config.agent_mut(field).take();
        }
    }
}
