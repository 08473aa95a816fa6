//! Retry interceptor for [`reqwest_interceptor`].
//!
//! Attach a [`RetryInterceptor`] to a client to transparently replay requests that failed
//! without receiving a response:
//!
//! ```
//! use reqwest_interceptor::ClientBuilder;
//! use reqwest_interceptor_retry::RetryInterceptor;
//!
//! let client = ClientBuilder::new(reqwest::Client::new())
//!     .with(RetryInterceptor::default())
//!     .build();
//! ```
//!
//! The caller only ever sees the outcome of the last attempt. The number of replays is recorded
//! on the request configuration, see [`RequestConfig::retry_count`].
//!
//! [`RequestConfig::retry_count`]: reqwest_interceptor::RequestConfig::retry_count
mod condition;
mod interceptor;
mod retryable;

pub use condition::{is_network_error, DefaultRetryCondition, RetryCondition};
pub use interceptor::{RetryInterceptor, DEFAULT_MAX_RETRIES};
pub use retryable::{is_retry_allowed, Retryable};
