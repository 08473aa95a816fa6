use reqwest_interceptor::Failure;

/// Decides whether a failed attempt is eligible for a retry.
///
/// The condition is consulted first, for every failure that carries a request configuration.
/// The retry limit and the error's structural classification ([`is_retry_allowed`]) must agree
/// as well before a request is replayed.
///
/// Any `Fn(&Failure) -> bool` is a condition:
///
/// ```
/// use reqwest_interceptor::{ClientBuilder, Failure};
/// use reqwest_interceptor_retry::RetryInterceptor;
///
/// // Retry network errors and 503s, but nothing else.
/// let retry_unavailable = |failure: &Failure| match failure.response() {
///     None => true,
///     Some(response) => response.status() == reqwest::StatusCode::SERVICE_UNAVAILABLE,
/// };
///
/// let client = ClientBuilder::new(reqwest::Client::new())
///     .with(RetryInterceptor::new_with_condition(3, retry_unavailable))
///     .build();
/// ```
///
/// [`is_retry_allowed`]: crate::is_retry_allowed
pub trait RetryCondition: 'static + Send + Sync {
    fn should_retry(&self, failure: &Failure) -> bool;
}

impl<F> RetryCondition for F
where
    F: Fn(&Failure) -> bool + Send + Sync + 'static,
{
    fn should_retry(&self, failure: &Failure) -> bool {
        (self)(failure)
    }
}

/// The default [`RetryCondition`] for [`RetryInterceptor`](crate::RetryInterceptor): see
/// [`is_network_error`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRetryCondition;

impl RetryCondition for DefaultRetryCondition {
    fn should_retry(&self, failure: &Failure) -> bool {
        is_network_error(failure)
    }
}

/// Returns `true` if the attempt failed without receiving any response.
///
/// Failures carrying an HTTP response, whatever its status, are not network errors.
pub fn is_network_error(failure: &Failure) -> bool {
    failure.response().is_none()
}
