use reqwest_interceptor::Error;

/// Classification of an error returned by a request attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retryable {
    /// The failure was due to something that might resolve in the future.
    Transient,
    /// Unresolvable error.
    Fatal,
}

impl Retryable {
    /// Classifies an error by its kind alone, regardless of any retry policy.
    pub fn from_error(error: &Error) -> Self {
        match error {
            // If something fails in an interceptor we're screwed.
            Error::Middleware(_) => Retryable::Fatal,
            Error::Builder(_) => Retryable::Fatal,
            // Whether a rejected status is worth replaying is up to the retry condition.
            Error::Status(_) => Retryable::Transient,
            Error::Reqwest(error) => Retryable::from(error),
        }
    }
}

/// Transport errors are replayable unless they are known to fail again the same way.
///
/// Fatal are: errors raised while sending the request body or reading the response, redirect
/// and builder errors, hosts that cannot be resolved or reached, rejected TLS handshakes, and
/// requests abandoned or misused on this side of the connection.
impl From<&reqwest::Error> for Retryable {
    fn from(error: &reqwest::Error) -> Retryable {
        if error.is_timeout() {
            Retryable::Transient
        } else if error.is_body() || error.is_decode() || error.is_builder() || error.is_redirect()
        {
            Retryable::Fatal
        } else if error.is_status() {
            Retryable::Transient
        } else {
            #[cfg(not(target_arch = "wasm32"))]
            if error.is_connect() && is_unreachable(error) {
                return Retryable::Fatal;
            }
            #[cfg(not(target_arch = "wasm32"))]
            if let Some(hyper_error) = get_source_error_type::<hyper::Error>(error) {
                // hyper::Error(IncompleteMessage) is raised if the response is cut halfway
                // through, and hyper::Error(Parse) if the bytes are not HTTP at all. Both are
                // replayable. hyper::Error(Canceled) is raised when the connection is closed
                // on the server side before the request was dispatched: requests sent
                // through this client are always awaited, so it never stands for an abort of
                // our own.
                if hyper_error.is_user() || hyper_error.is_body_write_aborted() {
                    return Retryable::Fatal;
                }
            }
            Retryable::Transient
        }
    }
}

/// Returns `true` if replaying a request that failed with `error` is structurally sound.
///
/// This only looks at what kind of error happened. Whether a particular failure should be
/// replayed is decided by the retry condition and the retry limit on top of this.
pub fn is_retry_allowed(error: &Error) -> bool {
    Retryable::from_error(error) == Retryable::Transient
}

/// Returns `true` if a connect error says the host does not exist or cannot be reached.
#[cfg(not(target_arch = "wasm32"))]
fn is_unreachable(error: &reqwest::Error) -> bool {
    if has_source_message(error, DNS_ERROR) {
        return true;
    }
    match get_source_error_type::<std::io::Error>(error) {
        Some(io_error) => classify_connect_io_error(io_error) == Retryable::Fatal,
        None => false,
    }
}

/// How the connector reports a failed name lookup.
#[cfg(not(target_arch = "wasm32"))]
const DNS_ERROR: &str = "dns error";

/// Classifies an I/O error raised while connecting.
///
/// TLS backends report rejected certificates and handshakes as `InvalidData`.
#[cfg(not(target_arch = "wasm32"))]
fn classify_connect_io_error(error: &std::io::Error) -> Retryable {
    use std::io::ErrorKind;

    match error.kind() {
        ErrorKind::HostUnreachable | ErrorKind::NetworkUnreachable | ErrorKind::InvalidData => {
            Retryable::Fatal
        }
        _ => Retryable::Transient,
    }
}

/// Returns `true` if an error in the source chain of `err` displays as `message`.
#[cfg(not(target_arch = "wasm32"))]
fn has_source_message(err: &dyn std::error::Error, message: &str) -> bool {
    let mut source = err.source();

    while let Some(err) = source {
        if err.to_string() == message {
            return true;
        }

        source = err.source();
    }
    false
}

/// Downcasts the given err source into T.
#[cfg(not(target_arch = "wasm32"))]
fn get_source_error_type<T: std::error::Error + 'static>(
    err: &dyn std::error::Error,
) -> Option<&T> {
    let mut source = err.source();

    while let Some(err) = source {
        if let Some(err) = err.downcast_ref::<T>() {
            return Some(err);
        }

        source = err.source();
    }
    None
}
