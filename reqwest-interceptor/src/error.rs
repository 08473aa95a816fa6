use reqwest::{StatusCode, Url};
use std::fmt;
use thiserror::Error;

use crate::config::RequestConfig;

pub type Result<T> = std::result::Result<T, Failure>;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum Error {
    /// There was an error running some interceptor
    #[error("Middleware error: {0}")]
    Middleware(#[from] anyhow::Error),
    /// Error from the underlying reqwest client
    #[error("Request error: {0}")]
    Reqwest(#[from] reqwest::Error),
    /// A response was received but its status was rejected by the client
    #[error("Status error: {0}")]
    Status(StatusCode),
    /// The request could not be assembled
    #[error("Builder error: {0}")]
    Builder(BoxError),
}

impl Error {
    pub fn middleware<E>(err: E) -> Self
    where
        E: 'static + Send + Sync + std::error::Error,
    {
        Error::Middleware(err.into())
    }

    pub(crate) fn builder<E: Into<BoxError>>(err: E) -> Self {
        Error::Builder(err.into())
    }

    /// Returns a possible URL related to this error.
    pub fn url(&self) -> Option<&Url> {
        match self {
            Error::Reqwest(e) => e.url(),
            _ => None,
        }
    }

    /// Returns true if the error comes from assembling the request.
    pub fn is_builder(&self) -> bool {
        match self {
            Error::Builder(_) => true,
            Error::Reqwest(e) => e.is_builder(),
            _ => false,
        }
    }

    /// Returns true if the error is from a `RedirectPolicy`.
    pub fn is_redirect(&self) -> bool {
        match self {
            Error::Reqwest(e) => e.is_redirect(),
            _ => false,
        }
    }

    /// Returns true if a response was received and rejected because of its status.
    pub fn is_status(&self) -> bool {
        match self {
            Error::Status(_) => true,
            Error::Reqwest(e) => e.is_status(),
            _ => false,
        }
    }

    /// Returns true if the error is related to a timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Reqwest(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Returns true if the error is related to the request
    pub fn is_request(&self) -> bool {
        match self {
            Error::Reqwest(e) => e.is_request(),
            _ => false,
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    /// Returns true if the error is related to connect
    pub fn is_connect(&self) -> bool {
        match self {
            Error::Reqwest(e) => e.is_connect(),
            _ => false,
        }
    }

    /// Returns true if the error is related to the request or response body
    pub fn is_body(&self) -> bool {
        match self {
            Error::Reqwest(e) => e.is_body(),
            _ => false,
        }
    }

    /// Returns the status code, if the error was generated from a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Status(status) => Some(*status),
            Error::Reqwest(e) => e.status(),
            _ => None,
        }
    }
}

/// The record of one failed attempt.
///
/// Carries the [`Error`], the response if one was received, and the [`RequestConfig`] that
/// produced the attempt. The configuration is absent when the failure happened before a
/// request could be assembled, e.g. for an unparsable URL.
#[derive(Debug)]
pub struct Failure {
    error: Error,
    response: Option<reqwest::Response>,
    config: Option<RequestConfig>,
}

impl Failure {
    pub fn new(error: impl Into<Error>) -> Self {
        Failure {
            error: error.into(),
            response: None,
            config: None,
        }
    }

    pub fn with_response(self, response: reqwest::Response) -> Self {
        Failure {
            response: Some(response),
            ..self
        }
    }

    pub fn with_config(self, config: RequestConfig) -> Self {
        Failure {
            config: Some(config),
            ..self
        }
    }

    pub fn error(&self) -> &Error {
        &self.error
    }

    /// The response, if the attempt got far enough to receive one.
    pub fn response(&self) -> Option<&reqwest::Response> {
        self.response.as_ref()
    }

    pub fn config(&self) -> Option<&RequestConfig> {
        self.config.as_ref()
    }

    pub fn into_parts(self) -> (Error, Option<reqwest::Response>, Option<RequestConfig>) {
        (self.error, self.response, self.config)
    }

    /// Takes the configuration out of the failure, discarding the rest.
    ///
    /// Hands the failure back untouched if it has no configuration.
    pub fn try_into_config(self) -> std::result::Result<RequestConfig, Failure> {
        match self.config {
            Some(config) => Ok(config),
            None => Err(self),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.error.source()
    }
}
