use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{StatusCode, Url};
use std::fmt;

use crate::config::RequestConfig;
use crate::error::{Error, Failure, Result};

/// A successful response, together with the [`RequestConfig`] of the attempt that produced it.
pub struct Response {
    inner: reqwest::Response,
    config: RequestConfig,
}

impl Response {
    pub fn new(inner: reqwest::Response, config: RequestConfig) -> Self {
        Response { inner, config }
    }

    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// The final URL of the response, after redirects.
    pub fn url(&self) -> &Url {
        self.inner.url()
    }

    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    pub fn into_parts(self) -> (reqwest::Response, RequestConfig) {
        (self.inner, self.config)
    }

    pub fn into_inner(self) -> reqwest::Response {
        self.inner
    }

    /// Get the full response text.
    pub async fn text(self) -> Result<String> {
        let Response { inner, config } = self;
        inner
            .text()
            .await
            .map_err(|e| Failure::new(Error::from(e)).with_config(config))
    }

    /// Get the full response body as `Bytes`.
    pub async fn bytes(self) -> Result<Bytes> {
        let Response { inner, config } = self;
        inner
            .bytes()
            .await
            .map_err(|e| Failure::new(Error::from(e)).with_config(config))
    }

    /// Deserialize the response body as JSON.
    ///
    /// # Optional
    ///
    /// This requires the optional `json` feature enabled.
    #[cfg(feature = "json")]
    #[cfg_attr(docsrs, doc(cfg(feature = "json")))]
    pub async fn json<T: serde::de::DeserializeOwned>(self) -> Result<T> {
        let Response { inner, config } = self;
        inner
            .json()
            .await
            .map_err(|e| Failure::new(Error::from(e)).with_config(config))
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Response")
            .field("inner", &self.inner)
            .field("retry_count", &self.config.retry_count())
            .finish_non_exhaustive()
    }
}
