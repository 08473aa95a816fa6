use bytes::Bytes;
use http::Extensions;
use reqwest::header::HeaderMap;
use reqwest::{Method, Url};
use std::time::Duration;

use crate::agent::{Agent, AgentField};
use crate::client::Defaults;

/// The description of one logical request.
///
/// A `RequestConfig` is created when a request is issued and travels with it through the
/// whole pipeline: it is moved into the [`Failure`](crate::Failure) of a failed attempt or the
/// [`Response`](crate::Response) of a successful one. Interceptors that replay a request hand
/// the same record back to [`Client::execute`](crate::Client::execute), so state recorded on it
/// (such as the retry counter) survives across attempts.
///
/// The body is kept as [`Bytes`] so the request can be dispatched any number of times.
#[derive(Debug)]
pub struct RequestConfig {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Bytes>,
    timeout: Option<Duration>,
    agent: Option<Agent>,
    http_agent: Option<Agent>,
    https_agent: Option<Agent>,
    extensions: Extensions,
    retry_count: u32,
}

impl RequestConfig {
    pub fn new(method: Method, url: Url) -> Self {
        RequestConfig {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
            agent: None,
            http_agent: None,
            https_agent: None,
            extensions: Extensions::new(),
            retry_count: 0,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn method_mut(&mut self) -> &mut Method {
        &mut self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn url_mut(&mut self) -> &mut Url {
        &mut self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn body_mut(&mut self) -> &mut Option<Bytes> {
        &mut self.body
    }

    /// Per-request timeout, overriding the client default.
    pub fn timeout(&self) -> Option<&Duration> {
        self.timeout.as_ref()
    }

    pub fn timeout_mut(&mut self) -> &mut Option<Duration> {
        &mut self.timeout
    }

    /// The agent set on this request for `field`, if any.
    pub fn agent(&self, field: AgentField) -> Option<&Agent> {
        match field {
            AgentField::General => self.agent.as_ref(),
            AgentField::Http => self.http_agent.as_ref(),
            AgentField::Https => self.https_agent.as_ref(),
        }
    }

    pub fn agent_mut(&mut self, field: AgentField) -> &mut Option<Agent> {
        match field {
            AgentField::General => &mut self.agent,
            AgentField::Http => &mut self.http_agent,
            AgentField::Https => &mut self.https_agent,
        }
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// How many times this request has been replayed. Starts at `0`.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn retry_count_mut(&mut self) -> &mut u32 {
        &mut self.retry_count
    }

    /// Picks the agent the request is dispatched through.
    ///
    /// Scheme-specific agents win over the general one, and request agents win over client
    /// defaults of the same field.
    pub(crate) fn resolve_agent<'a>(&'a self, defaults: &'a Defaults) -> &'a Agent {
        AgentField::for_scheme(self.url.scheme())
            .and_then(|field| self.agent(field).or_else(|| defaults.agent(field)))
            .or_else(|| self.agent(AgentField::General))
            .unwrap_or_else(|| defaults.general_agent())
    }

    /// Builds the outgoing `reqwest::Request`, with `defaults` merged underneath.
    pub(crate) fn to_request(
        &self,
        agent: &Agent,
        defaults: &Defaults,
    ) -> reqwest::Result<reqwest::Request> {
        let mut headers = defaults.headers().clone();
        headers.extend(self.headers.clone());

        let mut builder = agent
            .client()
            .request(self.method.clone(), self.url.clone())
            .headers(headers);
        if let Some(body) = &self.body {
            builder = builder.body(body.clone());
        }
        if let Some(timeout) = self.timeout.or_else(|| defaults.timeout().copied()) {
            builder = builder.timeout(timeout);
        }
        builder.build()
    }
}
