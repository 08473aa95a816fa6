use bytes::Bytes;
use http::Extensions;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{IntoUrl, Method, StatusCode};
use std::fmt::{self, Display};
use std::sync::Arc;
use std::time::Duration;

use crate::agent::{Agent, AgentField};
use crate::config::RequestConfig;
use crate::error::{Error, Failure, Result};
use crate::interceptor::{Chain, Interceptor};
use crate::response::Response;

pub use service::Pending;

/// Default transport settings of a [`Client`], merged underneath every [`RequestConfig`] it
/// dispatches.
#[derive(Clone, Debug)]
pub struct Defaults {
    agent: Agent,
    http_agent: Option<Agent>,
    https_agent: Option<Agent>,
    headers: HeaderMap,
    timeout: Option<Duration>,
}

impl Defaults {
    fn new(agent: Agent) -> Self {
        Defaults {
            agent,
            http_agent: None,
            https_agent: None,
            headers: HeaderMap::new(),
            timeout: None,
        }
    }

    /// The default agent for `field`. The general agent is always set.
    pub fn agent(&self, field: AgentField) -> Option<&Agent> {
        match field {
            AgentField::General => Some(&self.agent),
            AgentField::Http => self.http_agent.as_ref(),
            AgentField::Https => self.https_agent.as_ref(),
        }
    }

    /// The agent used when neither the request nor a scheme-specific default provides one.
    pub fn general_agent(&self) -> &Agent {
        &self.agent
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn timeout(&self) -> Option<&Duration> {
        self.timeout.as_ref()
    }
}

fn default_validate_status(status: StatusCode) -> bool {
    status.is_success()
}

/// A `ClientBuilder` is used to build a [`Client`].
pub struct ClientBuilder {
    defaults: Defaults,
    validate_status: fn(StatusCode) -> bool,
    interceptor_stack: Vec<Arc<dyn Interceptor>>,
}

impl ClientBuilder {
    /// Starts a builder whose general default agent wraps `client`.
    pub fn new(client: reqwest::Client) -> Self {
        ClientBuilder {
            defaults: Defaults::new(Agent::new(client)),
            validate_status: default_validate_status,
            interceptor_stack: Vec::new(),
        }
    }

    /// This method allows creating a ClientBuilder
    /// from an existing Client instance
    pub fn from_client(client: Client) -> Self {
        ClientBuilder {
            defaults: client.inner.defaults.clone(),
            validate_status: client.inner.validate_status,
            interceptor_stack: client.inner.interceptor_stack.to_vec(),
        }
    }

    /// Replaces the general default agent.
    pub fn agent(mut self, agent: Agent) -> Self {
        self.defaults.agent = agent;
        self
    }

    /// Sets the default agent for `http` URLs.
    pub fn http_agent(mut self, agent: Agent) -> Self {
        self.defaults.http_agent = Some(agent);
        self
    }

    /// Sets the default agent for `https` URLs.
    pub fn https_agent(mut self, agent: Agent) -> Self {
        self.defaults.https_agent = Some(agent);
        self
    }

    /// Headers sent with every request unless the request sets the same header itself.
    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.defaults.headers = headers;
        self
    }

    /// Timeout applied to every request that does not set its own.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.defaults.timeout = Some(timeout);
        self
    }

    /// Decides which response statuses count as success. Defaults to `2xx`.
    ///
    /// A response with any other status becomes a [`Failure`] carrying both the response and
    /// an [`Error::Status`].
    pub fn validate_status(mut self, validate_status: fn(StatusCode) -> bool) -> Self {
        self.validate_status = validate_status;
        self
    }

    /// Convenience method to attach an interceptor.
    ///
    /// If you need to keep a reference to the interceptor after attaching, use [`with_arc`].
    ///
    /// [`with_arc`]: Self::with_arc
    pub fn with<I>(self, interceptor: I) -> Self
    where
        I: Interceptor,
    {
        self.with_arc(Arc::new(interceptor))
    }

    /// Add an interceptor to the chain. [`with`] is more ergonomic if you don't need the `Arc`.
    ///
    /// [`with`]: Self::with
    pub fn with_arc(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptor_stack.push(interceptor);
        self
    }

    /// Returns a `Client` using this builder configuration.
    pub fn build(self) -> Client {
        Client {
            inner: Arc::new(ClientRef {
                defaults: self.defaults,
                validate_status: self.validate_status,
                interceptor_stack: self.interceptor_stack.into_boxed_slice(),
            }),
        }
    }
}

/// `Client` dispatches [`RequestConfig`]s through its agents and runs every outcome through
/// its interceptors.
///
/// Cloning a `Client` is cheap: clones share defaults and interceptors.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientRef>,
}

struct ClientRef {
    defaults: Defaults,
    validate_status: fn(StatusCode) -> bool,
    interceptor_stack: Box<[Arc<dyn Interceptor>]>,
}

impl Client {
    /// The defaults merged underneath every request this client dispatches.
    pub fn defaults(&self) -> &Defaults {
        &self.inner.defaults
    }

    /// Convenience method to make a `GET` request to a URL.
    ///
    /// # Errors
    ///
    /// This method fails whenever the supplied `Url` cannot be parsed.
    pub fn get<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    /// Convenience method to make a `POST` request to a URL.
    ///
    /// # Errors
    ///
    /// This method fails whenever the supplied `Url` cannot be parsed.
    pub fn post<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    /// Convenience method to make a `PUT` request to a URL.
    ///
    /// # Errors
    ///
    /// This method fails whenever the supplied `Url` cannot be parsed.
    pub fn put<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::PUT, url)
    }

    /// Convenience method to make a `PATCH` request to a URL.
    ///
    /// # Errors
    ///
    /// This method fails whenever the supplied `Url` cannot be parsed.
    pub fn patch<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::PATCH, url)
    }

    /// Convenience method to make a `DELETE` request to a URL.
    ///
    /// # Errors
    ///
    /// This method fails whenever the supplied `Url` cannot be parsed.
    pub fn delete<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::DELETE, url)
    }

    /// Convenience method to make a `HEAD` request to a URL.
    ///
    /// # Errors
    ///
    /// This method fails whenever the supplied `Url` cannot be parsed.
    pub fn head<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::HEAD, url)
    }

    /// Start building a request with the `Method` and `Url`.
    ///
    /// Returns a `RequestBuilder`, which will allow setting headers and
    /// the request body before sending.
    ///
    /// # Errors
    ///
    /// This method fails whenever the supplied `Url` cannot be parsed.
    pub fn request<U: IntoUrl>(&self, method: Method, url: U) -> RequestBuilder {
        RequestBuilder {
            client: self.clone(),
            config: self
                .inner
                .defaults
                .agent
                .client()
                .request(method, url)
                .build()
                .map(|request| {
                    RequestConfig::new(request.method().clone(), request.url().clone())
                })
                .map_err(Error::from),
        }
    }

    /// Issues `config` as a new request.
    ///
    /// The request is dispatched through the agent resolved for it, its response status is
    /// validated, and the outcome runs through every interceptor. Interceptors replaying a
    /// failed request call this with the same configuration again.
    pub fn execute(&self, config: RequestConfig) -> Pending {
        let client = self.clone();
        Pending::new(async move {
            let outcome = client.dispatch(config).await;
            client.intercept(outcome).await
        })
    }

    /// Runs an outcome that never reached dispatch through the interceptors.
    fn reject(&self, failure: Failure) -> Pending {
        let client = self.clone();
        Pending::new(async move { client.intercept(Err(failure)).await })
    }

    async fn intercept(&self, outcome: Result<Response>) -> Result<Response> {
        Chain::new(self, &self.inner.interceptor_stack)
            .run(outcome)
            .await
    }

    async fn dispatch(&self, config: RequestConfig) -> Result<Response> {
        let defaults = &self.inner.defaults;
        let agent = config.resolve_agent(defaults).clone();
        let request = match config.to_request(&agent, defaults) {
            Ok(request) => request,
            Err(e) => return Err(Failure::new(e).with_config(config)),
        };

        match agent.client().execute(request).await {
            Ok(response) if (self.inner.validate_status)(response.status()) => {
                Ok(Response::new(response, config))
            }
            Ok(response) => Err(Failure::new(Error::Status(response.status()))
                .with_response(response)
                .with_config(config)),
            Err(e) => Err(Failure::new(e).with_config(config)),
        }
    }
}

/// Create a `Client` without any interceptor.
impl From<reqwest::Client> for Client {
    fn from(client: reqwest::Client) -> Self {
        ClientBuilder::new(client).build()
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // skipping interceptor_stack field for now
        f.debug_struct("Client")
            .field("defaults", &self.inner.defaults)
            .finish_non_exhaustive()
    }
}

mod service {
    use std::{
        future::Future,
        pin::Pin,
        task::{Context, Poll},
    };

    use crate::config::RequestConfig;
    use crate::error::{Failure, Result};
    use crate::interceptor::BoxFuture;
    use crate::response::Response;
    use crate::Client;

    /// A request attempt in flight, resolving to its final outcome once every interceptor ran.
    #[must_use = "futures do nothing unless you `.await` or poll them"]
    pub struct Pending {
        inner: BoxFuture<'static, Result<Response>>,
    }

    impl Pending {
        pub(crate) fn new<F>(future: F) -> Self
        where
            F: Future<Output = Result<Response>> + Send + 'static,
        {
            Pending {
                inner: Box::pin(future),
            }
        }
    }

    impl Unpin for Pending {}

    impl Future for Pending {
        type Output = Result<Response>;

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
            self.inner.as_mut().poll(cx)
        }
    }

    impl tower_service::Service<RequestConfig> for Client {
        type Response = Response;
        type Error = Failure;
        type Future = Pending;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, config: RequestConfig) -> Self::Future {
            self.execute(config)
        }
    }
}

fn invalid_header(err: http::Error) -> Error {
    Error::builder(err)
}

/// Builds a [`RequestConfig`] and sends it through a [`Client`].
#[must_use = "RequestBuilder does nothing until you 'send' it"]
pub struct RequestBuilder {
    client: Client,
    config: std::result::Result<RequestConfig, Error>,
}

impl RequestBuilder {
    /// Assemble a builder starting from an existing `Client` and a `RequestConfig`.
    pub fn from_parts(client: Client, config: RequestConfig) -> RequestBuilder {
        RequestBuilder {
            client,
            config: Ok(config),
        }
    }

    fn map_config<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&mut RequestConfig) -> std::result::Result<(), Error>,
    {
        if let Ok(config) = &mut self.config {
            if let Err(e) = f(config) {
                self.config = Err(e);
            }
        }
        self
    }

    /// Add a `Header` to this Request.
    pub fn header<K, V>(self, key: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        self.map_config(|config| {
            let key = HeaderName::try_from(key).map_err(|e| invalid_header(e.into()))?;
            let value = HeaderValue::try_from(value).map_err(|e| invalid_header(e.into()))?;
            config.headers_mut().append(key, value);
            Ok(())
        })
    }

    /// Add a set of Headers to the existing ones on this Request.
    ///
    /// The headers will be merged in to any already set.
    pub fn headers(self, headers: HeaderMap) -> Self {
        self.map_config(|config| {
            config.headers_mut().extend(headers);
            Ok(())
        })
    }

    /// Enable HTTP bearer authentication.
    pub fn bearer_auth<T>(self, token: T) -> Self
    where
        T: Display,
    {
        self.map_config(|config| {
            let mut value =
                HeaderValue::try_from(format!("Bearer {}", token)).map_err(Error::builder)?;
            value.set_sensitive(true);
            config.headers_mut().insert(AUTHORIZATION, value);
            Ok(())
        })
    }

    /// Set the request body.
    pub fn body<T: Into<Bytes>>(self, body: T) -> Self {
        self.map_config(|config| {
            *config.body_mut() = Some(body.into());
            Ok(())
        })
    }

    /// Enables a request timeout.
    ///
    /// The timeout is applied from when the request starts connecting until the
    /// response body has finished. It affects only this request and overrides
    /// the timeout configured using `ClientBuilder::timeout()`.
    pub fn timeout(self, timeout: Duration) -> Self {
        self.map_config(|config| {
            *config.timeout_mut() = Some(timeout);
            Ok(())
        })
    }

    /// Append query parameters to the URL.
    ///
    /// This method appends and does not overwrite: calling
    /// `.query(&[("foo", "a"), ("foo", "b")])` gives `"foo=a&foo=b"`.
    pub fn query<K, V>(self, query: &[(K, V)]) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.map_config(|config| {
            if !query.is_empty() {
                let mut pairs = config.url_mut().query_pairs_mut();
                for (key, value) in query {
                    pairs.append_pair(key.as_ref(), value.as_ref());
                }
            }
            Ok(())
        })
    }

    /// Dispatch this request through `agent` whatever the URL scheme, unless a scheme-specific
    /// agent applies.
    pub fn agent(self, agent: Agent) -> Self {
        self.agent_field(AgentField::General, agent)
    }

    /// Dispatch this request through `agent` if the URL is `http`.
    pub fn http_agent(self, agent: Agent) -> Self {
        self.agent_field(AgentField::Http, agent)
    }

    /// Dispatch this request through `agent` if the URL is `https`.
    pub fn https_agent(self, agent: Agent) -> Self {
        self.agent_field(AgentField::Https, agent)
    }

    fn agent_field(self, field: AgentField, agent: Agent) -> Self {
        self.map_config(|config| {
            *config.agent_mut(field) = Some(agent);
            Ok(())
        })
    }

    /// Send a JSON body.
    ///
    /// # Optional
    ///
    /// This requires the optional `json` feature enabled.
    ///
    /// # Errors
    ///
    /// Serialization can fail if `T`'s implementation of `Serialize` decides to
    /// fail, or if `T` contains a map with non-string keys.
    #[cfg(feature = "json")]
    #[cfg_attr(docsrs, doc(cfg(feature = "json")))]
    pub fn json<T: serde::Serialize + ?Sized>(self, json: &T) -> Self {
        self.map_config(|config| {
            let body = serde_json::to_vec(json).map_err(Error::builder)?;
            config
                .headers_mut()
                .entry(reqwest::header::CONTENT_TYPE)
                .or_insert_with(|| HeaderValue::from_static("application/json"));
            *config.body_mut() = Some(body.into());
            Ok(())
        })
    }

    /// Inserts the extension into this request
    pub fn with_extension<T: Send + Sync + Clone + 'static>(self, extension: T) -> Self {
        self.map_config(|config| {
            config.extensions_mut().insert(extension);
            Ok(())
        })
    }

    /// Returns a mutable reference to the extensions of this request, if it could be built so far.
    pub fn extensions(&mut self) -> Option<&mut Extensions> {
        self.config.as_mut().ok().map(RequestConfig::extensions_mut)
    }

    /// Build the `RequestConfig`, which can be inspected, modified and executed with
    /// `Client::execute()`.
    pub fn build(self) -> std::result::Result<RequestConfig, Error> {
        self.config
    }

    /// Constructs the request and sends it to the target URL.
    ///
    /// # Errors
    ///
    /// This method fails if there was an error while sending request, if the
    /// response status was rejected, or if the request could not be built. In
    /// the last case the failure carries no configuration.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use anyhow::Error;
    /// #
    /// # async fn run() -> Result<(), Error> {
    /// let response = reqwest_interceptor::Client::from(reqwest::Client::new())
    ///     .get("https://hyper.rs")
    ///     .send()
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn send(self) -> Result<Response> {
        let RequestBuilder { client, config } = self;
        match config {
            Ok(config) => client.execute(config).await,
            Err(e) => client.reject(Failure::new(e)).await,
        }
    }
}

impl fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
