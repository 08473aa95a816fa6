use paste::paste;
use reqwest::StatusCode;
use reqwest_interceptor::{Agent, AgentField, Client, ClientBuilder, Failure};
use reqwest_interceptor_retry::RetryInterceptor;
use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};
use std::time::Duration;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, Respond, ResponseTemplate,
};

use crate::helpers::{refused_uri, SimpleServer};

// Following the HTTP/1.1 specification (https://en.wikipedia.org/wiki/HTTP_message_body) a valid response contains:
// - status line
// - headers
// - empty line
// - optional message body
//
// "HTTP/1.1" is correct up to that point but misses mandatory parts, so the client reports a
// hyper::IncompleteMessage: the attempt failed without a response.
const INCOMPLETE_MESSAGE: &str = "HTTP/1.1";
const COMPLETE_MESSAGE: &str = "HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n";

fn script(failures: usize) -> Vec<String> {
    let mut responses = vec![INCOMPLETE_MESSAGE.to_string(); failures];
    responses.push(COMPLETE_MESSAGE.to_string());
    responses
}

fn retrying_client(retry_interceptor: RetryInterceptor) -> Client {
    let reqwest_client = reqwest::Client::builder().build().unwrap();
    ClientBuilder::new(reqwest_client)
        .with(retry_interceptor)
        .build()
}

/// Starts a scripted server in the background and returns its URI and call counter.
async fn start_server(raw_http_responses: Vec<String>) -> (String, Arc<AtomicU32>) {
    let simple_server = SimpleServer::new("127.0.0.1", None, raw_http_responses)
        .await
        .expect("Error when creating a simple server");
    let uri = simple_server.uri();
    let calls = simple_server.calls();
    tokio::spawn(simple_server.start());
    (uri, calls)
}

macro_rules! assert_no_retry {
    ($x:tt) => {
        paste! {
            #[tokio::test]
            async fn [<assert_no_retry_on_ $x>]() {
                let server = MockServer::start().await;
                Mock::given(method("GET"))
                    .and(path("/foo"))
                    .respond_with(ResponseTemplate::new($x))
                    .expect(1)
                    .mount(&server)
                    .await;

                let client = retrying_client(RetryInterceptor::default());
                let failure = client
                    .get(&format!("{}/foo", server.uri()))
                    .send()
                    .await
                    .expect_err("non-2xx must fail");

                assert_eq!(failure.error().status(), Some(StatusCode::from_u16($x).unwrap()));
                assert!(failure.response().is_some());
                assert_eq!(failure.config().map(|c| c.retry_count()), Some(0));
            }
        }
    };
}

macro_rules! assert_success_without_retry {
    ($x:tt) => {
        paste! {
            #[tokio::test]
            async fn [<assert_success_without_retry_on_ $x>]() {
                let server = MockServer::start().await;
                Mock::given(method("GET"))
                    .and(path("/foo"))
                    .respond_with(ResponseTemplate::new($x))
                    .expect(1)
                    .mount(&server)
                    .await;

                let client = retrying_client(RetryInterceptor::default());
                let resp = client
                    .get(&format!("{}/foo", server.uri()))
                    .send()
                    .await
                    .expect("call failed");

                assert_eq!(resp.status(), StatusCode::from_u16($x).unwrap());
                assert_eq!(resp.config().retry_count(), 0);
            }
        }
    };
}

macro_rules! assert_retry_count {
    ($failures:tt) => {
        paste! {
            #[tokio::test]
            async fn [<assert_retry_count_after_ $failures _network_failures>]() {
                let (uri, calls) = start_server(script($failures)).await;

                let client = retrying_client(RetryInterceptor::new(3));
                let resp = client
                    .get(&format!("{}/foo", uri))
                    .send()
                    .await
                    .expect("call failed");

                assert_eq!(resp.status(), StatusCode::OK);
                assert_eq!(resp.config().retry_count(), $failures);
                assert_eq!(calls.load(Ordering::SeqCst), $failures + 1);
            }
        }
    };
}

// 2xx.
assert_success_without_retry!(200);
assert_success_without_retry!(201);
assert_success_without_retry!(204);

// 4xx.
assert_no_retry!(400);
assert_no_retry!(401);
assert_no_retry!(404);
assert_no_retry!(408);
assert_no_retry!(429);

// 5xx.
assert_no_retry!(500);
assert_no_retry!(502);
assert_no_retry!(503);
assert_no_retry!(504);

assert_retry_count!(0);
assert_retry_count!(1);
assert_retry_count!(2);
assert_retry_count!(3);

#[tokio::test]
async fn succeeds_on_the_last_allowed_attempt() {
    let (uri, calls) = start_server(script(3)).await;

    let client = retrying_client(RetryInterceptor::new(3));
    let resp = client
        .get(&format!("{}/foo", uri))
        .send()
        .await
        .expect("call failed");

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.config().retry_count(), 3);
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn gives_up_after_max_retries() {
    let (uri, calls) = start_server(script(4)).await;

    let client = retrying_client(RetryInterceptor::new(3));
    let failure = client
        .get(&format!("{}/foo", uri))
        .send()
        .await
        .expect_err("fourth failure must propagate");

    assert!(failure.response().is_none());
    assert!(failure.error().is_request());
    assert_eq!(failure.config().map(|c| c.retry_count()), Some(3));
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn status_failure_is_returned_immediately() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/foo"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = retrying_client(RetryInterceptor::new(3));
    let failure = client
        .get(&format!("{}/foo", server.uri()))
        .send()
        .await
        .expect_err("404 must fail");

    assert_eq!(
        failure.response().map(|r| r.status()),
        Some(StatusCode::NOT_FOUND)
    );
    assert_eq!(failure.config().map(|c| c.retry_count()), Some(0));
}

#[tokio::test]
async fn zero_max_retries_never_replays() {
    let (uri, calls) = start_server(script(1)).await;

    let client = retrying_client(RetryInterceptor::new(0));
    let failure = client
        .get(&format!("{}/foo", uri))
        .send()
        .await
        .expect_err("no replay allowed");

    assert_eq!(failure.config().map(|c| c.retry_count()), Some(0));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rejecting_condition_disables_retries() {
    let (uri, calls) = start_server(script(1)).await;

    let reqwest_client = reqwest::Client::builder().build().unwrap();
    let client = ClientBuilder::new(reqwest_client)
        .with(RetryInterceptor::new_with_condition(
            10,
            |_: &Failure| false,
        ))
        .build();
    let failure = client
        .get(&format!("{}/foo", uri))
        .send()
        .await
        .expect_err("condition rejects every failure");

    assert!(failure.response().is_none());
    assert_eq!(failure.config().map(|c| c.retry_count()), Some(0));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failure_without_config_is_propagated_unchanged() {
    let client = retrying_client(RetryInterceptor::new(3));
    let failure = client
        .get("http://[::1")
        .send()
        .await
        .expect_err("unparsable url must fail");

    assert!(failure.error().is_builder());
    assert!(failure.config().is_none());
    assert!(failure.response().is_none());
}

#[tokio::test]
async fn retries_refused_connections() {
    let uri = refused_uri().await.unwrap();

    let client = retrying_client(RetryInterceptor::new(2));
    let failure = client
        .get(&uri)
        .send()
        .await
        .expect_err("nothing is listening");

    assert!(failure.error().is_connect());
    assert_eq!(failure.config().map(|c| c.retry_count()), Some(2));
}

#[tokio::test]
async fn retries_responses_that_are_not_http() {
    let (uri, calls) = start_server(vec![
        "GARBAGE\r\n\r\n".to_string(),
        COMPLETE_MESSAGE.to_string(),
    ])
    .await;

    let client = retrying_client(RetryInterceptor::new(3));
    let resp = client
        .get(&format!("{}/foo", uri))
        .send()
        .await
        .expect("second attempt succeeds");

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.config().retry_count(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn unresolvable_hosts_are_not_retried() {
    let client = retrying_client(RetryInterceptor::new(3));
    let failure = client
        .get("http://nonexistent.invalid/foo")
        .send()
        .await
        .expect_err("the .invalid domain never resolves");

    assert!(failure.error().is_connect());
    assert!(failure.response().is_none());
    assert_eq!(failure.config().map(|c| c.retry_count()), Some(0));
}

#[tokio::test]
async fn default_agents_are_removed_before_replay() {
    let uri = refused_uri().await.unwrap();
    let default_http = Agent::new(reqwest::Client::new());

    let client = ClientBuilder::new(reqwest::Client::new())
        .http_agent(default_http.clone())
        .with(RetryInterceptor::new(1))
        .build();
    let failure = client
        .get(&uri)
        .http_agent(default_http)
        .agent(client.defaults().general_agent().clone())
        .send()
        .await
        .expect_err("nothing is listening");

    let config = failure.config().expect("config is kept");
    assert_eq!(config.retry_count(), 1);
    assert!(config.agent(AgentField::Http).is_none());
    assert!(config.agent(AgentField::General).is_none());
}

#[tokio::test]
async fn custom_agents_survive_replays() {
    let uri = refused_uri().await.unwrap();
    let default_http = Agent::new(reqwest::Client::new());
    let custom_http = Agent::new(reqwest::Client::new());

    let client = ClientBuilder::new(reqwest::Client::new())
        .http_agent(default_http)
        .with(RetryInterceptor::new(3))
        .build();
    let failure = client
        .get(&uri)
        .http_agent(custom_http.clone())
        .send()
        .await
        .expect_err("nothing is listening");

    let config = failure.config().expect("config is kept");
    assert_eq!(config.retry_count(), 3);
    let kept = config.agent(AgentField::Http).expect("custom agent kept");
    assert!(Agent::ptr_eq(kept, &custom_http));
}

pub struct RetryTimeoutResponder(Arc<AtomicU32>, u32, Duration);

impl RetryTimeoutResponder {
    fn new(retries: u32, initial_timeout: Duration) -> Self {
        Self(Arc::new(AtomicU32::new(0)), retries, initial_timeout)
    }
}

impl Respond for RetryTimeoutResponder {
    fn respond(&self, _request: &wiremock::Request) -> ResponseTemplate {
        let mut retries = self.0.load(Ordering::SeqCst);
        retries += 1;
        self.0.store(retries, Ordering::SeqCst);

        if retries + 1 >= self.1 {
            ResponseTemplate::new(200)
        } else {
            ResponseTemplate::new(500).set_delay(self.2)
        }
    }
}

#[tokio::test]
async fn assert_retry_on_request_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/foo"))
        .respond_with(RetryTimeoutResponder::new(3, Duration::from_millis(1000)))
        .expect(2)
        .mount(&server)
        .await;

    let client = retrying_client(RetryInterceptor::new(3));
    let resp = client
        .get(&format!("{}/foo", server.uri()))
        .timeout(Duration::from_millis(100))
        .send()
        .await
        .expect("call failed");

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.config().retry_count(), 1);
}

pub struct RetryResponder(Arc<AtomicU32>, u32, u16);

impl RetryResponder {
    fn new(retries: u32, status_code: u16) -> Self {
        Self(Arc::new(AtomicU32::new(0)), retries, status_code)
    }
}

impl Respond for RetryResponder {
    fn respond(&self, _request: &wiremock::Request) -> ResponseTemplate {
        let mut retries = self.0.load(Ordering::SeqCst);
        retries += 1;
        self.0.store(retries, Ordering::SeqCst);

        if retries + 1 >= self.1 {
            ResponseTemplate::new(200)
        } else {
            ResponseTemplate::new(self.2)
        }
    }
}

#[tokio::test]
async fn custom_condition_retries_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/foo"))
        .respond_with(RetryResponder::new(4, 503))
        .expect(3)
        .mount(&server)
        .await;

    let retry_server_errors = |failure: &Failure| match failure.response() {
        None => true,
        Some(response) => response.status().is_server_error(),
    };
    let reqwest_client = reqwest::Client::builder().build().unwrap();
    let client = ClientBuilder::new(reqwest_client)
        .with(RetryInterceptor::new_with_condition(3, retry_server_errors))
        .build();
    let resp = client
        .post(&format!("{}/foo", server.uri()))
        .body("payload")
        .send()
        .await
        .expect("call failed");

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.config().retry_count(), 2);
    assert_eq!(resp.config().body().map(|b| &b[..]), Some(&b"payload"[..]));
}
