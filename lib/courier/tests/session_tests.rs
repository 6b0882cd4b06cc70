//! Integration tests for `Session` over `HyperTransport` using wiremock.

use std::sync::{Arc, Mutex};

use assert2::{check, let_assert};
use bytes::Bytes;
use courier::middleware::{
    HttpErrorMiddleware, MiddlewareFuture, PayloadResponse, RequestMiddleware, ResponseContext,
    ResponseMiddleware,
};
use courier::{
    Error, HyperTransport, Method, RefreshPolicy, Request, Response, ResponsePayload, Result,
    Session, StatusCode, Token, TokenAuthenticator,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, method, path},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct User {
    id: u64,
    name: String,
}

fn url(server: &MockServer, path: &str) -> url::Url {
    url::Url::parse(&format!("{}{path}", server.uri())).expect("url")
}

fn get(server: &MockServer, path: &str) -> Request {
    Request::builder(Method::GET, url(server, path))
        .header("Accept", "application/json")
        .build()
        .expect("request")
}

fn session() -> Session<HyperTransport> {
    Session::builder(HyperTransport::new()).build()
}

/// Sets a header, overwriting any previous value.
struct SetHeader(&'static str, &'static str);

impl RequestMiddleware for SetHeader {
    fn handle<'a>(&'a self, request: &'a mut Request) -> MiddlewareFuture<'a, ()> {
        Box::pin(async move { request.set_header(self.0, self.1) })
    }
}

/// Records the payload it sees, then hands a rewritten one down the chain.
#[derive(Clone, Default)]
struct Rewrite {
    seen: Arc<Mutex<Vec<String>>>,
}

impl ResponseMiddleware for Rewrite {
    fn handle<'a>(
        &'a self,
        mut response: PayloadResponse,
        context: ResponseContext<'a>,
    ) -> MiddlewareFuture<'a, PayloadResponse> {
        Box::pin(async move {
            let kind = response.body().kind().to_string();
            self.seen.lock().expect("seen").push(kind);
            response
                .headers_mut()
                .insert("x-inspected", "yes".parse().expect("header value"));
            context
                .next(response.with_body(ResponsePayload::Data(Bytes::from_static(b"rewritten"))))
                .await
        })
    }
}

// ============================================================================
// perform
// ============================================================================

#[tokio::test]
async fn request_middlewares_run_last_added_first() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/order"))
        .and(header("x-order", "first"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let session = Session::builder(HyperTransport::new())
        .request_middleware(SetHeader("x-order", "first"))
        .build();
    session
        .request_middlewares()
        .add(SetHeader("x-order", "second"));

    let response = session
        .perform(get(&mock_server, "/order"))
        .await
        .expect("response");

    check!(response.status() == StatusCode::OK);
}

#[tokio::test]
async fn caller_gets_the_transport_body_and_the_chain_headers() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/raw"))
        .respond_with(ResponseTemplate::new(200).set_body_string("original"))
        .mount(&mock_server)
        .await;

    let rewrite = Rewrite::default();
    let session = Session::builder(HyperTransport::new())
        .response_middleware(rewrite.clone())
        .build();

    let response = session
        .perform(get(&mock_server, "/raw"))
        .await
        .expect("response");

    check!(response.body().as_ref() == b"original");
    check!(response.header("x-inspected") == Some("yes"));
    check!(*rewrite.seen.lock().expect("seen") == vec!["buffered".to_owned()]);
}

#[tokio::test]
async fn failing_request_middleware_never_reaches_the_network() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let session = session();
    session
        .request_middlewares()
        .add(SetHeader("bad header", "value"));

    let result = session.perform(get(&mock_server, "/never")).await;

    let_assert!(Err(Error::MiddlewareAborted { source, .. }) = result);
    check!(matches!(*source, Error::InvalidRequest(_)));
}

#[tokio::test]
async fn transport_errors_are_not_wrapped() {
    let session = session();
    let url = url::Url::parse("http://127.0.0.1:1/unreachable").expect("url");
    let request = Request::builder(Method::GET, url).build().expect("request");

    let result = session.perform(request).await;

    let_assert!(Err(err) = result);
    check!(err.is_connection());
}

// ============================================================================
// execute
// ============================================================================

#[tokio::test]
async fn execute_decodes_json() {
    let mock_server = MockServer::start().await;
    let user = User {
        id: 1,
        name: "Alice".to_string(),
    };
    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&user))
        .mount(&mock_server)
        .await;

    let body: User = session()
        .execute(get(&mock_server, "/users/1"))
        .await
        .expect("user");

    check!(body == user);
}

#[tokio::test]
async fn execute_with_content_encodes_then_decodes() {
    let mock_server = MockServer::start().await;
    let input = User {
        id: 0,
        name: "Bob".to_string(),
    };
    let output = User {
        id: 42,
        name: "Bob".to_string(),
    };
    Mock::given(method("POST"))
        .and(path("/users"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(&input))
        .respond_with(ResponseTemplate::new(201).set_body_json(&output))
        .mount(&mock_server)
        .await;

    let request = Request::builder(Method::POST, url(&mock_server, "/users"))
        .build()
        .expect("request");
    let (created, metadata): (User, _) = session()
        .execute_with_content_and_metadata(request, &input)
        .await
        .expect("user");

    check!(created == output);
    check!(metadata.status() == StatusCode::CREATED);
}

#[tokio::test]
async fn no_content_decodes_as_none() {
    let mock_server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let request = Request::builder(Method::DELETE, url(&mock_server, "/users/1"))
        .build()
        .expect("request");
    let deleted: Option<User> = session().execute(request).await.expect("decode");

    check!(deleted.is_none());
}

#[tokio::test]
async fn http_errors_skip_decoding() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/404"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(serde_json::json!({"error": "not found"})),
        )
        .mount(&mock_server)
        .await;

    let session = Session::builder(HyperTransport::new())
        .response_middleware(HttpErrorMiddleware)
        .build();
    let result = session.execute::<User>(get(&mock_server, "/users/404")).await;

    let_assert!(Err(err) = result);
    let cause = err.root_cause();
    check!(cause.is_client_error());
    let_assert!(Some(Ok(body)) = cause.decode_body::<serde_json::Value>());
    check!(body["error"] == "not found");
}

#[tokio::test]
async fn decode_errors_carry_the_json_path() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "one", "name": "A"})),
        )
        .mount(&mock_server)
        .await;

    let result = session().execute::<User>(get(&mock_server, "/users/1")).await;

    let_assert!(Err(Error::JsonDeserialization { path, .. }) = result);
    check!(path == "id");
}

// ============================================================================
// bytes
// ============================================================================

#[tokio::test]
async fn bytes_returns_the_shared_stream() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download"))
        .respond_with(ResponseTemplate::new(200).set_body_string("streamed content"))
        .mount(&mock_server)
        .await;

    let rewrite = Rewrite::default();
    let session = Session::builder(HyperTransport::new())
        .response_middleware(rewrite.clone())
        .build();

    let response = session
        .bytes(get(&mock_server, "/download"))
        .await
        .expect("stream");
    check!(response.header("x-inspected") == Some("yes"));

    let body = response.collect().await.expect("collect");
    check!(body.body().as_ref() == b"streamed content");
    check!(*rewrite.seen.lock().expect("seen") == vec!["streaming".to_owned()]);
}

// ============================================================================
// Token refresh end to end
// ============================================================================

struct TokenEndpointPolicy {
    token_url: url::Url,
    cached: Mutex<Option<Token>>,
}

impl RefreshPolicy for TokenEndpointPolicy {
    async fn access_token(&self) -> Option<Token> {
        self.cached.lock().expect("cache").clone()
    }

    fn construct_refresh_request(&self, _current: Option<&Token>) -> Result<Request> {
        Request::builder(Method::POST, self.token_url.clone())
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Bytes::from_static(b"grant_type=refresh_token"))
            .build()
    }

    async fn process_refresh_response(&self, response: Result<Response>) -> Result<Token> {
        let response = response?;
        if !response.is_success() {
            return Err(Error::http(response.status()));
        }
        let token: Token = response.json()?;
        *self.cached.lock().expect("cache") = Some(token.clone());
        Ok(token)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn expired_token_is_refreshed_once_for_concurrent_requests() {
    let mock_server = MockServer::start().await;
    let fresh = Token::new(
        "fresh-token",
        OffsetDateTime::now_utc() + time::Duration::hours(1),
    );
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(&fresh)
                .set_delay(std::time::Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(User {
            id: 7,
            name: "Carol".to_string(),
        }))
        .expect(5)
        .mount(&mock_server)
        .await;

    let policy = TokenEndpointPolicy {
        token_url: url(&mock_server, "/oauth/token"),
        cached: Mutex::new(Some(Token::new(
            "stale-token",
            OffsetDateTime::now_utc() - time::Duration::seconds(1),
        ))),
    };
    let authenticator = TokenAuthenticator::new(policy, HyperTransport::new());
    let session = Arc::new(
        Session::builder(HyperTransport::new())
            .request_middleware(authenticator)
            .response_middleware(HttpErrorMiddleware)
            .build(),
    );

    let calls: Vec<_> = (0..5)
        .map(|_| {
            let session = Arc::clone(&session);
            let request = get(&mock_server, "/me");
            tokio::spawn(async move { session.execute::<User>(request).await })
        })
        .collect();

    for call in calls {
        let user = call.await.expect("join").expect("user");
        check!(user.name == "Carol");
    }
}
