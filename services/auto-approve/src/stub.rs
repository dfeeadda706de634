//! Canned GitHub REST API for exercising the HTTP clients

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    Router,
};
use std::sync::{Arc, Mutex};

/// PEM key the stub accepts JWTs from
pub(crate) const APP_KEY_PEM: &[u8] = include_bytes!("testdata/app_key.pem");

/// A request as the stub received it
#[derive(Debug, Clone)]
pub(crate) struct Received {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Received {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

#[derive(Clone)]
struct Routes {
    canned: Arc<Vec<(Method, String, StatusCode, String)>>,
    received: Arc<Mutex<Vec<Received>>>,
}

async fn respond(
    State(routes): State<Routes>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    let path = uri.path().to_string();
    routes.received.lock().unwrap().push(Received {
        method: method.clone(),
        path: path.clone(),
        headers,
        body,
    });
    routes
        .canned
        .iter()
        .find(|(m, p, _, _)| *m == method && *p == path)
        .map(|(_, _, status, body)| (*status, body.clone()))
        .unwrap_or((StatusCode::NOT_FOUND, r#"{"message":"Not Found"}"#.to_string()))
}

/// Running stub server
pub(crate) struct GitHubStub {
    pub url: String,
    received: Arc<Mutex<Vec<Received>>>,
}

impl GitHubStub {
    /// Serve `routes` on an ephemeral localhost port. Unmatched requests get 404.
    pub async fn start(routes: Vec<(Method, &str, StatusCode, serde_json::Value)>) -> Self {
        let received = Arc::new(Mutex::new(Vec::new()));
        let canned = routes
            .into_iter()
            .map(|(method, path, status, body)| (method, path.to_string(), status, body.to_string()))
            .collect();
        let app = Router::new().fallback(respond).with_state(Routes {
            canned: Arc::new(canned),
            received: received.clone(),
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { url, received }
    }

    pub fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }
}

/// HTTP client that never routes localhost through a proxy
pub(crate) fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// URL of a localhost port nothing listens on
pub(crate) async fn closed_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// Check the headers every GitHub REST call carries and return the bearer token
pub(crate) fn bearer_token(request: &Received) -> String {
    assert_eq!(request.header("accept"), Some("application/vnd.github+json"));
    assert_eq!(request.header("x-github-api-version"), Some("2022-11-28"));
    assert_eq!(request.header("user-agent"), Some("auto-approve-bot"));
    request
        .header("authorization")
        .and_then(|value| value.strip_prefix("Bearer "))
        .expect("bearer authorization header")
        .to_string()
}
