//! Shared harness for router tests
//!
//! Builds the full application over the in-memory store and cache, the
//! scripted Google provider and the dummy payment provider, so no database
//! or network is needed. Requests go through `tower::Service::call`.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::Value;
use std::sync::Arc;
use storefront_api::{
    app::{build_router, AppState},
    config::Config,
};
use storefront_shared::{
    auth::{jwt::TokenIssuer, oauth::MockOAuthProvider},
    cache::MemoryCache,
    models::{Provider, Role, User},
    payments::DummyProvider,
    services::{registry::ServiceDeps, ServiceRegistry},
    store::memory::MemoryStore,
};
use tower::Service as _;
use uuid::Uuid;

pub const JWT_SECRET: &str = "router-test-secret-at-least-32-bytes";
pub const FRONTEND_URL: &str = "http://localhost:3000";

pub struct TestApp {
    pub app: Router,
    pub store: MemoryStore,
    pub cache: MemoryCache,
    pub oauth: Arc<MockOAuthProvider>,
    pub tokens: Arc<TokenIssuer>,
}

/// What came back from one request
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// `Set-Cookie` values in order
    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(str::to_string)
            .collect()
    }

    /// Value of the cookie `name` set by this response
    pub fn cookie(&self, name: &str) -> Option<String> {
        let prefix = format!("{}=", name);
        self.set_cookies().iter().find_map(|cookie| {
            cookie
                .strip_prefix(&prefix)
                .and_then(|rest| rest.split(';').next())
                .map(str::to_string)
        })
    }

    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
    }

    pub fn code(&self) -> &str {
        self.body["code"].as_str().unwrap_or_default()
    }
}

pub fn test_config() -> Config {
    Config::from_lookup(|name| match name {
        "DATABASE_URL" => Some("postgres://unused@localhost/storefront".to_string()),
        "REDIS_URL" => Some("redis://localhost:6379".to_string()),
        "JWT_SECRET" => Some(JWT_SECRET.to_string()),
        "FRONTEND_URL" => Some(FRONTEND_URL.to_string()),
        _ => None,
    })
    .expect("test configuration is valid")
}

impl TestApp {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let cache = MemoryCache::new();
        let oauth = Arc::new(MockOAuthProvider::new("google-123", "gina@example.com", "Gina"));
        let tokens = Arc::new(TokenIssuer::new(
            JWT_SECRET,
            Duration::minutes(15),
            Duration::days(7),
        ));

        let deps = ServiceDeps::with_store(store.clone())
            .cache(Arc::new(cache.clone()))
            .oauth(oauth.clone())
            .tokens(tokens.clone())
            .payments(Arc::new(DummyProvider::new()));
        let services = Arc::new(ServiceRegistry::new(deps));

        Self {
            app: build_router(AppState::new(test_config(), services, None)),
            store,
            cache,
            oauth,
            tokens,
        }
    }

    /// Router whose services have no dependencies at all
    pub fn unconfigured() -> Router {
        let services = Arc::new(ServiceRegistry::new(ServiceDeps::default()));
        build_router(AppState::new(test_config(), services, None))
    }

    pub async fn send(&mut self, request: Request<Body>) -> TestResponse {
        send(&mut self.app, request).await
    }

    pub async fn request(
        &mut self,
        method: Method,
        uri: &str,
        headers: &[(header::HeaderName, String)],
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(name, value);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request builds");

        self.send(request).await
    }

    /// Adds a user straight to the store
    pub fn seed_user(&self, role: Role) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: format!("user-{}", Uuid::new_v4().simple()),
            email: format!("{}@example.com", Uuid::new_v4().simple()),
            password_hash: None,
            provider: Provider::Local,
            provider_id: None,
            phone: None,
            address: None,
            role,
            created_at: now,
            updated_at: now,
            last_sign_in_at: None,
        };
        self.store.seed_user(user.clone());
        user
    }

    /// `Authorization` header carrying an access token for `user`
    pub fn bearer(&self, user: &User) -> (header::HeaderName, String) {
        let token = self
            .tokens
            .issue_access(user.id, user.role, user.provider)
            .expect("token issues");
        (header::AUTHORIZATION, format!("Bearer {}", token.token))
    }
}

pub async fn send(app: &mut Router, request: Request<Body>) -> TestResponse {
    let response = app.call(request).await.expect("router is infallible");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    TestResponse {
        status,
        headers,
        body,
    }
}

/// `Cookie` header replaying the session cookies a response set
pub fn cookie_header(response: &TestResponse) -> (header::HeaderName, String) {
    let pairs: Vec<String> = ["access_token", "refresh_token"]
        .iter()
        .filter_map(|name| {
            response
                .cookie(name)
                .map(|value| format!("{}={}", name, value))
        })
        .collect();
    (header::COOKIE, pairs.join("; "))
}

/// `state` query parameter of a consent URL
pub fn state_param(url: &str) -> String {
    url.split(['?', '&'])
        .find_map(|pair| pair.strip_prefix("state="))
        .expect("consent url carries a state")
        .to_string()
}
