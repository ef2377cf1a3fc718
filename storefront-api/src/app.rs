/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use storefront_api::{app::{build_router, AppState}, config::Config};
/// use storefront_shared::services::{registry::ServiceDeps, ServiceRegistry};
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let services = ServiceRegistry::new(ServiceDeps::default());
/// let app = build_router(AppState::new(config, Arc::new(services), None));
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, extractors::client_ip, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::{ConnectInfo, Request},
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::{net::SocketAddr, sync::Arc};
use storefront_shared::services::ServiceRegistry;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    /// Domain services, built on first use
    pub services: Arc<ServiceRegistry>,

    pub config: Arc<Config>,

    /// Only used by the health check; None when running without PostgreSQL
    pub db: Option<PgPool>,
}

impl AppState {
    pub fn new(config: Config, services: Arc<ServiceRegistry>, db: Option<PgPool>) -> Self {
        Self {
            services,
            config: Arc::new(config),
            db,
        }
    }

    /// Whether cookies carry `Secure`
    pub fn secure_cookies(&self) -> bool {
        self.config.api.production
    }
}

/// Builds the complete router
///
/// ```text
/// /health                              GET
/// /v1/auth/signup|signin|signout|refresh POST
/// /v1/auth/google/signin|callback      GET
/// /v1/categories[/:id]                 GET (public), POST/PUT/DELETE (admin)
/// /v1/products[/filter|/:id]           GET (optional auth), POST/PUT/DELETE (admin)
/// /v1/users[/]                         GET/PUT (user)
/// /v1/admin/user/promote               POST (user, role checked by the service)
/// /v1/payments/intents[/:id]           POST/GET (user)
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let auth_routes = Router::new()
        .route("/signup", post(routes::auth::sign_up))
        .route("/signin", post(routes::auth::sign_in))
        .route("/signout", post(routes::auth::sign_out))
        .route("/refresh", post(routes::auth::refresh))
        .route("/google/signin", get(routes::google::sign_in))
        .route("/google/callback", get(routes::google::callback));

    let category_routes = Router::new()
        .route(
            "/",
            get(routes::categories::list).post(routes::categories::create),
        )
        .route(
            "/:id",
            get(routes::categories::get)
                .put(routes::categories::update)
                .delete(routes::categories::delete),
        );

    let product_routes = Router::new()
        .route(
            "/",
            get(routes::products::list).post(routes::products::create),
        )
        .route("/filter", get(routes::products::filter))
        .route(
            "/:id",
            get(routes::products::get)
                .put(routes::products::update)
                .delete(routes::products::delete),
        );

    let payment_routes = Router::new()
        .route("/intents", post(routes::payments::create_intent))
        .route("/intents/:id", get(routes::payments::get_intent));

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/categories", category_routes)
        .nest("/products", product_routes)
        .route(
            "/users",
            get(routes::users::profile).put(routes::users::update_profile),
        )
        .route(
            "/users/",
            get(routes::users::profile).put(routes::users::update_profile),
        )
        .route("/admin/user/promote", post(routes::admin::promote))
        .nest("/payments", payment_routes);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(request_span)
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Request span with the client address and user agent
fn request_span(request: &Request) -> tracing::Span {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    let ip = client_ip(request.headers(), peer).unwrap_or_else(|| "unknown".to_string());

    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        client_ip = %ip,
        user_agent,
    )
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.allows_any_origin() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    // Credentials (cookies) require explicit origins
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
