/// Middleware for the API server
///
/// Request tracing and CORS come from `tower-http` and are wired in
/// `app::build_router`; this module holds the layers written here.

pub mod security;
