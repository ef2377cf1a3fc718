//! # Storefront API Server Library
//!
//! HTTP layer of the storefront: everything between axum and the domain
//! services in `storefront-shared`.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `cookies`: Session cookie formatting and parsing
//! - `error`: Error handling and HTTP response mapping
//! - `extractors`: Authenticated-caller and rejection-mapping extractors
//! - `middleware`: Security headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod cookies;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod routes;
