//! # Storefront Shared Library
//!
//! Domain logic behind the storefront HTTP API: models, the store port with
//! its PostgreSQL and in-memory implementations, authentication, the Redis
//! session cache, payment providers and the services that tie them
//! together.
//!
//! ## Module Organization
//!
//! - `models`: rows and validated input types
//! - `store`: store traits, `PgStore`, `MemoryStore`
//! - `db`: connection pool and embedded migrations
//! - `auth`: password hashing, JWT issuing, OAuth providers
//! - `cache`: Redis client, in-memory cache, session entries
//! - `payments`: payment intent providers (Stripe, dummy)
//! - `services`: domain services and their lazy registry
//! - `error`: `AppError` and its machine-readable codes

pub mod auth;
pub mod cache;
pub mod db;
pub mod error;
pub mod models;
pub mod payments;
pub mod services;
pub mod store;

pub use error::{AppError, AppResult};

/// Current version of the storefront shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
