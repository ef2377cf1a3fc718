/// Database plumbing: connection pool and embedded migrations
///
/// Queries themselves live behind the traits in [`crate::store`].

pub mod migrations;
pub mod pool;
