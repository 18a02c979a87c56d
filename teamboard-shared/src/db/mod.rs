/// Database utilities
///
/// This module provides the PostgreSQL connection pool used by all models.

pub mod pool;

pub use pool::{create_pool, DatabaseConfig};
