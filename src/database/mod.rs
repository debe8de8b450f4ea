/*!
 * Database module for persistent storage of user pronoun selections.
 *
 * This module provides the SQLite-backed layer under the pronoun store:
 * - A fixed-size connection pool with scoped acquisition
 * - Additive schema creation and migration
 * - A repository with the handful of queries the store needs
 */

pub mod schema;
pub mod connection;
pub mod repository;
pub mod models;

// Re-export main types
pub use connection::{DatabaseConnection, PooledConnection};
pub use repository::Repository;
