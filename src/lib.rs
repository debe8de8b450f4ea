/*!
 * # pronouns - per-user pronoun storage and the community pronoun catalog
 *
 * ## Features
 *
 * - Ordered per-user pronoun set selections in SQLite
 * - Write-behind in-memory cache: writes are visible immediately and
 *   persisted by a single background worker
 * - Additive schema migration on startup
 * - Locally cached snapshot of the remote pronoun catalog, with refresh and
 *   submission that degrade gracefully when offline
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `pronoun_set`: The six-form pronoun set value type
 * - `database`: Connection pool, schema and queries
 * - `store`: `UserPronounStore`, the cache and write-behind worker
 * - `catalog`: `RemoteCatalogCache` and the catalog service client
 * - `errors`: Custom error types for the library
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod catalog;
pub mod database;
pub mod errors;
pub mod pronoun_set;
pub mod store;

// Re-export main types for easier usage
pub use app_config::Config;
pub use catalog::{CatalogSnapshot, RemoteCatalogCache};
pub use errors::{AppError, CatalogError, PronounSetError, StoreError};
pub use pronoun_set::PronounSet;
pub use store::{StoreStats, UserPronounStore};
