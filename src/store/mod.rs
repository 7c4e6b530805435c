//! Persistence layer: profile storage backends.

pub mod libsql_backend;
pub mod migrations;
pub mod postgrest;
pub mod traits;

pub use libsql_backend::LibSqlProfileStore;
pub use postgrest::PostgrestProfileStore;
pub use traits::{Principal, ProfileStore};
