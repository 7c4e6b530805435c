//! libSQL backend: async `ProfileStore` implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::profile::{Profile, Role};
use crate::store::migrations;
use crate::store::traits::{Principal, ProfileStore};

/// libSQL profile store.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlProfileStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlProfileStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let store = Self::from_database(db)?;
        migrations::run_migrations(&store.conn).await?;
        info!(path = %path.display(), "Profile database opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let store = Self::from_database(db)?;
        migrations::run_migrations(&store.conn).await?;
        Ok(store)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }
}

fn row_to_profile(row: &libsql::Row) -> Result<Profile, libsql::Error> {
    let role: Option<String> = row.get(0)?;
    let onboarded: Option<i64> = row.get(1)?;
    Ok(Profile::from_columns(
        role.as_deref(),
        onboarded.map(|v| v != 0),
    ))
}

#[async_trait]
impl ProfileStore for LibSqlProfileStore {
    async fn get_profile(&self, user: Principal<'_>) -> Result<Option<Profile>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT role, onboarded FROM profiles WHERE id = ?1 LIMIT 1",
                params![user.user_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_profile: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let profile = row_to_profile(&row)
                    .map_err(|e| DatabaseError::Query(format!("get_profile row parse: {e}")))?;
                Ok(Some(profile))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_profile: {e}"))),
        }
    }

    async fn assign_role(
        &self,
        user: Principal<'_>,
        role: Role,
        name: Option<&str>,
    ) -> Result<(), DatabaseError> {
        let user_id = user.user_id;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO profiles (id, role, onboarded, name, created_at, updated_at)
                 VALUES (?1, ?2, 1, ?3, ?4, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                     role = excluded.role,
                     onboarded = 1,
                     name = COALESCE(excluded.name, profiles.name),
                     updated_at = excluded.updated_at",
                params![user_id.to_string(), role.as_str(), name, now],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("assign_role: {e}")))?;

        debug!(user_id = %user_id, role = %role, "Role assigned");
        Ok(())
    }
}
