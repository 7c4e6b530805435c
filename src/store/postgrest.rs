//! Supabase REST (PostgREST) backend for the `profiles` table.
//!
//! Requests go out as the signed-in user: the anon key as `apikey` and the
//! user's access token as the bearer, so the table's row-level security
//! decides what each user may read and write.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use crate::error::DatabaseError;
use crate::profile::{Profile, Role};
use crate::store::traits::{Principal, ProfileStore};

/// `profiles` access over `/rest/v1`.
pub struct PostgrestProfileStore {
    client: Client,
    base_url: String,
    anon_key: SecretString,
}

#[derive(Debug, Deserialize)]
struct ProfileRow {
    role: Option<String>,
    onboarded: Option<bool>,
}

impl PostgrestProfileStore {
    pub fn new(client: Client, supabase_url: &str, anon_key: SecretString) -> Self {
        Self {
            client,
            base_url: format!("{}/rest/v1", supabase_url.trim_end_matches('/')),
            anon_key,
        }
    }

    fn authed(
        &self,
        op: &str,
        user: Principal<'_>,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, DatabaseError> {
        let token = user.access_token.ok_or_else(|| {
            query_error(op, format!("no access token for user {}", user.user_id))
        })?;
        Ok(builder
            .header("apikey", self.anon_key.expose_secret())
            .bearer_auth(token))
    }
}

fn query_error(op: &str, e: impl std::fmt::Display) -> DatabaseError {
    DatabaseError::Query(format!("{op}: {e}"))
}

async fn check(op: &str, response: reqwest::Response) -> Result<reqwest::Response, DatabaseError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(query_error(op, format!("{status}: {body}")))
}

#[async_trait]
impl ProfileStore for PostgrestProfileStore {
    async fn get_profile(&self, user: Principal<'_>) -> Result<Option<Profile>, DatabaseError> {
        let id_filter = format!("eq.{}", user.user_id);
        let request = self
            .client
            .get(format!("{}/profiles", self.base_url))
            .query(&[("select", "role,onboarded"), ("id", id_filter.as_str())]);
        let response = self
            .authed("get_profile", user, request)?
            .send()
            .await
            .map_err(|e| query_error("get_profile", e))?;

        // Zero rows is `200 []`; any other status is a real failure.
        let rows: Vec<ProfileRow> = check("get_profile", response)
            .await?
            .json()
            .await
            .map_err(|e| DatabaseError::Serialization(format!("get_profile: {e}")))?;

        // `id` is the primary key, so at most one row comes back.
        Ok(rows
            .into_iter()
            .next()
            .map(|row| Profile::from_columns(row.role.as_deref(), row.onboarded)))
    }

    async fn assign_role(
        &self,
        user: Principal<'_>,
        role: Role,
        name: Option<&str>,
    ) -> Result<(), DatabaseError> {
        let mut body = serde_json::json!({
            "id": user.user_id,
            "role": role,
            "onboarded": true,
        });
        if let Some(name) = name {
            body["name"] = serde_json::Value::from(name);
        }

        let request = self
            .client
            .post(format!("{}/profiles", self.base_url))
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .query(&[("on_conflict", "id")])
            .json(&body);
        let response = self
            .authed("assign_role", user, request)?
            .send()
            .await
            .map_err(|e| query_error("assign_role", e))?;
        check("assign_role", response).await?;

        debug!(user_id = %user.user_id, role = %role, "Role assigned via REST");
        Ok(())
    }
}
