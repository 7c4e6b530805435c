//! HTTP surface: the gated app router plus the auth/profile endpoints the
//! gate depends on.

pub mod auth;
pub mod profile;

use std::path::Path;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router, middleware};
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::access::{AccessEngine, RouteTable, access_gate};
use crate::config::{AppConfig, ProfileBackend};
use crate::error::Result;
use crate::profile::ProfileLoader;
use crate::session::{CookieOptions, SessionResolver, SupabaseAuth};
use crate::store::{LibSqlProfileStore, PostgrestProfileStore, ProfileStore};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AccessEngine>,
    pub profiles: Arc<dyn ProfileStore>,
}

impl AppState {
    /// Wire the profile store, the Supabase session resolver and the
    /// Medicly route table from configuration.
    pub async fn from_config(config: &AppConfig, http: reqwest::Client) -> Result<Self> {
        let profiles: Arc<dyn ProfileStore> = match &config.profile_backend {
            ProfileBackend::LibSql(path) => Arc::new(LibSqlProfileStore::new_local(path).await?),
            ProfileBackend::Postgrest => Arc::new(PostgrestProfileStore::new(
                http.clone(),
                &config.supabase.url,
                config.supabase.anon_key.clone(),
            )),
        };

        let sessions: Arc<dyn SessionResolver> = Arc::new(
            SupabaseAuth::new(
                http,
                &config.supabase.url,
                config.supabase.anon_key.clone(),
                config.supabase.auth_cookie.clone(),
            )
            .with_cookie_options(CookieOptions::session(config.access.secure_cookies)),
        );
        let table = Arc::new(RouteTable::medicly()?);
        let loader = ProfileLoader::new(Arc::clone(&profiles), config.access.profile_retry)
            .with_timeout(config.access.lookup_timeout);
        let engine = Arc::new(
            AccessEngine::new(table, sessions, loader)
                .with_lookup_timeout(config.access.lookup_timeout),
        );

        Ok(Self { engine, profiles })
    }
}

/// Build the full router: API routes, the static frontend (if any) as the
/// fallback, and the access gate in front of all of it.
pub fn app_router(state: AppState, static_dir: Option<&Path>) -> Router {
    let engine = Arc::clone(&state.engine);

    let router = Router::new()
        .route("/health", get(health))
        .route("/auth/callback", get(auth::callback))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/profile/role", post(profile::assign_role))
        .with_state(state);

    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router.fallback(not_found),
    };

    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(middleware::from_fn_with_state(engine, access_gate)),
    )
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "medicly-gate"
    }))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Not found" })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::profile::Role;
    use crate::store::Principal;
    use uuid::Uuid;

    fn config(db_path: &Path) -> AppConfig {
        let db_path = db_path.to_string_lossy().to_string();
        AppConfig::from_vars(|key| match key {
            "SUPABASE_URL" => Some("http://127.0.0.1:1".to_string()),
            "SUPABASE_ANON_KEY" => Some("anon".to_string()),
            "MEDICLY_DB_PATH" => Some(db_path.clone()),
            _ => None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn state_opens_the_configured_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir.path().join("data").join("medicly.db"));

        let state = AppState::from_config(&config, reqwest::Client::new())
            .await
            .unwrap();
        let user = Principal::user(Uuid::new_v4());
        state.profiles.assign_role(user, Role::Doctor, None).await.unwrap();
        let profile = state.profiles.get_profile(user).await.unwrap().unwrap();
        assert_eq!(profile.role, Role::Doctor);
        assert!(profile.onboarded);
    }

    #[tokio::test]
    async fn unopenable_store_is_a_database_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();
        let config = config(&blocker.join("medicly.db"));

        let err = AppState::from_config(&config, reqwest::Client::new())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::Database(_)), "{err}");
    }
}
