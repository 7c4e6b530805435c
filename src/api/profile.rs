//! Role assignment: the onboarding write the gate's profile retry waits on.

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::{info, warn};

use super::AppState;
use crate::error::ApiError;
use crate::profile::Role;
use crate::session::RequestCookies;
use crate::store::Principal;

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    role: Option<String>,
}

/// Roles a user may pick for themselves. Admins are assigned out of band.
fn self_assignable(raw: Option<&str>) -> Option<Role> {
    match raw?.parse::<Role>().ok()? {
        role @ (Role::Client | Role::Doctor) => Some(role),
        Role::Admin => None,
    }
}

/// POST /api/profile/role `{ "role": "client" | "doctor" }`
///
/// Sets the caller's role and marks them onboarded.
pub async fn assign_role(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<RoleRequest>,
) -> Response {
    let mut cookies = RequestCookies::new(jar);
    let result = assign(&state, &mut cookies, body).await;
    (cookies.into_jar(), result).into_response()
}

async fn assign(
    state: &AppState,
    cookies: &mut RequestCookies,
    body: RoleRequest,
) -> Result<Json<serde_json::Value>, ApiError> {
    let session = match state.engine.sessions().get_session(cookies).await {
        Ok(Some(session)) => session,
        Ok(None) => return Err(ApiError::Unauthorized),
        Err(e) => {
            warn!(error = %e, "Session lookup failed on role assignment");
            return Err(ApiError::Unauthorized);
        }
    };

    let role = self_assignable(body.role.as_deref())
        .ok_or_else(|| ApiError::BadRequest("Invalid role".to_string()))?;

    state
        .profiles
        .assign_role(Principal::from(&session), role, session.display_name())
        .await?;

    info!(user_id = %session.user_id, role = %role, "Role assigned");
    Ok(Json(serde_json::json!({ "success": true, "role": role })))
}
