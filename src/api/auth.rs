//! Auth endpoints: OAuth/PKCE callback and logout.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::{info, warn};

use super::AppState;
use crate::access::DASHBOARD_ROOT;
use crate::session::RequestCookies;

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
}

/// GET /auth/callback?code=…
///
/// Exchanges the code for a session cookie and sends the user to the
/// dashboard root, where the gate picks their role dashboard.
pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
    jar: CookieJar,
) -> Response {
    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        return Redirect::temporary(DASHBOARD_ROOT).into_response();
    };

    let mut cookies = RequestCookies::new(jar);
    if let Err(e) = state.engine.sessions().exchange_code(&code, &mut cookies).await {
        warn!(error = %e, "Code exchange failed");
    }
    (cookies.into_jar(), Redirect::temporary(DASHBOARD_ROOT)).into_response()
}

/// POST /api/auth/logout
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    let mut cookies = RequestCookies::new(jar);
    let result = state.engine.sessions().sign_out(&mut cookies).await;
    let jar = cookies.into_jar();

    match result {
        Ok(()) => {
            info!("Signed out");
            (jar, Json(serde_json::json!({ "ok": true }))).into_response()
        }
        Err(e) => {
            warn!(error = %e, "Sign-out failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                jar,
                Json(serde_json::json!({ "ok": false, "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
