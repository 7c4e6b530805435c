//! Axum middleware wrapping [`AccessEngine`].

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

use super::decision::{AccessEngine, Decision};
use super::path::canonical_path;
use crate::session::RequestCookies;

/// Gate a request. Decisions use the canonical path, so encoded or
/// doubled-up spellings of a gated path are gated too. Paths outside the
/// table's gated prefixes go straight through; for the rest, any cookie the
/// identity provider rewrote is sent back on both the pass-through and the
/// redirect response.
///
/// Install with `axum::middleware::from_fn_with_state(engine, access_gate)`.
pub async fn access_gate(
    State(engine): State<Arc<AccessEngine>>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let path = canonical_path(request.uri().path());
    if !engine.table().is_gated(&path) {
        return next.run(request).await;
    }

    let mut cookies = RequestCookies::new(jar);
    let decision = engine.decide(&path, &mut cookies).await;
    let jar = cookies.into_jar();

    match decision {
        Decision::PassThrough => (jar, next.run(request).await).into_response(),
        Decision::Redirect(target) => {
            debug!(from = %path, to = %target, "Access redirect");
            (jar, Redirect::temporary(&target)).into_response()
        }
    }
}
