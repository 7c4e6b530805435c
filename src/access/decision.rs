//! Access decision engine: one request in, pass-through or redirect out.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::routes::{DASHBOARD_ROOT, LANDING_PATH, RouteTable, WELCOME_PATH};
use crate::error::AuthError;
use crate::profile::{ProfileLoader, Role};
use crate::session::{CookieBridge, Session, SessionResolver};
use crate::store::Principal;

/// Terminal outcome for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Let the request through to the inner service.
    PassThrough,
    /// Send the client elsewhere.
    Redirect(String),
}

impl Decision {
    fn redirect(path: &str) -> Self {
        Self::Redirect(path.to_string())
    }
}

/// Combines session, onboarding state, and role into a [`Decision`].
///
/// Every lookup failure degrades to a redirect (no session → landing,
/// no readable profile → welcome). Nothing fails toward more access.
pub struct AccessEngine {
    table: Arc<RouteTable>,
    sessions: Arc<dyn SessionResolver>,
    profiles: ProfileLoader,
    lookup_timeout: Option<Duration>,
}

impl AccessEngine {
    pub fn new(
        table: Arc<RouteTable>,
        sessions: Arc<dyn SessionResolver>,
        profiles: ProfileLoader,
    ) -> Self {
        Self {
            table,
            sessions,
            profiles,
            lookup_timeout: None,
        }
    }

    /// Bound the session lookup. Profile attempts are bounded by the loader.
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = Some(timeout);
        self
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn sessions(&self) -> &Arc<dyn SessionResolver> {
        &self.sessions
    }

    /// Decide what happens to a request for `path`.
    ///
    /// Cookie writes made by the identity provider land in `cookies` and
    /// must be sent with whatever response follows.
    pub async fn decide(&self, path: &str, cookies: &mut dyn CookieBridge) -> Decision {
        if self.table.is_public(path) {
            debug!(path, "Public route");
            return Decision::PassThrough;
        }

        let Some(session) = self.resolve_session(cookies).await else {
            debug!(path, "No session, redirecting to landing");
            return Decision::redirect(LANDING_PATH);
        };

        if self.table.is_always_accessible(path) {
            return Decision::PassThrough;
        }

        let profile = match self.profiles.load(Principal::from(&session)).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(user_id = %session.user_id, error = %e, "Profile lookup failed");
                None
            }
        };
        let Some(profile) = profile.filter(|p| p.onboarded) else {
            debug!(user_id = %session.user_id, path, "Not onboarded, redirecting to welcome");
            return Decision::redirect(WELCOME_PATH);
        };

        let decision = self.decide_for_role(path, profile.role);
        debug!(user_id = %session.user_id, role = %profile.role, path, ?decision, "Access decided");
        decision
    }

    /// Role-based part of the decision, once the user is known and onboarded.
    fn decide_for_role(&self, path: &str, role: Role) -> Decision {
        if let Some(rule) = self.table.classify(path) {
            if !rule.allows(role) {
                return Decision::redirect(rule.redirect_path().unwrap_or(role.dashboard_path()));
            }
            // Rules with a redirect are legacy aliases and never served directly.
            if let Some(alias) = rule.redirect_path() {
                return Decision::redirect(alias);
            }
        }

        if path == DASHBOARD_ROOT {
            return Decision::redirect(role.dashboard_path());
        }

        Decision::PassThrough
    }

    async fn resolve_session(&self, cookies: &mut dyn CookieBridge) -> Option<Session> {
        let lookup = self.sessions.get_session(cookies);
        let result = match self.lookup_timeout {
            Some(limit) => tokio::time::timeout(limit, lookup)
                .await
                .unwrap_or(Err(AuthError::Timeout(limit))),
            None => lookup.await,
        };
        match result {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Session lookup failed, treating as signed out");
                None
            }
        }
    }
}
