//! Sessions: who is making the request, resolved from cookies.

pub mod cookies;
pub mod supabase;

pub use cookies::{CookieBridge, CookieOptions, RequestCookies};
pub use supabase::SupabaseAuth;

use async_trait::async_trait;
use secrecy::SecretString;
use uuid::Uuid;

use crate::error::AuthError;

/// An authenticated identity bound to the request.
///
/// Resolvers only build one from an identity the provider has vouched for,
/// never from client-supplied claims alone.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub email: Option<String>,
    /// Provider-supplied user metadata (e.g. `full_name`).
    pub metadata: serde_json::Value,
    /// The user's access token, forwarded to backends that check it.
    pub access_token: Option<SecretString>,
}

impl Session {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            email: None,
            metadata: serde_json::Value::Null,
            access_token: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(SecretString::from(token.into()));
        self
    }

    /// Display name: `full_name` metadata, else the email.
    pub fn display_name(&self) -> Option<&str> {
        self.metadata
            .get("full_name")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .or(self.email.as_deref())
    }
}

/// Identity provider contract, spoken through a [`CookieBridge`].
///
/// Implementations may rewrite cookies (token refresh) during any call.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    /// Current session, or `None` when the request is unauthenticated.
    async fn get_session(
        &self,
        cookies: &mut dyn CookieBridge,
    ) -> Result<Option<Session>, AuthError>;

    /// End the session and clear its cookies.
    async fn sign_out(&self, cookies: &mut dyn CookieBridge) -> Result<(), AuthError>;

    /// Exchange an OAuth/PKCE authorization code for a session.
    async fn exchange_code(
        &self,
        code: &str,
        cookies: &mut dyn CookieBridge,
    ) -> Result<Session, AuthError>;
}
