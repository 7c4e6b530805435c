//! `ProfileStore` trait: the gate's single read plus the onboarding write.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::profile::{Profile, Role};
use crate::session::Session;

/// The user a store call acts for.
#[derive(Debug, Clone, Copy)]
pub struct Principal<'a> {
    pub user_id: Uuid,
    /// The user's own access token, for backends that enforce row-level security.
    pub access_token: Option<&'a str>,
}

impl<'a> Principal<'a> {
    /// A user with no credential attached. Only trusted local backends accept it.
    pub fn user(user_id: Uuid) -> Self {
        Self {
            user_id,
            access_token: None,
        }
    }

    pub fn with_token(user_id: Uuid, access_token: &'a str) -> Self {
        Self {
            user_id,
            access_token: Some(access_token),
        }
    }
}

impl<'a> From<&'a Session> for Principal<'a> {
    fn from(session: &'a Session) -> Self {
        Self {
            user_id: session.user_id,
            access_token: session.access_token.as_ref().map(|t| t.expose_secret()),
        }
    }
}

/// Backend-agnostic access to the `profiles` table.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Role and onboarding flag for a user. Zero rows is `Ok(None)`.
    async fn get_profile(&self, user: Principal<'_>) -> Result<Option<Profile>, DatabaseError>;

    /// Set the user's role and mark them onboarded, creating the row if needed.
    async fn assign_role(
        &self,
        user: Principal<'_>,
        role: Role,
        name: Option<&str>,
    ) -> Result<(), DatabaseError>;
}
