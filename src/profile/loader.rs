//! Profile loader with a read-after-write consistency retry.
//!
//! Right after onboarding completes, the role write may not be visible to
//! the next read yet. The loader re-reads a "not onboarded" result a few
//! times before giving up. It cannot tell "still propagating" apart from
//! "never onboarded", so never-onboarded users pay the full retry latency.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::Profile;
use crate::access::retry::{RetryPolicy, retry_until};
use crate::error::DatabaseError;
use crate::store::{Principal, ProfileStore};

/// Reads profiles through a [`ProfileStore`], retrying until onboarded.
#[derive(Clone)]
pub struct ProfileLoader {
    store: Arc<dyn ProfileStore>,
    policy: RetryPolicy,
    timeout: Option<Duration>,
}

impl ProfileLoader {
    pub fn new(store: Arc<dyn ProfileStore>, policy: RetryPolicy) -> Self {
        Self {
            store,
            policy,
            timeout: None,
        }
    }

    /// Bound every individual lookup attempt.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Load the profile for `user`.
    ///
    /// `Ok(None)` means no row after the final attempt. Lookup errors
    /// (including timeouts) are returned from the attempt that hit them.
    pub async fn load(&self, user: Principal<'_>) -> Result<Option<Profile>, DatabaseError> {
        let profile = retry_until(
            self.policy,
            || self.lookup_once(user),
            |profile: &Option<Profile>| profile.is_some_and(|p| p.onboarded),
        )
        .await?;
        debug!(user_id = %user.user_id, ?profile, "Profile loaded");
        Ok(profile)
    }

    async fn lookup_once(&self, user: Principal<'_>) -> Result<Option<Profile>, DatabaseError> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.store.get_profile(user))
                .await
                .map_err(|_| DatabaseError::Timeout(limit))?,
            None => self.store.get_profile(user).await,
        }
    }
}
