//! Supabase Auth (GoTrue) session resolver.
//!
//! Speaks the same cookie format as the Supabase SSR helpers, so the gate
//! and the browser client can share one session:
//!
//! - the session lives in `sb-<ref>-auth-token` as JSON, optionally
//!   `base64-`-prefixed (base64url), and is split into `<name>.0`,
//!   `<name>.1`, … when it outgrows a single cookie;
//! - the PKCE verifier lives in `<name>-code-verifier`.
//!
//! The cookie is client-controlled, so its `user` object is never trusted on
//! its own: a stored access token is checked with `GET /auth/v1/user` and
//! the identity comes from that answer.

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::cookies::{CookieBridge, CookieOptions};
use super::{Session, SessionResolver};
use crate::error::AuthError;

/// Largest cookie value written before splitting into chunks.
const MAX_CHUNK_SIZE: usize = 3180;
/// Refresh sessions this close to expiry.
const EXPIRY_MARGIN_SECS: i64 = 10;
const BASE64_PREFIX: &str = "base64-";

const BASE64URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// The session object as the Supabase client persists it.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSession {
    access_token: String,
    refresh_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_in: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<i64>,
    user: AuthUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AuthUser {
    id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(default)]
    user_metadata: serde_json::Value,
}

impl StoredSession {
    /// Token endpoints may return only `expires_in`; pin it to a timestamp.
    fn with_expiry(mut self, now: i64) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = self.expires_in.map(|secs| now + secs);
        }
        self
    }

    /// A session without a known expiry is treated as live.
    fn needs_refresh(&self, now: i64) -> bool {
        self.expires_at
            .is_some_and(|at| at <= now + EXPIRY_MARGIN_SECS)
    }

    /// Only for sessions that just came back from a token grant.
    fn to_session(&self) -> Session {
        self.user.clone().into_session(&self.access_token)
    }
}

impl AuthUser {
    fn into_session(self, access_token: &str) -> Session {
        Session {
            user_id: self.id,
            email: self.email,
            metadata: self.user_metadata,
            access_token: Some(SecretString::from(access_token.to_string())),
        }
    }
}

/// [`SessionResolver`] backed by the Supabase Auth REST API.
pub struct SupabaseAuth {
    client: Client,
    auth_url: String,
    anon_key: SecretString,
    cookie_name: String,
    cookie_options: CookieOptions,
}

impl SupabaseAuth {
    pub fn new(
        client: Client,
        supabase_url: &str,
        anon_key: SecretString,
        cookie_name: impl Into<String>,
    ) -> Self {
        Self {
            client,
            auth_url: format!("{}/auth/v1", supabase_url.trim_end_matches('/')),
            anon_key,
            cookie_name: cookie_name.into(),
            cookie_options: CookieOptions::session(true),
        }
    }

    /// Attributes for cookies written by this resolver.
    pub fn with_cookie_options(mut self, options: CookieOptions) -> Self {
        self.cookie_options = options;
        self
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    fn verifier_cookie(&self) -> String {
        format!("{}-code-verifier", self.cookie_name)
    }

    // ── Cookie storage ──────────────────────────────────────────────────

    /// Read a value, reassembling `<name>.N` chunks if the plain cookie is absent.
    fn read_value(&self, cookies: &dyn CookieBridge, name: &str) -> Option<String> {
        if let Some(value) = cookies.get(name) {
            return Some(value);
        }
        let mut combined = String::new();
        let mut index = 0;
        while let Some(chunk) = cookies.get(&format!("{name}.{index}")) {
            combined.push_str(&chunk);
            index += 1;
        }
        (index > 0).then_some(combined)
    }

    fn write_value(&self, cookies: &mut dyn CookieBridge, name: &str, raw: &str) {
        let encoded = format!("{BASE64_PREFIX}{}", BASE64URL.encode(raw));
        self.clear_value(cookies, name);

        if encoded.len() <= MAX_CHUNK_SIZE {
            cookies.set(name, &encoded, &self.cookie_options);
            return;
        }
        // base64url output is ASCII, so byte-offset chunks are char boundaries.
        for (index, chunk) in encoded.as_bytes().chunks(MAX_CHUNK_SIZE).enumerate() {
            let chunk = std::str::from_utf8(chunk).unwrap_or_default();
            cookies.set(&format!("{name}.{index}"), chunk, &self.cookie_options);
        }
    }

    fn clear_value(&self, cookies: &mut dyn CookieBridge, name: &str) {
        if cookies.get(name).is_some() {
            cookies.remove(name, &self.cookie_options);
        }
        let mut index = 0;
        loop {
            let chunk = format!("{name}.{index}");
            if cookies.get(&chunk).is_none() {
                break;
            }
            cookies.remove(&chunk, &self.cookie_options);
            index += 1;
        }
    }

    fn load_stored(&self, cookies: &dyn CookieBridge) -> Result<Option<StoredSession>, AuthError> {
        let Some(raw) = self.read_value(cookies, &self.cookie_name) else {
            return Ok(None);
        };
        let json = decode_value(&raw)?;
        let stored = serde_json::from_str(&json)
            .map_err(|e| AuthError::MalformedSession(e.to_string()))?;
        Ok(Some(stored))
    }

    fn store(&self, cookies: &mut dyn CookieBridge, stored: &StoredSession) -> Result<(), AuthError> {
        let json = serde_json::to_string(stored)
            .map_err(|e| AuthError::MalformedSession(e.to_string()))?;
        self.write_value(cookies, &self.cookie_name, &json);
        Ok(())
    }

    // ── HTTP ────────────────────────────────────────────────────────────

    async fn token_request(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> Result<StoredSession, AuthError> {
        let response = self
            .client
            .post(format!("{}/token", self.auth_url))
            .query(&[("grant_type", grant_type)])
            .header("apikey", self.anon_key.expose_secret())
            .json(&body)
            .send()
            .await?;
        let stored: StoredSession = check(response).await?.json().await?;
        Ok(stored.with_expiry(Utc::now().timestamp()))
    }

    /// Ask the provider who `access_token` belongs to.
    async fn user_request(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        let response = self
            .client
            .get(format!("{}/user", self.auth_url))
            .header("apikey", self.anon_key.expose_secret())
            .bearer_auth(access_token)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn logout_request(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .client
            .post(format!("{}/logout", self.auth_url))
            .header("apikey", self.anon_key.expose_secret())
            .bearer_auth(access_token)
            .send()
            .await?;
        match check(response).await {
            Ok(_) => Ok(()),
            // Token already revoked or unknown: nothing left to sign out.
            Err(AuthError::Rejected { status, .. }) if matches!(status, 401 | 403 | 404) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Strip the `base64-` encoding if present.
fn decode_value(raw: &str) -> Result<String, AuthError> {
    match raw.strip_prefix(BASE64_PREFIX) {
        Some(encoded) => {
            let bytes = BASE64URL
                .decode(encoded)
                .map_err(|e| AuthError::MalformedSession(e.to_string()))?;
            String::from_utf8(bytes).map_err(|e| AuthError::MalformedSession(e.to_string()))
        }
        None => Ok(raw.to_string()),
    }
}

/// The verifier is stored JSON-encoded as `"<verifier>/<flow type>"`.
fn parse_code_verifier(raw: &str) -> Result<String, AuthError> {
    let decoded = decode_value(raw)?;
    let value = serde_json::from_str::<String>(&decoded).unwrap_or(decoded);
    let verifier = value.split('/').next().unwrap_or_default();
    if verifier.is_empty() {
        return Err(AuthError::MissingCodeVerifier);
    }
    Ok(verifier.to_string())
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, AuthError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AuthError::Rejected {
        status: status.as_u16(),
        body,
    })
}

/// The provider refused the credential itself, as opposed to failing.
fn is_rejection(err: &AuthError, statuses: &[StatusCode]) -> bool {
    matches!(
        err,
        AuthError::Rejected { status, .. } if statuses.iter().any(|s| s.as_u16() == *status)
    )
}

#[async_trait]
impl SessionResolver for SupabaseAuth {
    async fn get_session(
        &self,
        cookies: &mut dyn CookieBridge,
    ) -> Result<Option<Session>, AuthError> {
        let Some(stored) = self.load_stored(cookies)? else {
            return Ok(None);
        };

        if !stored.needs_refresh(Utc::now().timestamp()) {
            return match self.user_request(&stored.access_token).await {
                Ok(user) => Ok(Some(user.into_session(&stored.access_token))),
                Err(e) if is_rejection(&e, &[StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN]) => {
                    info!(error = %e, "Access token rejected, clearing session");
                    self.clear_value(cookies, &self.cookie_name);
                    Ok(None)
                }
                Err(e) => Err(e),
            };
        }

        debug!("Session expiring, refreshing");
        let body = serde_json::json!({ "refresh_token": stored.refresh_token });
        match self.token_request("refresh_token", body).await {
            Ok(refreshed) => {
                self.store(cookies, &refreshed)?;
                Ok(Some(refreshed.to_session()))
            }
            Err(e) if is_rejection(&e, &[StatusCode::BAD_REQUEST, StatusCode::UNAUTHORIZED]) => {
                info!(error = %e, "Refresh token rejected, clearing session");
                self.clear_value(cookies, &self.cookie_name);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn sign_out(&self, cookies: &mut dyn CookieBridge) -> Result<(), AuthError> {
        let stored = match self.load_stored(cookies) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "Discarding unreadable session on sign-out");
                None
            }
        };

        let result = match &stored {
            Some(stored) => self.logout_request(&stored.access_token).await,
            None => Ok(()),
        };

        self.clear_value(cookies, &self.cookie_name);
        self.clear_value(cookies, &self.verifier_cookie());
        result
    }

    async fn exchange_code(
        &self,
        code: &str,
        cookies: &mut dyn CookieBridge,
    ) -> Result<Session, AuthError> {
        let verifier_name = self.verifier_cookie();
        let raw = self
            .read_value(cookies, &verifier_name)
            .ok_or(AuthError::MissingCodeVerifier)?;
        let verifier = parse_code_verifier(&raw)?;

        let body = serde_json::json!({ "auth_code": code, "code_verifier": verifier });
        let stored = self.token_request("pkce", body).await?;

        self.store(cookies, &stored)?;
        self.clear_value(cookies, &verifier_name);
        info!(user_id = %stored.user.id, "Code exchanged for session");
        Ok(stored.to_session())
    }
}
