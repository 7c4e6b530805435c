//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::access::RetryPolicy;
use crate::error::ConfigError;

/// Identity provider (Supabase) settings.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project base URL, e.g. `https://abcd.supabase.co`.
    pub url: String,
    /// Public anon key sent as `apikey` on auth and REST requests.
    pub anon_key: SecretString,
    /// Name of the session cookie.
    pub auth_cookie: String,
}

/// Where profiles are read from and written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileBackend {
    /// Local libSQL database file.
    LibSql(PathBuf),
    /// Supabase PostgREST `profiles` table.
    Postgrest,
}

/// Tunables for the access gate.
#[derive(Debug, Clone)]
pub struct AccessConfig {
    /// Retry policy for the "not yet onboarded" profile re-read.
    pub profile_retry: RetryPolicy,
    /// Upper bound for each outbound lookup (session, every profile attempt).
    pub lookup_timeout: Duration,
    /// Mark cookies written by the gate as `Secure`.
    pub secure_cookies: bool,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            profile_retry: RetryPolicy::default(),
            lookup_timeout: Duration::from_secs(5),
            secure_cookies: true,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub supabase: SupabaseConfig,
    pub profile_backend: ProfileBackend,
    /// Directory holding the exported frontend, served behind the gate.
    pub static_dir: Option<PathBuf>,
    pub access: AccessConfig,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        let url = non_empty("SUPABASE_URL")
            .or_else(|| non_empty("NEXT_PUBLIC_SUPABASE_URL"))
            .ok_or_else(|| ConfigError::MissingEnvVar("SUPABASE_URL".to_string()))?;
        let url = url.trim_end_matches('/').to_string();

        let anon_key = non_empty("SUPABASE_ANON_KEY")
            .or_else(|| non_empty("NEXT_PUBLIC_SUPABASE_ANON_KEY"))
            .ok_or_else(|| ConfigError::MissingEnvVar("SUPABASE_ANON_KEY".to_string()))?;

        let auth_cookie = match non_empty("SUPABASE_AUTH_COOKIE") {
            Some(name) => name,
            None => default_auth_cookie(&url)?,
        };

        let profile_backend = match non_empty("MEDICLY_DB_PATH") {
            Some(path) => ProfileBackend::LibSql(PathBuf::from(path)),
            None => ProfileBackend::Postgrest,
        };
        let defaults = AccessConfig::default();
        let access = AccessConfig {
            profile_retry: RetryPolicy {
                max_attempts: parse_or(&var, "MEDICLY_PROFILE_ATTEMPTS", 3)?,
                delay: Duration::from_millis(parse_or(&var, "MEDICLY_PROFILE_RETRY_MS", 100)?),
            },
            lookup_timeout: Duration::from_millis(parse_or(
                &var,
                "MEDICLY_LOOKUP_TIMEOUT_MS",
                defaults.lookup_timeout.as_millis() as u64,
            )?),
            secure_cookies: parse_or(&var, "MEDICLY_SECURE_COOKIES", defaults.secure_cookies)?,
        };

        Ok(Self {
            port: parse_or(&var, "MEDICLY_PORT", 3000)?,
            supabase: SupabaseConfig {
                url,
                anon_key: SecretString::from(anon_key),
                auth_cookie,
            },
            profile_backend,
            static_dir: non_empty("MEDICLY_STATIC_DIR").map(PathBuf::from),
            access,
        })
    }
}

/// Cookie name the Supabase SSR helpers use: `sb-<project-ref>-auth-token`.
fn default_auth_cookie(url: &str) -> Result<String, ConfigError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| ConfigError::InvalidValue {
        key: "SUPABASE_URL".to_string(),
        message: e.to_string(),
    })?;
    let host = parsed.host_str().ok_or_else(|| ConfigError::InvalidValue {
        key: "SUPABASE_URL".to_string(),
        message: "URL has no host".to_string(),
    })?;
    let project_ref = host.split('.').next().unwrap_or(host);
    Ok(format!("sb-{project_ref}-auth-token"))
}

fn parse_or<F, T>(var: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })
        }
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_with_local_db() {
        let config = load(&[
            ("SUPABASE_URL", "https://abcd1234.supabase.co/"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("MEDICLY_DB_PATH", "./data/medicly.db"),
        ])
        .unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.supabase.url, "https://abcd1234.supabase.co");
        assert_eq!(config.supabase.auth_cookie, "sb-abcd1234-auth-token");
        assert_eq!(config.supabase.anon_key.expose_secret(), "anon");
        assert_eq!(
            config.profile_backend,
            ProfileBackend::LibSql(PathBuf::from("./data/medicly.db"))
        );
        assert_eq!(config.access.profile_retry.max_attempts, 3);
        assert_eq!(config.access.profile_retry.delay, Duration::from_millis(100));
        assert_eq!(config.access.lookup_timeout, Duration::from_secs(5));
        assert!(config.access.secure_cookies);
        assert!(config.static_dir.is_none());
    }

    #[test]
    fn next_public_fallbacks() {
        let config = load(&[
            ("NEXT_PUBLIC_SUPABASE_URL", "https://xyz.supabase.co"),
            ("NEXT_PUBLIC_SUPABASE_ANON_KEY", "anon"),
        ])
        .unwrap();
        assert_eq!(config.supabase.auth_cookie, "sb-xyz-auth-token");
        assert_eq!(config.profile_backend, ProfileBackend::Postgrest);
    }

    #[test]
    fn overrides() {
        let config = load(&[
            ("SUPABASE_URL", "http://localhost:54321"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("SUPABASE_AUTH_COOKIE", "sb-local-auth-token"),
            ("MEDICLY_DB_PATH", "/tmp/p.db"),
            ("MEDICLY_PORT", "8081"),
            ("MEDICLY_PROFILE_ATTEMPTS", "5"),
            ("MEDICLY_PROFILE_RETRY_MS", "20"),
            ("MEDICLY_LOOKUP_TIMEOUT_MS", "750"),
            ("MEDICLY_SECURE_COOKIES", "false"),
            ("MEDICLY_STATIC_DIR", "./out"),
        ])
        .unwrap();
        assert_eq!(config.port, 8081);
        assert_eq!(config.supabase.auth_cookie, "sb-local-auth-token");
        assert_eq!(config.access.profile_retry.max_attempts, 5);
        assert_eq!(config.access.profile_retry.delay, Duration::from_millis(20));
        assert_eq!(config.access.lookup_timeout, Duration::from_millis(750));
        assert!(!config.access.secure_cookies);
        assert_eq!(config.static_dir, Some(PathBuf::from("./out")));
    }

    #[test]
    fn localhost_cookie_uses_first_label() {
        let config = load(&[
            ("SUPABASE_URL", "http://127.0.0.1:54321"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("MEDICLY_DB_PATH", "/tmp/p.db"),
        ])
        .unwrap();
        assert_eq!(config.supabase.auth_cookie, "sb-127-auth-token");
    }

    #[test]
    fn missing_url() {
        let err = load(&[("SUPABASE_ANON_KEY", "anon")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "SUPABASE_URL"));
    }

    #[test]
    fn rest_backend_needs_only_the_anon_key() {
        let config = load(&[
            ("SUPABASE_URL", "https://abcd.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
            // Ignored: profile calls carry the user's own token.
            ("SUPABASE_SERVICE_ROLE_KEY", "service"),
        ])
        .unwrap();
        assert_eq!(config.profile_backend, ProfileBackend::Postgrest);
    }

    #[test]
    fn invalid_number() {
        let err = load(&[
            ("SUPABASE_URL", "https://abcd.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("MEDICLY_DB_PATH", "/tmp/p.db"),
            ("MEDICLY_PORT", "eighty"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "MEDICLY_PORT"));
    }
}
