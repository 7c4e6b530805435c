//! Cookie bridge: the identity provider's view of the request's cookies.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

/// Attributes applied to a cookie written through the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    pub path: Option<String>,
    pub domain: Option<String>,
    /// Lifetime in seconds.
    pub max_age: Option<i64>,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: Option<SameSite>,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            path: Some("/".to_string()),
            domain: None,
            max_age: None,
            http_only: false,
            secure: false,
            same_site: Some(SameSite::Lax),
        }
    }
}

impl CookieOptions {
    /// Default session-cookie attributes: root path, `Lax`, one year.
    pub fn session(secure: bool) -> Self {
        Self {
            max_age: Some(400 * 24 * 60 * 60),
            secure,
            ..Self::default()
        }
    }

    fn build(&self, name: &str, value: String) -> Cookie<'static> {
        let mut builder = Cookie::build((name.to_string(), value))
            .http_only(self.http_only)
            .secure(self.secure);
        if let Some(path) = &self.path {
            builder = builder.path(path.clone());
        }
        if let Some(domain) = &self.domain {
            builder = builder.domain(domain.clone());
        }
        if let Some(seconds) = self.max_age {
            builder = builder.max_age(time::Duration::seconds(seconds));
        }
        if let Some(same_site) = self.same_site {
            builder = builder.same_site(same_site);
        }
        builder.build()
    }
}

/// Read/write access to cookies for one request.
///
/// Writes must be visible to later reads on the same bridge, and every
/// write must reach the outgoing response.
pub trait CookieBridge: Send {
    fn get(&self, name: &str) -> Option<String>;
    fn set(&mut self, name: &str, value: &str, options: &CookieOptions);
    fn remove(&mut self, name: &str, options: &CookieOptions);
}

/// [`CookieBridge`] over the request's [`CookieJar`].
///
/// The jar tracks the delta of writes; converting it back into the response
/// (`into_jar()` as a response part) emits the `Set-Cookie` headers.
#[derive(Debug, Default)]
pub struct RequestCookies {
    jar: CookieJar,
}

impl RequestCookies {
    pub fn new(jar: CookieJar) -> Self {
        Self { jar }
    }

    /// Hand the jar back for inclusion in the response.
    pub fn into_jar(self) -> CookieJar {
        self.jar
    }
}

impl CookieBridge for RequestCookies {
    fn get(&self, name: &str) -> Option<String> {
        self.jar.get(name).map(|c| c.value().to_string())
    }

    fn set(&mut self, name: &str, value: &str, options: &CookieOptions) {
        let cookie = options.build(name, value.to_string());
        self.jar = std::mem::take(&mut self.jar).add(cookie);
    }

    fn remove(&mut self, name: &str, options: &CookieOptions) {
        let cookie = options.build(name, String::new());
        self.jar = std::mem::take(&mut self.jar).remove(cookie);
    }
}
