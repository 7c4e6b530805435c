//! Route table: which roles may see which paths.
//!
//! Rules are tried in declaration order and the first match governs the
//! path. Order is load-bearing: a narrower pattern declared after a broader
//! one that also matches is never reached.

use regex::Regex;

use crate::error::ConfigError;
use crate::profile::Role;

/// Landing page for unauthenticated users.
pub const LANDING_PATH: &str = "/";
/// Onboarding page for users without a completed profile.
pub const WELCOME_PATH: &str = "/welcome";
/// Bare dashboard root, resolved to the role's dashboard.
pub const DASHBOARD_ROOT: &str = "/dashboard";

/// One access rule.
#[derive(Debug, Clone)]
pub struct RouteRule {
    pattern: Regex,
    allowed_roles: Vec<Role>,
    redirect_path: Option<String>,
}

impl RouteRule {
    pub fn new(
        pattern: &str,
        allowed_roles: &[Role],
        redirect_path: Option<&str>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            pattern: compile(pattern)?,
            allowed_roles: allowed_roles.to_vec(),
            redirect_path: redirect_path.map(str::to_string),
        })
    }

    /// Unanchored test; anchors belong in the pattern itself.
    pub fn matches(&self, path: &str) -> bool {
        self.pattern.is_match(path)
    }

    pub fn allows(&self, role: Role) -> bool {
        self.allowed_roles.contains(&role)
    }

    pub fn redirect_path(&self) -> Option<&str> {
        self.redirect_path.as_deref()
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

fn compile(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|e| ConfigError::InvalidValue {
        key: format!("route pattern {pattern:?}"),
        message: e.to_string(),
    })
}

/// Immutable access configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
    public: Vec<Regex>,
    always_accessible: Vec<Regex>,
    gated_prefixes: Vec<String>,
}

impl RouteTable {
    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder::default()
    }

    /// The Medicly dashboard table.
    pub fn medicly() -> Result<Self, ConfigError> {
        use Role::*;

        Self::builder()
            .rule(r"^/dashboard/patient", &[Client], None)
            // No redirect here: a redirect marks an alias, and an alias
            // back to `/dashboard` would bounce permitted users forever.
            .rule(r"^/dashboard/doctor", &[Doctor], None)
            .rule(r"^/dashboard/admin", &[Admin], None)
            .rule(r"^/dashboard$", &[Client, Doctor, Admin], None)
            // Legacy aliases.
            .rule(r"^/client", &[Client], Some("/dashboard/patient"))
            .rule(r"^/patient", &[Client], Some("/dashboard/patient"))
            .rule(r"^/doctor", &[Doctor], Some("/dashboard/doctor"))
            .public(r"^/$")
            .public(r"^/signup")
            .public(r"^/welcome")
            .public(r"^/auth/")
            .public(r"^/_next/")
            .public(r"^/api/auth/")
            .public(r"^/favicon")
            .public(r"^/.*\.(png|jpg|jpeg|gif|svg|ico)$")
            .always_accessible(r"^/$")
            .gate_prefixes([
                "/dashboard",
                "/patient",
                "/client",
                "/doctor",
                "/admin",
                "/analytics",
                "/patients",
                "/upload",
            ])
            .build()
    }

    /// First rule matching `path`, in declaration order.
    pub fn classify(&self, path: &str) -> Option<&RouteRule> {
        self.rules.iter().find(|rule| rule.matches(path))
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.public.iter().any(|p| p.is_match(path))
    }

    pub fn is_always_accessible(&self, path: &str) -> bool {
        self.always_accessible.iter().any(|p| p.is_match(path))
    }

    /// Whether the gate runs for `path` at all.
    ///
    /// A prefix covers itself and anything below it (`/doctor`, `/doctor/1`)
    /// but not siblings that merely share characters (`/doctors`).
    pub fn is_gated(&self, path: &str) -> bool {
        self.gated_prefixes.iter().any(|prefix| {
            path.strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }
}

/// Builder for [`RouteTable`]. Patterns are compiled in [`build`](Self::build).
#[derive(Debug, Default)]
pub struct RouteTableBuilder {
    rules: Vec<(String, Vec<Role>, Option<String>)>,
    public: Vec<String>,
    always_accessible: Vec<String>,
    gated_prefixes: Vec<String>,
}

impl RouteTableBuilder {
    /// Append a rule. Earlier rules win.
    pub fn rule(mut self, pattern: &str, allowed: &[Role], redirect: Option<&str>) -> Self {
        self.rules.push((
            pattern.to_string(),
            allowed.to_vec(),
            redirect.map(str::to_string),
        ));
        self
    }

    pub fn public(mut self, pattern: &str) -> Self {
        self.public.push(pattern.to_string());
        self
    }

    pub fn always_accessible(mut self, pattern: &str) -> Self {
        self.always_accessible.push(pattern.to_string());
        self
    }

    pub fn gate_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.gated_prefixes
            .extend(prefixes.into_iter().map(|p| p.into().trim_end_matches('/').to_string()));
        self
    }

    pub fn build(self) -> Result<RouteTable, ConfigError> {
        let rules = self
            .rules
            .iter()
            .map(|(pattern, roles, redirect)| RouteRule::new(pattern, roles, redirect.as_deref()))
            .collect::<Result<Vec<_>, _>>()?;
        let public = self
            .public
            .iter()
            .map(|p| compile(p))
            .collect::<Result<Vec<_>, _>>()?;
        let always_accessible = self
            .always_accessible
            .iter()
            .map(|p| compile(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RouteTable {
            rules,
            public,
            always_accessible,
            gated_prefixes: self.gated_prefixes,
        })
    }
}
