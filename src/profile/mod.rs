//! User profiles: role and onboarding state as seen by the access gate.

pub mod loader;

pub use loader::ProfileLoader;

use serde::{Deserialize, Serialize};

/// A user's role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Client,
    Doctor,
    Admin,
}

impl Role {
    /// Parse a stored role string. Anything unrecognised is a client.
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }

    /// The role's default dashboard.
    pub fn dashboard_path(&self) -> &'static str {
        match self {
            Self::Client => "/dashboard/patient",
            Self::Doctor => "/dashboard/doctor",
            Self::Admin => "/dashboard/admin",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Doctor => "doctor",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Self::Client),
            "doctor" => Ok(Self::Doctor),
            "admin" => Ok(Self::Admin),
            other => Err(format!("Unknown role: {other}")),
        }
    }
}

/// The slice of a profile row the gate cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Profile {
    pub role: Role,
    pub onboarded: bool,
}

impl Profile {
    /// Build from nullable columns; a null role reads as client, a null flag as not onboarded.
    pub fn from_columns(role: Option<&str>, onboarded: Option<bool>) -> Self {
        Self {
            role: role.map(Role::parse_lenient).unwrap_or_default(),
            onboarded: onboarded.unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_roles_fall_back_to_client() {
        assert_eq!(Role::parse_lenient("doctor"), Role::Doctor);
        assert_eq!(Role::parse_lenient("admin"), Role::Admin);
        assert_eq!(Role::parse_lenient("superuser"), Role::Client);
        assert_eq!(Role::parse_lenient(""), Role::Client);
        assert_eq!(Role::default(), Role::Client);
    }

    #[test]
    fn dashboards() {
        assert_eq!(Role::Client.dashboard_path(), "/dashboard/patient");
        assert_eq!(Role::Doctor.dashboard_path(), "/dashboard/doctor");
        assert_eq!(Role::Admin.dashboard_path(), "/dashboard/admin");
    }

    #[test]
    fn display_matches_serde() {
        for role in [Role::Client, Role::Doctor, Role::Admin] {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(format!("\"{role}\""), json);
        }
    }

    #[test]
    fn nullable_columns() {
        let profile = Profile::from_columns(None, None);
        assert_eq!(profile.role, Role::Client);
        assert!(!profile.onboarded);

        let profile = Profile::from_columns(Some("doctor"), Some(true));
        assert_eq!(profile.role, Role::Doctor);
        assert!(profile.onboarded);
    }
}
