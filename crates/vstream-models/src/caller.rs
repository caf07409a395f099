//! Caller identity and capabilities.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::video::ModelError;

/// Role granted to an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Can watch own videos only
    #[default]
    Viewer,
    /// Can upload
    Editor,
    /// Full access
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Editor => "editor",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "viewer" => Ok(Role::Viewer),
            "editor" => Ok(Role::Editor),
            "admin" => Ok(Role::Admin),
            other => Err(ModelError::UnknownRole(other.to_string())),
        }
    }
}

/// Capability value describing who is making a request.
///
/// Built by the HTTP edge from a verified token; the access rules only ever
/// look at this value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Caller {
    pub id: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Caller {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
            is_admin: false,
            email: None,
        }
    }

    /// Administrator with the admin flag set.
    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Admin,
            is_admin: true,
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Admin by flag or by role.
    pub fn has_admin_rights(&self) -> bool {
        self.is_admin || self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!("Editor".parse::<Role>().unwrap(), Role::Editor);
        assert_eq!(" admin ".parse::<Role>().unwrap(), Role::Admin);
        assert!(matches!(
            "owner".parse::<Role>(),
            Err(ModelError::UnknownRole(_))
        ));
    }

    #[test]
    fn test_admin_rights() {
        assert!(Caller::admin("a").has_admin_rights());
        assert!(Caller::new("b", Role::Admin).has_admin_rights());
        assert!(!Caller::new("c", Role::Editor).has_admin_rights());
    }
}
