//! Role and ownership authorization checks.
//!
//! Pure decision functions over already-loaded data. Routes declare their
//! allowed-role set explicitly; an admin is only granted a route when
//! `Role::Admin` is in that set, never implicitly.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use super::guard::Principal;
use crate::api::error::ApiError;

/// The closed set of deployed roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown role: {0}")]
pub struct UnknownRole(String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Fail unless the principal's role is a member of `allowed`.
///
/// # Errors
/// Returns `ApiError::Forbidden` when the role is not in the set.
pub fn authorize_role(principal: &Principal, allowed: &[Role]) -> Result<(), ApiError> {
    if allowed.contains(&principal.role) {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

/// Fail unless the principal owns the resource or is an admin.
///
/// Evaluated per resource instance against freshly loaded state; results
/// are never cached across requests.
///
/// # Errors
/// Returns `ApiError::Forbidden` for non-owning, non-admin principals.
pub fn authorize_ownership(principal: &Principal, resource_owner_id: Uuid) -> Result<(), ApiError> {
    if principal.role == Role::Admin || principal.id == resource_owner_id {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Role) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            role,
            email: "someone@example.com".to_string(),
        }
    }

    #[test]
    fn role_round_trips_through_str() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("user".parse::<Role>(), Ok(Role::User));
        assert_eq!(Role::Admin.as_str(), "admin");
        assert_eq!(Role::User.to_string(), "user");
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!("superadmin".parse::<Role>().is_err());
        assert!("Admin".parse::<Role>().is_err());
        assert!(String::new().parse::<Role>().is_err());
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(Role::Admin).expect("serializable"),
            serde_json::json!("admin")
        );
    }

    #[test]
    fn user_role_never_passes_admin_only_route() {
        let result = authorize_role(&principal(Role::User), &[Role::Admin]);
        assert!(matches!(result, Err(ApiError::Forbidden)));
    }

    #[test]
    fn admin_passes_when_listed() {
        assert!(authorize_role(&principal(Role::Admin), &[Role::Admin, Role::User]).is_ok());
    }

    #[test]
    fn admin_is_not_implicitly_granted() {
        // A route that only lists `user` rejects admins too.
        let result = authorize_role(&principal(Role::Admin), &[Role::User]);
        assert!(matches!(result, Err(ApiError::Forbidden)));
    }

    #[test]
    fn ownership_fails_for_other_users() {
        let caller = principal(Role::User);
        let result = authorize_ownership(&caller, Uuid::new_v4());
        assert!(matches!(result, Err(ApiError::Forbidden)));
    }

    #[test]
    fn ownership_succeeds_for_owner() {
        let caller = principal(Role::User);
        assert!(authorize_ownership(&caller, caller.id).is_ok());
    }

    #[test]
    fn ownership_succeeds_for_any_admin() {
        let caller = principal(Role::Admin);
        assert!(authorize_ownership(&caller, Uuid::new_v4()).is_ok());
    }
}
