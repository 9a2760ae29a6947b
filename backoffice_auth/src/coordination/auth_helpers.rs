//! Caller checks shared by the coordination functions.
//!
//! The `SessionUser` passed in has already been resolved against storage by
//! `validate_session`, so role and tenant reflect the current records.

use super::errors::AuthError;
use crate::identity::Role;
use crate::session::SessionUser;

pub(super) fn require_admin(user: &SessionUser, action: &str) -> Result<(), AuthError> {
    if user.role != Role::Admin {
        tracing::warn!(
            target: "audit",
            identity_id = %user.id,
            role = %user.role,
            action,
            "Admin operation denied"
        );
        return Err(AuthError::PermissionDenied);
    }
    tracing::debug!(identity_id = %user.id, action, "Admin check passed");
    Ok(())
}

/// The caller owns the resource or is an admin.
pub(super) fn require_owner_or_admin(
    user: &SessionUser,
    owner_id: &str,
    action: &str,
) -> Result<(), AuthError> {
    if user.id == owner_id || user.role == Role::Admin {
        return Ok(());
    }
    tracing::warn!(
        target: "audit",
        identity_id = %user.id,
        owner_id,
        action,
        "Operation on another identity's resource denied"
    );
    Err(AuthError::PermissionDenied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::ModulePermissions;
    use chrono::Utc;

    fn user(id: &str, role: Role) -> SessionUser {
        SessionUser {
            id: id.into(),
            email: format!("{id}@example.com"),
            display_name: id.into(),
            username: id.into(),
            role,
            tenant_id: Some("t1".into()),
            module_permissions: ModulePermissions::new(),
            expires_at: Utc::now(),
        }
    }

    #[test]
    fn test_require_admin() {
        assert!(require_admin(&user("a", Role::Admin), "test").is_ok());
        assert_eq!(
            require_admin(&user("s", Role::Staff), "test"),
            Err(AuthError::PermissionDenied)
        );
    }

    #[test]
    fn test_require_owner_or_admin() {
        assert!(require_owner_or_admin(&user("s", Role::Staff), "s", "test").is_ok());
        assert!(require_owner_or_admin(&user("a", Role::Admin), "s", "test").is_ok());
        assert!(require_owner_or_admin(&user("x", Role::Maintainer), "s", "test").is_err());
    }
}
