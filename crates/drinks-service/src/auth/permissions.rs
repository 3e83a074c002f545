//! Permission enforcement on verified claims.

use crate::auth::claims::Claims;
use crate::errors::AuthError;

/// Description for a token that lacks the required permission.
pub const PERMISSION_NOT_FOUND: &str = "Permission not found.";

/// Check that `claims` grant `permission`.
///
/// An empty `permission` means "authenticated only" and always passes.
/// Matching is exact and case-sensitive.
///
/// # Errors
///
/// - `PermissionsMissing` - the token has no `permissions` claim at all
/// - `Unauthorized` - the claim exists but does not contain `permission`
pub fn check_permissions(permission: &str, claims: &Claims) -> Result<(), AuthError> {
    if permission.is_empty() {
        return Ok(());
    }

    let Some(permissions) = claims.permissions.as_ref() else {
        tracing::warn!(
            target: "drinks.auth.permissions",
            required = %permission,
            "Token carries no permissions claim"
        );
        return Err(AuthError::PermissionsMissing);
    };

    if !permissions.contains(permission) {
        tracing::debug!(
            target: "drinks.auth.permissions",
            required = %permission,
            "Required permission not granted"
        );
        return Err(AuthError::Unauthorized(PERMISSION_NOT_FOUND.to_string()));
    }

    Ok(())
}
