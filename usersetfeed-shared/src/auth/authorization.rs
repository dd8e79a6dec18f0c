/// Capability checks
///
/// Capabilities are plain strings such as `local/elisprogram:userset_create`,
/// granted through the caller's token. A grant matches a required capability
/// when it is:
///
/// - the global wildcard `*`
/// - exactly the required capability
/// - a component wildcard ending in `:*` whose prefix the capability starts with
///   (`local/elisprogram:*` covers every `local/elisprogram:` capability)
///
/// # Example
///
/// ```
/// use usersetfeed_shared::auth::authorization::require_capability;
/// use usersetfeed_shared::auth::middleware::AuthContext;
///
/// let auth = AuthContext::with_capabilities(2, vec!["local/elisprogram:*".to_string()]);
/// assert!(require_capability(&auth, "local/elisprogram:userset_create").is_ok());
/// assert!(require_capability(&auth, "moodle/site:config").is_err());
/// ```

use tracing::warn;

use super::middleware::AuthContext;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Caller doesn't hold the capability
    #[error("Missing required capability: {0}")]
    MissingCapability(String),
}

/// Checks whether a list of grants covers a capability
pub fn has_capability(grants: &[String], required: &str) -> bool {
    grants.iter().any(|grant| {
        if grant == "*" || grant == required {
            return true;
        }

        // "component:*" keeps the trailing ':' as prefix
        grant
            .strip_suffix('*')
            .filter(|prefix| prefix.ends_with(':'))
            .is_some_and(|prefix| required.starts_with(prefix))
    })
}

/// Requires the caller to hold a capability
///
/// # Errors
///
/// Returns `AuthzError::MissingCapability` if no grant covers it
pub fn require_capability(auth: &AuthContext, capability: &str) -> Result<(), AuthzError> {
    if !auth.has_capability(capability) {
        warn!(user_id = auth.user_id, capability, "Capability check failed");
        return Err(AuthzError::MissingCapability(capability.to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grants(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_has_capability() {
        let required = "local/elisprogram:userset_create";

        assert!(has_capability(&grants(&["*"]), required));
        assert!(has_capability(&grants(&[required]), required));
        assert!(has_capability(&grants(&["local/elisprogram:*"]), required));

        assert!(!has_capability(&grants(&[]), required));
        assert!(!has_capability(&grants(&["local/elisprogram:userset_view"]), required));
        assert!(!has_capability(&grants(&["local/elis*"]), required));
        assert!(!has_capability(&grants(&["local/other:*"]), required));
    }

    #[test]
    fn test_require_capability() {
        let auth = AuthContext::with_capabilities(2, grants(&["local/elisprogram:userset_create"]));
        assert!(require_capability(&auth, "local/elisprogram:userset_create").is_ok());

        let err = require_capability(&auth, "local/elisprogram:userset_delete").unwrap_err();
        assert!(err.to_string().contains("local/elisprogram:userset_delete"));
    }
}
