/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`jwt`]: JWT token generation and validation
/// - [`middleware`]: Axum middleware turning a bearer token into an [`middleware::AuthContext`]
/// - [`authorization`]: capability checks
///
/// # Security Features
///
/// - **JWT Tokens**: HS256 signing with configurable expiration
/// - **Capabilities**: carried in the token, matched exactly or by wildcard
///
/// # Example
///
/// ```no_run
/// use usersetfeed_shared::auth::jwt::{create_token, validate_token, Claims};
/// use usersetfeed_shared::auth::middleware::AuthContext;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let claims = Claims::new(2, vec!["local/elisprogram:userset_create".to_string()]);
/// let token = create_token(&claims, "secret-key-at-least-32-bytes-long")?;
///
/// let claims = validate_token(&token, "secret-key-at-least-32-bytes-long")?;
/// let auth = AuthContext::from_claims(claims);
/// assert!(auth.has_capability("local/elisprogram:userset_create"));
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
