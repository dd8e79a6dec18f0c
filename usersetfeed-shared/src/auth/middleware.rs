/// Authentication middleware for Axum
///
/// Validates the bearer token of incoming requests and adds the caller's
/// [`AuthContext`] to the request extensions.
///
/// # Example
///
/// ```no_run
/// use axum::{Extension, Router, routing::post, middleware};
/// use usersetfeed_shared::auth::middleware::{create_jwt_middleware, AuthContext};
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("Hello, user {}!", auth.user_id)
/// }
///
/// let app: Router = Router::new()
///     .route("/protected", post(handler))
///     .layer(middleware::from_fn(create_jwt_middleware("your-jwt-secret")));
/// ```

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::jwt::{validate_token, Claims, JwtError};

/// Authentication method used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// JWT bearer token
    Jwt,

    /// Context built in process (tests, command line tools)
    Internal,
}

/// Authenticated caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    /// Acting user ID
    pub user_id: i64,

    /// Capabilities granted at system level
    pub capabilities: Vec<String>,

    /// Authentication method used
    pub method: AuthMethod,
}

impl AuthContext {
    /// Creates auth context from validated JWT claims
    pub fn from_claims(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            capabilities: claims.capabilities,
            method: AuthMethod::Jwt,
        }
    }

    /// Creates an in-process auth context
    pub fn with_capabilities(user_id: i64, capabilities: Vec<String>) -> Self {
        Self {
            user_id,
            capabilities,
            method: AuthMethod::Internal,
        }
    }

    /// Checks if the caller holds a capability
    pub fn has_capability(&self, capability: &str) -> bool {
        super::authorization::has_capability(&self.capabilities, capability)
    }
}

/// Error type for authentication middleware
#[derive(Debug)]
pub enum AuthError {
    /// Missing authorization header
    MissingCredentials,

    /// Invalid authorization header format
    InvalidFormat(String),

    /// Token validation failed
    InvalidToken(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::MissingCredentials => {
                (StatusCode::UNAUTHORIZED, "Missing credentials").into_response()
            }
            AuthError::InvalidFormat(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            AuthError::InvalidToken(msg) => (StatusCode::UNAUTHORIZED, msg).into_response(),
        }
    }
}

/// JWT authentication middleware
///
/// Validates JWT tokens from the `Authorization: Bearer <token>` header.
///
/// # Errors
///
/// Returns 401 Unauthorized if:
/// - Authorization header is missing
/// - Token validation fails
/// - Token has expired
///
/// Returns 400 Bad Request if the header is not a bearer token.
pub async fn jwt_auth_middleware(
    secret: String,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    let claims = validate_token(token, &secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::InvalidIssuer { .. } => AuthError::InvalidToken("Invalid issuer".to_string()),
        _ => AuthError::InvalidToken(format!("Invalid token: {}", e)),
    })?;

    debug!(user_id = claims.sub, "Request authenticated");

    req.extensions_mut().insert(AuthContext::from_claims(claims));

    Ok(next.run(req).await)
}

/// Future returned by the middleware closure
pub type AuthFuture =
    std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, AuthError>> + Send>>;

/// Creates a JWT authentication middleware closure
///
/// Helper function that captures the JWT secret and returns a middleware function.
pub fn create_jwt_middleware(
    secret: impl Into<String>,
) -> impl Fn(Request, Next) -> AuthFuture + Clone {
    let secret = secret.into();
    move |req, next| {
        let secret = secret.clone();
        Box::pin(jwt_auth_middleware(secret, req, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_context_from_claims() {
        let claims = Claims::new(2, vec!["local/elisprogram:*".to_string()]);

        let context = AuthContext::from_claims(claims);

        assert_eq!(context.user_id, 2);
        assert_eq!(context.method, AuthMethod::Jwt);
        assert!(context.has_capability("local/elisprogram:userset_create"));
        assert!(!context.has_capability("local/other:userset_create"));
    }

    #[test]
    fn test_auth_error_into_response() {
        let response = AuthError::MissingCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = AuthError::InvalidFormat("test".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AuthError::InvalidToken("test".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
