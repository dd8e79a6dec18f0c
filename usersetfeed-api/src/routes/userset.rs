/// User set web service functions
///
/// # Endpoint
///
/// `POST /v1/webservice/userset_create`
///
/// # Authentication
///
/// JWT token (Authorization: Bearer <token>) whose capabilities include
/// `local/elisprogram:userset_create`.
///
/// # Example Request
///
/// ```json
/// {
///   "data": {
///     "name": "testusersetname",
///     "display": "Test user set",
///     "parent": "top",
///     "expiry": "2030-06-01 12:00:00",
///     "autoassociate1": "testdropdownwithdefault",
///     "autoassociate1_value": "one",
///     "field_testfield": "abc"
///   }
/// }
/// ```
///
/// # Example Response
///
/// ```json
/// {
///   "messagecode": 1,
///   "message": "Userset created successfully",
///   "record": {
///     "id": 7,
///     "name": "testusersetname",
///     "display": "Test user set",
///     "parent": 0,
///     "expiry": "1906628400",
///     "autoassociate1": "testdropdownwithdefault",
///     "autoassociate1_value": "one",
///     "field_testfield": "abc"
///   }
/// }
/// ```
///
/// Validation failures also answer 200, with a negative `messagecode` and the
/// record `{"id": 0, "name": "NULL"}`.

use crate::app::AppState;
use crate::error::ApiError;
use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use usersetfeed_shared::auth::middleware::AuthContext;
use usersetfeed_shared::userset::create::{create_userset, UsersetCreateResponse};

/// `userset_create` request
#[derive(Debug, Clone, Deserialize)]
pub struct UsersetCreateRequest {
    /// User set parameters, checked against the request schema
    pub data: JsonValue,
}

/// `userset_create` handler
///
/// # Errors
///
/// - 400 when the payload violates the schema or names an unknown parent
/// - 403 when the caller lacks the capability
/// - 503 when the program component is missing
/// - 500 when the store fails
pub async fn userset_create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<UsersetCreateRequest>,
) -> Result<Json<UsersetCreateResponse>, ApiError> {
    let response = create_userset(
        state.store.as_ref(),
        &state.config.userset,
        &auth,
        &request.data,
    )
    .await?;

    Ok(Json(response))
}
