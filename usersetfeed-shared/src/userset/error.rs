//! Error types of the user set flow
//!
//! Two channels: [`ValidationFailure`] carries a stable [`MessageCode`] and is
//! returned to the caller as data; every other [`UsersetError`] variant is
//! fatal and aborts the request.

use serde::{Deserialize, Serialize};

use super::schema::SchemaError;
use crate::auth::authorization::AuthzError;
use crate::store::StoreError;

/// Stable message codes of structured validation failures
///
/// `-4` is not used and must not be reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageCode {
    FieldNotFound,
    InvalidFieldType,
    EmptyValue,
    InvalidMenuOption,
    ExpiryFieldMissing,
    InvalidExpiryFormat,
}

impl MessageCode {
    pub fn as_i32(&self) -> i32 {
        match self {
            MessageCode::FieldNotFound => -1,
            MessageCode::InvalidFieldType => -2,
            MessageCode::EmptyValue => -3,
            MessageCode::InvalidMenuOption => -5,
            MessageCode::ExpiryFieldMissing => -6,
            MessageCode::InvalidExpiryFormat => -7,
        }
    }

    /// Message returned alongside the code
    pub fn message(&self) -> &'static str {
        match self {
            MessageCode::FieldNotFound => "Auto-associate field shortname does not exist.",
            MessageCode::InvalidFieldType => concat!(
                "Auto-associate field is not a valid type.  ",
                "Valid types are \"text\", \"menu\" and \"checkbox\"."
            ),
            MessageCode::EmptyValue => "Auto-associate value field cannot be empty.",
            MessageCode::InvalidMenuOption => {
                "Auto-associate value is not a valid option for a menu field."
            }
            MessageCode::ExpiryFieldMissing => {
                "Expiry date field does not exist as a field in the User Set context."
            }
            MessageCode::InvalidExpiryFormat => {
                "Expiry date is an invalid format.  Expiry date format must be YYYY-MM-DD hh:mm:ss"
            }
        }
    }
}

/// Recoverable input problem, reported to the caller as data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailure {
    pub code: MessageCode,
    pub message: String,
}

impl From<MessageCode> for ValidationFailure {
    fn from(code: MessageCode) -> Self {
        Self {
            code,
            message: code.message().to_string(),
        }
    }
}

/// Error type of the user set flow
#[derive(Debug, thiserror::Error)]
pub enum UsersetError {
    /// Structured validation failure
    #[error("Validation failed ({}): {}", .0.code.as_i32(), .0.message)]
    Validation(ValidationFailure),

    /// The program component providing user sets is not installed
    #[error("This web service function requires the program component to be installed")]
    HostDependencyMissing,

    /// The caller lacks the required capability
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The payload does not satisfy the parameter schema
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The named parent user set does not exist
    #[error("Parent user set not found: {0}")]
    InvalidParent(String),

    /// The user set could not be created
    #[error("Failed to create user set: {0}")]
    CreateFailed(String),

    /// A collaborator store failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<MessageCode> for UsersetError {
    fn from(code: MessageCode) -> Self {
        UsersetError::Validation(code.into())
    }
}

impl From<SchemaError> for UsersetError {
    fn from(err: SchemaError) -> Self {
        UsersetError::InvalidParameter(err.to_string())
    }
}

impl From<AuthzError> for UsersetError {
    fn from(err: AuthzError) -> Self {
        UsersetError::Forbidden(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_codes_keep_gap() {
        let codes = [
            MessageCode::FieldNotFound,
            MessageCode::InvalidFieldType,
            MessageCode::EmptyValue,
            MessageCode::InvalidMenuOption,
            MessageCode::ExpiryFieldMissing,
            MessageCode::InvalidExpiryFormat,
        ];
        let values: Vec<i32> = codes.iter().map(MessageCode::as_i32).collect();
        assert_eq!(values, vec![-1, -2, -3, -5, -6, -7]);
        assert!(!values.contains(&-4));
    }

    #[test]
    fn test_validation_failure_from_code() {
        let err = UsersetError::from(MessageCode::InvalidMenuOption);
        match err {
            UsersetError::Validation(failure) => {
                assert_eq!(failure.code.as_i32(), -5);
                assert_eq!(
                    failure.message,
                    "Auto-associate value is not a valid option for a menu field."
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
