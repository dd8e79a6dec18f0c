//! Expiry date validation
//!
//! The expiry date of a user set lives in a `datetime` custom field of the
//! user set context. Which field that is comes from configuration
//! ([`super::UsersetSettings::expiry_field_id`]).

use chrono::{Local, NaiveDateTime, TimeZone};
use tracing::{debug, warn};

use super::error::{MessageCode, UsersetError};
use super::fields::FieldRegistry;
use crate::models::custom_field::ContextLevel;
use crate::store::FieldStore;

/// Accepted expiry format
pub const EXPIRY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Validated expiry date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expiry {
    /// Short name of the custom field receiving the timestamp
    pub shortname: String,

    /// Unix timestamp of the expiry date in server local time
    pub timestamp: i64,
}

pub struct ExpiryValidator<'a, S: FieldStore + ?Sized> {
    registry: &'a FieldRegistry<'a, S>,
    expiry_field_id: Option<i64>,
}

impl<'a, S: FieldStore + ?Sized> ExpiryValidator<'a, S> {
    pub fn new(registry: &'a FieldRegistry<'a, S>, expiry_field_id: Option<i64>) -> Self {
        Self {
            registry,
            expiry_field_id,
        }
    }

    /// Validates an expiry date string
    ///
    /// The field check runs first, so an unconfigured field reports `-6` even
    /// for malformed input.
    ///
    /// # Errors
    ///
    /// Returns [`UsersetError::Validation`] with `-6` when the configured
    /// field is not a `datetime` field of the user set context, `-7` when the
    /// string is not `YYYY-MM-DD hh:mm:ss`
    pub async fn validate(&self, value: &str) -> Result<Expiry, UsersetError> {
        let field = match self.expiry_field_id {
            Some(id) => self.registry.find_custom_field(ContextLevel::Userset, id).await?,
            None => None,
        };
        let Some(field) = field.filter(|field| field.datatype == "datetime") else {
            warn!(expiry_field_id = ?self.expiry_field_id, "Expiry field is not configured");
            return Err(MessageCode::ExpiryFieldMissing.into());
        };

        let Some(timestamp) = parse_local_timestamp(value) else {
            warn!(value, "Invalid expiry date");
            return Err(MessageCode::InvalidExpiryFormat.into());
        };

        debug!(shortname = %field.shortname, timestamp, "Expiry date validated");

        Ok(Expiry {
            shortname: field.shortname,
            timestamp,
        })
    }
}

/// Parses `YYYY-MM-DD hh:mm:ss` as server local time
///
/// Every component must be zero padded. A local time skipped by a daylight
/// saving change is rejected; a repeated one resolves to its first instant.
pub fn parse_local_timestamp(value: &str) -> Option<i64> {
    if !has_expiry_shape(value) {
        return None;
    }

    let naive = NaiveDateTime::parse_from_str(value, EXPIRY_FORMAT).ok()?;
    let local = Local.from_local_datetime(&naive).earliest()?;
    Some(local.timestamp())
}

fn has_expiry_shape(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 19
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            10 => *b == b' ',
            13 | 16 => *b == b':',
            _ => b.is_ascii_digit(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::custom_field::CustomField;
    use crate::store::memory::MemoryStore;
    use crate::userset::error::ValidationFailure;

    fn custom_field(id: i64, shortname: &str, datatype: &str) -> CustomField {
        CustomField {
            id,
            shortname: shortname.to_string(),
            name: shortname.to_string(),
            datatype: datatype.to_string(),
            multivalued: false,
        }
    }

    async fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .insert_custom_field(
                custom_field(11, "textfielddate", "datetime"),
                &[ContextLevel::Userset],
            )
            .await;
        store
            .insert_custom_field(custom_field(12, "testfield", "text"), &[ContextLevel::Userset])
            .await;
        store
            .insert_custom_field(custom_field(13, "userdate", "datetime"), &[ContextLevel::User])
            .await;
        store
    }

    fn code(result: Result<Expiry, UsersetError>) -> i32 {
        match result {
            Err(UsersetError::Validation(ValidationFailure { code, .. })) => code.as_i32(),
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_valid_expiry() {
        let store = store().await;
        let registry = FieldRegistry::new(&store);
        let validator = ExpiryValidator::new(&registry, Some(11));

        let expiry = validator.validate("2015-01-01 12:00:05").await.unwrap();
        let expected = Local
            .with_ymd_and_hms(2015, 1, 1, 12, 0, 5)
            .earliest()
            .unwrap()
            .timestamp();
        assert_eq!(expiry.shortname, "textfielddate");
        assert_eq!(expiry.timestamp, expected);
    }

    #[tokio::test]
    async fn test_wrong_separator() {
        let store = store().await;
        let registry = FieldRegistry::new(&store);

        let configured = ExpiryValidator::new(&registry, Some(11));
        assert_eq!(code(configured.validate("2015-01-01T12:00:05").await), -7);

        let unconfigured = ExpiryValidator::new(&registry, None);
        assert_eq!(code(unconfigured.validate("2015-01-01T12:00:05").await), -6);
    }

    #[tokio::test]
    async fn test_field_must_be_userset_datetime() {
        let store = store().await;
        let registry = FieldRegistry::new(&store);

        for id in [12, 13, 99] {
            let validator = ExpiryValidator::new(&registry, Some(id));
            assert_eq!(code(validator.validate("2015-01-01 12:00:05").await), -6);
        }
    }

    #[test]
    fn test_parse_rejects_loose_formats() {
        assert!(parse_local_timestamp("2015-01-01 12:00:05").is_some());
        assert!(parse_local_timestamp("2000-01-01 00:00:00").is_some());
        assert!(parse_local_timestamp("2015-1-01 12:00:05").is_none());
        assert!(parse_local_timestamp("2015-01-01 12:00").is_none());
        assert!(parse_local_timestamp("2015-01-01 24:00:00").is_none());
        assert!(parse_local_timestamp("2015-02-30 12:00:00").is_none());
        assert!(parse_local_timestamp(" 2015-01-01 12:00:05").is_none());
        assert!(parse_local_timestamp("0").is_none());
    }
}
