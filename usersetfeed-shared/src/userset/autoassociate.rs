//! Auto-association validation
//!
//! Checks a requested (profile field short name, raw value) pair and turns it
//! into the (field ID, stored value) pair an auto-association rule keeps.
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. the field exists (`-1`)
//! 2. the field is a text, checkbox or menu field (`-2`)
//! 3. text and menu values are not empty (`-3`)
//! 4. menu values, trimmed, are one of the menu lines (`-5`)
//!
//! Checkbox values never fail; they are normalized to `"1"` or `"0"`.

use tracing::{debug, warn};

use super::error::{MessageCode, UsersetError};
use super::fields::FieldRegistry;
use crate::models::profile_field::ProfileFieldType;
use crate::store::FieldStore;

/// Profile field types usable for auto-association
pub const ALLOWED_TYPES: [ProfileFieldType; 3] = [
    ProfileFieldType::Text,
    ProfileFieldType::Checkbox,
    ProfileFieldType::Menu,
];

/// Validated auto-association rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRule {
    pub field_id: i64,
    pub value: String,
}

/// Returns true for the values treated as empty: `""` and `"0"`
pub fn is_empty_value(value: &str) -> bool {
    value.is_empty() || value == "0"
}

pub struct AutoAssociateValidator<'a, S: FieldStore + ?Sized> {
    registry: &'a FieldRegistry<'a, S>,
}

impl<'a, S: FieldStore + ?Sized> AutoAssociateValidator<'a, S> {
    pub fn new(registry: &'a FieldRegistry<'a, S>) -> Self {
        Self { registry }
    }

    /// Validates one auto-association request
    ///
    /// # Errors
    ///
    /// Returns [`UsersetError::Validation`] with the code of the first failed
    /// check, or [`UsersetError::Store`] if metadata cannot be read
    pub async fn validate(
        &self,
        shortname: &str,
        value: &str,
    ) -> Result<ValidatedRule, UsersetError> {
        let Some(field) = self.registry.find_profile_field_by_shortname(shortname).await? else {
            warn!(shortname, "Auto-associate field not found");
            return Err(MessageCode::FieldNotFound.into());
        };

        if !self.registry.profile_field_has_type(field.id, &ALLOWED_TYPES).await? {
            warn!(
                shortname,
                datatype = %field.datatype,
                "Auto-associate field has unsupported type"
            );
            return Err(MessageCode::InvalidFieldType.into());
        }

        let value = match field.data_type() {
            ProfileFieldType::Checkbox => {
                let checked = !is_empty_value(value);
                String::from(if checked { "1" } else { "0" })
            }
            ProfileFieldType::Menu => {
                if is_empty_value(value) {
                    return Err(MessageCode::EmptyValue.into());
                }
                let trimmed = value.trim();
                if !field.choices().iter().any(|choice| *choice == trimmed) {
                    warn!(shortname, value, "Auto-associate value is not a menu option");
                    return Err(MessageCode::InvalidMenuOption.into());
                }
                value.to_string()
            }
            _ => {
                if is_empty_value(value) {
                    return Err(MessageCode::EmptyValue.into());
                }
                value.to_string()
            }
        };

        debug!(shortname, field_id = field.id, value = %value, "Auto-associate rule validated");

        Ok(ValidatedRule {
            field_id: field.id,
            value,
        })
    }
}
