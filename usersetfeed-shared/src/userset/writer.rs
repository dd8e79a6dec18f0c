//! User set writer
//!
//! Resolves the parent reference, converts custom field input to stored
//! values and persists the user set.

use tracing::{error, info, warn};
use validator::Validate;

use super::error::UsersetError;
use super::expiry::Expiry;
use super::input::UsersetInput;
use super::schema::ParamValue;
use crate::models::custom_field::CustomField;
use crate::models::userset::{CreateUserset, CustomFieldValues, FieldValue, Userset};
use crate::store::UsersetStore;

/// Parent name meaning "no parent", compared case-insensitively
pub const TOP_LEVEL: &str = "top";

/// Parent reference also meaning "no parent"; a parent named "0" is unreachable
pub const TOP_LEVEL_ID: &str = "0";

pub struct UsersetWriter<'a, S: UsersetStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: UsersetStore + ?Sized> UsersetWriter<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Creates the user set
    ///
    /// Nothing is persisted when the parent cannot be resolved or the name is
    /// invalid.
    ///
    /// # Errors
    ///
    /// - [`UsersetError::InvalidParent`] if the named parent doesn't exist
    /// - [`UsersetError::InvalidParameter`] if the name is empty or too long
    /// - [`UsersetError::CreateFailed`] if the store rejects the insert
    pub async fn create(
        &self,
        input: &UsersetInput,
        fields: &[CustomField],
        expiry: &Expiry,
    ) -> Result<Userset, UsersetError> {
        let parent = self.resolve_parent(input.parent.as_deref()).await?;

        let mut custom_fields = resolve_custom_fields(input, fields);
        custom_fields.insert(expiry.shortname.clone(), FieldValue::Int(expiry.timestamp));

        let data = CreateUserset {
            name: input.name.clone(),
            display: input.display.clone().unwrap_or_default(),
            parent,
            custom_fields,
        };
        data.validate()
            .map_err(|e| UsersetError::InvalidParameter(e.to_string()))?;

        let userset = self.store.create_userset(data).await.map_err(|e| {
            error!(error = %e, name = %input.name, "Failed to create user set");
            UsersetError::CreateFailed(e.to_string())
        })?;

        info!(
            userset_id = userset.id,
            name = %userset.name,
            parent = userset.parent,
            "User set created"
        );

        Ok(userset)
    }

    /// Resolves a parent name to a user set ID, 0 for top level
    ///
    /// No parent, an empty name, [`TOP_LEVEL`] and [`TOP_LEVEL_ID`] all mean
    /// top level.
    async fn resolve_parent(&self, parent: Option<&str>) -> Result<i64, UsersetError> {
        let name = match parent {
            Some(name) if !is_top_level(name) => name,
            _ => return Ok(0),
        };

        match self.store.find_userset_id_by_name(name).await? {
            Some(id) => Ok(id),
            None => {
                warn!(parent = name, "Parent user set not found");
                Err(UsersetError::InvalidParent(name.to_string()))
            }
        }
    }
}

fn is_top_level(name: &str) -> bool {
    name.is_empty() || name == TOP_LEVEL_ID || name.eq_ignore_ascii_case(TOP_LEVEL)
}

/// Converts custom field input to stored values
///
/// Input for fields missing from the snapshot is ignored. Multivalued fields
/// take comma-separated text.
fn resolve_custom_fields(input: &UsersetInput, fields: &[CustomField]) -> CustomFieldValues {
    input
        .custom_fields
        .iter()
        .filter_map(|(shortname, value)| {
            let field = fields.iter().find(|field| &field.shortname == shortname)?;
            let value = match value {
                ParamValue::Text(text) if field.multivalued => FieldValue::List(
                    text.split(',')
                        .map(str::trim)
                        .filter(|item| !item.is_empty())
                        .map(str::to_string)
                        .collect(),
                ),
                ParamValue::Text(text) => FieldValue::Text(text.clone()),
                ParamValue::Int(number) => FieldValue::Int(*number),
                ParamValue::Bool(flag) => FieldValue::Bool(*flag),
            };
            Some((shortname.clone(), value))
        })
        .collect()
}
