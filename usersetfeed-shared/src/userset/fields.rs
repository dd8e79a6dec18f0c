//! Field registry
//!
//! Read-only view over custom field and profile field metadata. Nothing is
//! cached: field configuration can change between requests, so each request
//! builds its own registry over the store.

use crate::models::custom_field::{ContextLevel, CustomField};
use crate::models::profile_field::{ProfileField, ProfileFieldType};
use crate::store::{FieldStore, StoreError};

/// Metadata lookups used while validating a request
pub struct FieldRegistry<'a, S: FieldStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: FieldStore + ?Sized> FieldRegistry<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Lists the custom fields of a context level
    pub async fn list_fields(&self, level: ContextLevel) -> Result<Vec<CustomField>, StoreError> {
        self.store.list_custom_fields(level).await
    }

    /// Finds a custom field by ID within a context level
    pub async fn find_custom_field(
        &self,
        level: ContextLevel,
        id: i64,
    ) -> Result<Option<CustomField>, StoreError> {
        self.store.find_custom_field(level, id).await
    }

    pub async fn find_profile_field_by_shortname(
        &self,
        shortname: &str,
    ) -> Result<Option<ProfileField>, StoreError> {
        self.store.find_profile_field_by_shortname(shortname).await
    }

    /// Returns true when the profile field exists and has one of `allowed`
    pub async fn profile_field_has_type(
        &self,
        id: i64,
        allowed: &[ProfileFieldType],
    ) -> Result<bool, StoreError> {
        let field = self.store.find_profile_field(id).await?;
        Ok(field.is_some_and(|field| allowed.contains(&field.data_type())))
    }
}
