//! `userset_create` orchestration
//!
//! Runs the whole flow for one request, independent of the transport:
//!
//! 1. host dependency check
//! 2. capability check
//! 3. parameter schema validation
//! 4. auto-association slots 1 then 2
//! 5. expiry date
//! 6. user set creation
//! 7. auto-association reconciliation
//! 8. response assembly
//!
//! Steps 6 to 8 share one store transaction. It is committed only once the
//! response record is built, so a failure in any of them persists nothing.
//!
//! Structured validation failures come back as an `Ok` response carrying a
//! negative message code. Everything else is an `Err`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as JsonValue};
use tracing::{error, info, warn};

use super::autoassociate::{AutoAssociateValidator, ValidatedRule};
use super::error::{UsersetError, ValidationFailure};
use super::expiry::{Expiry, ExpiryValidator};
use super::fields::FieldRegistry;
use super::input::{AutoAssociateSlot, UsersetInput};
use super::reconcile::Reconciler;
use super::schema::ParamSchema;
use super::writer::UsersetWriter;
use super::{UsersetSettings, CREATE_CAPABILITY, CUSTOM_FIELD_PREFIX, DEFAULT_EXPIRY};
use crate::auth::authorization::require_capability;
use crate::auth::middleware::AuthContext;
use crate::models::custom_field::{ContextLevel, CustomField};
use crate::models::userset::Userset;
use crate::store::{Store, StoreTransaction};

/// Message code of a successful creation
pub const SUCCESS_CODE: i32 = 1;

pub const SUCCESS_MESSAGE: &str = "Userset created successfully";

/// Response envelope of `userset_create`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsersetCreateResponse {
    pub messagecode: i32,
    pub message: String,
    pub record: Map<String, JsonValue>,
}

impl UsersetCreateResponse {
    /// Envelope of a structured validation failure
    pub fn failure(failure: ValidationFailure) -> Self {
        let mut record = Map::new();
        record.insert("id".to_string(), json!(0));
        record.insert("name".to_string(), json!("NULL"));

        Self {
            messagecode: failure.code.as_i32(),
            message: failure.message,
            record,
        }
    }

    pub fn is_success(&self) -> bool {
        self.messagecode == SUCCESS_CODE
    }
}

/// Creates a user set from a `userset_create` payload
///
/// # Errors
///
/// Returns the fatal [`UsersetError`] variants; validation failures are
/// reported through [`UsersetCreateResponse::failure`]
pub async fn create_userset<S: Store + ?Sized>(
    store: &S,
    settings: &UsersetSettings,
    auth: &AuthContext,
    data: &JsonValue,
) -> Result<UsersetCreateResponse, UsersetError> {
    match run(store, settings, auth, data).await {
        Err(UsersetError::Validation(failure)) => {
            warn!(
                user_id = auth.user_id,
                messagecode = failure.code.as_i32(),
                "User set creation rejected"
            );
            Ok(UsersetCreateResponse::failure(failure))
        }
        other => other,
    }
}

async fn run<S: Store + ?Sized>(
    store: &S,
    settings: &UsersetSettings,
    auth: &AuthContext,
    data: &JsonValue,
) -> Result<UsersetCreateResponse, UsersetError> {
    if !store.program_installed().await? {
        return Err(UsersetError::HostDependencyMissing);
    }

    require_capability(auth, CREATE_CAPABILITY)?;

    let registry = FieldRegistry::new(store);
    let fields = registry.list_fields(ContextLevel::Userset).await?;

    let params = ParamSchema::input(&fields).validate(data)?;
    let input = UsersetInput::from_params(&params);

    let validator = AutoAssociateValidator::new(&registry);
    let rule1 = validate_slot(&validator, input.autoassociate1.as_ref()).await?;
    let rule2 = validate_slot(&validator, input.autoassociate2.as_ref()).await?;

    let expiry_value = match input.expiry.as_deref() {
        None | Some("") | Some("0") => DEFAULT_EXPIRY,
        Some(value) => value,
    };
    let expiry = ExpiryValidator::new(&registry, settings.expiry_field_id)
        .validate(expiry_value)
        .await?;

    let tx = store.begin().await?;
    let persisted = persist(&*tx, &input, &fields, &expiry, rule1.as_ref(), rule2.as_ref()).await;
    let (userset, record) = match persisted {
        Ok(persisted) => {
            tx.commit().await?;
            persisted
        }
        Err(err) => {
            if let Err(rollback) = tx.rollback().await {
                error!(error = %rollback, "Failed to roll back user set creation");
            }
            return Err(err);
        }
    };

    info!(
        user_id = auth.user_id,
        userset_id = userset.id,
        name = %userset.name,
        "userset_create completed"
    );

    Ok(UsersetCreateResponse {
        messagecode: SUCCESS_CODE,
        message: SUCCESS_MESSAGE.to_string(),
        record,
    })
}

/// Writes the user set and its rules, then shapes the response record
async fn persist<T: StoreTransaction + ?Sized>(
    tx: &T,
    input: &UsersetInput,
    fields: &[CustomField],
    expiry: &Expiry,
    rule1: Option<&ValidatedRule>,
    rule2: Option<&ValidatedRule>,
) -> Result<(Userset, Map<String, JsonValue>), UsersetError> {
    let userset = UsersetWriter::new(tx).create(input, fields, expiry).await?;

    Reconciler::new(tx).reconcile(userset.id, rule1, rule2).await?;

    let mut record = Map::new();
    record.insert("id".to_string(), json!(userset.id));
    record.insert("name".to_string(), json!(userset.name));
    record.insert("display".to_string(), json!(userset.display));
    record.insert("parent".to_string(), json!(userset.parent));
    record.insert("expiry".to_string(), json!(expiry.timestamp.to_string()));
    echo_slot(&mut record, "autoassociate1", input.autoassociate1.as_ref(), rule1);
    echo_slot(&mut record, "autoassociate2", input.autoassociate2.as_ref(), rule2);
    for (shortname, value) in userset.custom_fields.iter() {
        record.insert(format!("{}{}", CUSTOM_FIELD_PREFIX, shortname), value.to_json());
    }

    let record = ParamSchema::output(fields)
        .shape(record)
        .map_err(|e| UsersetError::CreateFailed(e.to_string()))?;

    Ok((userset, record))
}

async fn validate_slot<S: Store + ?Sized>(
    validator: &AutoAssociateValidator<'_, S>,
    slot: Option<&AutoAssociateSlot>,
) -> Result<Option<ValidatedRule>, UsersetError> {
    match slot {
        Some(slot) => Ok(Some(validator.validate(&slot.shortname, &slot.value).await?)),
        None => Ok(None),
    }
}

fn echo_slot(
    record: &mut Map<String, JsonValue>,
    key: &str,
    slot: Option<&AutoAssociateSlot>,
    rule: Option<&ValidatedRule>,
) {
    if let (Some(slot), Some(rule)) = (slot, rule) {
        record.insert(key.to_string(), json!(slot.shortname));
        record.insert(format!("{}_value", key), json!(rule.value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::userset::error::MessageCode;

    #[test]
    fn test_failure_envelope() {
        let response = UsersetCreateResponse::failure(MessageCode::FieldNotFound.into());

        assert_eq!(response.messagecode, -1);
        assert_eq!(response.message, "Auto-associate field shortname does not exist.");
        assert_eq!(JsonValue::Object(response.record), json!({"id": 0, "name": "NULL"}));
    }

    #[test]
    fn test_response_serialization() {
        let mut record = Map::new();
        record.insert("id".to_string(), json!(3));
        let response = UsersetCreateResponse {
            messagecode: SUCCESS_CODE,
            message: SUCCESS_MESSAGE.to_string(),
            record,
        };

        assert!(response.is_success());
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "messagecode": 1,
                "message": "Userset created successfully",
                "record": {"id": 3}
            })
        );
    }
}
