/// Parameter schema of the `userset_create` web service
///
/// The schema is derived from the custom fields attached to the user set
/// context: a fixed set of base entries followed by one `field_<shortname>`
/// entry per custom field. Field configuration changes at runtime, so a
/// schema is built per request from a registry snapshot and never cached.
///
/// The same schema validates the incoming payload ([`ParamSchema::validate`])
/// and cleans the outgoing record ([`ParamSchema::shape`]).
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use usersetfeed_shared::userset::schema::{ParamSchema, ParamValue};
///
/// let schema = ParamSchema::input(&[]);
/// let params = schema.validate(&json!({"name": "testusersetname"})).unwrap();
/// assert_eq!(params["name"], ParamValue::Text("testusersetname".to_string()));
///
/// assert!(schema.validate(&json!({"display": "no name"})).is_err());
/// ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use super::CUSTOM_FIELD_PREFIX;
use crate::models::custom_field::{CustomField, CustomFieldType};

/// Error type for schema validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// The payload is not a JSON object
    #[error("Expected an object")]
    NotAnObject,

    /// A required entry is absent
    #[error("Missing required key: {0}")]
    MissingRequired(String),

    /// The payload has entries the schema does not declare
    #[error("Unexpected keys: {}", .0.join(", "))]
    UnexpectedKeys(Vec<String>),

    /// An entry cannot be read as its declared type
    #[error("Invalid value for {name}: expected {expected}")]
    InvalidValue { name: String, expected: ParamType },
}

/// Declared type of a schema entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Text,
    Int,
    Bool,
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ParamType::Text => "text",
            ParamType::Int => "integer",
            ParamType::Bool => "boolean",
        };
        f.write_str(name)
    }
}

/// One schema entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub param_type: ParamType,
    pub description: String,
    pub required: bool,
}

impl ParamSpec {
    fn new(name: &str, param_type: ParamType, description: &str, required: bool) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            description: description.to_string(),
            required,
        }
    }

    fn optional_text(name: &str, description: &str) -> Self {
        Self::new(name, ParamType::Text, description, false)
    }

    /// Entry for a custom field
    ///
    /// Multivalued fields travel as comma-separated text.
    fn custom(field: &CustomField) -> Self {
        let param_type = if field.multivalued {
            ParamType::Text
        } else {
            match field.data_type() {
                CustomFieldType::Bool => ParamType::Bool,
                CustomFieldType::Int => ParamType::Int,
                _ => ParamType::Text,
            }
        };

        Self {
            name: format!("{}{}", CUSTOM_FIELD_PREFIX, field.shortname),
            param_type,
            description: field.name.clone(),
            required: false,
        }
    }
}

/// Validated value of one entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Text(String),
    Int(i64),
    Bool(bool),
}

impl ParamValue {
    /// Returns the text of a text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            ParamValue::Text(value) => JsonValue::String(value.clone()),
            ParamValue::Int(value) => JsonValue::from(*value),
            ParamValue::Bool(value) => JsonValue::Bool(*value),
        }
    }
}

/// Validated payload, keyed by entry name
pub type Params = BTreeMap<String, ParamValue>;

/// Ordered set of schema entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSchema {
    entries: Vec<ParamSpec>,
}

impl ParamSchema {
    /// Builds the request schema
    pub fn input(fields: &[CustomField]) -> Self {
        let mut entries = vec![
            ParamSpec::new("name", ParamType::Text, "Userset name", true),
            ParamSpec::optional_text("display", "Userset description"),
            ParamSpec::optional_text("parent", "Userset parent name"),
            ParamSpec::optional_text(
                "expiry",
                "Customer User expiry date in the following format: YYYY-MM-DD hh:mm:ss",
            ),
        ];
        entries.extend(Self::autoassociate_entries());
        entries.extend(fields.iter().map(ParamSpec::custom));

        Self { entries }
    }

    /// Builds the response record schema
    pub fn output(fields: &[CustomField]) -> Self {
        let mut entries = vec![
            ParamSpec::new("id", ParamType::Int, "Userset DB id", true),
            ParamSpec::new("name", ParamType::Text, "Userset name", true),
            ParamSpec::optional_text("display", "Userset description"),
            ParamSpec::new("parent", ParamType::Int, "Userset parent DB id", false),
            ParamSpec::optional_text(
                "expiry",
                "Customer User expiry date expressed as a Unix timestamp",
            ),
        ];
        entries.extend(Self::autoassociate_entries());
        entries.extend(fields.iter().map(ParamSpec::custom));

        Self { entries }
    }

    fn autoassociate_entries() -> [ParamSpec; 4] {
        [
            ParamSpec::optional_text(
                "autoassociate1",
                "First auto-association profile field shortname",
            ),
            ParamSpec::optional_text(
                "autoassociate1_value",
                "First auto-association profile field value",
            ),
            ParamSpec::optional_text(
                "autoassociate2",
                "Second auto-association profile field shortname",
            ),
            ParamSpec::optional_text(
                "autoassociate2_value",
                "Second auto-association profile field value",
            ),
        ]
    }

    /// Returns the entries in declaration order
    pub fn entries(&self) -> &[ParamSpec] {
        &self.entries
    }

    /// Finds an entry by name
    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Validates a request payload
    ///
    /// `null` entries count as absent. Unknown keys are rejected.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] describing the first violation found
    pub fn validate(&self, payload: &JsonValue) -> Result<Params, SchemaError> {
        let object = payload.as_object().ok_or(SchemaError::NotAnObject)?;

        let unexpected: Vec<String> = object
            .keys()
            .filter(|key| self.get(key).is_none())
            .cloned()
            .collect();
        if !unexpected.is_empty() {
            return Err(SchemaError::UnexpectedKeys(unexpected));
        }

        let mut params = Params::new();
        for entry in &self.entries {
            match object.get(&entry.name) {
                None | Some(JsonValue::Null) => {
                    if entry.required {
                        return Err(SchemaError::MissingRequired(entry.name.clone()));
                    }
                }
                Some(value) => {
                    params.insert(entry.name.clone(), coerce(entry, value)?);
                }
            }
        }

        Ok(params)
    }

    /// Cleans a response record
    ///
    /// Keeps only declared entries, converted to their declared types.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] if a required entry is missing or an entry
    /// cannot be converted
    pub fn shape(
        &self,
        record: Map<String, JsonValue>,
    ) -> Result<Map<String, JsonValue>, SchemaError> {
        let mut shaped = Map::new();
        for entry in &self.entries {
            match record.get(&entry.name) {
                None | Some(JsonValue::Null) => {
                    if entry.required {
                        return Err(SchemaError::MissingRequired(entry.name.clone()));
                    }
                }
                Some(value) => {
                    shaped.insert(entry.name.clone(), coerce(entry, value)?.to_json());
                }
            }
        }

        Ok(shaped)
    }
}

fn coerce(entry: &ParamSpec, value: &JsonValue) -> Result<ParamValue, SchemaError> {
    let invalid = || SchemaError::InvalidValue {
        name: entry.name.clone(),
        expected: entry.param_type,
    };

    match entry.param_type {
        ParamType::Text => match value {
            JsonValue::String(text) => Ok(ParamValue::Text(text.clone())),
            JsonValue::Number(number) => Ok(ParamValue::Text(number.to_string())),
            JsonValue::Bool(true) => Ok(ParamValue::Text("1".to_string())),
            JsonValue::Bool(false) => Ok(ParamValue::Text(String::new())),
            _ => Err(invalid()),
        },
        ParamType::Int => match value {
            JsonValue::Number(number) => number.as_i64().map(ParamValue::Int).ok_or_else(invalid),
            JsonValue::String(text) => parse_int(text).map(ParamValue::Int).ok_or_else(invalid),
            _ => Err(invalid()),
        },
        ParamType::Bool => match value {
            JsonValue::Bool(flag) => Ok(ParamValue::Bool(*flag)),
            JsonValue::Number(number) => match number.as_i64() {
                Some(0) => Ok(ParamValue::Bool(false)),
                Some(1) => Ok(ParamValue::Bool(true)),
                _ => Err(invalid()),
            },
            JsonValue::String(text) => match text.as_str() {
                "0" | "false" => Ok(ParamValue::Bool(false)),
                "1" | "true" => Ok(ParamValue::Bool(true)),
                _ => Err(invalid()),
            },
            _ => Err(invalid()),
        },
    }
}

/// Parses an optionally signed run of decimal digits
fn parse_int(text: &str) -> Option<i64> {
    let digits = text.strip_prefix('-').unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}
