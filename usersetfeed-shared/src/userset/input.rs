//! Typed view of a validated `userset_create` payload

use std::collections::BTreeMap;

use super::schema::{ParamValue, Params};
use super::CUSTOM_FIELD_PREFIX;

/// Auto-association request: a profile field short name and a raw value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoAssociateSlot {
    pub shortname: String,
    pub value: String,
}

/// Request to create a user set
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UsersetInput {
    pub name: String,
    pub display: Option<String>,

    /// Name of the parent user set
    pub parent: Option<String>,

    pub expiry: Option<String>,
    pub autoassociate1: Option<AutoAssociateSlot>,
    pub autoassociate2: Option<AutoAssociateSlot>,

    /// Custom field values keyed by field short name
    pub custom_fields: BTreeMap<String, ParamValue>,
}

impl UsersetInput {
    /// Builds the input from validated parameters
    ///
    /// A slot is only set when its short name is non-empty and its value key
    /// is present, even if the value itself is empty.
    pub fn from_params(params: &Params) -> Self {
        let text = |key: &str| {
            params
                .get(key)
                .and_then(ParamValue::as_text)
                .map(str::to_string)
        };

        let slot = |field_key: &str, value_key: &str| {
            let shortname = text(field_key).filter(|name| !name.is_empty())?;
            let value = text(value_key)?;
            Some(AutoAssociateSlot { shortname, value })
        };

        let custom_fields = params
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(CUSTOM_FIELD_PREFIX)
                    .map(|shortname| (shortname.to_string(), value.clone()))
            })
            .collect();

        Self {
            name: text("name").unwrap_or_default(),
            display: text("display"),
            parent: text("parent"),
            expiry: text("expiry"),
            autoassociate1: slot("autoassociate1", "autoassociate1_value"),
            autoassociate2: slot("autoassociate2", "autoassociate2_value"),
            custom_fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(entries: &[(&str, ParamValue)]) -> Params {
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    fn text(value: &str) -> ParamValue {
        ParamValue::Text(value.to_string())
    }

    #[test]
    fn test_slot_requires_shortname_and_value_key() {
        let input = UsersetInput::from_params(&params(&[
            ("name", text("testusersetname")),
            ("autoassociate1", text("testcheckbox")),
            ("autoassociate1_value", text("")),
            ("autoassociate2", text("")),
            ("autoassociate2_value", text("1")),
        ]));

        assert_eq!(
            input.autoassociate1,
            Some(AutoAssociateSlot {
                shortname: "testcheckbox".to_string(),
                value: String::new(),
            })
        );
        assert_eq!(input.autoassociate2, None);

        let missing_value = UsersetInput::from_params(&params(&[
            ("name", text("testusersetname")),
            ("autoassociate1", text("testtext")),
        ]));
        assert_eq!(missing_value.autoassociate1, None);
    }

    #[test]
    fn test_custom_fields_are_keyed_by_shortname() {
        let input = UsersetInput::from_params(&params(&[
            ("name", text("testusersetname")),
            ("display", text("A set")),
            ("field_testfield", text("Test field")),
            ("field_count", ParamValue::Int(3)),
        ]));

        assert_eq!(input.name, "testusersetname");
        assert_eq!(input.display.as_deref(), Some("A set"));
        assert_eq!(input.parent, None);
        assert_eq!(input.custom_fields.len(), 2);
        assert_eq!(input.custom_fields["testfield"], text("Test field"));
        assert_eq!(input.custom_fields["count"], ParamValue::Int(3));
    }
}
