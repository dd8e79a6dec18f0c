/// User set model and database operations
///
/// A user set is a named grouping of users. Sets form a hierarchy through
/// `parent` (0 means top level). Custom field values are kept alongside the
/// set as a JSON object keyed by field short name.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE usersets (
///     id BIGSERIAL PRIMARY KEY,
///     name VARCHAR(255) NOT NULL,
///     display TEXT NOT NULL DEFAULT '',
///     parent BIGINT NOT NULL DEFAULT 0,
///     custom_fields JSONB NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use usersetfeed_shared::models::userset::{CreateUserset, Userset};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let parent = Userset::find_id_by_name(&pool, "Managers").await?.unwrap_or(0);
/// let userset = Userset::create(&pool, CreateUserset {
///     name: "Regional managers".to_string(),
///     display: "Managers of the northern region".to_string(),
///     parent,
///     custom_fields: Default::default(),
/// }).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::types::Json;
use sqlx::PgExecutor;
use std::collections::BTreeMap;
use validator::Validate;

/// Value of a custom field on a user set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    /// Renders the value for a web service response
    ///
    /// Lists are rendered as a comma-separated string.
    pub fn to_json(&self) -> JsonValue {
        match self {
            FieldValue::Bool(value) => JsonValue::Bool(*value),
            FieldValue::Int(value) => JsonValue::from(*value),
            FieldValue::Text(value) => JsonValue::String(value.clone()),
            FieldValue::List(values) => JsonValue::String(values.join(",")),
        }
    }
}

/// Custom field values keyed by field short name
pub type CustomFieldValues = BTreeMap<String, FieldValue>;

/// User set model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Userset {
    /// User set ID
    pub id: i64,

    /// Name, used for parent lookups
    pub name: String,

    /// Description
    pub display: String,

    /// Parent user set ID (0 for a top level set)
    pub parent: i64,

    /// Custom field values
    pub custom_fields: Json<CustomFieldValues>,

    /// When the set was created
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new user set
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateUserset {
    /// Name (1-255 characters)
    #[validate(length(min = 1, max = 255))]
    pub name: String,

    /// Description
    pub display: String,

    /// Parent user set ID, 0 for top level
    pub parent: i64,

    /// Resolved custom field values
    pub custom_fields: CustomFieldValues,
}

impl Userset {
    /// Creates a new user set
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn create<'e, E>(executor: E, data: CreateUserset) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let userset = sqlx::query_as::<_, Userset>(
            r#"
            INSERT INTO usersets (name, display, parent, custom_fields)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, display, parent, custom_fields, created_at
            "#,
        )
        .bind(&data.name)
        .bind(&data.display)
        .bind(data.parent)
        .bind(Json(&data.custom_fields))
        .fetch_one(executor)
        .await?;

        Ok(userset)
    }

    /// Finds a user set by ID
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let userset = sqlx::query_as::<_, Userset>(
            r#"
            SELECT id, name, display, parent, custom_fields, created_at
            FROM usersets
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(userset)
    }

    /// Finds the ID of a user set by exact name
    ///
    /// Names are not unique; the oldest matching set wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn find_id_by_name<'e, E>(executor: E, name: &str) -> Result<Option<i64>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let id: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT id FROM usersets
            WHERE name = $1
            ORDER BY id ASC
            LIMIT 1
            "#,
        )
        .bind(name)
        .fetch_optional(executor)
        .await?;

        Ok(id)
    }

    /// Returns the value of a custom field
    pub fn field(&self, shortname: &str) -> Option<&FieldValue> {
        self.custom_fields.get(shortname)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_value_to_json() {
        assert_eq!(FieldValue::Bool(true).to_json(), JsonValue::Bool(true));
        assert_eq!(FieldValue::Int(42).to_json(), JsonValue::from(42));
        assert_eq!(
            FieldValue::Text("Test field".to_string()).to_json(),
            JsonValue::String("Test field".to_string())
        );
        assert_eq!(
            FieldValue::List(vec!["a".to_string(), "b".to_string()]).to_json(),
            JsonValue::String("a,b".to_string())
        );
    }

    #[test]
    fn test_field_value_untagged_serde() {
        let values: CustomFieldValues =
            serde_json::from_str(r#"{"flag": true, "count": 3, "label": "x", "tags": ["a", "b"]}"#)
                .unwrap();

        assert_eq!(values["flag"], FieldValue::Bool(true));
        assert_eq!(values["count"], FieldValue::Int(3));
        assert_eq!(values["label"], FieldValue::Text("x".to_string()));
        assert_eq!(
            values["tags"],
            FieldValue::List(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_create_userset_validation() {
        let valid = CreateUserset {
            name: "testusersetname".to_string(),
            display: String::new(),
            parent: 0,
            custom_fields: CustomFieldValues::new(),
        };
        assert!(valid.validate().is_ok());

        let empty = CreateUserset {
            name: String::new(),
            ..valid.clone()
        };
        assert!(empty.validate().is_err());

        let too_long = CreateUserset {
            name: "a".repeat(256),
            ..valid
        };
        assert!(too_long.validate().is_err());
    }
}
