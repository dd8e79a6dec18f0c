/// Profile field model and database operations
///
/// Profile fields are the custom fields defined on platform user profiles.
/// They are owned by the platform and only read here: auto-association rules
/// reference them by id and user profile data is keyed by them.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE profile_fields (
///     id BIGSERIAL PRIMARY KEY,
///     shortname VARCHAR(255) NOT NULL UNIQUE,
///     name TEXT NOT NULL,
///     datatype VARCHAR(255) NOT NULL,
///     param1 TEXT,
///     defaultdata TEXT
/// );
/// ```
///
/// For `menu` fields `param1` holds the choices, one per line.

use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;

/// Data types a profile field can have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileFieldType {
    /// Single line of text
    Text,

    /// Checkbox, stored as "0" or "1"
    Checkbox,

    /// Drop-down menu of choices
    Menu,

    /// Date and time
    Datetime,

    /// Multi-line text area
    Textarea,

    /// Any datatype provided by a plugin this service does not know about
    Other,
}

impl ProfileFieldType {
    /// Parses the datatype column
    pub fn parse(datatype: &str) -> Self {
        match datatype {
            "text" => ProfileFieldType::Text,
            "checkbox" => ProfileFieldType::Checkbox,
            "menu" => ProfileFieldType::Menu,
            "datetime" => ProfileFieldType::Datetime,
            "textarea" => ProfileFieldType::Textarea,
            _ => ProfileFieldType::Other,
        }
    }

    /// Converts the type to its datatype column value
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileFieldType::Text => "text",
            ProfileFieldType::Checkbox => "checkbox",
            ProfileFieldType::Menu => "menu",
            ProfileFieldType::Datetime => "datetime",
            ProfileFieldType::Textarea => "textarea",
            ProfileFieldType::Other => "other",
        }
    }
}

/// Profile field definition
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProfileField {
    /// Field ID
    pub id: i64,

    /// Unique short name
    pub shortname: String,

    /// Display name
    pub name: String,

    /// Raw datatype (see [`ProfileFieldType`])
    pub datatype: String,

    /// Type specific parameter; newline-delimited choices for menus
    pub param1: Option<String>,

    /// Value a user has when no profile data row exists
    pub defaultdata: Option<String>,
}

impl ProfileField {
    /// Returns the parsed datatype
    pub fn data_type(&self) -> ProfileFieldType {
        ProfileFieldType::parse(&self.datatype)
    }

    /// Returns the menu choices in declaration order
    ///
    /// Lines are not trimmed; a value must match a line exactly.
    pub fn choices(&self) -> Vec<&str> {
        match &self.param1 {
            Some(param) => param.split('\n').collect(),
            None => Vec::new(),
        }
    }

    /// Returns the default value, empty when none is configured
    pub fn default_value(&self) -> &str {
        self.defaultdata.as_deref().unwrap_or("")
    }

    /// Finds a profile field by its short name
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn find_by_shortname<'e, E>(
        executor: E,
        shortname: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let field = sqlx::query_as::<_, ProfileField>(
            r#"
            SELECT id, shortname, name, datatype, param1, defaultdata
            FROM profile_fields
            WHERE shortname = $1
            "#,
        )
        .bind(shortname)
        .fetch_optional(executor)
        .await?;

        Ok(field)
    }

    /// Finds a profile field by ID
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let field = sqlx::query_as::<_, ProfileField>(
            r#"
            SELECT id, shortname, name, datatype, param1, defaultdata
            FROM profile_fields
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(field)
    }
}
