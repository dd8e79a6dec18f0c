/// Custom field model and database operations
///
/// Custom fields are typed attributes that can be attached to program
/// entities. A field is made available to an entity kind by linking it to
/// that kind's context level.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE custom_fields (
///     id BIGSERIAL PRIMARY KEY,
///     shortname VARCHAR(255) NOT NULL,
///     name TEXT NOT NULL,
///     datatype VARCHAR(32) NOT NULL,
///     multivalued BOOLEAN NOT NULL DEFAULT FALSE
/// );
///
/// CREATE TABLE custom_field_contexts (
///     field_id BIGINT NOT NULL REFERENCES custom_fields(id) ON DELETE CASCADE,
///     context_level INTEGER NOT NULL,
///     PRIMARY KEY (field_id, context_level)
/// );
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;

/// Context levels of program entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextLevel {
    Program,
    Track,
    Course,
    Class,
    User,
    Userset,
}

impl ContextLevel {
    /// Numeric level stored in `custom_field_contexts`
    pub fn as_i32(&self) -> i32 {
        match self {
            ContextLevel::Program => 11,
            ContextLevel::Track => 12,
            ContextLevel::Course => 13,
            ContextLevel::Class => 14,
            ContextLevel::User => 15,
            ContextLevel::Userset => 16,
        }
    }
}

/// Data types a custom field can have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomFieldType {
    Bool,
    Int,
    Num,
    Char,
    Text,
    Datetime,
}

impl CustomFieldType {
    /// Parses the datatype column
    ///
    /// Unknown datatypes are treated as free text.
    pub fn parse(datatype: &str) -> Self {
        match datatype {
            "bool" => CustomFieldType::Bool,
            "int" => CustomFieldType::Int,
            "num" => CustomFieldType::Num,
            "char" => CustomFieldType::Char,
            "datetime" => CustomFieldType::Datetime,
            _ => CustomFieldType::Text,
        }
    }
}

/// Custom field definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CustomField {
    /// Field ID
    pub id: i64,

    /// Short name, used as the parameter name suffix
    pub shortname: String,

    /// Display name
    pub name: String,

    /// Raw datatype (see [`CustomFieldType`])
    pub datatype: String,

    /// Whether the field holds a list of values
    pub multivalued: bool,
}

impl CustomField {
    /// Returns the parsed datatype
    pub fn data_type(&self) -> CustomFieldType {
        CustomFieldType::parse(&self.datatype)
    }

    /// Lists all fields attached to a context level, ordered by ID
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn list_for_context<'e, E>(
        executor: E,
        level: ContextLevel,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let fields = sqlx::query_as::<_, CustomField>(
            r#"
            SELECT f.id, f.shortname, f.name, f.datatype, f.multivalued
            FROM custom_fields f
            JOIN custom_field_contexts fctx ON f.id = fctx.field_id AND fctx.context_level = $1
            ORDER BY f.id ASC
            "#,
        )
        .bind(level.as_i32())
        .fetch_all(executor)
        .await?;

        Ok(fields)
    }

    /// Finds a field by ID among the fields attached to a context level
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn find_in_context<'e, E>(
        executor: E,
        level: ContextLevel,
        id: i64,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let field = sqlx::query_as::<_, CustomField>(
            r#"
            SELECT f.id, f.shortname, f.name, f.datatype, f.multivalued
            FROM custom_fields f
            JOIN custom_field_contexts fctx ON f.id = fctx.field_id AND fctx.context_level = $1
            WHERE f.id = $2
            "#,
        )
        .bind(level.as_i32())
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_level_values() {
        assert_eq!(ContextLevel::Program.as_i32(), 11);
        assert_eq!(ContextLevel::User.as_i32(), 15);
        assert_eq!(ContextLevel::Userset.as_i32(), 16);
    }

    #[test]
    fn test_custom_field_type_parse() {
        assert_eq!(CustomFieldType::parse("bool"), CustomFieldType::Bool);
        assert_eq!(CustomFieldType::parse("int"), CustomFieldType::Int);
        assert_eq!(CustomFieldType::parse("num"), CustomFieldType::Num);
        assert_eq!(CustomFieldType::parse("datetime"), CustomFieldType::Datetime);
        assert_eq!(CustomFieldType::parse("char"), CustomFieldType::Char);
        assert_eq!(CustomFieldType::parse("whatever"), CustomFieldType::Text);
    }
}
