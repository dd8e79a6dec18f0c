/// Auto-association rule model and database operations
///
/// A rule states that users whose profile field `field_id` holds `value`
/// belong to the user set. A set has at most one rule per profile field.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE userset_profiles (
///     id BIGSERIAL PRIMARY KEY,
///     userset_id BIGINT NOT NULL REFERENCES usersets(id) ON DELETE CASCADE,
///     field_id BIGINT NOT NULL,
///     value TEXT NOT NULL,
///     UNIQUE (userset_id, field_id)
/// );
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;

/// Auto-association rule of a user set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AutoAssociationRule {
    /// Rule ID
    pub id: i64,

    /// Owning user set
    pub userset_id: i64,

    /// Profile field the rule matches on
    pub field_id: i64,

    /// Value a user's profile field must hold
    pub value: String,
}

impl AutoAssociationRule {
    /// Lists the rules of a user set, oldest first
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn list_by_userset<'e, E>(
        executor: E,
        userset_id: i64,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let rules = sqlx::query_as::<_, AutoAssociationRule>(
            r#"
            SELECT id, userset_id, field_id, value
            FROM userset_profiles
            WHERE userset_id = $1
            ORDER BY id ASC
            LIMIT $2
            "#,
        )
        .bind(userset_id)
        .bind(limit)
        .fetch_all(executor)
        .await?;

        Ok(rules)
    }

    /// Creates a rule
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A rule for the same field already exists (unique constraint violation)
    /// - The user set doesn't exist (foreign key violation)
    /// - Database connection fails
    pub async fn create<'e, E>(
        executor: E,
        userset_id: i64,
        field_id: i64,
        value: &str,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let rule = sqlx::query_as::<_, AutoAssociationRule>(
            r#"
            INSERT INTO userset_profiles (userset_id, field_id, value)
            VALUES ($1, $2, $3)
            RETURNING id, userset_id, field_id, value
            "#,
        )
        .bind(userset_id)
        .bind(field_id)
        .bind(value)
        .fetch_one(executor)
        .await?;

        Ok(rule)
    }

    /// Replaces the value of a rule
    ///
    /// Returns true if the rule existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn update_value<'e, E>(executor: E, id: i64, value: &str) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("UPDATE userset_profiles SET value = $2 WHERE id = $1")
            .bind(id)
            .bind(value)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a rule
    ///
    /// Returns true if the rule existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn delete<'e, E>(executor: E, id: i64) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM userset_profiles WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
