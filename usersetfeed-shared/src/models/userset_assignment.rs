/// User set membership assignment model and database operations
///
/// Each row puts one program user into one user set. The `plugin` column
/// records where the assignment came from; rows produced by profile based
/// auto-association carry [`PROFILE_PLUGIN`] and are the only rows this
/// service ever deletes.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE userset_assignments (
///     userset_id BIGINT NOT NULL REFERENCES usersets(id) ON DELETE CASCADE,
///     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     plugin VARCHAR(32) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (userset_id, user_id, plugin)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use usersetfeed_shared::models::userset_assignment::{UsersetAssignment, PROFILE_PLUGIN};
/// use usersetfeed_shared::userset::predicate::{FieldCondition, MatchPredicate};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool, userset_id: i64) -> Result<(), sqlx::Error> {
/// let predicate = MatchPredicate::new().and(FieldCondition::new(3, "1", "0"));
/// let mut tx = pool.begin().await?;
/// let change =
///     UsersetAssignment::regenerate(&mut *tx, userset_id, PROFILE_PLUGIN, &predicate).await?;
/// tx.commit().await?;
/// println!("removed {}, added {}", change.removed, change.added);
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor, Postgres, QueryBuilder};

use crate::userset::predicate::MatchPredicate;

/// Provenance marker of assignments produced by profile auto-association
pub const PROFILE_PLUGIN: &str = "moodleprofile";

/// Membership assignment of a program user to a user set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UsersetAssignment {
    /// User set ID
    pub userset_id: i64,

    /// Program user ID
    pub user_id: i64,

    /// Provenance marker
    pub plugin: String,
}

/// Outcome of regenerating a user set's assignments
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentChange {
    /// Rows deleted
    pub removed: u64,

    /// Rows inserted
    pub added: u64,
}

impl UsersetAssignment {
    /// Creates an assignment
    ///
    /// # Errors
    ///
    /// Returns an error if the assignment already exists or the database
    /// connection fails
    pub async fn create<'e, E>(
        executor: E,
        userset_id: i64,
        user_id: i64,
        plugin: &str,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let assignment = sqlx::query_as::<_, UsersetAssignment>(
            r#"
            INSERT INTO userset_assignments (userset_id, user_id, plugin)
            VALUES ($1, $2, $3)
            RETURNING userset_id, user_id, plugin
            "#,
        )
        .bind(userset_id)
        .bind(user_id)
        .bind(plugin)
        .fetch_one(executor)
        .await?;

        Ok(assignment)
    }

    /// Lists all assignments of a user set, ordered by user
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn list_by_userset<'e, E>(
        executor: E,
        userset_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let assignments = sqlx::query_as::<_, UsersetAssignment>(
            r#"
            SELECT userset_id, user_id, plugin
            FROM userset_assignments
            WHERE userset_id = $1
            ORDER BY user_id ASC, plugin ASC
            "#,
        )
        .bind(userset_id)
        .fetch_all(executor)
        .await?;

        Ok(assignments)
    }

    /// Replaces every `plugin` assignment of a user set with the users
    /// selected by `predicate`
    ///
    /// Runs a delete then an insert on `conn`, which must be inside a
    /// transaction for readers never to see a partially regenerated set. An
    /// empty predicate only deletes.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn regenerate(
        conn: &mut PgConnection,
        userset_id: i64,
        plugin: &str,
        predicate: &MatchPredicate,
    ) -> Result<AssignmentChange, sqlx::Error> {
        let removed = sqlx::query(
            "DELETE FROM userset_assignments WHERE userset_id = $1 AND plugin = $2",
        )
        .bind(userset_id)
        .bind(plugin)
        .execute(&mut *conn)
        .await?
        .rows_affected();

        let added = if predicate.is_empty() {
            0
        } else {
            matching_insert(userset_id, plugin, predicate)
                .build()
                .execute(&mut *conn)
                .await?
                .rows_affected()
        };

        Ok(AssignmentChange { removed, added })
    }
}

/// Builds the `INSERT ... SELECT` assigning every program user whose
/// platform account satisfies `predicate`
///
/// Program users are linked to platform users by `idnumber`. Each condition
/// joins `profile_data` once: an inner join when the value must be stored, a
/// left join when a missing row counts as the default value.
pub(crate) fn matching_insert(
    userset_id: i64,
    plugin: &str,
    predicate: &MatchPredicate,
) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO userset_assignments (userset_id, user_id, plugin) SELECT ",
    );
    builder.push_bind(userset_id);
    builder.push(", cu.id, ");
    builder.push_bind(plugin.to_string());
    builder.push(" FROM users cu INNER JOIN platform_users mu ON mu.idnumber = cu.idnumber");

    for (i, condition) in predicate.conditions().iter().enumerate() {
        let alias = format!("inf{}", i + 1);
        let join = if condition.is_default { "LEFT" } else { "INNER" };
        builder.push(format!(
            " {join} JOIN profile_data {alias} ON mu.id = {alias}.user_id AND {alias}.field_id = "
        ));
        builder.push_bind(condition.field_id);
    }

    builder.push(" WHERE ");
    for (i, condition) in predicate.conditions().iter().enumerate() {
        let alias = format!("inf{}", i + 1);
        if i > 0 {
            builder.push(" AND ");
        }
        builder.push(format!("({alias}.data = "));
        builder.push_bind(condition.value.clone());
        if condition.is_default {
            builder.push(format!(" OR {alias}.user_id IS NULL"));
        }
        builder.push(")");
    }

    builder.push(" ON CONFLICT DO NOTHING");
    builder
}
