/// Program and platform user models
///
/// A person exists twice: once in the program roster (`users`) and once as a
/// platform account (`platform_users`) that owns the profile data. The two
/// records are linked by `idnumber`, the stable external identifier.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id BIGSERIAL PRIMARY KEY,
///     idnumber VARCHAR(255) NOT NULL UNIQUE,
///     username VARCHAR(255) NOT NULL
/// );
///
/// CREATE TABLE platform_users (
///     id BIGSERIAL PRIMARY KEY,
///     idnumber VARCHAR(255) NOT NULL UNIQUE
/// );
///
/// CREATE TABLE profile_data (
///     user_id BIGINT NOT NULL REFERENCES platform_users(id) ON DELETE CASCADE,
///     field_id BIGINT NOT NULL REFERENCES profile_fields(id) ON DELETE CASCADE,
///     data TEXT NOT NULL,
///     PRIMARY KEY (user_id, field_id)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use usersetfeed_shared::models::user::{PlatformUser, ProfileData, ProgramUser};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// ProgramUser::create(&pool, "EMP-0042", "jdoe").await?;
/// let account = PlatformUser::create(&pool, "EMP-0042").await?;
/// ProfileData::upsert(&pool, account.id, 3, "1").await?;
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// User in the program roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProgramUser {
    /// Program user ID, referenced by assignments
    pub id: i64,

    /// External identifier shared with the platform account
    pub idnumber: String,

    /// Login name
    pub username: String,
}

/// Platform account owning profile data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlatformUser {
    /// Platform user ID
    pub id: i64,

    /// External identifier shared with the program user
    pub idnumber: String,
}

/// Stored value of one profile field for one platform user
///
/// A missing row means the user holds the field's default value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProfileData {
    /// Platform user ID
    pub user_id: i64,

    /// Profile field ID
    pub field_id: i64,

    /// Raw value
    pub data: String,
}

impl ProgramUser {
    /// Adds a user to the program roster
    ///
    /// # Errors
    ///
    /// Returns an error if the idnumber is already taken or the database
    /// connection fails
    pub async fn create(
        pool: &PgPool,
        idnumber: &str,
        username: &str,
    ) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, ProgramUser>(
            r#"
            INSERT INTO users (idnumber, username)
            VALUES ($1, $2)
            RETURNING id, idnumber, username
            "#,
        )
        .bind(idnumber)
        .bind(username)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds a program user by external identifier
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn find_by_idnumber(
        pool: &PgPool,
        idnumber: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, ProgramUser>(
            "SELECT id, idnumber, username FROM users WHERE idnumber = $1",
        )
        .bind(idnumber)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }
}

impl PlatformUser {
    /// Creates a platform account
    ///
    /// # Errors
    ///
    /// Returns an error if the idnumber is already taken or the database
    /// connection fails
    pub async fn create(pool: &PgPool, idnumber: &str) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, PlatformUser>(
            r#"
            INSERT INTO platform_users (idnumber)
            VALUES ($1)
            RETURNING id, idnumber
            "#,
        )
        .bind(idnumber)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }
}

impl ProfileData {
    /// Stores a profile value, replacing any previous value
    ///
    /// # Errors
    ///
    /// Returns an error if the user or field doesn't exist or the database
    /// connection fails
    pub async fn upsert(
        pool: &PgPool,
        user_id: i64,
        field_id: i64,
        data: &str,
    ) -> Result<Self, sqlx::Error> {
        let row = sqlx::query_as::<_, ProfileData>(
            r#"
            INSERT INTO profile_data (user_id, field_id, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, field_id) DO UPDATE SET data = EXCLUDED.data
            RETURNING user_id, field_id, data
            "#,
        )
        .bind(user_id)
        .bind(field_id)
        .bind(data)
        .fetch_one(pool)
        .await?;

        Ok(row)
    }

    /// Lists the stored profile values of a platform user
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn list_for_user(pool: &PgPool, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        let rows = sqlx::query_as::<_, ProfileData>(
            r#"
            SELECT user_id, field_id, data
            FROM profile_data
            WHERE user_id = $1
            ORDER BY field_id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }
}
