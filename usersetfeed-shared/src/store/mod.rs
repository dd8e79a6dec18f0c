/// Collaborator interfaces of the user set core
///
/// The core never talks to the database directly. Everything it reads or
/// writes goes through the traits below, grouped by concern:
///
/// - [`HostStore`]: liveness and host platform dependency checks
/// - [`FieldStore`]: custom field and profile field metadata (read only)
/// - [`UsersetStore`]: user set persistence
/// - [`AssociationStore`]: auto-association rules and membership assignments
/// - [`EnrolmentSync`]: downstream enrolment recomputation
/// - [`TransactionalStore`]: opens a [`StoreTransaction`] whose writes are
///   committed or rolled back as one unit
///
/// [`Store`] bundles them and is implemented for every type implementing all
/// six, so a single backend can be shared as `Arc<dyn Store>`.
///
/// # Implementations
///
/// - [`postgres::PgStore`]: sqlx/Postgres backend built on [`crate::models`]
/// - [`memory::MemoryStore`]: in-process backend for tests and local runs

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::db::pool::PoolStats;
use crate::models::custom_field::{ContextLevel, CustomField};
use crate::models::profile_field::ProfileField;
use crate::models::userset::{CreateUserset, Userset};
use crate::models::userset_assignment::AssignmentChange;
use crate::models::userset_profile::AutoAssociationRule;
use crate::userset::predicate::MatchPredicate;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database query failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Backend refused or could not serve the request
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Host platform checks
#[async_trait]
pub trait HostStore: Send + Sync {
    /// Verifies the backend is reachable
    async fn ping(&self) -> Result<(), StoreError>;

    /// Returns true when the program component owning user sets is installed
    async fn program_installed(&self) -> Result<bool, StoreError>;

    /// Connection pool usage, for backends that pool connections
    fn pool_stats(&self) -> Option<PoolStats> {
        None
    }
}

/// Field metadata reads
#[async_trait]
pub trait FieldStore: Send + Sync {
    /// Lists the custom fields attached to a context level, ordered by ID
    async fn list_custom_fields(
        &self,
        level: ContextLevel,
    ) -> Result<Vec<CustomField>, StoreError>;

    /// Finds a custom field by ID among those attached to a context level
    async fn find_custom_field(
        &self,
        level: ContextLevel,
        id: i64,
    ) -> Result<Option<CustomField>, StoreError>;

    /// Finds a profile field by short name
    async fn find_profile_field_by_shortname(
        &self,
        shortname: &str,
    ) -> Result<Option<ProfileField>, StoreError>;

    /// Finds a profile field by ID
    async fn find_profile_field(&self, id: i64) -> Result<Option<ProfileField>, StoreError>;
}

/// User set persistence
#[async_trait]
pub trait UsersetStore: Send + Sync {
    /// Finds the ID of the oldest user set with exactly this name
    async fn find_userset_id_by_name(&self, name: &str) -> Result<Option<i64>, StoreError>;

    /// Persists a new user set and returns it with its assigned ID
    async fn create_userset(&self, data: CreateUserset) -> Result<Userset, StoreError>;
}

/// Auto-association rule and assignment persistence
#[async_trait]
pub trait AssociationStore: Send + Sync {
    /// Lists at most `limit` rules of a user set, oldest first
    async fn list_rules(
        &self,
        userset_id: i64,
        limit: i64,
    ) -> Result<Vec<AutoAssociationRule>, StoreError>;

    /// Inserts a rule
    async fn insert_rule(
        &self,
        userset_id: i64,
        field_id: i64,
        value: &str,
    ) -> Result<AutoAssociationRule, StoreError>;

    /// Replaces the value of a rule
    async fn update_rule_value(&self, rule_id: i64, value: &str) -> Result<(), StoreError>;

    /// Deletes a rule
    async fn delete_rule(&self, rule_id: i64) -> Result<(), StoreError>;

    /// Deletes every `plugin` assignment of a user set and inserts one per
    /// program user matching `predicate`, as a single atomic step
    async fn replace_assignments(
        &self,
        userset_id: i64,
        plugin: &str,
        predicate: &MatchPredicate,
    ) -> Result<AssignmentChange, StoreError>;
}

/// Downstream enrolment recomputation
#[async_trait]
pub trait EnrolmentSync: Send + Sync {
    /// Requests recomputation of the enrolments implied by a user set's members
    async fn update_enrolments(&self, userset_id: i64) -> Result<(), StoreError>;
}

/// Open unit of work
///
/// Reads see the transaction's own writes. Nothing becomes visible to other
/// callers before [`commit`](StoreTransaction::commit). Dropping an
/// unfinished transaction rolls it back.
#[async_trait]
pub trait StoreTransaction: FieldStore + UsersetStore + AssociationStore + EnrolmentSync {
    /// Makes every write of the transaction durable
    async fn commit(&self) -> Result<(), StoreError>;

    /// Discards every write of the transaction
    async fn rollback(&self) -> Result<(), StoreError>;
}

/// Source of [`StoreTransaction`]s
#[async_trait]
pub trait TransactionalStore: Send + Sync {
    /// Starts a transaction
    async fn begin<'a>(&'a self) -> Result<Box<dyn StoreTransaction + 'a>, StoreError>;
}

/// Every collaborator the user set flow needs
pub trait Store:
    HostStore + FieldStore + UsersetStore + AssociationStore + EnrolmentSync + TransactionalStore
{
}

impl<T> Store for T where
    T: HostStore
        + FieldStore
        + UsersetStore
        + AssociationStore
        + EnrolmentSync
        + TransactionalStore
{
}
