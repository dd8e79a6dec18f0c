/// Postgres implementation of the store traits
///
/// Thin delegation to the model operations in [`crate::models`], plus the two
/// host level checks that have no model of their own. [`PgTransaction`] runs
/// the same operations on one connection inside a database transaction.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use usersetfeed_shared::db::pool::{create_pool, DatabaseConfig};
/// use usersetfeed_shared::store::{postgres::PgStore, Store};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
/// let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tokio::sync::Mutex;
use tracing::debug;

use super::{
    AssociationStore, EnrolmentSync, FieldStore, HostStore, StoreError, StoreTransaction,
    TransactionalStore, UsersetStore,
};
use crate::db::pool::{get_pool_stats, health_check, PoolStats};
use crate::models::custom_field::{ContextLevel, CustomField};
use crate::models::profile_field::ProfileField;
use crate::models::userset::{CreateUserset, Userset};
use crate::models::userset_assignment::{AssignmentChange, UsersetAssignment};
use crate::models::userset_profile::AutoAssociationRule;
use crate::userset::predicate::MatchPredicate;

/// Channel notified when a user set's enrolments need recomputing
pub const ENROLMENT_CHANNEL: &str = "userset_enrolments";

/// Store backed by a Postgres connection pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

async fn notify_enrolments(conn: &mut PgConnection, userset_id: i64) -> Result<(), StoreError> {
    debug!(userset_id, channel = ENROLMENT_CHANNEL, "Requesting enrolment update");

    sqlx::query("SELECT pg_notify($1, $2)")
        .bind(ENROLMENT_CHANNEL)
        .bind(userset_id.to_string())
        .execute(conn)
        .await?;

    Ok(())
}

#[async_trait]
impl HostStore for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        health_check(&self.pool).await?;
        Ok(())
    }

    async fn program_installed(&self) -> Result<bool, StoreError> {
        let installed: bool =
            sqlx::query_scalar("SELECT to_regclass('public.usersets') IS NOT NULL")
                .fetch_one(&self.pool)
                .await?;

        Ok(installed)
    }

    fn pool_stats(&self) -> Option<PoolStats> {
        Some(get_pool_stats(&self.pool))
    }
}

#[async_trait]
impl FieldStore for PgStore {
    async fn list_custom_fields(
        &self,
        level: ContextLevel,
    ) -> Result<Vec<CustomField>, StoreError> {
        Ok(CustomField::list_for_context(&self.pool, level).await?)
    }

    async fn find_custom_field(
        &self,
        level: ContextLevel,
        id: i64,
    ) -> Result<Option<CustomField>, StoreError> {
        Ok(CustomField::find_in_context(&self.pool, level, id).await?)
    }

    async fn find_profile_field_by_shortname(
        &self,
        shortname: &str,
    ) -> Result<Option<ProfileField>, StoreError> {
        Ok(ProfileField::find_by_shortname(&self.pool, shortname).await?)
    }

    async fn find_profile_field(&self, id: i64) -> Result<Option<ProfileField>, StoreError> {
        Ok(ProfileField::find_by_id(&self.pool, id).await?)
    }
}

#[async_trait]
impl UsersetStore for PgStore {
    async fn find_userset_id_by_name(&self, name: &str) -> Result<Option<i64>, StoreError> {
        Ok(Userset::find_id_by_name(&self.pool, name).await?)
    }

    async fn create_userset(&self, data: CreateUserset) -> Result<Userset, StoreError> {
        Ok(Userset::create(&self.pool, data).await?)
    }
}

#[async_trait]
impl AssociationStore for PgStore {
    async fn list_rules(
        &self,
        userset_id: i64,
        limit: i64,
    ) -> Result<Vec<AutoAssociationRule>, StoreError> {
        Ok(AutoAssociationRule::list_by_userset(&self.pool, userset_id, limit).await?)
    }

    async fn insert_rule(
        &self,
        userset_id: i64,
        field_id: i64,
        value: &str,
    ) -> Result<AutoAssociationRule, StoreError> {
        Ok(AutoAssociationRule::create(&self.pool, userset_id, field_id, value).await?)
    }

    async fn update_rule_value(&self, rule_id: i64, value: &str) -> Result<(), StoreError> {
        AutoAssociationRule::update_value(&self.pool, rule_id, value).await?;
        Ok(())
    }

    async fn delete_rule(&self, rule_id: i64) -> Result<(), StoreError> {
        AutoAssociationRule::delete(&self.pool, rule_id).await?;
        Ok(())
    }

    async fn replace_assignments(
        &self,
        userset_id: i64,
        plugin: &str,
        predicate: &MatchPredicate,
    ) -> Result<AssignmentChange, StoreError> {
        let mut tx = self.pool.begin().await?;
        let change = UsersetAssignment::regenerate(&mut tx, userset_id, plugin, predicate).await?;
        tx.commit().await?;

        Ok(change)
    }
}

#[async_trait]
impl EnrolmentSync for PgStore {
    async fn update_enrolments(&self, userset_id: i64) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        notify_enrolments(&mut conn, userset_id).await
    }
}

#[async_trait]
impl TransactionalStore for PgStore {
    async fn begin<'a>(&'a self) -> Result<Box<dyn StoreTransaction + 'a>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTransaction {
            tx: Mutex::new(Some(tx)),
        }))
    }
}

/// Database transaction serving the store traits
///
/// Notifications sent inside the transaction are delivered on commit only.
/// Dropping it without a commit rolls it back.
pub struct PgTransaction {
    tx: Mutex<Option<Transaction<'static, Postgres>>>,
}

fn finished() -> StoreError {
    StoreError::Unavailable("transaction already finished".to_string())
}

#[async_trait]
impl FieldStore for PgTransaction {
    async fn list_custom_fields(
        &self,
        level: ContextLevel,
    ) -> Result<Vec<CustomField>, StoreError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(finished)?;
        Ok(CustomField::list_for_context(&mut **tx, level).await?)
    }

    async fn find_custom_field(
        &self,
        level: ContextLevel,
        id: i64,
    ) -> Result<Option<CustomField>, StoreError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(finished)?;
        Ok(CustomField::find_in_context(&mut **tx, level, id).await?)
    }

    async fn find_profile_field_by_shortname(
        &self,
        shortname: &str,
    ) -> Result<Option<ProfileField>, StoreError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(finished)?;
        Ok(ProfileField::find_by_shortname(&mut **tx, shortname).await?)
    }

    async fn find_profile_field(&self, id: i64) -> Result<Option<ProfileField>, StoreError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(finished)?;
        Ok(ProfileField::find_by_id(&mut **tx, id).await?)
    }
}

#[async_trait]
impl UsersetStore for PgTransaction {
    async fn find_userset_id_by_name(&self, name: &str) -> Result<Option<i64>, StoreError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(finished)?;
        Ok(Userset::find_id_by_name(&mut **tx, name).await?)
    }

    async fn create_userset(&self, data: CreateUserset) -> Result<Userset, StoreError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(finished)?;
        Ok(Userset::create(&mut **tx, data).await?)
    }
}

#[async_trait]
impl AssociationStore for PgTransaction {
    async fn list_rules(
        &self,
        userset_id: i64,
        limit: i64,
    ) -> Result<Vec<AutoAssociationRule>, StoreError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(finished)?;
        Ok(AutoAssociationRule::list_by_userset(&mut **tx, userset_id, limit).await?)
    }

    async fn insert_rule(
        &self,
        userset_id: i64,
        field_id: i64,
        value: &str,
    ) -> Result<AutoAssociationRule, StoreError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(finished)?;
        Ok(AutoAssociationRule::create(&mut **tx, userset_id, field_id, value).await?)
    }

    async fn update_rule_value(&self, rule_id: i64, value: &str) -> Result<(), StoreError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(finished)?;
        AutoAssociationRule::update_value(&mut **tx, rule_id, value).await?;
        Ok(())
    }

    async fn delete_rule(&self, rule_id: i64) -> Result<(), StoreError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(finished)?;
        AutoAssociationRule::delete(&mut **tx, rule_id).await?;
        Ok(())
    }

    async fn replace_assignments(
        &self,
        userset_id: i64,
        plugin: &str,
        predicate: &MatchPredicate,
    ) -> Result<AssignmentChange, StoreError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(finished)?;
        Ok(UsersetAssignment::regenerate(&mut **tx, userset_id, plugin, predicate).await?)
    }
}

#[async_trait]
impl EnrolmentSync for PgTransaction {
    async fn update_enrolments(&self, userset_id: i64) -> Result<(), StoreError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(finished)?;
        notify_enrolments(&mut **tx, userset_id).await
    }
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn commit(&self) -> Result<(), StoreError> {
        let tx = self.tx.lock().await.take().ok_or_else(finished)?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&self) -> Result<(), StoreError> {
        let tx = self.tx.lock().await.take().ok_or_else(finished)?;
        tx.rollback().await?;
        Ok(())
    }
}
