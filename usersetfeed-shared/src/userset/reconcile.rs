//! Auto-association reconciliation
//!
//! Brings a user set's stored auto-association rules in line with the
//! requested ones and, when anything changed, regenerates the user set's
//! profile based membership from the new rules.
//!
//! Steps:
//!
//! 1. Build the desired rules, keyed by profile field
//! 2. Load the stored rules (at most [`MAX_RULES`])
//! 3. Delete stored rules whose field is no longer requested
//! 4. Update stored rules whose value changed
//! 5. Insert requested rules that are not stored yet
//! 6. Stop when nothing changed
//! 7. Otherwise replace every [`PROFILE_PLUGIN`] assignment of the set with
//!    the users matching all rules, then ask for enrolments to be recomputed
//!
//! A user matches a rule when their profile data for the field equals the
//! rule value, or when the rule value is the field's default and they have
//! no profile data for the field.
//!
//! Concurrent reconciliation of one user set is not serialized. The store
//! keeps at most one rule per profile field, and the membership is whatever
//! the last regeneration produced, so it matches one caller's rules. Stored
//! rules of both callers may remain. `userset_create` only reconciles the set
//! it just created, inside its own transaction, so it never races this way.

use std::collections::BTreeMap;

use tracing::{debug, info};

use super::autoassociate::ValidatedRule;
use super::predicate::{FieldCondition, MatchPredicate};
use crate::models::userset_assignment::PROFILE_PLUGIN;
use crate::store::{AssociationStore, EnrolmentSync, FieldStore, StoreError};

/// Number of rules a user set can carry
pub const MAX_RULES: i64 = 2;

/// What a reconciliation did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub changed: bool,
    pub rules_inserted: usize,
    pub rules_updated: usize,
    pub rules_deleted: usize,
    pub assignments_removed: u64,
    pub assignments_added: u64,
}

pub struct Reconciler<'a, S>
where
    S: FieldStore + AssociationStore + EnrolmentSync + ?Sized,
{
    store: &'a S,
}

impl<'a, S> Reconciler<'a, S>
where
    S: FieldStore + AssociationStore + EnrolmentSync + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Reconciles the rules of a user set
    ///
    /// Rules with a zero field ID are ignored. When both rules name the same
    /// field, the second one wins.
    ///
    /// # Errors
    ///
    /// Returns the first store error. Earlier writes are only undone when
    /// `store` is a transaction that the caller rolls back
    pub async fn reconcile(
        &self,
        userset_id: i64,
        rule1: Option<&ValidatedRule>,
        rule2: Option<&ValidatedRule>,
    ) -> Result<ReconcileReport, StoreError> {
        let desired: BTreeMap<i64, &str> = [rule1, rule2]
            .into_iter()
            .flatten()
            .filter(|rule| rule.field_id != 0)
            .map(|rule| (rule.field_id, rule.value.as_str()))
            .collect();

        let existing = self.store.list_rules(userset_id, MAX_RULES).await?;
        let mut report = ReconcileReport::default();

        for rule in &existing {
            match desired.get(&rule.field_id) {
                None => {
                    self.store.delete_rule(rule.id).await?;
                    report.rules_deleted += 1;
                }
                Some(value) if *value != rule.value => {
                    self.store.update_rule_value(rule.id, value).await?;
                    report.rules_updated += 1;
                }
                Some(_) => {}
            }
        }

        for (field_id, value) in &desired {
            if !existing.iter().any(|rule| rule.field_id == *field_id) {
                self.store.insert_rule(userset_id, *field_id, value).await?;
                report.rules_inserted += 1;
            }
        }

        report.changed = report.rules_deleted + report.rules_updated + report.rules_inserted > 0;
        if !report.changed {
            debug!(userset_id, "Auto-association rules unchanged");
            return Ok(report);
        }

        let predicate = self.build_predicate(&desired).await?;
        let change = self
            .store
            .replace_assignments(userset_id, PROFILE_PLUGIN, &predicate)
            .await?;
        report.assignments_removed = change.removed;
        report.assignments_added = change.added;

        self.store.update_enrolments(userset_id).await?;

        info!(
            userset_id,
            rules_inserted = report.rules_inserted,
            rules_updated = report.rules_updated,
            rules_deleted = report.rules_deleted,
            assignments_removed = report.assignments_removed,
            assignments_added = report.assignments_added,
            "Auto-association reconciled"
        );

        Ok(report)
    }

    /// Builds the membership predicate of the desired rules
    ///
    /// A field that no longer exists has no default value.
    async fn build_predicate(
        &self,
        desired: &BTreeMap<i64, &str>,
    ) -> Result<MatchPredicate, StoreError> {
        let mut predicate = MatchPredicate::new();
        for (field_id, value) in desired {
            let field = self.store.find_profile_field(*field_id).await?;
            let default_value = field.as_ref().map(|f| f.default_value()).unwrap_or("");
            predicate = predicate.and(FieldCondition::new(*field_id, *value, default_value));
        }
        Ok(predicate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile_field::ProfileField;
    use crate::store::memory::{MemoryStore, StoreOperation};

    fn rule(field_id: i64, value: &str) -> ValidatedRule {
        ValidatedRule {
            field_id,
            value: value.to_string(),
        }
    }

    async fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .insert_profile_field(ProfileField {
                id: 1,
                shortname: "testdropdownwithdefault".to_string(),
                name: "Dropdown".to_string(),
                datatype: "menu".to_string(),
                param1: Some("one\ntwo\nthree".to_string()),
                defaultdata: Some("two".to_string()),
            })
            .await;
        store
            .insert_profile_field(ProfileField {
                id: 3,
                shortname: "testcheckboxdefaultunchecked".to_string(),
                name: "Checkbox".to_string(),
                datatype: "checkbox".to_string(),
                param1: None,
                defaultdata: Some("0".to_string()),
            })
            .await;
        store
    }

    #[tokio::test]
    async fn test_no_rules_is_a_no_op() {
        let store = store().await;
        let reconciler = Reconciler::new(&store);

        let report = reconciler.reconcile(5, None, None).await.unwrap();
        assert_eq!(report, ReconcileReport::default());
        assert!(store.operations().await.is_empty());
    }

    #[tokio::test]
    async fn test_zero_field_id_is_not_set() {
        let store = store().await;
        let reconciler = Reconciler::new(&store);

        let report = reconciler
            .reconcile(5, Some(&rule(0, "x")), None)
            .await
            .unwrap();
        assert!(!report.changed);
        assert!(store.rules_for(5).await.is_empty());
    }

    #[tokio::test]
    async fn test_second_call_is_idempotent() {
        let store = store().await;
        let reconciler = Reconciler::new(&store);
        let r1 = rule(1, "two");
        let r2 = rule(3, "1");

        let first = reconciler.reconcile(5, Some(&r1), Some(&r2)).await.unwrap();
        assert!(first.changed);
        assert_eq!(first.rules_inserted, 2);

        store.clear_operations().await;
        let second = reconciler.reconcile(5, Some(&r1), Some(&r2)).await.unwrap();
        assert!(!second.changed);
        assert!(store.operations().await.is_empty());
    }

    #[tokio::test]
    async fn test_diff_deletes_updates_and_regenerates() {
        let store = store().await;
        let removed = store.seed_rule(5, 1, "two").await;
        let changed = store.seed_rule(5, 3, "0").await;
        let reconciler = Reconciler::new(&store);

        let report = reconciler
            .reconcile(5, Some(&rule(3, "1")), None)
            .await
            .unwrap();

        assert_eq!(report.rules_deleted, 1);
        assert_eq!(report.rules_updated, 1);
        assert_eq!(report.rules_inserted, 0);
        assert_eq!(
            store.operations().await,
            vec![
                StoreOperation::RuleDeleted { id: removed },
                StoreOperation::RuleUpdated {
                    id: changed,
                    value: "1".to_string()
                },
                StoreOperation::AssignmentsReplaced {
                    userset_id: 5,
                    removed: 0,
                    added: 0
                },
                StoreOperation::EnrolmentsUpdated { userset_id: 5 },
            ]
        );
    }

    #[tokio::test]
    async fn test_default_value_matches_users_without_data() {
        let store = store().await;
        let (no_data, _) = store.add_user("U1").await;
        let (explicit_two, account_two) = store.add_user("U2").await;
        let (explicit_three, account_three) = store.add_user("U3").await;
        store.set_profile_data(account_two, 1, "two").await;
        store.set_profile_data(account_three, 1, "three").await;
        let reconciler = Reconciler::new(&store);

        let report = reconciler
            .reconcile(5, Some(&rule(1, "two")), None)
            .await
            .unwrap();
        assert_eq!(report.assignments_added, 2);

        let users: Vec<i64> = store
            .assignments_for(5)
            .await
            .iter()
            .map(|a| a.user_id)
            .collect();
        assert!(users.contains(&no_data));
        assert!(users.contains(&explicit_two));
        assert!(!users.contains(&explicit_three));
    }

    #[tokio::test]
    async fn test_removing_all_rules_clears_profile_assignments() {
        let store = store().await;
        let (user_id, _) = store.add_user("U1").await;
        store.seed_rule(5, 3, "0").await;
        store.add_assignment(5, user_id, PROFILE_PLUGIN).await;
        store.add_assignment(5, user_id, "manual").await;
        let reconciler = Reconciler::new(&store);

        let report = reconciler.reconcile(5, None, None).await.unwrap();
        assert_eq!(report.rules_deleted, 1);
        assert_eq!(report.assignments_removed, 1);
        assert_eq!(report.assignments_added, 0);

        let assignments = store.assignments_for(5).await;
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].plugin, "manual");
        assert_eq!(store.enrolment_syncs().await, vec![5]);
    }

    #[tokio::test]
    async fn test_concurrent_reconciles_leave_consistent_membership() {
        let store = store().await;
        let (menu_user, menu_account) = store.add_user("U1").await;
        let (checked_user, checked_account) = store.add_user("U2").await;
        store.set_profile_data(menu_account, 1, "one").await;
        store.set_profile_data(checked_account, 3, "1").await;

        let menu_rule = rule(1, "one");
        let checkbox_rule = rule(3, "1");
        let first = Reconciler::new(&store);
        let second = Reconciler::new(&store);

        let (menu, checkbox) = tokio::join!(
            first.reconcile(5, Some(&menu_rule), None),
            second.reconcile(5, Some(&checkbox_rule), None),
        );
        assert!(menu.unwrap().changed);
        assert!(checkbox.unwrap().changed);

        let mut fields: Vec<i64> = store
            .rules_for(5)
            .await
            .iter()
            .map(|r| r.field_id)
            .collect();
        let stored = fields.len();
        fields.sort_unstable();
        fields.dedup();
        assert_eq!(fields.len(), stored, "one rule per field");
        assert!(!fields.is_empty());

        let users: Vec<i64> = store
            .assignments_for(5)
            .await
            .iter()
            .filter(|a| a.plugin == PROFILE_PLUGIN)
            .map(|a| a.user_id)
            .collect();
        assert!(
            users == vec![menu_user] || users == vec![checked_user],
            "membership must match one caller's rules: {users:?}"
        );
        assert_eq!(store.enrolment_syncs().await, vec![5, 5]);
    }
}
