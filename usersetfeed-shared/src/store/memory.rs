//! In-memory store
//!
//! Keeps every table in one mutex-guarded state, so each trait call is atomic.
//! Besides implementing the store traits it offers seeding helpers and
//! inspectors, and records every write in an operation log that tests use to
//! assert what a flow did (and in which order).
//!
//! A [`MemoryTransaction`] holds the state lock until it finishes and restores
//! a snapshot taken at `begin` unless it is committed.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use tokio::sync::{Mutex, MutexGuard};

use super::{
    AssociationStore, EnrolmentSync, FieldStore, HostStore, StoreError, StoreTransaction,
    TransactionalStore, UsersetStore,
};
use crate::models::custom_field::{ContextLevel, CustomField};
use crate::models::profile_field::ProfileField;
use crate::models::user::{PlatformUser, ProgramUser};
use crate::models::userset::{CreateUserset, Userset};
use crate::models::userset_assignment::{AssignmentChange, UsersetAssignment};
use crate::models::userset_profile::AutoAssociationRule;
use crate::userset::predicate::MatchPredicate;

/// Write recorded by [`MemoryStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOperation {
    UsersetCreated { id: i64 },
    RuleInserted { userset_id: i64, field_id: i64, value: String },
    RuleUpdated { id: i64, value: String },
    RuleDeleted { id: i64 },
    AssignmentsReplaced { userset_id: i64, removed: u64, added: u64 },
    EnrolmentsUpdated { userset_id: i64 },
}

#[derive(Debug, Clone, Default)]
struct State {
    profile_fields: BTreeMap<i64, ProfileField>,
    custom_fields: BTreeMap<i64, (CustomField, Vec<ContextLevel>)>,
    usersets: BTreeMap<i64, Userset>,
    rules: BTreeMap<i64, AutoAssociationRule>,
    assignments: BTreeSet<(i64, i64, String)>,
    program_users: BTreeMap<i64, ProgramUser>,
    platform_users: BTreeMap<i64, PlatformUser>,
    profile_data: BTreeMap<(i64, i64), String>,
    next_id: i64,
    operations: Vec<StoreOperation>,
    // Writes still allowed; None means unlimited
    write_budget: Option<usize>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn check_writable(&mut self) -> Result<(), StoreError> {
        match self.write_budget.as_mut() {
            Some(0) => Err(StoreError::Unavailable("writes are disabled".to_string())),
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Puts back `snapshot`, keeping the current failure settings
    fn restore(&mut self, snapshot: State) {
        let write_budget = self.write_budget;
        *self = snapshot;
        self.write_budget = write_budget;
    }

    fn list_custom_fields(&self, level: ContextLevel) -> Vec<CustomField> {
        self.custom_fields
            .values()
            .filter(|(_, levels)| levels.contains(&level))
            .map(|(field, _)| field.clone())
            .collect()
    }

    fn find_custom_field(&self, level: ContextLevel, id: i64) -> Option<CustomField> {
        self.custom_fields
            .get(&id)
            .filter(|(_, levels)| levels.contains(&level))
            .map(|(field, _)| field.clone())
    }

    fn find_profile_field_by_shortname(&self, shortname: &str) -> Option<ProfileField> {
        self.profile_fields
            .values()
            .find(|field| field.shortname == shortname)
            .cloned()
    }

    fn find_userset_id_by_name(&self, name: &str) -> Option<i64> {
        self.usersets
            .values()
            .find(|userset| userset.name == name)
            .map(|userset| userset.id)
    }

    fn create_userset(&mut self, data: CreateUserset) -> Result<Userset, StoreError> {
        self.check_writable()?;

        let id = self.next_id();
        let userset = Userset {
            id,
            name: data.name,
            display: data.display,
            parent: data.parent,
            custom_fields: Json(data.custom_fields),
            created_at: Utc::now(),
        };

        self.usersets.insert(id, userset.clone());
        self.operations.push(StoreOperation::UsersetCreated { id });

        Ok(userset)
    }

    fn list_rules(&self, userset_id: i64, limit: i64) -> Vec<AutoAssociationRule> {
        self.rules
            .values()
            .filter(|rule| rule.userset_id == userset_id)
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect()
    }

    fn insert_rule(
        &mut self,
        userset_id: i64,
        field_id: i64,
        value: &str,
    ) -> Result<AutoAssociationRule, StoreError> {
        self.check_writable()?;

        let duplicate = self
            .rules
            .values()
            .any(|rule| rule.userset_id == userset_id && rule.field_id == field_id);
        if duplicate {
            return Err(StoreError::Unavailable(format!(
                "rule for field {} already exists on user set {}",
                field_id, userset_id
            )));
        }

        let id = self.next_id();
        let rule = AutoAssociationRule {
            id,
            userset_id,
            field_id,
            value: value.to_string(),
        };
        self.rules.insert(id, rule.clone());
        self.operations.push(StoreOperation::RuleInserted {
            userset_id,
            field_id,
            value: value.to_string(),
        });

        Ok(rule)
    }

    fn update_rule_value(&mut self, rule_id: i64, value: &str) -> Result<(), StoreError> {
        self.check_writable()?;

        if let Some(rule) = self.rules.get_mut(&rule_id) {
            rule.value = value.to_string();
        }
        self.operations.push(StoreOperation::RuleUpdated {
            id: rule_id,
            value: value.to_string(),
        });

        Ok(())
    }

    fn delete_rule(&mut self, rule_id: i64) -> Result<(), StoreError> {
        self.check_writable()?;

        self.rules.remove(&rule_id);
        self.operations.push(StoreOperation::RuleDeleted { id: rule_id });

        Ok(())
    }

    fn replace_assignments(
        &mut self,
        userset_id: i64,
        plugin: &str,
        predicate: &MatchPredicate,
    ) -> Result<AssignmentChange, StoreError> {
        self.check_writable()?;

        let before = self.assignments.len();
        self.assignments
            .retain(|(set, _, tag)| !(*set == userset_id && tag == plugin));
        let removed = (before - self.assignments.len()) as u64;

        let matched: Vec<i64> = self
            .program_users
            .values()
            .filter_map(|user| {
                let account = self
                    .platform_users
                    .values()
                    .find(|account| account.idnumber == user.idnumber)?;
                let profile = &self.profile_data;
                predicate
                    .matches(|field_id| profile.get(&(account.id, field_id)).map(String::as_str))
                    .then_some(user.id)
            })
            .collect();

        let mut added = 0;
        for user_id in matched {
            if self
                .assignments
                .insert((userset_id, user_id, plugin.to_string()))
            {
                added += 1;
            }
        }

        self.operations.push(StoreOperation::AssignmentsReplaced {
            userset_id,
            removed,
            added,
        });

        Ok(AssignmentChange { removed, added })
    }

    fn update_enrolments(&mut self, userset_id: i64) -> Result<(), StoreError> {
        self.check_writable()?;
        self.operations
            .push(StoreOperation::EnrolmentsUpdated { userset_id });
        Ok(())
    }
}

/// Store holding all data in process memory
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<State>,
    program_installed: bool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates an empty store with the program component installed
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            program_installed: true,
        }
    }

    /// Creates an empty store reporting the program component as missing
    pub fn without_program() -> Self {
        Self {
            program_installed: false,
            ..Self::new()
        }
    }

    /// Adds a profile field definition
    pub async fn insert_profile_field(&self, field: ProfileField) {
        let mut state = self.state.lock().await;
        state.profile_fields.insert(field.id, field);
    }

    /// Adds a custom field definition attached to the given context levels
    pub async fn insert_custom_field(&self, field: CustomField, levels: &[ContextLevel]) {
        let mut state = self.state.lock().await;
        state.custom_fields.insert(field.id, (field, levels.to_vec()));
    }

    /// Adds a person to the program roster and the platform, linked by
    /// `idnumber`
    ///
    /// Returns `(program user ID, platform user ID)`.
    pub async fn add_user(&self, idnumber: &str) -> (i64, i64) {
        let mut state = self.state.lock().await;
        let program_id = state.next_id();
        let platform_id = state.next_id();

        state.program_users.insert(
            program_id,
            ProgramUser {
                id: program_id,
                idnumber: idnumber.to_string(),
                username: idnumber.to_lowercase(),
            },
        );
        state.platform_users.insert(
            platform_id,
            PlatformUser {
                id: platform_id,
                idnumber: idnumber.to_string(),
            },
        );

        (program_id, platform_id)
    }

    /// Stores a profile value for a platform user
    pub async fn set_profile_data(&self, platform_user_id: i64, field_id: i64, data: &str) {
        let mut state = self.state.lock().await;
        state
            .profile_data
            .insert((platform_user_id, field_id), data.to_string());
    }

    /// Adds an assignment without recording an operation
    pub async fn add_assignment(&self, userset_id: i64, user_id: i64, plugin: &str) {
        let mut state = self.state.lock().await;
        state
            .assignments
            .insert((userset_id, user_id, plugin.to_string()));
    }

    /// Adds a user set without recording an operation
    pub async fn seed_userset(&self, name: &str) -> i64 {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        state.usersets.insert(
            id,
            Userset {
                id,
                name: name.to_string(),
                display: String::new(),
                parent: 0,
                custom_fields: Json(Default::default()),
                created_at: Utc::now(),
            },
        );
        id
    }

    /// Adds a rule without recording an operation
    pub async fn seed_rule(&self, userset_id: i64, field_id: i64, value: &str) -> i64 {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        state.rules.insert(
            id,
            AutoAssociationRule {
                id,
                userset_id,
                field_id,
                value: value.to_string(),
            },
        );
        id
    }

    /// Makes every subsequent write fail with [`StoreError::Unavailable`]
    pub async fn fail_writes(&self, fail: bool) {
        self.state.lock().await.write_budget = fail.then_some(0);
    }

    /// Lets the next `writes` writes succeed and fails every one after them
    pub async fn fail_writes_after(&self, writes: usize) {
        self.state.lock().await.write_budget = Some(writes);
    }

    /// Returns all user sets, ordered by ID
    pub async fn usersets(&self) -> Vec<Userset> {
        self.state.lock().await.usersets.values().cloned().collect()
    }

    /// Returns the rules of a user set, ordered by ID
    pub async fn rules_for(&self, userset_id: i64) -> Vec<AutoAssociationRule> {
        self.state
            .lock()
            .await
            .rules
            .values()
            .filter(|rule| rule.userset_id == userset_id)
            .cloned()
            .collect()
    }

    /// Returns the assignments of a user set, ordered by user then plugin
    pub async fn assignments_for(&self, userset_id: i64) -> Vec<UsersetAssignment> {
        self.state
            .lock()
            .await
            .assignments
            .iter()
            .filter(|(set, _, _)| *set == userset_id)
            .map(|(set, user, plugin)| UsersetAssignment {
                userset_id: *set,
                user_id: *user,
                plugin: plugin.clone(),
            })
            .collect()
    }

    /// Returns the recorded writes, oldest first
    pub async fn operations(&self) -> Vec<StoreOperation> {
        self.state.lock().await.operations.clone()
    }

    /// Forgets the recorded writes
    pub async fn clear_operations(&self) {
        self.state.lock().await.operations.clear();
    }

    /// Returns the user sets whose enrolments were recomputed, in call order
    pub async fn enrolment_syncs(&self) -> Vec<i64> {
        self.state
            .lock()
            .await
            .operations
            .iter()
            .filter_map(|op| match op {
                StoreOperation::EnrolmentsUpdated { userset_id } => Some(*userset_id),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl HostStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn program_installed(&self) -> Result<bool, StoreError> {
        Ok(self.program_installed)
    }
}

#[async_trait]
impl FieldStore for MemoryStore {
    async fn list_custom_fields(
        &self,
        level: ContextLevel,
    ) -> Result<Vec<CustomField>, StoreError> {
        Ok(self.state.lock().await.list_custom_fields(level))
    }

    async fn find_custom_field(
        &self,
        level: ContextLevel,
        id: i64,
    ) -> Result<Option<CustomField>, StoreError> {
        Ok(self.state.lock().await.find_custom_field(level, id))
    }

    async fn find_profile_field_by_shortname(
        &self,
        shortname: &str,
    ) -> Result<Option<ProfileField>, StoreError> {
        Ok(self.state.lock().await.find_profile_field_by_shortname(shortname))
    }

    async fn find_profile_field(&self, id: i64) -> Result<Option<ProfileField>, StoreError> {
        Ok(self.state.lock().await.profile_fields.get(&id).cloned())
    }
}

#[async_trait]
impl UsersetStore for MemoryStore {
    async fn find_userset_id_by_name(&self, name: &str) -> Result<Option<i64>, StoreError> {
        Ok(self.state.lock().await.find_userset_id_by_name(name))
    }

    async fn create_userset(&self, data: CreateUserset) -> Result<Userset, StoreError> {
        self.state.lock().await.create_userset(data)
    }
}

#[async_trait]
impl AssociationStore for MemoryStore {
    async fn list_rules(
        &self,
        userset_id: i64,
        limit: i64,
    ) -> Result<Vec<AutoAssociationRule>, StoreError> {
        Ok(self.state.lock().await.list_rules(userset_id, limit))
    }

    async fn insert_rule(
        &self,
        userset_id: i64,
        field_id: i64,
        value: &str,
    ) -> Result<AutoAssociationRule, StoreError> {
        self.state.lock().await.insert_rule(userset_id, field_id, value)
    }

    async fn update_rule_value(&self, rule_id: i64, value: &str) -> Result<(), StoreError> {
        self.state.lock().await.update_rule_value(rule_id, value)
    }

    async fn delete_rule(&self, rule_id: i64) -> Result<(), StoreError> {
        self.state.lock().await.delete_rule(rule_id)
    }

    async fn replace_assignments(
        &self,
        userset_id: i64,
        plugin: &str,
        predicate: &MatchPredicate,
    ) -> Result<AssignmentChange, StoreError> {
        self.state
            .lock()
            .await
            .replace_assignments(userset_id, plugin, predicate)
    }
}

#[async_trait]
impl EnrolmentSync for MemoryStore {
    async fn update_enrolments(&self, userset_id: i64) -> Result<(), StoreError> {
        self.state.lock().await.update_enrolments(userset_id)
    }
}

#[async_trait]
impl TransactionalStore for MemoryStore {
    async fn begin<'a>(&'a self) -> Result<Box<dyn StoreTransaction + 'a>, StoreError> {
        let state = self.state.lock().await;
        let snapshot = state.clone();

        Ok(Box::new(MemoryTransaction {
            state: Mutex::new(state),
            snapshot: Mutex::new(Some(snapshot)),
        }))
    }
}

/// Exclusive view of a [`MemoryStore`] whose writes are undone unless
/// committed
pub struct MemoryTransaction<'a> {
    state: Mutex<MutexGuard<'a, State>>,
    // Taken on commit or rollback
    snapshot: Mutex<Option<State>>,
}

impl<'a> Drop for MemoryTransaction<'a> {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.get_mut().take() {
            self.state.get_mut().restore(snapshot);
        }
    }
}

#[async_trait]
impl<'a> FieldStore for MemoryTransaction<'a> {
    async fn list_custom_fields(
        &self,
        level: ContextLevel,
    ) -> Result<Vec<CustomField>, StoreError> {
        Ok(self.state.lock().await.list_custom_fields(level))
    }

    async fn find_custom_field(
        &self,
        level: ContextLevel,
        id: i64,
    ) -> Result<Option<CustomField>, StoreError> {
        Ok(self.state.lock().await.find_custom_field(level, id))
    }

    async fn find_profile_field_by_shortname(
        &self,
        shortname: &str,
    ) -> Result<Option<ProfileField>, StoreError> {
        Ok(self.state.lock().await.find_profile_field_by_shortname(shortname))
    }

    async fn find_profile_field(&self, id: i64) -> Result<Option<ProfileField>, StoreError> {
        Ok(self.state.lock().await.profile_fields.get(&id).cloned())
    }
}

#[async_trait]
impl<'a> UsersetStore for MemoryTransaction<'a> {
    async fn find_userset_id_by_name(&self, name: &str) -> Result<Option<i64>, StoreError> {
        Ok(self.state.lock().await.find_userset_id_by_name(name))
    }

    async fn create_userset(&self, data: CreateUserset) -> Result<Userset, StoreError> {
        self.state.lock().await.create_userset(data)
    }
}

#[async_trait]
impl<'a> AssociationStore for MemoryTransaction<'a> {
    async fn list_rules(
        &self,
        userset_id: i64,
        limit: i64,
    ) -> Result<Vec<AutoAssociationRule>, StoreError> {
        Ok(self.state.lock().await.list_rules(userset_id, limit))
    }

    async fn insert_rule(
        &self,
        userset_id: i64,
        field_id: i64,
        value: &str,
    ) -> Result<AutoAssociationRule, StoreError> {
        self.state.lock().await.insert_rule(userset_id, field_id, value)
    }

    async fn update_rule_value(&self, rule_id: i64, value: &str) -> Result<(), StoreError> {
        self.state.lock().await.update_rule_value(rule_id, value)
    }

    async fn delete_rule(&self, rule_id: i64) -> Result<(), StoreError> {
        self.state.lock().await.delete_rule(rule_id)
    }

    async fn replace_assignments(
        &self,
        userset_id: i64,
        plugin: &str,
        predicate: &MatchPredicate,
    ) -> Result<AssignmentChange, StoreError> {
        self.state
            .lock()
            .await
            .replace_assignments(userset_id, plugin, predicate)
    }
}

#[async_trait]
impl<'a> EnrolmentSync for MemoryTransaction<'a> {
    async fn update_enrolments(&self, userset_id: i64) -> Result<(), StoreError> {
        self.state.lock().await.update_enrolments(userset_id)
    }
}

#[async_trait]
impl<'a> StoreTransaction for MemoryTransaction<'a> {
    async fn commit(&self) -> Result<(), StoreError> {
        match self.snapshot.lock().await.take() {
            Some(_) => Ok(()),
            None => Err(StoreError::Unavailable("transaction already finished".to_string())),
        }
    }

    async fn rollback(&self) -> Result<(), StoreError> {
        let snapshot = self
            .snapshot
            .lock()
            .await
            .take()
            .ok_or_else(|| StoreError::Unavailable("transaction already finished".to_string()))?;
        self.state.lock().await.restore(snapshot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::userset_assignment::PROFILE_PLUGIN;
    use crate::userset::predicate::FieldCondition;

    fn checkbox() -> ProfileField {
        ProfileField {
            id: 3,
            shortname: "testcheckbox".to_string(),
            name: "Test checkbox".to_string(),
            datatype: "checkbox".to_string(),
            param1: None,
            defaultdata: Some("0".to_string()),
        }
    }

    #[tokio::test]
    async fn test_custom_fields_filtered_by_context() {
        let store = MemoryStore::new();
        let field = CustomField {
            id: 5,
            shortname: "testfield".to_string(),
            name: "Test field".to_string(),
            datatype: "text".to_string(),
            multivalued: false,
        };
        store
            .insert_custom_field(field.clone(), &[ContextLevel::Userset])
            .await;

        assert_eq!(
            store.list_custom_fields(ContextLevel::Userset).await.unwrap(),
            vec![field.clone()]
        );
        assert!(store.list_custom_fields(ContextLevel::User).await.unwrap().is_empty());
        assert!(store
            .find_custom_field(ContextLevel::Course, 5)
            .await
            .unwrap()
            .is_none());
        assert_eq!(
            store.find_custom_field(ContextLevel::Userset, 5).await.unwrap(),
            Some(field)
        );
    }

    #[tokio::test]
    async fn test_replace_assignments_keeps_other_plugins() {
        let store = MemoryStore::new();
        store.insert_profile_field(checkbox()).await;
        let userset_id = store.seed_userset("testuserset").await;

        let (checked, checked_account) = store.add_user("U1").await;
        let (unchecked, _) = store.add_user("U2").await;
        store.set_profile_data(checked_account, 3, "1").await;
        store.add_assignment(userset_id, unchecked, "manual").await;
        store.add_assignment(userset_id, unchecked, PROFILE_PLUGIN).await;

        let predicate = MatchPredicate::new().and(FieldCondition::new(3, "1", "0"));
        let change = store
            .replace_assignments(userset_id, PROFILE_PLUGIN, &predicate)
            .await
            .unwrap();

        assert_eq!(change, AssignmentChange { removed: 1, added: 1 });
        let assignments = store.assignments_for(userset_id).await;
        assert_eq!(assignments.len(), 2);
        assert!(assignments
            .iter()
            .any(|a| a.user_id == checked && a.plugin == PROFILE_PLUGIN));
        assert!(assignments
            .iter()
            .any(|a| a.user_id == unchecked && a.plugin == "manual"));
    }

    #[tokio::test]
    async fn test_users_without_platform_account_never_match() {
        let store = MemoryStore::new();
        store.insert_profile_field(checkbox()).await;
        let userset_id = store.seed_userset("testuserset").await;

        let (user_id, _) = store.add_user("U1").await;
        // Rename the platform account so idnumbers no longer line up.
        {
            let mut state = store.state.lock().await;
            for account in state.platform_users.values_mut() {
                account.idnumber = "OTHER".to_string();
            }
        }

        let predicate = MatchPredicate::new().and(FieldCondition::new(3, "0", "0"));
        store
            .replace_assignments(userset_id, PROFILE_PLUGIN, &predicate)
            .await
            .unwrap();

        assert!(!store
            .assignments_for(userset_id)
            .await
            .iter()
            .any(|a| a.user_id == user_id));
    }

    #[tokio::test]
    async fn test_fail_writes() {
        let store = MemoryStore::new();
        store.fail_writes(true).await;

        let result = store.insert_rule(1, 3, "1").await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert!(store.operations().await.is_empty());
    }

    #[tokio::test]
    async fn test_list_rules_respects_limit() {
        let store = MemoryStore::new();
        store.seed_rule(1, 3, "1").await;
        store.seed_rule(1, 8, "x").await;
        store.seed_rule(1, 1, "two").await;
        store.seed_rule(2, 3, "0").await;

        let rules = store.list_rules(1, 2).await.unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].field_id, 3);
        assert_eq!(rules[1].field_id, 8);
    }

    fn create(name: &str) -> CreateUserset {
        CreateUserset {
            name: name.to_string(),
            display: String::new(),
            parent: 0,
            custom_fields: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_committed_transaction_keeps_writes() {
        let store = MemoryStore::new();

        let tx = store.begin().await.unwrap();
        let userset = tx.create_userset(create("testuserset")).await.unwrap();
        tx.insert_rule(userset.id, 3, "1").await.unwrap();
        assert_eq!(
            tx.find_userset_id_by_name("testuserset").await.unwrap(),
            Some(userset.id)
        );
        tx.commit().await.unwrap();
        drop(tx);

        assert_eq!(store.usersets().await.len(), 1);
        assert_eq!(store.rules_for(userset.id).await.len(), 1);
        assert_eq!(store.operations().await.len(), 2);
    }

    #[tokio::test]
    async fn test_rolled_back_transaction_discards_writes() {
        let store = MemoryStore::new();
        let existing = store.seed_userset("existing").await;

        let tx = store.begin().await.unwrap();
        let userset = tx.create_userset(create("testuserset")).await.unwrap();
        tx.insert_rule(userset.id, 3, "1").await.unwrap();
        tx.rollback().await.unwrap();
        assert!(tx.commit().await.is_err());
        drop(tx);

        let usersets = store.usersets().await;
        assert_eq!(usersets.len(), 1);
        assert_eq!(usersets[0].id, existing);
        assert!(store.rules_for(userset.id).await.is_empty());
        assert!(store.operations().await.is_empty());
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let store = MemoryStore::new();

        {
            let tx = store.begin().await.unwrap();
            tx.create_userset(create("testuserset")).await.unwrap();
        }

        assert!(store.usersets().await.is_empty());
        assert!(store.operations().await.is_empty());
    }

    #[tokio::test]
    async fn test_fail_writes_after() {
        let store = MemoryStore::new();
        store.fail_writes_after(1).await;

        let userset = store.create_userset(create("testuserset")).await.unwrap();
        let result = store.insert_rule(userset.id, 3, "1").await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert_eq!(
            store.operations().await,
            vec![StoreOperation::UsersetCreated { id: userset.id }]
        );
    }
}
