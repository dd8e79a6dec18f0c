//! Profile match predicate
//!
//! A [`MatchPredicate`] describes which users qualify for a user set's
//! automatic membership: a conjunction of one [`FieldCondition`] per
//! auto-association rule. A condition is satisfied when the user's profile
//! data for the field equals the rule value, or, when the rule value is the
//! field's default, when the user has no profile data for the field at all.
//!
//! The predicate is independent of any query mechanism. The Postgres store
//! renders it as joins over `profile_data`
//! (see [`crate::models::userset_assignment`]); the memory store evaluates it
//! with [`MatchPredicate::matches`].

use serde::{Deserialize, Serialize};

/// Condition on one profile field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCondition {
    /// Profile field ID
    pub field_id: i64,

    /// Required value
    pub value: String,

    /// Whether `value` is the field's default, so a missing row also matches
    pub is_default: bool,
}

impl FieldCondition {
    /// Builds a condition, comparing `value` with the field's default value
    pub fn new(field_id: i64, value: impl Into<String>, default_value: &str) -> Self {
        let value = value.into();
        let is_default = value == default_value;

        Self {
            field_id,
            value,
            is_default,
        }
    }

    /// Checks a user's stored data for this field (`None` when no row exists)
    pub fn accepts(&self, data: Option<&str>) -> bool {
        match data {
            Some(data) => data == self.value,
            None => self.is_default,
        }
    }
}

/// Conjunction of field conditions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPredicate {
    conditions: Vec<FieldCondition>,
}

impl MatchPredicate {
    /// Creates an empty predicate
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a condition
    pub fn and(mut self, condition: FieldCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Returns the conditions in insertion order
    pub fn conditions(&self) -> &[FieldCondition] {
        &self.conditions
    }

    /// Returns true when the predicate has no conditions
    ///
    /// An empty predicate selects nobody.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Evaluates the predicate for one user
    ///
    /// `lookup` returns the user's stored data for a profile field ID.
    pub fn matches<'a, F>(&self, lookup: F) -> bool
    where
        F: Fn(i64) -> Option<&'a str>,
    {
        !self.is_empty()
            && self
                .conditions
                .iter()
                .all(|condition| condition.accepts(lookup(condition.field_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup<'a>(data: &'a HashMap<i64, String>) -> impl Fn(i64) -> Option<&'a str> + 'a {
        move |field_id| data.get(&field_id).map(String::as_str)
    }

    #[test]
    fn test_default_value_matches_missing_row() {
        let condition = FieldCondition::new(1, "two", "two");
        assert!(condition.is_default);
        assert!(condition.accepts(None));
        assert!(condition.accepts(Some("two")));
        assert!(!condition.accepts(Some("three")));
    }

    #[test]
    fn test_non_default_value_requires_row() {
        let condition = FieldCondition::new(1, "three", "two");
        assert!(!condition.is_default);
        assert!(!condition.accepts(None));
        assert!(condition.accepts(Some("three")));
        assert!(!condition.accepts(Some("two")));
    }

    #[test]
    fn test_empty_predicate_matches_nobody() {
        let predicate = MatchPredicate::new();
        let data = HashMap::new();
        assert!(predicate.is_empty());
        assert!(!predicate.matches(lookup(&data)));
    }

    #[test]
    fn test_conditions_are_combined_with_and() {
        let predicate = MatchPredicate::new()
            .and(FieldCondition::new(3, "1", "0"))
            .and(FieldCondition::new(8, "TEST1234", ""));

        let mut both = HashMap::new();
        both.insert(3, "1".to_string());
        both.insert(8, "TEST1234".to_string());
        assert!(predicate.matches(lookup(&both)));

        let mut only_checkbox = HashMap::new();
        only_checkbox.insert(3, "1".to_string());
        assert!(!predicate.matches(lookup(&only_checkbox)));

        let mut wrong_text = both.clone();
        wrong_text.insert(8, "test1234".to_string());
        assert!(!predicate.matches(lookup(&wrong_text)));
    }
}
