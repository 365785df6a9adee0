//! ---
//! acm_section: "02-policy-model"
//! acm_subsection: "module"
//! acm_type: "source"
//! acm_scope: "code"
//! acm_description: "Rule index mapping canonical keys to policy positions."
//! acm_version: "v0.0.0-prealpha"
//! acm_owner: "tbd"
//! ---
use std::collections::HashMap;

use crate::rule::{Rule, RuleKey};

/// Mapping from canonical rule key to the rule's position in its policy list.
///
/// The index knows nothing about priorities or roles; the owning
/// [`Assertion`](crate::Assertion) keeps it in lock-step with the rule list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleIndex {
    positions: HashMap<RuleKey, usize>,
}

impl RuleIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index for an ordered rule list.
    pub fn from_policy(policy: &[Rule]) -> Self {
        let mut index = Self::new();
        index.rebuild(policy);
        index
    }

    /// Number of indexed rules.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Whether the rule is indexed.
    pub fn contains(&self, rule: &[String]) -> bool {
        self.positions.contains_key(rule)
    }

    /// Position of the rule, if indexed.
    pub fn position(&self, rule: &[String]) -> Option<usize> {
        self.positions.get(rule).copied()
    }

    /// Point the rule's key at `position`, inserting the key when missing.
    ///
    /// Returns the previous position.
    pub fn set_position(&mut self, rule: &[String], position: usize) -> Option<usize> {
        match self.positions.get_mut(rule) {
            Some(slot) => Some(std::mem::replace(slot, position)),
            None => {
                self.positions.insert(RuleKey::new(rule), position);
                None
            }
        }
    }

    /// Drop the rule's key, returning the position it held.
    pub fn remove(&mut self, rule: &[String]) -> Option<usize> {
        self.positions.remove(rule)
    }

    /// Re-key every rule from `start` to the end of `policy` with its current position.
    pub fn reindex_from(&mut self, policy: &[Rule], start: usize) {
        for (position, rule) in policy.iter().enumerate().skip(start) {
            self.set_position(rule, position);
        }
    }

    /// Discard all keys.
    pub fn clear(&mut self) {
        self.positions.clear();
    }

    /// Replace the index content with the keys of `policy`.
    pub fn rebuild(&mut self, policy: &[Rule]) {
        self.positions.clear();
        self.positions.reserve(policy.len());
        for (position, rule) in policy.iter().enumerate() {
            self.positions.insert(RuleKey::new(rule), position);
        }
    }

    /// Iterate over `(key, position)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&RuleKey, usize)> {
        self.positions.iter().map(|(key, position)| (key, *position))
    }

    /// Check the index is an exact bijection onto `policy`.
    pub fn is_consistent_with(&self, policy: &[Rule]) -> bool {
        self.positions.len() == policy.len()
            && policy
                .iter()
                .enumerate()
                .all(|(position, rule)| self.position(rule) == Some(position))
    }
}
