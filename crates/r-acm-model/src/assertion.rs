//! ---
//! acm_section: "02-policy-model"
//! acm_subsection: "module"
//! acm_type: "source"
//! acm_scope: "code"
//! acm_description: "Per rule type policy store with index and priority ordering."
//! acm_version: "v0.0.0-prealpha"
//! acm_owner: "tbd"
//! ---
use std::collections::HashMap;

use indexmap::IndexSet;

use crate::errors::{ModelError, Result};
use crate::index::RuleIndex;
use crate::rule::Rule;

pub use r_acm_common::config::{GROUPING_SECTION, POLICY_SECTION};

/// Well-known field whose integer value orders permission rules.
pub const PRIORITY_FIELD: &str = "priority";

/// Schema, ordered rules, and rule index for one (section, rule type).
///
/// Every mutation keeps the index an exact bijection onto the rule list. For
/// permission rule types that declare a `priority` field, rules with an integer
/// priority stay sorted ascending; rules whose priority does not parse are
/// appended where they land and are exempt from ordering.
#[derive(Debug, Clone)]
pub struct Assertion {
    section: String,
    ptype: String,
    tokens: Vec<String>,
    params: Vec<String>,
    field_index_map: HashMap<String, usize>,
    policy: Vec<Rule>,
    index: RuleIndex,
}

impl Assertion {
    /// Create an empty assertion with the declared field names.
    pub fn new(section: impl Into<String>, ptype: impl Into<String>, tokens: Vec<String>) -> Self {
        let mut field_index_map = HashMap::with_capacity(tokens.len());
        for (column, token) in tokens.iter().enumerate() {
            field_index_map.entry(token.clone()).or_insert(column);
        }
        Self {
            section: section.into(),
            ptype: ptype.into(),
            tokens,
            params: Vec::new(),
            field_index_map,
            policy: Vec::new(),
            index: RuleIndex::new(),
        }
    }

    /// Declare condition parameter names carried after the link fields of grouping rules.
    pub fn with_params(mut self, params: Vec<String>) -> Self {
        self.params = params;
        self
    }

    /// Section this assertion belongs to.
    pub fn section(&self) -> &str {
        &self.section
    }

    /// Rule type identifier.
    pub fn ptype(&self) -> &str {
        &self.ptype
    }

    /// Declared field names.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Declared condition parameter names.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Rules in evaluation order.
    pub fn policy(&self) -> &[Rule] {
        &self.policy
    }

    /// Rule index backing existence checks.
    pub fn index(&self) -> &RuleIndex {
        &self.index
    }

    /// Number of stored rules.
    pub fn len(&self) -> usize {
        self.policy.len()
    }

    /// Whether no rule is stored.
    pub fn is_empty(&self) -> bool {
        self.policy.is_empty()
    }

    /// Whether this assertion holds grouping rules.
    pub fn is_grouping(&self) -> bool {
        self.section == GROUPING_SECTION
    }

    /// Column of a declared field.
    pub fn field_index(&self, field: &str) -> Option<usize> {
        self.field_index_map.get(field).copied()
    }

    /// Column driving priority order, only for permission rule types.
    pub fn priority_index(&self) -> Option<usize> {
        if self.section == POLICY_SECTION {
            self.field_index(PRIORITY_FIELD)
        } else {
            None
        }
    }

    /// Check the rule length against the declared schema.
    ///
    /// Grouping rules may carry trailing fields beyond the declared tokens;
    /// every other section requires an exact match.
    pub fn check_arity(&self, rule: &[String]) -> Result<()> {
        let expected = self.tokens.len();
        let valid = if self.is_grouping() {
            rule.len() >= expected
        } else {
            rule.len() == expected
        };
        if valid {
            Ok(())
        } else {
            Err(ModelError::ArityMismatch {
                expected,
                actual: rule.len(),
                rule: rule.to_vec(),
            })
        }
    }

    /// Whether the rule is stored.
    pub fn contains(&self, rule: &[String]) -> bool {
        self.index.contains(rule)
    }

    /// Whether any of the rules is stored.
    pub fn contains_any(&self, rules: &[Rule]) -> bool {
        rules.iter().any(|rule| self.index.contains(rule))
    }

    /// Add a rule unless it is already stored. Returns whether it was inserted.
    pub fn add(&mut self, rule: Rule) -> bool {
        if self.index.contains(&rule) {
            return false;
        }
        self.push_rule(rule);
        true
    }

    /// Add every rule not already stored, returning the inserted rules in input order.
    pub fn add_with_affected(&mut self, rules: &[Rule]) -> Vec<Rule> {
        let mut affected = Vec::new();
        for rule in rules {
            if self.index.contains(rule) {
                continue;
            }
            affected.push(rule.clone());
            self.push_rule(rule.clone());
        }
        affected
    }

    /// Append the rule, moving it ahead of higher-priority rules when ordering applies.
    fn push_rule(&mut self, rule: Rule) {
        let ordering = self
            .priority_index()
            .and_then(|column| parse_priority(&rule, column).map(|value| (column, value)));

        let mut position = self.policy.len();
        self.index.set_position(&rule, position);
        self.policy.push(rule);

        if let Some((column, inserted)) = ordering {
            while position > 0 {
                // unparsable neighbours are exempt and get shifted like higher ones
                if let Some(previous) = parse_priority(&self.policy[position - 1], column) {
                    if previous <= inserted {
                        break;
                    }
                }
                self.policy.swap(position - 1, position);
                self.index.set_position(&self.policy[position], position);
                position -= 1;
            }
            self.index.set_position(&self.policy[position], position);
        }
    }

    /// Replace `old` with `new` in place.
    ///
    /// Returns false without changes when `old` is absent, or when `new` is
    /// already stored at another position.
    pub fn update(&mut self, old: &[String], new: Rule) -> bool {
        let Some(position) = self.index.position(old) else {
            return false;
        };
        if old != new.as_slice() && self.index.contains(&new) {
            return false;
        }
        self.replace_at(position, new);
        true
    }

    /// Replace each `olds[i]` with `news[i]`, all or nothing.
    ///
    /// When a pair cannot be applied every earlier replacement of this call is
    /// undone and `Ok(false)` is returned.
    pub fn update_batch(&mut self, olds: &[Rule], news: &[Rule]) -> Result<bool> {
        if olds.len() != news.len() {
            return Err(ModelError::BatchLengthMismatch {
                old: olds.len(),
                new: news.len(),
            });
        }

        let mut journal = UpdateJournal::new(self);
        for (old, new) in olds.iter().zip(news) {
            if !journal.replace(old, new.clone()) {
                return Ok(false);
            }
        }
        journal.commit();
        Ok(true)
    }

    fn replace_at(&mut self, position: usize, rule: Rule) -> Rule {
        let previous = std::mem::replace(&mut self.policy[position], rule);
        self.index.remove(&previous);
        self.index.set_position(&self.policy[position], position);
        previous
    }

    /// Remove one rule, keeping the relative order of the rest.
    pub fn remove(&mut self, rule: &[String]) -> bool {
        self.remove_rule(rule).is_some()
    }

    /// Remove every stored rule of the input, returning the removed rules in input order.
    pub fn remove_with_affected(&mut self, rules: &[Rule]) -> Vec<Rule> {
        rules
            .iter()
            .filter_map(|rule| self.remove_rule(rule))
            .collect()
    }

    fn remove_rule(&mut self, rule: &[String]) -> Option<Rule> {
        let position = self.index.remove(rule)?;
        let removed = self.policy.remove(position);
        self.index.reindex_from(&self.policy, position);
        Some(removed)
    }

    /// Remove rules matching the field filter.
    ///
    /// Returns whether anything changed and the removed rules in stored order.
    pub fn remove_filtered<S: AsRef<str>>(
        &mut self,
        field_index: usize,
        field_values: &[S],
    ) -> (bool, Vec<Rule>) {
        if !self
            .policy
            .iter()
            .any(|rule| matches_filter(rule, field_index, field_values))
        {
            return (false, Vec::new());
        }

        let (removed, kept): (Vec<Rule>, Vec<Rule>) = std::mem::take(&mut self.policy)
            .into_iter()
            .partition(|rule| matches_filter(rule, field_index, field_values));
        self.policy = kept;
        self.index.rebuild(&self.policy);
        (true, removed)
    }

    /// Rules matching the field filter, in stored order.
    pub fn filtered<S: AsRef<str>>(&self, field_index: usize, field_values: &[S]) -> Vec<Rule> {
        self.policy
            .iter()
            .filter(|rule| matches_filter(rule, field_index, field_values))
            .cloned()
            .collect()
    }

    /// Distinct values of one column, in first-seen order.
    pub fn values_for_field(&self, field_index: usize) -> Vec<String> {
        let values: IndexSet<&str> = self
            .policy
            .iter()
            .filter_map(|rule| rule.get(field_index))
            .map(String::as_str)
            .collect();
        values.into_iter().map(str::to_owned).collect()
    }

    /// Drop every rule, keeping the schema.
    pub fn clear(&mut self) {
        self.policy.clear();
        self.index.clear();
    }

    /// Whether the rule index exactly mirrors the rule list.
    pub fn is_consistent(&self) -> bool {
        self.index.is_consistent_with(&self.policy)
    }
}

/// Undo log for [`Assertion::update_batch`].
///
/// Dropping an uncommitted journal restores every replaced rule in reverse
/// order, which also covers unwinding out of the batch.
struct UpdateJournal<'a> {
    assertion: &'a mut Assertion,
    applied: Vec<(usize, Rule)>,
    committed: bool,
}

impl<'a> UpdateJournal<'a> {
    fn new(assertion: &'a mut Assertion) -> Self {
        Self {
            assertion,
            applied: Vec::new(),
            committed: false,
        }
    }

    fn replace(&mut self, old: &[String], new: Rule) -> bool {
        let Some(position) = self.assertion.index.position(old) else {
            return false;
        };
        if old != new.as_slice() && self.assertion.index.contains(&new) {
            return false;
        }
        let previous = self.assertion.replace_at(position, new);
        self.applied.push((position, previous));
        true
    }

    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for UpdateJournal<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        while let Some((position, previous)) = self.applied.pop() {
            self.assertion.replace_at(position, previous);
        }
        debug_assert!(self.assertion.is_consistent(), "rollback left index inconsistent");
    }
}

fn parse_priority(rule: &[String], column: usize) -> Option<i64> {
    rule.get(column)?.parse().ok()
}

/// Empty filter values match anything; rules without the column never match a
/// non-empty value.
fn matches_filter<S: AsRef<str>>(rule: &[String], field_index: usize, field_values: &[S]) -> bool {
    field_values.iter().enumerate().all(|(offset, value)| {
        let value = value.as_ref();
        value.is_empty()
            || rule
                .get(field_index + offset)
                .is_some_and(|field| field == value)
    })
}
