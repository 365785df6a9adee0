//! ---
//! acm_section: "02-policy-model"
//! acm_subsection: "module"
//! acm_type: "source"
//! acm_scope: "code"
//! acm_description: "Section and rule type registry over the policy stores."
//! acm_version: "v0.0.0-prealpha"
//! acm_owner: "tbd"
//! ---
use std::fmt;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use r_acm_common::config::ModelDefinition;
use r_acm_logging::{
    acm_debug, acm_error, acm_info, log_model_event, LogContext, ModelEventOutcome,
    NoopPolicyLogger, PolicyLogger, PolicySnapshot,
};

use crate::assertion::{Assertion, GROUPING_SECTION, POLICY_SECTION};
use crate::errors::{ModelError, Result};
use crate::metrics::PolicyMetrics;
use crate::role_links::RoleHierarchyBuilder;
use crate::role_manager::{ConditionalRoleManagerMap, PolicyOp, RoleManagerMap};
use crate::rule::Rule;

/// Registry of assertions keyed by section, then rule type.
///
/// The model performs no locking of its own; wrap it in a
/// [`SharedModel`](crate::SharedModel) to share it between threads.
#[derive(Clone)]
pub struct Model {
    sections: IndexMap<String, IndexMap<String, Assertion>>,
    logger: Arc<dyn PolicyLogger>,
    metrics: Option<PolicyMetrics>,
}

impl Default for Model {
    fn default() -> Self {
        Self {
            sections: IndexMap::new(),
            logger: Arc::new(NoopPolicyLogger),
            metrics: None,
        }
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("sections", &self.sections)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

impl Model {
    /// Create an empty model with no logger and no metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every rule type of a model definition.
    pub fn from_definition(definition: &ModelDefinition) -> Result<Self> {
        let mut model = Self::new();
        for (section, ptype, def) in definition.assertions() {
            model.register(
                Assertion::new(section, ptype, def.tokens.clone()).with_params(def.params.clone()),
            )?;
        }
        Ok(model)
    }

    /// Replace the policy logger.
    pub fn with_logger(mut self, logger: Arc<dyn PolicyLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Attach mutation counters.
    pub fn with_metrics(mut self, metrics: PolicyMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Replace the policy logger in place.
    pub fn set_logger(&mut self, logger: Arc<dyn PolicyLogger>) {
        self.logger = logger;
    }

    /// Attached mutation counters.
    pub fn metrics(&self) -> Option<&PolicyMetrics> {
        self.metrics.as_ref()
    }

    /// Register an empty assertion. Fails if its (section, rule type) already exists.
    pub fn register(&mut self, assertion: Assertion) -> Result<()> {
        let ptypes = self
            .sections
            .entry(assertion.section().to_owned())
            .or_default();
        if ptypes.contains_key(assertion.ptype()) {
            return Err(ModelError::DuplicateAssertion {
                section: assertion.section().to_owned(),
                ptype: assertion.ptype().to_owned(),
            });
        }
        ptypes.insert(assertion.ptype().to_owned(), assertion);
        Ok(())
    }

    /// Register a rule type with the given field names.
    pub fn add_def<S: AsRef<str>>(
        &mut self,
        section: &str,
        ptype: &str,
        tokens: &[S],
    ) -> Result<()> {
        let tokens = tokens.iter().map(|t| t.as_ref().to_owned()).collect();
        self.register(Assertion::new(section, ptype, tokens))
    }

    /// Registered section names.
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Assertions of one section, empty when the section is unknown.
    pub fn assertions(&self, section: &str) -> impl Iterator<Item = &Assertion> {
        self.sections
            .get(section)
            .into_iter()
            .flat_map(|ptypes| ptypes.values())
    }

    /// Resolve a registered assertion.
    pub fn assertion(&self, section: &str, ptype: &str) -> Result<&Assertion> {
        self.sections
            .get(section)
            .and_then(|ptypes| ptypes.get(ptype))
            .ok_or_else(|| unknown_assertion(section, ptype))
    }

    fn assertion_mut(&mut self, section: &str, ptype: &str) -> Result<&mut Assertion> {
        self.sections
            .get_mut(section)
            .and_then(|ptypes| ptypes.get_mut(ptype))
            .ok_or_else(|| unknown_assertion(section, ptype))
    }

    /// Whether every assertion's index mirrors its rule list.
    pub fn is_consistent(&self) -> bool {
        self.sections
            .values()
            .flat_map(IndexMap::values)
            .all(Assertion::is_consistent)
    }

    /// Whether the rule is stored.
    pub fn has_policy(&self, section: &str, ptype: &str, rule: &[String]) -> Result<bool> {
        Ok(self.assertion(section, ptype)?.contains(rule))
    }

    /// Like [`Model::has_policy`], failing when the rule length contradicts the schema.
    pub fn has_policy_strict(&self, section: &str, ptype: &str, rule: &[String]) -> Result<bool> {
        let assertion = self.assertion(section, ptype)?;
        assertion.check_arity(rule)?;
        Ok(assertion.contains(rule))
    }

    /// Whether any of the rules is stored.
    pub fn has_policies(&self, section: &str, ptype: &str, rules: &[Rule]) -> Result<bool> {
        Ok(self.assertion(section, ptype)?.contains_any(rules))
    }

    /// Add one rule unless already stored. Returns whether it was inserted.
    pub fn add_policy(&mut self, section: &str, ptype: &str, rule: Rule) -> Result<bool> {
        let added = self.assertion_mut(section, ptype)?.add(rule);
        if added {
            self.record(|m| m.add_rules(1));
        }
        Ok(added)
    }

    /// Add rules not already stored. Returns whether anything was inserted.
    pub fn add_policies(&mut self, section: &str, ptype: &str, rules: &[Rule]) -> Result<bool> {
        Ok(!self
            .add_policies_with_affected(section, ptype, rules)?
            .is_empty())
    }

    /// Add rules not already stored, returning the inserted ones in input order.
    pub fn add_policies_with_affected(
        &mut self,
        section: &str,
        ptype: &str,
        rules: &[Rule],
    ) -> Result<Vec<Rule>> {
        let affected = self.assertion_mut(section, ptype)?.add_with_affected(rules);
        acm_debug!(
            context = LogContext::assertion(section, ptype)
                .with_operation("add_policies")
                .with_rules(affected.len()),
            "{} of {} rules added",
            affected.len(),
            rules.len()
        );
        self.record(|m| m.add_rules(affected.len()));
        Ok(affected)
    }

    /// Remove one rule. Returns whether it was stored.
    pub fn remove_policy(&mut self, section: &str, ptype: &str, rule: &[String]) -> Result<bool> {
        let removed = self.assertion_mut(section, ptype)?.remove(rule);
        if removed {
            self.record(|m| m.remove_rules(1));
        }
        Ok(removed)
    }

    /// Remove stored rules. Returns whether anything was removed.
    pub fn remove_policies(&mut self, section: &str, ptype: &str, rules: &[Rule]) -> Result<bool> {
        Ok(!self
            .remove_policies_with_affected(section, ptype, rules)?
            .is_empty())
    }

    /// Remove stored rules, returning the removed ones in input order.
    pub fn remove_policies_with_affected(
        &mut self,
        section: &str,
        ptype: &str,
        rules: &[Rule],
    ) -> Result<Vec<Rule>> {
        let affected = self
            .assertion_mut(section, ptype)?
            .remove_with_affected(rules);
        acm_debug!(
            context = LogContext::assertion(section, ptype)
                .with_operation("remove_policies")
                .with_rules(affected.len()),
            "{} of {} rules removed",
            affected.len(),
            rules.len()
        );
        self.record(|m| m.remove_rules(affected.len()));
        Ok(affected)
    }

    /// Remove rules matching a field filter starting at `field_index`.
    ///
    /// Empty filter values match any field. Returns whether anything changed
    /// and the removed rules.
    pub fn remove_filtered_policy<S: AsRef<str>>(
        &mut self,
        section: &str,
        ptype: &str,
        field_index: usize,
        field_values: &[S],
    ) -> Result<(bool, Vec<Rule>)> {
        let (changed, removed) = self
            .assertion_mut(section, ptype)?
            .remove_filtered(field_index, field_values);
        acm_debug!(
            context = LogContext::assertion(section, ptype)
                .with_operation("remove_filtered_policy")
                .with_rules(removed.len()),
            "filtered removal from field {}",
            field_index
        );
        self.record(|m| m.remove_rules(removed.len()));
        Ok((changed, removed))
    }

    /// Replace one rule in place. `Ok(false)` when `old` is absent.
    pub fn update_policy(
        &mut self,
        section: &str,
        ptype: &str,
        old: &[String],
        new: Rule,
    ) -> Result<bool> {
        let updated = self.assertion_mut(section, ptype)?.update(old, new);
        if updated {
            self.record(|m| m.update_rules(1));
        }
        Ok(updated)
    }

    /// Replace rules pairwise, all or nothing. `Ok(false)` leaves the store untouched.
    pub fn update_policies(
        &mut self,
        section: &str,
        ptype: &str,
        olds: &[Rule],
        news: &[Rule],
    ) -> Result<bool> {
        let context = LogContext::assertion(section, ptype)
            .with_operation("update_policies")
            .with_rules(olds.len());
        let updated = match self.assertion_mut(section, ptype)?.update_batch(olds, news) {
            Ok(updated) => updated,
            Err(err) => {
                acm_error!(context = context, "batch update rejected: {}", err);
                return Err(err);
            }
        };
        if updated {
            acm_debug!(context = context, "batch update applied");
            self.record(|m| m.update_rules(olds.len()));
        } else {
            acm_info!(context = context, "batch update rolled back");
        }
        Ok(updated)
    }

    /// Owned copy of every rule of a rule type, in stored order.
    pub fn get_policy(&self, section: &str, ptype: &str) -> Result<Vec<Rule>> {
        Ok(self.policy(section, ptype)?.to_vec())
    }

    /// Borrowed view of every rule of a rule type.
    pub fn policy(&self, section: &str, ptype: &str) -> Result<&[Rule]> {
        Ok(self.assertion(section, ptype)?.policy())
    }

    /// Rules matching a field filter starting at `field_index`.
    pub fn get_filtered_policy<S: AsRef<str>>(
        &self,
        section: &str,
        ptype: &str,
        field_index: usize,
        field_values: &[S],
    ) -> Result<Vec<Rule>> {
        Ok(self
            .assertion(section, ptype)?
            .filtered(field_index, field_values))
    }

    /// Distinct values of one column of a rule type.
    pub fn values_for_field(
        &self,
        section: &str,
        ptype: &str,
        field_index: usize,
    ) -> Result<Vec<String>> {
        Ok(self.assertion(section, ptype)?.values_for_field(field_index))
    }

    /// Distinct values of one column across every rule type of a section.
    pub fn values_for_field_all_types(&self, section: &str, field_index: usize) -> Vec<String> {
        let values: IndexSet<String> = self
            .assertions(section)
            .flat_map(|assertion| assertion.values_for_field(field_index))
            .collect();
        values.into_iter().collect()
    }

    /// Distinct values of a named field across every rule type of a section
    /// that declares it.
    pub fn values_for_field_all_types_by_name(&self, section: &str, field: &str) -> Vec<String> {
        let values: IndexSet<String> = self
            .assertions(section)
            .filter_map(|assertion| {
                assertion
                    .field_index(field)
                    .map(|column| assertion.values_for_field(column))
            })
            .flatten()
            .collect();
        values.into_iter().collect()
    }

    /// Column of a declared field.
    pub fn field_index(&self, section: &str, ptype: &str, field: &str) -> Result<usize> {
        self.assertion(section, ptype)?
            .field_index(field)
            .ok_or_else(|| ModelError::FieldNotFound {
                ptype: ptype.to_owned(),
                field: field.to_owned(),
            })
    }

    /// Drop every permission and grouping rule, keeping the schemas.
    pub fn clear_policy(&mut self) {
        for section in [POLICY_SECTION, GROUPING_SECTION] {
            if let Some(ptypes) = self.sections.get_mut(section) {
                ptypes.values_mut().for_each(Assertion::clear);
            }
        }
        acm_debug!("policy cleared");
    }

    /// Permission and grouping rules keyed by rule type.
    ///
    /// A rule type name used in both sections gets the permission rules
    /// followed by the grouping rules.
    pub fn policy_snapshot(&self) -> PolicySnapshot {
        let mut snapshot = PolicySnapshot::new();
        for section in [POLICY_SECTION, GROUPING_SECTION] {
            for assertion in self.assertions(section) {
                snapshot
                    .entry(assertion.ptype().to_owned())
                    .or_default()
                    .extend(assertion.policy().iter().cloned());
            }
        }
        snapshot
    }

    /// Hand the policy snapshot to the logger when it is enabled.
    pub fn print_policy(&self) {
        if !self.logger.is_enabled() {
            return;
        }
        self.logger.log_policy(&self.policy_snapshot());
    }

    /// Rebuild the role hierarchy of every grouping rule type with a bound manager.
    pub fn build_role_links(&self, rm_map: &RoleManagerMap) -> Result<()> {
        self.print_policy();
        for assertion in self.assertions(GROUPING_SECTION) {
            let Some(rm) = rm_map.get(assertion.ptype()) else {
                continue;
            };
            let outcome = RoleHierarchyBuilder::for_assertion(assertion)
                .and_then(|builder| builder.rebuild(rm.as_ref(), assertion.policy()));
            self.report_rebuild(assertion, &outcome);
            outcome?;
        }
        Ok(())
    }

    /// Rebuild the conditional role hierarchy of every grouping rule type with a bound manager.
    pub fn build_conditional_role_links(
        &self,
        cond_rm_map: &ConditionalRoleManagerMap,
    ) -> Result<()> {
        self.print_policy();
        for assertion in self.assertions(GROUPING_SECTION) {
            let Some(rm) = cond_rm_map.get(assertion.ptype()) else {
                continue;
            };
            let outcome = RoleHierarchyBuilder::for_assertion(assertion)
                .and_then(|builder| builder.rebuild_conditional(rm.as_ref(), assertion.policy()));
            self.report_rebuild(assertion, &outcome);
            outcome?;
        }
        Ok(())
    }

    /// Patch the role hierarchy with the rules a store operation affected.
    ///
    /// Only grouping rule types with a bound manager are touched; anything else
    /// is a no-op.
    pub fn build_incremental_role_links(
        &self,
        rm_map: &RoleManagerMap,
        op: PolicyOp,
        section: &str,
        ptype: &str,
        rules: &[Rule],
    ) -> Result<()> {
        if section != GROUPING_SECTION {
            return Ok(());
        }
        let Some(rm) = rm_map.get(ptype) else {
            return Ok(());
        };
        let assertion = self.assertion(section, ptype)?;
        RoleHierarchyBuilder::for_assertion(assertion)?.apply(rm.as_ref(), op, rules)?;
        acm_debug!(
            context = LogContext::assertion(section, ptype)
                .with_operation(op.as_str())
                .with_rules(rules.len()),
            "role links patched"
        );
        Ok(())
    }

    /// Conditional counterpart of [`Model::build_incremental_role_links`].
    pub fn build_incremental_conditional_role_links(
        &self,
        cond_rm_map: &ConditionalRoleManagerMap,
        op: PolicyOp,
        section: &str,
        ptype: &str,
        rules: &[Rule],
    ) -> Result<()> {
        if section != GROUPING_SECTION {
            return Ok(());
        }
        let Some(rm) = cond_rm_map.get(ptype) else {
            return Ok(());
        };
        let assertion = self.assertion(section, ptype)?;
        RoleHierarchyBuilder::for_assertion(assertion)?
            .apply_conditional(rm.as_ref(), op, rules)?;
        acm_debug!(
            context = LogContext::assertion(section, ptype)
                .with_operation(op.as_str())
                .with_rules(rules.len()),
            "conditional role links patched"
        );
        Ok(())
    }

    fn report_rebuild(&self, assertion: &Assertion, outcome: &Result<()>) {
        let context = LogContext::assertion(assertion.section(), assertion.ptype())
            .with_operation("build_role_links")
            .with_rules(assertion.len());
        match outcome {
            Ok(()) => {
                self.record(PolicyMetrics::inc_role_rebuild);
                log_model_event(
                    Some(&context),
                    "role_links.rebuild",
                    "role links rebuilt",
                    ModelEventOutcome::Success,
                );
            }
            Err(err) => acm_error!(context = context, "role link rebuild failed: {}", err),
        }
    }

    fn record(&self, update: impl FnOnce(&PolicyMetrics)) {
        if let Some(metrics) = &self.metrics {
            update(metrics);
        }
    }
}

fn unknown_assertion(section: &str, ptype: &str) -> ModelError {
    ModelError::UnknownAssertion {
        section: section.to_owned(),
        ptype: ptype.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role_manager::{RoleManager, RoleManagerError};
    use crate::rule::to_rule;
    use parking_lot::Mutex;
    use prometheus::Registry;
    use r_acm_logging::CapturingPolicyLogger;
    use std::collections::HashMap;
    use std::io;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture_logs(run: impl FnOnce()) -> String {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        tracing::subscriber::with_default(subscriber, run);
        let bytes = logs.0.lock().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[derive(Default)]
    struct LinkSet {
        links: Mutex<Vec<(String, String, Vec<String>)>>,
        clears: Mutex<usize>,
    }

    impl RoleManager for LinkSet {
        fn clear(&self) -> std::result::Result<(), RoleManagerError> {
            self.links.lock().clear();
            *self.clears.lock() += 1;
            Ok(())
        }

        fn add_link(
            &self,
            subject: &str,
            role: &str,
            domains: &[String],
        ) -> std::result::Result<(), RoleManagerError> {
            self.links
                .lock()
                .push((subject.into(), role.into(), domains.to_vec()));
            Ok(())
        }

        fn delete_link(
            &self,
            subject: &str,
            role: &str,
            domains: &[String],
        ) -> std::result::Result<(), RoleManagerError> {
            let mut links = self.links.lock();
            let position = links
                .iter()
                .position(|(s, r, d)| s == subject && r == role && d.as_slice() == domains)
                .ok_or_else(|| RoleManagerError::LinkNotFound {
                    subject: subject.into(),
                    role: role.into(),
                })?;
            links.remove(position);
            Ok(())
        }
    }

    fn rbac_model() -> Model {
        let definition = ModelDefinition::new()
            .with_assertion("p", "p", &["sub", "obj", "act"])
            .with_assertion("p", "p2", &["sub", "act"])
            .with_assertion("g", "g", &["_", "_"])
            .with_assertion("g", "g2", &["_", "_"]);
        Model::from_definition(&definition).unwrap()
    }

    fn rm_map(ptype: &str, rm: Arc<LinkSet>) -> RoleManagerMap {
        let mut map: RoleManagerMap = HashMap::new();
        map.insert(ptype.to_owned(), rm);
        map
    }

    #[test]
    fn unknown_assertion_is_reported() {
        let mut model = rbac_model();
        assert!(matches!(
            model.has_policy("p", "p9", &to_rule(&["a"])),
            Err(ModelError::UnknownAssertion { .. })
        ));
        assert!(model.add_policy("x", "p", to_rule(&["a"])).is_err());
        assert!(model.get_policy("g", "g9").is_err());
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut model = rbac_model();
        assert!(matches!(
            model.add_def("p", "p", &["sub"]),
            Err(ModelError::DuplicateAssertion { .. })
        ));
    }

    #[test]
    fn strict_existence_checks_arity() {
        let mut model = rbac_model();
        model
            .add_policy("p", "p", to_rule(&["alice", "data1", "read"]))
            .unwrap();
        assert!(model
            .has_policy_strict("p", "p", &to_rule(&["alice", "data1", "read"]))
            .unwrap());
        assert!(matches!(
            model.has_policy_strict("p", "p", &to_rule(&["alice", "data1"])),
            Err(ModelError::ArityMismatch { .. })
        ));
        assert!(!model
            .has_policy_strict("g", "g", &to_rule(&["alice", "admin", "dom"]))
            .unwrap());
    }

    #[test]
    fn has_policies_matches_any() {
        let mut model = rbac_model();
        model
            .add_policy("p", "p", to_rule(&["alice", "data1", "read"]))
            .unwrap();
        let probe = vec![
            to_rule(&["bob", "data1", "read"]),
            to_rule(&["alice", "data1", "read"]),
        ];
        assert!(model.has_policies("p", "p", &probe).unwrap());
        assert!(!model.has_policies("p", "p", &probe[..1]).unwrap());
    }

    #[test]
    fn get_policy_returns_owned_copy() {
        let mut model = rbac_model();
        model
            .add_policy("p", "p", to_rule(&["alice", "data1", "read"]))
            .unwrap();
        let mut copy = model.get_policy("p", "p").unwrap();
        copy[0][0] = "mallory".into();
        assert!(model
            .has_policy("p", "p", &to_rule(&["alice", "data1", "read"]))
            .unwrap());
        assert!(model.is_consistent());
    }

    #[test]
    fn values_across_types() {
        let mut model = rbac_model();
        model
            .add_policies(
                "p",
                "p",
                &[to_rule(&["alice", "data1", "read"]), to_rule(&["bob", "data2", "write"])],
            )
            .unwrap();
        model
            .add_policy("p", "p2", to_rule(&["carol", "read"]))
            .unwrap();

        assert_eq!(
            model.values_for_field_all_types("p", 0),
            vec!["alice", "bob", "carol"]
        );
        assert_eq!(
            model.values_for_field_all_types_by_name("p", "act"),
            vec!["read", "write"]
        );
        assert_eq!(
            model.values_for_field_all_types_by_name("p", "obj"),
            vec!["data1", "data2"]
        );
        assert!(model.values_for_field_all_types("zz", 0).is_empty());
        assert_eq!(model.field_index("p", "p2", "act").unwrap(), 1);
        assert!(matches!(
            model.field_index("p", "p2", "obj"),
            Err(ModelError::FieldNotFound { .. })
        ));
    }

    #[test]
    fn clear_policy_keeps_registrations() {
        let mut model = rbac_model();
        model
            .add_policy("p", "p", to_rule(&["alice", "data1", "read"]))
            .unwrap();
        model
            .add_policy("g", "g", to_rule(&["alice", "admin"]))
            .unwrap();
        model.clear_policy();
        assert!(model.get_policy("p", "p").unwrap().is_empty());
        assert!(model.get_policy("g", "g").unwrap().is_empty());
        assert_eq!(model.assertion("p", "p").unwrap().tokens().len(), 3);
    }

    #[test]
    fn build_role_links_skips_unbound_types() {
        let mut model = rbac_model();
        model
            .add_policies(
                "g",
                "g",
                &[to_rule(&["alice", "admin"]), to_rule(&["bob", "admin"])],
            )
            .unwrap();
        model
            .add_policy("g", "g2", to_rule(&["carol", "ops"]))
            .unwrap();

        let rm = Arc::new(LinkSet::default());
        model.build_role_links(&rm_map("g", rm.clone())).unwrap();
        assert_eq!(rm.links.lock().len(), 2);
        assert_eq!(*rm.clears.lock(), 1);

        model.build_role_links(&rm_map("g", rm.clone())).unwrap();
        assert_eq!(rm.links.lock().len(), 2);
        model.build_role_links(&HashMap::new()).unwrap();
    }

    #[test]
    fn incremental_links_follow_affected_rules() {
        let mut model = rbac_model();
        let rm = Arc::new(LinkSet::default());
        let map = rm_map("g", rm.clone());

        model
            .add_policy("g", "g", to_rule(&["alice", "admin"]))
            .unwrap();
        model.build_role_links(&map).unwrap();

        let affected = model
            .add_policies_with_affected(
                "g",
                "g",
                &[to_rule(&["alice", "admin"]), to_rule(&["bob", "admin"])],
            )
            .unwrap();
        model
            .build_incremental_role_links(&map, PolicyOp::Add, "g", "g", &affected)
            .unwrap();
        assert_eq!(rm.links.lock().len(), 2);

        let removed = model
            .remove_policies_with_affected("g", "g", &[to_rule(&["alice", "admin"])])
            .unwrap();
        model
            .build_incremental_role_links(&map, PolicyOp::Remove, "g", "g", &removed)
            .unwrap();
        assert_eq!(rm.links.lock().len(), 1);

        // permission section never drives role links
        model
            .build_incremental_role_links(&map, PolicyOp::Add, "p", "g", &affected)
            .unwrap();
        assert_eq!(rm.links.lock().len(), 1);
    }

    #[test]
    fn role_manager_errors_propagate() {
        let model = rbac_model();
        let rm = Arc::new(LinkSet::default());
        let err = model
            .build_incremental_role_links(
                &rm_map("g", rm),
                PolicyOp::Remove,
                "g",
                "g",
                &[to_rule(&["ghost", "admin"])],
            )
            .unwrap_err();
        assert!(matches!(
            err,
            ModelError::RoleManager(RoleManagerError::LinkNotFound { .. })
        ));
    }

    #[test]
    fn failed_rebuild_is_logged_as_error() {
        let mut model = rbac_model();
        model.add_policy("g", "g", to_rule(&["alice"])).unwrap();
        let rm = Arc::new(LinkSet::default());

        let logs = capture_logs(|| {
            let err = model.build_role_links(&rm_map("g", rm.clone())).unwrap_err();
            assert!(matches!(err, ModelError::ArityMismatch { expected: 2, actual: 1, .. }));
        });

        assert!(logs.contains("ERROR"));
        assert!(logs.contains("role link rebuild failed"));
        assert!(logs.contains("build_role_links"));
    }

    #[test]
    fn batch_update_outcomes_are_logged() {
        let mut model = rbac_model();
        model
            .add_policy("p", "p", to_rule(&["alice", "data1", "read"]))
            .unwrap();

        let logs = capture_logs(|| {
            let rolled_back = model
                .update_policies(
                    "p",
                    "p",
                    &[to_rule(&["ghost", "data1", "read"])],
                    &[to_rule(&["ghost", "data1", "write"])],
                )
                .unwrap();
            assert!(!rolled_back);
            let err = model
                .update_policies("p", "p", &[to_rule(&["alice", "data1", "read"])], &[])
                .unwrap_err();
            assert!(matches!(err, ModelError::BatchLengthMismatch { old: 1, new: 0 }));
        });

        assert!(logs.contains("INFO"));
        assert!(logs.contains("batch update rolled back"));
        assert!(logs.contains("ERROR"));
        assert!(logs.contains("batch update rejected"));
        assert!(model.is_consistent());
    }

    #[test]
    fn print_policy_merges_sections_only_when_enabled() {
        let logger = Arc::new(CapturingPolicyLogger::new(true));
        let mut model = rbac_model().with_logger(logger.clone());
        model
            .add_policy("p", "p", to_rule(&["alice", "data1", "read"]))
            .unwrap();
        model
            .add_policy("g", "g", to_rule(&["alice", "admin"]))
            .unwrap();
        model.build_role_links(&HashMap::new()).unwrap();

        let snapshots = logger.snapshots();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0]["p"].len(), 1);
        assert_eq!(snapshots[0]["g"].len(), 1);

        let disabled = Arc::new(CapturingPolicyLogger::new(false));
        model.set_logger(disabled.clone());
        model.print_policy();
        assert!(disabled.is_empty());
    }

    #[test]
    fn metrics_track_mutations() {
        let registry = Arc::new(Registry::new());
        let metrics = PolicyMetrics::new(registry).unwrap();
        let mut model = rbac_model().with_metrics(metrics);
        let a = to_rule(&["alice", "data1", "read"]);
        let b = to_rule(&["bob", "data1", "read"]);
        model.add_policies("p", "p", &[a.clone(), b.clone()]).unwrap();
        model.add_policy("p", "p", a.clone()).unwrap();
        model
            .update_policy("p", "p", &b, to_rule(&["bob", "data1", "write"]))
            .unwrap();
        model.remove_policy("p", "p", &a).unwrap();
        assert_eq!(model.metrics().unwrap().totals(), (2, 1, 1, 0));
    }
}
