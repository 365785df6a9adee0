//! ---
//! acm_section: "02-policy-model"
//! acm_subsection: "module"
//! acm_type: "source"
//! acm_scope: "code"
//! acm_description: "Role-hierarchy construction from grouping rules."
//! acm_version: "v0.0.0-prealpha"
//! acm_owner: "tbd"
//! ---
use tracing::debug;

use crate::assertion::Assertion;
use crate::errors::{ModelError, Result};
use crate::role_manager::{ConditionalRoleManager, PolicyOp, RoleManager};
use crate::rule::Rule;

/// Drives a role manager from the grouping rules of one rule type.
///
/// Rules are read as `[subject, role, domain.., param..]`: the declared tokens
/// cover subject, role and any domain fields, and trailing fields carry
/// condition parameters.
#[derive(Debug, Clone, Copy)]
pub struct RoleHierarchyBuilder<'a> {
    ptype: &'a str,
    link_fields: usize,
    param_fields: usize,
}

impl<'a> RoleHierarchyBuilder<'a> {
    /// Builder for a grouping assertion. Fails when fewer than two link fields are declared.
    pub fn for_assertion(assertion: &'a Assertion) -> Result<Self> {
        let link_fields = assertion.tokens().len();
        if link_fields < 2 {
            return Err(ModelError::InvalidRoleDefinition {
                ptype: assertion.ptype().to_owned(),
                tokens: link_fields,
            });
        }
        Ok(Self {
            ptype: assertion.ptype(),
            link_fields,
            param_fields: assertion.params().len(),
        })
    }

    /// Clear the manager and add one link per rule.
    pub fn rebuild(&self, rm: &dyn RoleManager, rules: &[Rule]) -> Result<()> {
        rm.clear()?;
        self.apply(rm, PolicyOp::Add, rules)?;
        debug!(ptype = self.ptype, links = rules.len(), "role links rebuilt");
        Ok(())
    }

    /// Add or delete one link per rule.
    pub fn apply(&self, rm: &dyn RoleManager, op: PolicyOp, rules: &[Rule]) -> Result<()> {
        for rule in rules {
            let link = self.link_fields_of(rule)?;
            match op {
                PolicyOp::Add => rm.add_link(&link[0], &link[1], &link[2..])?,
                PolicyOp::Remove => rm.delete_link(&link[0], &link[1], &link[2..])?,
            }
        }
        Ok(())
    }

    /// Clear the conditional manager and add one parameterised link per rule.
    pub fn rebuild_conditional(
        &self,
        rm: &dyn ConditionalRoleManager,
        rules: &[Rule],
    ) -> Result<()> {
        rm.clear()?;
        self.apply_conditional(rm, PolicyOp::Add, rules)?;
        debug!(ptype = self.ptype, links = rules.len(), "conditional role links rebuilt");
        Ok(())
    }

    /// Add (with condition parameters) or delete one link per rule.
    pub fn apply_conditional(
        &self,
        rm: &dyn ConditionalRoleManager,
        op: PolicyOp,
        rules: &[Rule],
    ) -> Result<()> {
        for rule in rules {
            let link = self.link_fields_of(rule)?;
            let (subject, role, domains) = (&link[0], &link[1], &link[2..]);
            match op {
                PolicyOp::Add => {
                    let params = self.params_of(rule);
                    match domains.first() {
                        None => {
                            rm.add_link(subject, role, &[])?;
                            rm.set_link_condition_params(subject, role, params)?;
                        }
                        Some(domain) => {
                            rm.add_link(subject, role, std::slice::from_ref(domain))?;
                            rm.set_domain_link_condition_params(subject, role, domain, params)?;
                        }
                    }
                }
                PolicyOp::Remove => {
                    let domain = domains.first().map(std::slice::from_ref).unwrap_or(&[]);
                    rm.delete_link(subject, role, domain)?;
                }
            }
        }
        Ok(())
    }

    fn link_fields_of<'r>(&self, rule: &'r [String]) -> Result<&'r [String]> {
        if rule.len() < self.link_fields {
            return Err(ModelError::ArityMismatch {
                expected: self.link_fields,
                actual: rule.len(),
                rule: rule.to_vec(),
            });
        }
        Ok(&rule[..self.link_fields])
    }

    /// Trailing fields, capped at the declared parameter count when one is declared.
    fn params_of<'r>(&self, rule: &'r [String]) -> &'r [String] {
        let trailing = &rule[self.link_fields..];
        if self.param_fields > 0 && trailing.len() > self.param_fields {
            &trailing[..self.param_fields]
        } else {
            trailing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role_manager::RoleManagerError;
    use crate::rule::to_rule;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct CallLog {
        calls: Mutex<Vec<String>>,
    }

    impl CallLog {
        fn push(&self, call: String) -> std::result::Result<(), RoleManagerError> {
            self.calls.lock().push(call);
            Ok(())
        }

        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.calls.lock())
        }
    }

    impl RoleManager for CallLog {
        fn clear(&self) -> std::result::Result<(), RoleManagerError> {
            self.push("clear".into())
        }

        fn add_link(
            &self,
            subject: &str,
            role: &str,
            domains: &[String],
        ) -> std::result::Result<(), RoleManagerError> {
            self.push(format!("add {subject} {role} {domains:?}"))
        }

        fn delete_link(
            &self,
            subject: &str,
            role: &str,
            domains: &[String],
        ) -> std::result::Result<(), RoleManagerError> {
            self.push(format!("delete {subject} {role} {domains:?}"))
        }
    }

    impl ConditionalRoleManager for CallLog {
        fn set_link_condition_params(
            &self,
            subject: &str,
            role: &str,
            params: &[String],
        ) -> std::result::Result<(), RoleManagerError> {
            self.push(format!("params {subject} {role} {params:?}"))
        }

        fn set_domain_link_condition_params(
            &self,
            subject: &str,
            role: &str,
            domain: &str,
            params: &[String],
        ) -> std::result::Result<(), RoleManagerError> {
            self.push(format!("domain-params {subject} {role} {domain} {params:?}"))
        }
    }

    fn grouping(tokens: &[&str]) -> Assertion {
        Assertion::new("g", "g", to_rule(tokens))
    }

    #[test]
    fn rejects_single_field_role_definition() {
        let ast = grouping(&["_"]);
        assert!(matches!(
            RoleHierarchyBuilder::for_assertion(&ast),
            Err(ModelError::InvalidRoleDefinition { tokens: 1, .. })
        ));
    }

    #[test]
    fn rebuild_clears_then_links_truncated_rules() {
        let ast = grouping(&["_", "_", "_"]);
        let builder = RoleHierarchyBuilder::for_assertion(&ast).unwrap();
        let rm = CallLog::default();
        builder
            .rebuild(
                &rm,
                &[
                    to_rule(&["alice", "admin", "dom1"]),
                    to_rule(&["bob", "admin", "dom1", "extra"]),
                ],
            )
            .unwrap();
        assert_eq!(
            rm.take(),
            vec![
                "clear",
                r#"add alice admin ["dom1"]"#,
                r#"add bob admin ["dom1"]"#,
            ]
        );
    }

    #[test]
    fn short_rule_is_an_arity_error() {
        let ast = grouping(&["_", "_", "_"]);
        let builder = RoleHierarchyBuilder::for_assertion(&ast).unwrap();
        let rm = CallLog::default();
        let err = builder
            .apply(&rm, PolicyOp::Add, &[to_rule(&["alice", "admin"])])
            .unwrap_err();
        assert!(matches!(err, ModelError::ArityMismatch { expected: 3, actual: 2, .. }));
    }

    #[test]
    fn incremental_remove_deletes_links() {
        let ast = grouping(&["_", "_"]);
        let builder = RoleHierarchyBuilder::for_assertion(&ast).unwrap();
        let rm = CallLog::default();
        builder
            .apply(&rm, PolicyOp::Remove, &[to_rule(&["alice", "admin"])])
            .unwrap();
        assert_eq!(rm.take(), vec!["delete alice admin []"]);
    }

    #[test]
    fn conditional_links_carry_params() {
        let ast = grouping(&["_", "_"]).with_params(to_rule(&["start", "end"]));
        let builder = RoleHierarchyBuilder::for_assertion(&ast).unwrap();
        let rm = CallLog::default();
        builder
            .rebuild_conditional(&rm, &[to_rule(&["alice", "admin", "09:00", "17:00", "x"])])
            .unwrap();
        assert_eq!(
            rm.take(),
            vec![
                "clear",
                "add alice admin []",
                r#"params alice admin ["09:00", "17:00"]"#,
            ]
        );
    }

    #[test]
    fn conditional_domain_links_use_first_domain() {
        let ast = grouping(&["_", "_", "_"]);
        let builder = RoleHierarchyBuilder::for_assertion(&ast).unwrap();
        let rm = CallLog::default();
        builder
            .apply_conditional(&rm, PolicyOp::Add, &[to_rule(&["alice", "admin", "dom1", "p1"])])
            .unwrap();
        builder
            .apply_conditional(&rm, PolicyOp::Remove, &[to_rule(&["alice", "admin", "dom1", "p1"])])
            .unwrap();
        assert_eq!(
            rm.take(),
            vec![
                r#"add alice admin ["dom1"]"#,
                r#"domain-params alice admin dom1 ["p1"]"#,
                r#"delete alice admin ["dom1"]"#,
            ]
        );
    }
}
