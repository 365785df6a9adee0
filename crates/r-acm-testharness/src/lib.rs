//! ---
//! acm_section: "11-test-harness"
//! acm_subsection: "01-bootstrap"
//! acm_type: "source"
//! acm_scope: "code"
//! acm_description: "Test harness role managers, fixtures, and shared exports."
//! acm_version: "v0.1.0"
//! acm_owner: "tbd"
//! ---
//! Helpers for exercising the policy store end to end: a role manager that
//! keeps links in a `petgraph` graph and answers reachability queries, plus
//! canned model definitions.

pub mod fixtures;
pub mod graph;

pub use fixtures::{
    conditional_definition, conditional_model, conditional_rm_map, domain_definition,
    domain_model, priority_definition, priority_model, rbac_definition, rbac_model, rm_map, rules,
};
pub use graph::{GraphRoleManager, LinkCall};

/// Install the development tracing subscriber once per test binary.
pub fn init_test_logging() {
    r_acm_logging::init();
}
