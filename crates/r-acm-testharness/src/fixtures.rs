//! ---
//! acm_section: "11-test-harness"
//! acm_subsection: "module"
//! acm_type: "source"
//! acm_scope: "code"
//! acm_description: "Canned model definitions and rule builders."
//! acm_version: "v0.1.0"
//! acm_owner: "tbd"
//! ---
use std::collections::HashMap;
use std::sync::Arc;

use r_acm_common::{AssertionDefinition, ModelDefinition};
use r_acm_model::{
    to_rule, ConditionalRoleManager, ConditionalRoleManagerMap, Model, RoleManager, RoleManagerMap,
    Rule,
};

/// `p = sub, obj, act` with role types `g = _, _` and `g2 = _, _`.
pub fn rbac_definition() -> ModelDefinition {
    ModelDefinition::new()
        .with_assertion("p", "p", &["sub", "obj", "act"])
        .with_assertion("g", "g", &["_", "_"])
        .with_assertion("g", "g2", &["_", "_"])
}

/// `p = priority, sub, obj, act, eft` with role type `g = _, _`.
pub fn priority_definition() -> ModelDefinition {
    ModelDefinition::new()
        .with_assertion("p", "p", &["priority", "sub", "obj", "act", "eft"])
        .with_assertion("g", "g", &["_", "_"])
}

/// `p = sub, dom, obj, act` with domain role type `g = _, _, _`.
pub fn domain_definition() -> ModelDefinition {
    ModelDefinition::new()
        .with_assertion("p", "p", &["sub", "dom", "obj", "act"])
        .with_assertion("g", "g", &["_", "_", "_"])
}

/// Domain model whose role links carry `start` and `end` condition params.
pub fn conditional_definition() -> ModelDefinition {
    ModelDefinition::new()
        .with_assertion("p", "p", &["sub", "dom", "obj", "act"])
        .with_definition(
            "g",
            "g",
            AssertionDefinition::new(&["_", "_"]).with_params(&["start", "end"]),
        )
        .with_definition(
            "g",
            "g2",
            AssertionDefinition::new(&["_", "_", "_"]).with_params(&["start", "end"]),
        )
}

fn build(definition: &ModelDefinition) -> Model {
    match Model::from_definition(definition) {
        Ok(model) => model,
        Err(err) => panic!("fixture definition rejected: {err}"),
    }
}

pub fn rbac_model() -> Model {
    build(&rbac_definition())
}

pub fn priority_model() -> Model {
    build(&priority_definition())
}

pub fn domain_model() -> Model {
    build(&domain_definition())
}

pub fn conditional_model() -> Model {
    build(&conditional_definition())
}

/// Build rules from string slices.
pub fn rules(rows: &[&[&str]]) -> Vec<Rule> {
    rows.iter().map(|row| to_rule(row)).collect()
}

/// Bind one role manager to a grouping rule type.
pub fn rm_map(ptype: &str, rm: Arc<dyn RoleManager>) -> RoleManagerMap {
    let mut map: RoleManagerMap = HashMap::new();
    map.insert(ptype.to_owned(), rm);
    map
}

/// Bind one conditional role manager to a grouping rule type.
pub fn conditional_rm_map(
    ptype: &str,
    rm: Arc<dyn ConditionalRoleManager>,
) -> ConditionalRoleManagerMap {
    let mut map: ConditionalRoleManagerMap = HashMap::new();
    map.insert(ptype.to_owned(), rm);
    map
}
