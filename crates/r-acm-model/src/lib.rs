//! ---
//! acm_section: "02-policy-model"
//! acm_subsection: "module"
//! acm_type: "source"
//! acm_scope: "code"
//! acm_description: "In-memory policy store, rule index, and role-hierarchy builder."
//! acm_version: "v0.0.0-prealpha"
//! acm_owner: "tbd"
//! ---
//! Policy rules live in [`Assertion`]s, one per (section, rule type), each
//! pairing an ordered rule list with a [`RuleIndex`] from rule to position.
//! The [`Model`] registry dispatches store operations by section and rule
//! type, and feeds grouping rules to a [`RoleManager`] through
//! [`RoleHierarchyBuilder`].
pub mod assertion;
pub mod errors;
pub mod index;
pub mod metrics;
pub mod model;
pub mod role_links;
pub mod role_manager;
pub mod rule;
pub mod shared;

pub use assertion::{Assertion, GROUPING_SECTION, POLICY_SECTION, PRIORITY_FIELD};
pub use errors::{ModelError, Result};
pub use index::RuleIndex;
pub use metrics::PolicyMetrics;
pub use model::Model;
pub use role_links::RoleHierarchyBuilder;
pub use role_manager::{
    ConditionalRoleManager, ConditionalRoleManagerMap, PolicyOp, RoleManager, RoleManagerError,
    RoleManagerMap,
};
pub use rule::{to_rule, Rule, RuleKey};
pub use shared::SharedModel;
