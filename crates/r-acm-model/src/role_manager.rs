//! ---
//! acm_section: "02-policy-model"
//! acm_subsection: "module"
//! acm_type: "source"
//! acm_scope: "code"
//! acm_description: "Contracts for the external role managers driven by grouping rules."
//! acm_version: "v0.0.0-prealpha"
//! acm_owner: "tbd"
//! ---
use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

/// Errors reported by a role manager implementation.
#[derive(Debug, Error)]
pub enum RoleManagerError {
    /// A link to delete does not exist.
    #[error("role link {subject} -> {role} not found")]
    LinkNotFound {
        /// Inheriting subject.
        subject: String,
        /// Inherited role.
        role: String,
    },
    /// Implementation-specific failure.
    #[error("role manager failure: {0}")]
    Backend(String),
}

/// Role manager maintaining the role-inheritance graph.
///
/// The store only ever writes to the manager; the graph is read by the
/// matcher. Implementations are shared behind `Arc` and mutate internally.
pub trait RoleManager: Send + Sync {
    /// Drop every link.
    fn clear(&self) -> Result<(), RoleManagerError>;

    /// Record that `subject` inherits `role`, optionally scoped by domain fields.
    fn add_link(&self, subject: &str, role: &str, domains: &[String])
        -> Result<(), RoleManagerError>;

    /// Remove the link previously added with the same arguments.
    fn delete_link(
        &self,
        subject: &str,
        role: &str,
        domains: &[String],
    ) -> Result<(), RoleManagerError>;
}

/// Role manager whose links carry condition parameters.
pub trait ConditionalRoleManager: RoleManager {
    /// Attach condition parameters to an undomained link.
    fn set_link_condition_params(
        &self,
        subject: &str,
        role: &str,
        params: &[String],
    ) -> Result<(), RoleManagerError>;

    /// Attach condition parameters to a link scoped by `domain`.
    fn set_domain_link_condition_params(
        &self,
        subject: &str,
        role: &str,
        domain: &str,
        params: &[String],
    ) -> Result<(), RoleManagerError>;
}

/// Role managers bound per grouping rule type.
pub type RoleManagerMap = HashMap<String, Arc<dyn RoleManager>>;

/// Conditional role managers bound per grouping rule type.
pub type ConditionalRoleManagerMap = HashMap<String, Arc<dyn ConditionalRoleManager>>;

/// Direction of an incremental role-link update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyOp {
    /// Links are added for the given rules.
    Add,
    /// Links are deleted for the given rules.
    Remove,
}

impl PolicyOp {
    /// Short label used in log events.
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyOp::Add => "add",
            PolicyOp::Remove => "remove",
        }
    }
}
