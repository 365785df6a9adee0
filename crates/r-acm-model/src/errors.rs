//! ---
//! acm_section: "02-policy-model"
//! acm_subsection: "module"
//! acm_type: "source"
//! acm_scope: "code"
//! acm_description: "Error taxonomy for the policy model."
//! acm_version: "v0.0.0-prealpha"
//! acm_owner: "tbd"
//! ---
use thiserror::Error;

use crate::role_manager::RoleManagerError;
use crate::rule::Rule;

/// Result alias used throughout the policy model.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors surfaced by the policy model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The (section, rule type) pair was never registered.
    #[error("unknown assertion {section}.{ptype}")]
    UnknownAssertion {
        /// Requested section.
        section: String,
        /// Requested rule type.
        ptype: String,
    },
    /// The (section, rule type) pair is already registered.
    #[error("assertion {section}.{ptype} is already registered")]
    DuplicateAssertion {
        /// Section of the existing assertion.
        section: String,
        /// Rule type of the existing assertion.
        ptype: String,
    },
    /// Rule length does not agree with the declared schema.
    #[error("invalid policy rule size: expected {expected}, got {actual}, rule: {rule:?}")]
    ArityMismatch {
        /// Declared token count.
        expected: usize,
        /// Length of the offending rule.
        actual: usize,
        /// The offending rule.
        rule: Rule,
    },
    /// Paired batch inputs differ in length.
    #[error("batch length mismatch: {old} old rules, {new} new rules")]
    BatchLengthMismatch {
        /// Number of rules to replace.
        old: usize,
        /// Number of replacement rules.
        new: usize,
    },
    /// The rule type does not declare the requested field.
    #[error("field `{field}` is not declared for {ptype}")]
    FieldNotFound {
        /// Rule type searched.
        ptype: String,
        /// Field name requested.
        field: String,
    },
    /// A grouping rule type declares fewer than two link fields.
    #[error("role definition {ptype} needs at least 2 fields, got {tokens}")]
    InvalidRoleDefinition {
        /// Grouping rule type.
        ptype: String,
        /// Number of declared tokens.
        tokens: usize,
    },
    /// The bound role manager rejected a link operation.
    #[error(transparent)]
    RoleManager(#[from] RoleManagerError),
}
