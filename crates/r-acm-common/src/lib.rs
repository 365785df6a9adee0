//! ---
//! acm_section: "01-core-functionality"
//! acm_subsection: "module"
//! acm_type: "source"
//! acm_scope: "code"
//! acm_description: "Shared configuration and tracing setup."
//! acm_version: "v0.0.0-prealpha"
//! acm_owner: "tbd"
//! ---
//! Shared primitives for the R-ACM workspace.
//! This crate exposes configuration loading, the declarative model
//! definition consumed by the policy store, and tracing initialisation.

pub mod config;
pub mod logging;

pub use config::{
    AcmConfig, AssertionDefinition, LoadedAcmConfig, LoggingConfig, ModelDefinition,
    GROUPING_SECTION, POLICY_SECTION,
};
pub use logging::{init_tracing, resolve_filter, FilterSource, LogFormat};
