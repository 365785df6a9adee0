//! ---
//! acm_section: "03-logging"
//! acm_subsection: "module"
//! acm_type: "source"
//! acm_scope: "code"
//! acm_description: "Structured logging adapters and the policy logger sink."
//! acm_version: "v0.0.0-prealpha"
//! acm_owner: "tbd"
//! ---
#![warn(missing_docs)]

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

pub mod macros;
pub mod policy_logger;

pub use policy_logger::{
    CapturingPolicyLogger, NoopPolicyLogger, PolicyLogger, PolicySnapshot, TracingPolicyLogger,
};

/// Initialize a baseline tracing subscriber suitable for development.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(subscriber_fmt::layer())
        .try_init();
}

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Section of the addressed assertion.
    pub section: Option<&'a str>,
    /// Rule type of the addressed assertion.
    pub ptype: Option<&'a str>,
    /// Store operation being performed.
    pub operation: Option<&'a str>,
    /// Number of rules involved.
    pub rules: Option<usize>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context addressing one (section, rule type).
    pub fn assertion(section: &'a str, ptype: &'a str) -> Self {
        Self::new().with_section(section).with_ptype(ptype)
    }

    /// Attach a section.
    pub fn with_section(mut self, section: &'a str) -> Self {
        self.section = Some(section);
        self
    }

    /// Attach a rule type.
    pub fn with_ptype(mut self, ptype: &'a str) -> Self {
        self.ptype = Some(ptype);
        self
    }

    /// Attach an operation name.
    pub fn with_operation(mut self, operation: &'a str) -> Self {
        self.operation = Some(operation);
        self
    }

    /// Attach a rule count.
    pub fn with_rules(mut self, rules: usize) -> Self {
        self.rules = Some(rules);
        self
    }
}

/// High-level outcome used when emitting model lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelEventOutcome {
    /// The operation completed successfully.
    Success,
    /// The operation failed or was aborted.
    Fault,
}

impl ModelEventOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            ModelEventOutcome::Success => "success",
            ModelEventOutcome::Fault => "fault",
        }
    }
}

/// Emit a standardized model event with a success/fault outcome.
pub fn log_model_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: ModelEventOutcome,
) {
    let ctx = context.cloned().unwrap_or_default();
    let fields = (
        ctx.section.unwrap_or(""),
        ctx.ptype.unwrap_or(""),
        ctx.operation.unwrap_or(""),
        ctx.rules.unwrap_or_default(),
    );
    // `tracing::event!` needs a constant level
    match outcome {
        ModelEventOutcome::Fault => tracing::error!(
            event,
            outcome = outcome.as_str(),
            section = fields.0,
            ptype = fields.1,
            operation = fields.2,
            rules = fields.3,
            message = %message
        ),
        ModelEventOutcome::Success => tracing::info!(
            event,
            outcome = outcome.as_str(),
            section = fields.0,
            ptype = fields.1,
            operation = fields.2,
            rules = fields.3,
            message = %message
        ),
    }
}
