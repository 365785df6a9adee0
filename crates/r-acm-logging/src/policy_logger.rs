//! ---
//! acm_section: "03-logging"
//! acm_subsection: "module"
//! acm_type: "source"
//! acm_scope: "code"
//! acm_description: "Structured logging adapters and the policy logger sink."
//! acm_version: "v0.0.0-prealpha"
//! acm_owner: "tbd"
//! ---
use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::{info, Level};

/// Rules keyed by rule type, permission and grouping sections merged.
pub type PolicySnapshot = IndexMap<String, Vec<Vec<String>>>;

/// Observer receiving the loaded policy on each full role-link rebuild.
///
/// Callers check [`PolicyLogger::is_enabled`] before building a snapshot, so a
/// disabled logger costs nothing on the rebuild path.
pub trait PolicyLogger: Send + Sync {
    /// Whether snapshots should be produced at all.
    fn is_enabled(&self) -> bool;

    /// Receive a policy snapshot.
    fn log_policy(&self, policy: &PolicySnapshot);
}

/// Logger that never asks for snapshots.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPolicyLogger;

impl PolicyLogger for NoopPolicyLogger {
    fn is_enabled(&self) -> bool {
        false
    }

    fn log_policy(&self, _policy: &PolicySnapshot) {}
}

/// Logger emitting one `INFO` event per rule type through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPolicyLogger;

impl PolicyLogger for TracingPolicyLogger {
    fn is_enabled(&self) -> bool {
        tracing::enabled!(Level::INFO)
    }

    fn log_policy(&self, policy: &PolicySnapshot) {
        for (ptype, rules) in policy {
            info!(ptype = %ptype, rules = rules.len(), policy = ?rules, "policy loaded");
        }
    }
}

/// Logger keeping every snapshot in memory.
#[derive(Debug)]
pub struct CapturingPolicyLogger {
    enabled: bool,
    snapshots: Mutex<Vec<PolicySnapshot>>,
}

impl CapturingPolicyLogger {
    /// Create an enabled or disabled capturing logger.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            snapshots: Mutex::new(Vec::new()),
        }
    }

    /// Snapshots received so far.
    pub fn snapshots(&self) -> Vec<PolicySnapshot> {
        self.snapshots.lock().clone()
    }

    /// Number of snapshots received.
    pub fn len(&self) -> usize {
        self.snapshots.lock().len()
    }

    /// Whether no snapshot was received.
    pub fn is_empty(&self) -> bool {
        self.snapshots.lock().is_empty()
    }
}

impl Default for CapturingPolicyLogger {
    fn default() -> Self {
        Self::new(true)
    }
}

impl PolicyLogger for CapturingPolicyLogger {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn log_policy(&self, policy: &PolicySnapshot) {
        self.snapshots.lock().push(policy.clone());
    }
}
