//! ---
//! acm_section: "02-policy-model"
//! acm_subsection: "module"
//! acm_type: "source"
//! acm_scope: "code"
//! acm_description: "Prometheus counters for policy mutations."
//! acm_version: "v0.0.0-prealpha"
//! acm_owner: "tbd"
//! ---
use prometheus::{IntCounter, Registry};
use std::sync::Arc;

/// Policy store metrics exported via Prometheus.
#[derive(Clone)]
pub struct PolicyMetrics {
    registry: Arc<Registry>,
    rules_added_total: IntCounter,
    rules_removed_total: IntCounter,
    rules_updated_total: IntCounter,
    role_rebuilds_total: IntCounter,
}

impl PolicyMetrics {
    /// Register metrics with the provided registry.
    pub fn new(registry: Arc<Registry>) -> anyhow::Result<Self> {
        let rules_added_total =
            IntCounter::new("policy_rules_added_total", "Rules inserted into the model")?;
        let rules_removed_total =
            IntCounter::new("policy_rules_removed_total", "Rules removed from the model")?;
        let rules_updated_total =
            IntCounter::new("policy_rules_updated_total", "Rules replaced in place")?;
        let role_rebuilds_total = IntCounter::new(
            "policy_role_rebuilds_total",
            "Full role-hierarchy rebuilds",
        )?;

        registry.register(Box::new(rules_added_total.clone()))?;
        registry.register(Box::new(rules_removed_total.clone()))?;
        registry.register(Box::new(rules_updated_total.clone()))?;
        registry.register(Box::new(role_rebuilds_total.clone()))?;

        Ok(Self {
            registry,
            rules_added_total,
            rules_removed_total,
            rules_updated_total,
            role_rebuilds_total,
        })
    }

    /// Access the underlying registry.
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Count inserted rules.
    pub fn add_rules(&self, count: usize) {
        self.rules_added_total.inc_by(count as u64);
    }

    /// Count removed rules.
    pub fn remove_rules(&self, count: usize) {
        self.rules_removed_total.inc_by(count as u64);
    }

    /// Count replaced rules.
    pub fn update_rules(&self, count: usize) {
        self.rules_updated_total.inc_by(count as u64);
    }

    /// Count a full role-hierarchy rebuild.
    pub fn inc_role_rebuild(&self) {
        self.role_rebuilds_total.inc();
    }

    /// Current `(added, removed, updated, rebuilds)` totals.
    pub fn totals(&self) -> (u64, u64, u64, u64) {
        (
            self.rules_added_total.get(),
            self.rules_removed_total.get(),
            self.rules_updated_total.get(),
            self.role_rebuilds_total.get(),
        )
    }
}

impl std::fmt::Debug for PolicyMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyMetrics")
            .field("totals", &self.totals())
            .finish()
    }
}
