//! ---
//! acm_section: "11-test-harness"
//! acm_subsection: "module"
//! acm_type: "source"
//! acm_scope: "code"
//! acm_description: "Graph-backed role manager recording every call it receives."
//! acm_version: "v0.1.0"
//! acm_owner: "tbd"
//! ---
use std::collections::HashMap;

use parking_lot::Mutex;
use petgraph::algo::has_path_connecting;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::{EdgeFiltered, EdgeRef};
use petgraph::Graph;
use tracing::trace;

use r_acm_model::{ConditionalRoleManager, RoleManager, RoleManagerError};

/// One call received by a [`GraphRoleManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkCall {
    Clear,
    Add {
        subject: String,
        role: String,
        domains: Vec<String>,
    },
    Delete {
        subject: String,
        role: String,
        domains: Vec<String>,
    },
    Params {
        subject: String,
        role: String,
        domain: Option<String>,
        params: Vec<String>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct LinkAttrs {
    domains: Vec<String>,
    params: Vec<String>,
}

#[derive(Debug, Default)]
struct State {
    graph: Graph<String, LinkAttrs>,
    nodes: HashMap<String, NodeIndex>,
    calls: Vec<LinkCall>,
}

impl State {
    fn node(&mut self, name: &str) -> NodeIndex {
        if let Some(idx) = self.nodes.get(name) {
            return *idx;
        }
        let idx = self.graph.add_node(name.to_owned());
        self.nodes.insert(name.to_owned(), idx);
        idx
    }

    fn find_edge(&self, subject: &str, role: &str, domains: &[String]) -> Option<EdgeIndex> {
        let from = *self.nodes.get(subject)?;
        let to = *self.nodes.get(role)?;
        self.graph
            .edges_connecting(from, to)
            .find(|edge| edge.weight().domains.as_slice() == domains)
            .map(|edge| edge.id())
    }
}

fn not_found(subject: &str, role: &str) -> RoleManagerError {
    RoleManagerError::LinkNotFound {
        subject: subject.to_owned(),
        role: role.to_owned(),
    }
}

/// Role manager keeping links as edges of a directed graph.
///
/// Links are scoped by their domain fields: a query for one domain only follows
/// edges added with exactly those domains. Adding an existing link again is a
/// no-op, so replaying the same grouping rules leaves the graph unchanged.
#[derive(Debug, Default)]
pub struct GraphRoleManager {
    state: Mutex<State>,
}

impl GraphRoleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `subject` reaches `role` through links scoped by `domains`.
    pub fn has_link(&self, subject: &str, role: &str, domains: &[String]) -> bool {
        if subject == role {
            return true;
        }
        let state = self.state.lock();
        let (Some(&from), Some(&to)) = (state.nodes.get(subject), state.nodes.get(role)) else {
            return false;
        };
        let scoped = EdgeFiltered::from_fn(&state.graph, |edge| {
            edge.weight().domains.as_slice() == domains
        });
        has_path_connecting(&scoped, from, to, None)
    }

    /// Direct links as sorted `(subject, role, domains)` triples.
    pub fn links(&self) -> Vec<(String, String, Vec<String>)> {
        let state = self.state.lock();
        let mut links: Vec<_> = state
            .graph
            .edge_references()
            .map(|edge| {
                (
                    state.graph[edge.source()].clone(),
                    state.graph[edge.target()].clone(),
                    edge.weight().domains.clone(),
                )
            })
            .collect();
        links.sort();
        links
    }

    /// Number of direct links.
    pub fn link_count(&self) -> usize {
        self.state.lock().graph.edge_count()
    }

    /// Condition parameters of a direct link, `None` when the link is absent.
    pub fn condition_params(
        &self,
        subject: &str,
        role: &str,
        domain: Option<&str>,
    ) -> Option<Vec<String>> {
        let state = self.state.lock();
        let domains: Vec<String> = domain.into_iter().map(str::to_owned).collect();
        let edge = state.find_edge(subject, role, &domains)?;
        Some(state.graph[edge].params.clone())
    }

    /// Every call received so far, oldest first.
    pub fn calls(&self) -> Vec<LinkCall> {
        self.state.lock().calls.clone()
    }

    /// Forget the recorded calls, keeping the links.
    pub fn reset_calls(&self) {
        self.state.lock().calls.clear();
    }

    fn set_params(
        &self,
        subject: &str,
        role: &str,
        domain: Option<&str>,
        params: &[String],
    ) -> Result<(), RoleManagerError> {
        let mut state = self.state.lock();
        state.calls.push(LinkCall::Params {
            subject: subject.to_owned(),
            role: role.to_owned(),
            domain: domain.map(str::to_owned),
            params: params.to_vec(),
        });
        let domains: Vec<String> = domain.into_iter().map(str::to_owned).collect();
        let edge = state
            .find_edge(subject, role, &domains)
            .ok_or_else(|| not_found(subject, role))?;
        state.graph[edge].params = params.to_vec();
        Ok(())
    }
}

impl RoleManager for GraphRoleManager {
    fn clear(&self) -> Result<(), RoleManagerError> {
        let mut state = self.state.lock();
        state.graph.clear();
        state.nodes.clear();
        state.calls.push(LinkCall::Clear);
        Ok(())
    }

    fn add_link(
        &self,
        subject: &str,
        role: &str,
        domains: &[String],
    ) -> Result<(), RoleManagerError> {
        let mut state = self.state.lock();
        state.calls.push(LinkCall::Add {
            subject: subject.to_owned(),
            role: role.to_owned(),
            domains: domains.to_vec(),
        });
        if state.find_edge(subject, role, domains).is_some() {
            return Ok(());
        }
        let from = state.node(subject);
        let to = state.node(role);
        state.graph.add_edge(
            from,
            to,
            LinkAttrs {
                domains: domains.to_vec(),
                params: Vec::new(),
            },
        );
        trace!(subject, role, ?domains, "link added");
        Ok(())
    }

    fn delete_link(
        &self,
        subject: &str,
        role: &str,
        domains: &[String],
    ) -> Result<(), RoleManagerError> {
        let mut state = self.state.lock();
        state.calls.push(LinkCall::Delete {
            subject: subject.to_owned(),
            role: role.to_owned(),
            domains: domains.to_vec(),
        });
        let edge = state
            .find_edge(subject, role, domains)
            .ok_or_else(|| not_found(subject, role))?;
        state.graph.remove_edge(edge);
        trace!(subject, role, ?domains, "link deleted");
        Ok(())
    }
}

impl ConditionalRoleManager for GraphRoleManager {
    fn set_link_condition_params(
        &self,
        subject: &str,
        role: &str,
        params: &[String],
    ) -> Result<(), RoleManagerError> {
        self.set_params(subject, role, None, params)
    }

    fn set_domain_link_condition_params(
        &self,
        subject: &str,
        role: &str,
        domain: &str,
        params: &[String],
    ) -> Result<(), RoleManagerError> {
        self.set_params(subject, role, Some(domain), params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dom(name: &str) -> Vec<String> {
        vec![name.to_owned()]
    }

    #[test]
    fn reachability_follows_transitive_links() {
        let rm = GraphRoleManager::new();
        rm.add_link("alice", "admin", &[]).unwrap();
        rm.add_link("admin", "root", &[]).unwrap();
        assert!(rm.has_link("alice", "root", &[]));
        assert!(!rm.has_link("root", "alice", &[]));
        assert!(rm.has_link("nobody", "nobody", &[]));
    }

    #[test]
    fn domains_scope_reachability() {
        let rm = GraphRoleManager::new();
        rm.add_link("alice", "admin", &dom("d1")).unwrap();
        assert!(rm.has_link("alice", "admin", &dom("d1")));
        assert!(!rm.has_link("alice", "admin", &dom("d2")));
        assert!(!rm.has_link("alice", "admin", &[]));
    }

    #[test]
    fn repeated_add_is_idempotent() {
        let rm = GraphRoleManager::new();
        rm.add_link("alice", "admin", &[]).unwrap();
        rm.add_link("alice", "admin", &[]).unwrap();
        assert_eq!(rm.link_count(), 1);
        assert_eq!(rm.calls().len(), 2);
    }

    #[test]
    fn delete_missing_link_fails() {
        let rm = GraphRoleManager::new();
        rm.add_link("alice", "admin", &[]).unwrap();
        rm.delete_link("alice", "admin", &[]).unwrap();
        assert!(matches!(
            rm.delete_link("alice", "admin", &[]),
            Err(RoleManagerError::LinkNotFound { .. })
        ));
        assert!(rm.links().is_empty());
    }

    #[test]
    fn condition_params_attach_to_existing_links() {
        let rm = GraphRoleManager::new();
        rm.add_link("alice", "admin", &dom("d1")).unwrap();
        let params = vec!["2024-01-01".to_owned()];
        rm.set_domain_link_condition_params("alice", "admin", "d1", &params)
            .unwrap();
        assert_eq!(
            rm.condition_params("alice", "admin", Some("d1")),
            Some(params.clone())
        );
        assert!(rm
            .set_link_condition_params("alice", "admin", &params)
            .is_err());
    }

    #[test]
    fn clear_drops_links_and_records_call() {
        let rm = GraphRoleManager::new();
        rm.add_link("alice", "admin", &[]).unwrap();
        rm.clear().unwrap();
        assert_eq!(rm.link_count(), 0);
        assert!(!rm.has_link("alice", "admin", &[]));
        assert_eq!(rm.calls().last(), Some(&LinkCall::Clear));
    }
}
