//! Everything the user has loaded or changed during one run.
//!
//! The session never touches positions. It bumps a [`Revisions`] counter on every change so
//! the controller can tell a structural change from an edge-only one.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::address::{Chain, canonical_id};
use crate::graph::{
    ExpandedLinks, FilterConfig, Graph, GraphNode, SizeMetric, apply_expansions, build_graph,
};
use crate::layout::auto_scale_factor;
use crate::source::{HolderRecord, InteractionEdge, Transaction};

/// Holders of one tracked token plus the interactions found among them so far.
#[derive(Clone, Debug, PartialEq)]
pub struct TokenDataset {
    pub token_address: String,
    pub chain: Chain,
    pub holders: Vec<HolderRecord>,
    pub interactions: Vec<InteractionEdge>,
}

impl TokenDataset {
    pub fn new(token_address: impl Into<String>, chain: Chain, holders: Vec<HolderRecord>) -> Self {
        Self {
            token_address: token_address.into(),
            chain,
            holders,
            interactions: Vec::new(),
        }
    }

    pub fn token_id(&self) -> String {
        canonical_id(&self.token_address)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeletedNode {
    pub node: GraphNode,
    pub deleted_at: DateTime<Utc>,
    pub was_main: bool,
}

/// User overrides keyed by canonical id. They survive token removal.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeOverrides {
    pub custom_labels: HashMap<String, String>,
    pub custom_highlights: HashMap<String, String>,
    pub locked: HashSet<String>,
    pub deleted: HashSet<String>,
    pub deleted_snapshots: BTreeMap<String, DeletedNode>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Revisions {
    /// Node set or node attributes.
    pub structure: u64,
    /// Edges only.
    pub interactions: u64,
    pub locks: u64,
}

#[derive(Debug, Default)]
pub struct Session {
    datasets: Vec<TokenDataset>,
    filters: FilterConfig,
    overrides: NodeOverrides,
    expanded: ExpandedLinks,
    revisions: Revisions,
    evicted: Vec<String>,
}

impl Session {
    pub fn new(filters: FilterConfig) -> Self {
        Self {
            filters,
            ..Self::default()
        }
    }

    pub fn datasets(&self) -> &[TokenDataset] {
        &self.datasets
    }

    pub fn filters(&self) -> &FilterConfig {
        &self.filters
    }

    pub fn overrides(&self) -> &NodeOverrides {
        &self.overrides
    }

    pub fn expanded(&self) -> &ExpandedLinks {
        &self.expanded
    }

    pub fn revisions(&self) -> Revisions {
        self.revisions
    }

    pub fn is_tracked(&self, token_address: &str) -> bool {
        self.dataset_index(token_address).is_some()
    }

    /// Adds a freshly fetched token, replacing an earlier load of the same address.
    pub fn track_token(&mut self, dataset: TokenDataset) {
        info!(
            token = %dataset.token_address,
            chain = %dataset.chain,
            holders = dataset.holders.len(),
            "tracking token"
        );
        match self.dataset_index(&dataset.token_address) {
            Some(index) => self.datasets[index] = dataset,
            None => self.datasets.push(dataset),
        }
        self.revisions.structure += 1;
    }

    /// Drops a tracked token and returns the ids no other token still holds.
    pub fn remove_token(&mut self, token_address: &str) -> Vec<String> {
        let Some(index) = self.dataset_index(token_address) else {
            return Vec::new();
        };
        let removed = self.datasets.remove(index);

        let still_held = self
            .datasets
            .iter()
            .flat_map(|dataset| {
                dataset
                    .holders
                    .iter()
                    .map(HolderRecord::id)
                    .chain(std::iter::once(dataset.token_id()))
            })
            .collect::<HashSet<_>>();

        let mut exclusive = removed
            .holders
            .iter()
            .map(HolderRecord::id)
            .chain(std::iter::once(removed.token_id()))
            .filter(|id| !still_held.contains(id))
            .collect::<Vec<_>>();
        exclusive.sort_unstable();
        exclusive.dedup();

        info!(
            token = %removed.token_address,
            evicted = exclusive.len(),
            "removed tracked token"
        );
        self.evicted.extend(exclusive.iter().cloned());
        self.revisions.structure += 1;
        exclusive
    }

    /// Appends a batch of edges. Batches for tokens that are no longer tracked are ignored.
    pub fn append_interactions(&mut self, token_address: &str, edges: Vec<InteractionEdge>) -> bool {
        let Some(index) = self.dataset_index(token_address) else {
            debug!(token = token_address, "ignoring interactions for untracked token");
            return false;
        };
        if edges.is_empty() {
            return false;
        }
        self.datasets[index].interactions.extend(edges);
        self.revisions.interactions += 1;
        true
    }

    /// Display-only changes are stored without touching the revisions.
    pub fn set_filters(&mut self, filters: FilterConfig) -> bool {
        if self.filters == filters {
            return false;
        }
        if self.filters.changes_graph(&filters) {
            self.revisions.structure += 1;
        }
        self.filters = filters;
        true
    }

    /// Switching to the uniform metric resets the scale factor to 1.
    pub fn set_size_metric(&mut self, metric: SizeMetric) -> bool {
        let mut filters = self.filters.clone();
        filters.size_metric = metric;
        if metric == SizeMetric::Uniform {
            filters.scale_factor = 1.0;
        }
        self.set_filters(filters)
    }

    /// Suggested scale factor for the largest holder of the active metric.
    pub fn auto_scale_factor(&self) -> f32 {
        let metric = self.filters.size_metric;
        let max_value = self
            .datasets
            .iter()
            .flat_map(|dataset| &dataset.holders)
            .map(|holder| match metric {
                SizeMetric::TokenAmount | SizeMetric::Uniform => holder.token_amount,
                SizeMetric::ValueUsd => holder.value_usd,
                SizeMetric::OwnershipPercentage => holder.ownership_percentage,
            })
            .fold(0.0, f64::max);
        auto_scale_factor(max_value, metric)
    }

    pub fn apply_auto_scale(&mut self) -> bool {
        if self.datasets.is_empty() {
            return false;
        }
        let mut filters = self.filters.clone();
        filters.set_scale_factor(self.auto_scale_factor());
        self.set_filters(filters)
    }

    /// Current graph: builder output with expanded pairs split into transaction links.
    pub fn processed_data(&self) -> Graph {
        let mut graph = build_graph(&self.datasets, &self.filters, &self.overrides);
        graph.links = apply_expansions(std::mem::take(&mut graph.links), &self.expanded);
        graph
    }

    /// Ids whose positions should be forgotten, drained by the controller.
    pub fn take_evicted(&mut self) -> Vec<String> {
        std::mem::take(&mut self.evicted)
    }

    /// Soft-deletes a node. Deleting a main token node drops the whole token.
    pub fn delete_node(&mut self, id: &str, is_main_token: bool) -> bool {
        let id = canonical_id(id);
        if !is_main_token && self.overrides.deleted.contains(&id) {
            return false;
        }

        let graph = self.processed_data();
        if let Some(node) = graph.node(&id) {
            self.overrides.deleted_snapshots.insert(
                id.clone(),
                DeletedNode {
                    node: node.clone(),
                    deleted_at: Utc::now(),
                    was_main: is_main_token,
                },
            );
        }

        if is_main_token {
            let token_address = self
                .datasets
                .iter()
                .find(|dataset| dataset.token_id() == id)
                .map(|dataset| dataset.token_address.clone());
            return match token_address {
                Some(token_address) => {
                    self.remove_token(&token_address);
                    true
                }
                None => false,
            };
        }

        debug!(node = %id, "soft-deleting node");
        self.overrides.deleted.insert(id);
        self.revisions.structure += 1;
        true
    }

    /// Restores a soft-deleted node. A deleted token only loses its snapshot; the token
    /// itself has to be loaded again.
    pub fn restore_node(&mut self, id: &str) -> bool {
        let id = canonical_id(id);
        let snapshot = self.overrides.deleted_snapshots.remove(&id);
        if snapshot.as_ref().is_some_and(|deleted| deleted.was_main) {
            info!(token = %id, "deleted token must be loaded again to restore it");
            return true;
        }
        let restored = self.overrides.deleted.remove(&id);
        if restored {
            self.revisions.structure += 1;
        }
        restored || snapshot.is_some()
    }

    pub fn restore_all(&mut self) -> bool {
        if self.overrides.deleted.is_empty() && self.overrides.deleted_snapshots.is_empty() {
            return false;
        }
        let had_hidden = !self.overrides.deleted.is_empty();
        self.overrides.deleted.clear();
        self.overrides.deleted_snapshots.clear();
        if had_hidden {
            self.revisions.structure += 1;
        }
        true
    }

    /// Drops the snapshot but keeps the node hidden.
    pub fn forget_deleted(&mut self, id: &str) -> bool {
        self.overrides
            .deleted_snapshots
            .remove(&canonical_id(id))
            .is_some()
    }

    pub fn forget_all_deleted(&mut self) -> bool {
        let had_any = !self.overrides.deleted_snapshots.is_empty();
        self.overrides.deleted_snapshots.clear();
        had_any
    }

    /// An empty label clears the override.
    pub fn set_custom_label(&mut self, id: &str, label: &str) -> bool {
        let id = canonical_id(id);
        let label = label.trim();
        let changed = if label.is_empty() {
            self.overrides.custom_labels.remove(&id).is_some()
        } else {
            self.overrides.custom_labels.insert(id, label.to_owned()).as_deref() != Some(label)
        };
        if changed {
            self.revisions.structure += 1;
        }
        changed
    }

    /// `None` clears the highlight.
    pub fn set_custom_highlight(&mut self, id: &str, color: Option<&str>) -> bool {
        let id = canonical_id(id);
        let changed = match color {
            Some(color) => {
                self.overrides
                    .custom_highlights
                    .insert(id, color.to_owned())
                    .as_deref()
                    != Some(color)
            }
            None => self.overrides.custom_highlights.remove(&id).is_some(),
        };
        if changed {
            self.revisions.structure += 1;
        }
        changed
    }

    pub fn set_locked(&mut self, id: &str, locked: bool) -> bool {
        let id = canonical_id(id);
        let changed = if locked {
            self.overrides.locked.insert(id)
        } else {
            self.overrides.locked.remove(&id)
        };
        if changed {
            self.revisions.locks += 1;
        }
        changed
    }

    /// Flips the lock and returns the new state.
    pub fn toggle_lock(&mut self, id: &str) -> bool {
        let locked = !self.overrides.locked.contains(&canonical_id(id));
        self.set_locked(id, locked);
        locked
    }

    pub fn is_locked(&self, id: &str) -> bool {
        self.overrides.locked.contains(&canonical_id(id))
    }

    pub fn expand_link(&mut self, a: &str, b: &str, transactions: Vec<Transaction>) -> bool {
        let changed = self.expanded.insert(a, b, transactions);
        if changed {
            self.revisions.interactions += 1;
        }
        changed
    }

    pub fn collapse_link(&mut self, a: &str, b: &str) -> bool {
        let changed = self.expanded.collapse(a, b);
        if changed {
            self.revisions.interactions += 1;
        }
        changed
    }

    fn dataset_index(&self, token_address: &str) -> Option<usize> {
        let id = canonical_id(token_address);
        self.datasets
            .iter()
            .position(|dataset| dataset.token_id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::LabelMode;

    fn session_with(token: &str, holders: &[(&str, f64)]) -> Session {
        let mut session = Session::default();
        session.track_token(TokenDataset::new(
            token,
            Chain::Solana,
            holders
                .iter()
                .map(|(address, amount)| HolderRecord::new(*address, *amount))
                .collect(),
        ));
        session
    }

    #[test]
    fn delete_then_restore_returns_the_same_graph() {
        let mut session = session_with("T", &[("A", 100.0), ("B", 50.0)]);
        session.append_interactions("T", vec![InteractionEdge::new("A", "B", 1.0, 2.0)]);
        let before = session.processed_data();

        assert!(session.delete_node("B", false));
        let hidden = session.processed_data();
        assert!(hidden.node("b").is_none());
        assert!(hidden.links.is_empty());
        assert!(session.overrides().deleted_snapshots.contains_key("b"));

        assert!(session.restore_node("b"));
        assert_eq!(session.processed_data(), before);
        assert!(session.overrides().deleted_snapshots.is_empty());
    }

    #[test]
    fn commands_are_idempotent() {
        let mut session = session_with("T", &[("A", 100.0)]);

        assert!(session.delete_node("A", false));
        assert!(!session.delete_node("a", false));
        assert!(session.restore_node("A"));
        assert!(!session.restore_node("A"));
        assert!(session.set_custom_label("A", "whale"));
        assert!(!session.set_custom_label("a", "whale"));
        assert!(session.set_custom_highlight("A", Some("#ff0000")));
        assert!(!session.set_custom_highlight("A", Some("#ff0000")));
        assert!(!session.restore_all());
    }

    #[test]
    fn forgetting_keeps_the_node_hidden() {
        let mut session = session_with("T", &[("A", 100.0)]);
        session.delete_node("A", false);

        assert!(session.forget_deleted("A"));
        assert!(session.processed_data().nodes.is_empty());
        assert!(session.restore_all());
        assert_eq!(session.processed_data().nodes.len(), 1);
    }

    #[test]
    fn late_batch_for_removed_token_is_ignored() {
        let mut session = session_with("T", &[("A", 100.0), ("B", 50.0)]);
        session.remove_token("t");
        let revisions = session.revisions();

        assert!(!session.append_interactions("T", vec![InteractionEdge::new("A", "B", 1.0, 1.0)]));
        assert_eq!(session.revisions(), revisions);
        assert!(session.datasets().is_empty());
    }

    #[test]
    fn removing_a_token_evicts_only_its_own_holders() {
        let mut session = session_with("T1", &[("A", 1.0), ("shared", 1.0)]);
        session.track_token(TokenDataset::new(
            "T2",
            Chain::Solana,
            vec![HolderRecord::new("SHARED", 1.0)],
        ));

        let evicted = session.remove_token("T1");

        assert_eq!(evicted, vec!["a".to_owned(), "t1".to_owned()]);
        assert_eq!(session.take_evicted(), evicted);
        assert!(session.take_evicted().is_empty());
    }

    #[test]
    fn deleting_a_main_node_removes_its_token() {
        let mut session = Session::new(FilterConfig {
            token_hubs: true,
            ..FilterConfig::default()
        });
        session.track_token(TokenDataset::new(
            "Tok",
            Chain::Solana,
            vec![HolderRecord::new("A", 1.0)],
        ));

        assert!(session.delete_node("tok", true));
        assert!(session.datasets().is_empty());
        assert!(session.overrides().deleted_snapshots["tok"].was_main);
        assert!(session.restore_node("tok"));
        assert!(session.processed_data().nodes.is_empty());
    }

    #[test]
    fn edge_batches_and_locks_bump_their_own_revision() {
        let mut session = session_with("T", &[("A", 1.0), ("B", 1.0)]);
        let start = session.revisions();

        session.append_interactions("T", vec![InteractionEdge::new("A", "B", 1.0, 1.0)]);
        assert!(session.toggle_lock("A"));
        assert!(!session.toggle_lock("A"));

        let now = session.revisions();
        assert_eq!(now.structure, start.structure);
        assert_eq!(now.interactions, start.interactions + 1);
        assert_eq!(now.locks, start.locks + 2);
    }

    #[test]
    fn display_filters_leave_revisions_alone() {
        let mut session = session_with("T", &[("A", 1.0)]);
        let start = session.revisions();

        let filters = FilterConfig {
            label_mode: LabelMode::Label,
            highlight_shared: true,
            ..session.filters().clone()
        };
        assert!(session.set_filters(filters));
        assert_eq!(session.filters().label_mode, LabelMode::Label);
        assert_eq!(session.revisions(), start);

        let filters = FilterConfig {
            show_exchanges: false,
            ..session.filters().clone()
        };
        assert!(session.set_filters(filters));
        assert_eq!(session.revisions().structure, start.structure + 1);
    }

    #[test]
    fn uniform_metric_resets_scale() {
        let mut session = session_with("T", &[("A", 2_000_000.0)]);
        assert_eq!(session.auto_scale_factor(), 0.5);
        session.apply_auto_scale();
        assert_eq!(session.filters().scale_factor, 0.5);

        session.set_size_metric(SizeMetric::Uniform);
        assert_eq!(session.filters().scale_factor, 1.0);
        assert_eq!(session.auto_scale_factor(), 1.0);
    }
}
