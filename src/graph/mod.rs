//! Holder graph: node/link types and the builder that derives them from session data.

mod build;
mod expand;
mod filter;

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::source::Transaction;

pub use build::{build_graph, is_exchange, is_smart_contract, truncated_address};
pub use expand::{ExpandedLinks, apply_expansions, direction_hint, pair_id};
pub use filter::{
    FilterConfig, LabelMode, MAX_SCALE_FACTOR, MIN_SCALE_FACTOR, SizeMetric, parse_bound,
};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub address: String,
    pub label: String,
    pub has_custom_label: bool,
    pub address_label: Option<String>,
    pub is_main: bool,
    pub token_amount: f64,
    pub value_usd: f64,
    pub ownership_percentage: f64,
    pub total_inflow: f64,
    pub total_outflow: f64,
    pub balance_change_24h: f64,
    pub balance_change_7d: f64,
    pub balance_change_30d: f64,
    pub connected_tokens: BTreeSet<String>,
    pub is_smart_contract: bool,
    pub is_exchange: bool,
    pub custom_highlight: Option<String>,
    pub locked: bool,
}

impl GraphNode {
    /// Raw value of the metric, before any radius transform.
    pub fn metric(&self, metric: SizeMetric) -> f64 {
        match metric {
            SizeMetric::TokenAmount => self.token_amount,
            SizeMetric::ValueUsd => self.value_usd,
            SizeMetric::OwnershipPercentage => self.ownership_percentage,
            SizeMetric::Uniform => 0.0,
        }
    }

    pub fn is_shared(&self) -> bool {
        self.connected_tokens.len() > 1
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum LinkDirection {
    Incoming,
    Outgoing,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum LinkKind {
    Aggregated {
        value: f64,
        volume_in: f64,
        volume_out: f64,
    },
    Transaction {
        transaction: Transaction,
        direction: LinkDirection,
        link_id: String,
        transaction_index: usize,
        total_transactions: usize,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
    pub kind: LinkKind,
}

/// Identity of a drawn link, used to diff link sets across rebuilds.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkKey {
    pub source: String,
    pub target: String,
    pub transaction_index: Option<usize>,
}

impl GraphLink {
    pub fn aggregated(source: String, target: String, value: f64, volume_in: f64, volume_out: f64) -> Self {
        Self {
            source,
            target,
            kind: LinkKind::Aggregated {
                value,
                volume_in,
                volume_out,
            },
        }
    }

    pub fn value(&self) -> f64 {
        match &self.kind {
            LinkKind::Aggregated { value, .. } => *value,
            LinkKind::Transaction {
                transaction,
                direction,
                ..
            } => match direction {
                LinkDirection::Outgoing => -transaction.volume_usd.abs(),
                LinkDirection::Incoming => transaction.volume_usd.abs(),
            },
        }
    }

    pub fn is_transaction(&self) -> bool {
        matches!(self.kind, LinkKind::Transaction { .. })
    }

    pub fn key(&self) -> LinkKey {
        let transaction_index = match &self.kind {
            LinkKind::Aggregated { .. } => None,
            LinkKind::Transaction {
                transaction_index, ..
            } => Some(*transaction_index),
        };
        LinkKey {
            source: self.source.clone(),
            target: self.target.clone(),
            transaction_index,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
    pub index: HashMap<String, usize>,
}

impl Graph {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index.get(id).and_then(|&index| self.nodes.get(index))
    }

    pub fn node_ids(&self) -> BTreeSet<String> {
        self.nodes.iter().map(|node| node.id.clone()).collect()
    }

    pub fn link_keys(&self) -> BTreeSet<LinkKey> {
        self.links.iter().map(GraphLink::key).collect()
    }
}
