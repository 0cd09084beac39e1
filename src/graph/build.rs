use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::address::canonical_id;
use crate::session::{NodeOverrides, TokenDataset};
use crate::source::HolderRecord;

use super::{FilterConfig, Graph, GraphLink, GraphNode};

const SMART_CONTRACT_MARKERS: [&str; 2] = ["Contract", "🤖"];
const EXCHANGE_MARKER: &str = "🏦";

pub fn is_smart_contract(label: Option<&str>) -> bool {
    label.is_some_and(|label| SMART_CONTRACT_MARKERS.iter().any(|marker| label.contains(marker)))
}

pub fn is_exchange(label: Option<&str>) -> bool {
    label.is_some_and(|label| {
        label.to_lowercase().contains("exchange") || label.contains(EXCHANGE_MARKER)
    })
}

/// `0x1234...abcd` style preview.
pub fn truncated_address(address: &str) -> String {
    let chars = address.chars().collect::<Vec<_>>();
    if chars.len() <= 10 {
        return address.to_owned();
    }
    let head = chars[..6].iter().collect::<String>();
    let tail = chars[chars.len() - 4..].iter().collect::<String>();
    format!("{head}...{tail}")
}

/// Derives the node/link graph from tracked datasets.
///
/// Pure in its inputs. Node order follows dataset and holder order but carries no
/// meaning; callers key everything by `id`.
pub fn build_graph(
    datasets: &[TokenDataset],
    filters: &FilterConfig,
    overrides: &NodeOverrides,
) -> Graph {
    let mut nodes: Vec<GraphNode> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for dataset in datasets {
        let token_id = dataset.token_id();

        if filters.token_hubs && !overrides.deleted.contains(&token_id) {
            upsert_hub(&mut nodes, &mut index, dataset, &token_id, overrides);
        }

        for holder in &dataset.holders {
            let id = holder.id();
            if !holder_visible(&id, holder, filters, overrides) {
                continue;
            }

            if let Some(&existing) = index.get(&id) {
                nodes[existing].connected_tokens.insert(token_id.clone());
                continue;
            }

            index.insert(id.clone(), nodes.len());
            nodes.push(holder_node(id, holder, &token_id, overrides));
        }
    }

    let links = collect_links(datasets, &index);
    debug!(nodes = nodes.len(), links = links.len(), "built holder graph");

    Graph {
        nodes,
        links,
        index,
    }
}

fn holder_visible(
    id: &str,
    holder: &HolderRecord,
    filters: &FilterConfig,
    overrides: &NodeOverrides,
) -> bool {
    if overrides.deleted.contains(id) || holder.token_amount == 0.0 {
        return false;
    }

    let label = holder.address_label.as_deref();
    if (!filters.show_smart_contracts && is_smart_contract(label))
        || (!filters.show_exchanges && is_exchange(label))
    {
        return false;
    }

    let metric_value = match filters.size_metric {
        super::SizeMetric::TokenAmount => holder.token_amount,
        super::SizeMetric::ValueUsd => holder.value_usd,
        super::SizeMetric::OwnershipPercentage => holder.ownership_percentage,
        super::SizeMetric::Uniform => 0.0,
    };
    filters.within_range(metric_value)
}

fn holder_node(
    id: String,
    holder: &HolderRecord,
    token_id: &str,
    overrides: &NodeOverrides,
) -> GraphNode {
    let label = holder.address_label.as_deref();
    let custom_label = overrides.custom_labels.get(&id);
    let display = custom_label
        .cloned()
        .or_else(|| label.filter(|label| !label.trim().is_empty()).map(str::to_owned))
        .unwrap_or_else(|| truncated_address(&holder.address));

    GraphNode {
        label: display,
        has_custom_label: custom_label.is_some(),
        address: holder.address.clone(),
        address_label: holder.address_label.clone(),
        is_main: false,
        token_amount: holder.token_amount,
        value_usd: holder.value_usd,
        ownership_percentage: holder.ownership_percentage,
        total_inflow: holder.total_inflow,
        total_outflow: holder.total_outflow,
        balance_change_24h: holder.balance_change_24h,
        balance_change_7d: holder.balance_change_7d,
        balance_change_30d: holder.balance_change_30d,
        connected_tokens: BTreeSet::from([token_id.to_owned()]),
        is_smart_contract: is_smart_contract(label),
        is_exchange: is_exchange(label),
        custom_highlight: overrides.custom_highlights.get(&id).cloned(),
        locked: overrides.locked.contains(&id),
        id,
    }
}

fn upsert_hub(
    nodes: &mut Vec<GraphNode>,
    index: &mut HashMap<String, usize>,
    dataset: &TokenDataset,
    token_id: &str,
    overrides: &NodeOverrides,
) {
    if let Some(&existing) = index.get(token_id) {
        nodes[existing].is_main = true;
        return;
    }

    let custom_label = overrides.custom_labels.get(token_id);
    index.insert(token_id.to_owned(), nodes.len());
    nodes.push(GraphNode {
        id: token_id.to_owned(),
        address: dataset.token_address.clone(),
        label: custom_label
            .cloned()
            .unwrap_or_else(|| truncated_address(&dataset.token_address)),
        has_custom_label: custom_label.is_some(),
        address_label: None,
        is_main: true,
        token_amount: 0.0,
        value_usd: 0.0,
        ownership_percentage: 0.0,
        total_inflow: 0.0,
        total_outflow: 0.0,
        balance_change_24h: 0.0,
        balance_change_7d: 0.0,
        balance_change_30d: 0.0,
        connected_tokens: BTreeSet::from([token_id.to_owned()]),
        is_smart_contract: false,
        is_exchange: false,
        custom_highlight: overrides.custom_highlights.get(token_id).cloned(),
        locked: overrides.locked.contains(token_id),
    });
}

/// Edges whose endpoints are both live nodes, one link per unordered pair.
fn collect_links(datasets: &[TokenDataset], index: &HashMap<String, usize>) -> Vec<GraphLink> {
    let mut seen_pairs = HashSet::new();
    let mut links = Vec::new();
    let mut skipped = 0usize;

    for dataset in datasets {
        for edge in &dataset.interactions {
            let source = canonical_id(&edge.source);
            let target = canonical_id(&edge.target);
            if source == target || !index.contains_key(&source) || !index.contains_key(&target) {
                skipped += 1;
                continue;
            }

            let pair = if source < target {
                (source.clone(), target.clone())
            } else {
                (target.clone(), source.clone())
            };
            if !seen_pairs.insert(pair) {
                continue;
            }

            links.push(GraphLink::aggregated(
                source,
                target,
                edge.total_volume,
                edge.volume_in,
                edge.volume_out,
            ));
        }
    }

    if skipped > 0 {
        debug!(skipped, "dropped interactions without two live endpoints");
    }
    links
}
