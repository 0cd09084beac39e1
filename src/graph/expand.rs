use std::collections::HashMap;

use crate::address::canonical_id;
use crate::source::Transaction;

use super::{GraphLink, LinkDirection, LinkKind};

/// Order-independent id of the pair `a`/`b`.
pub fn pair_id(a: &str, b: &str) -> String {
    let (a, b) = (canonical_id(a), canonical_id(b));
    if a <= b {
        format!("{a}-{b}")
    } else {
        format!("{b}-{a}")
    }
}

/// Display hint only; the transactions endpoint does not say which side sent.
pub fn direction_hint(transaction: &Transaction) -> LinkDirection {
    if transaction.volume_usd < 0.0 {
        LinkDirection::Outgoing
    } else {
        LinkDirection::Incoming
    }
}

/// Pairs whose aggregated link is currently shown as individual transactions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExpandedLinks {
    pairs: HashMap<String, Vec<Transaction>>,
}

impl ExpandedLinks {
    pub fn insert(&mut self, a: &str, b: &str, transactions: Vec<Transaction>) -> bool {
        let id = pair_id(a, b);
        if self.pairs.get(&id) == Some(&transactions) {
            return false;
        }
        self.pairs.insert(id, transactions);
        true
    }

    pub fn collapse(&mut self, a: &str, b: &str) -> bool {
        self.pairs.remove(&pair_id(a, b)).is_some()
    }

    pub fn is_expanded(&self, a: &str, b: &str) -> bool {
        self.pairs.contains_key(&pair_id(a, b))
    }

    pub fn transactions(&self, a: &str, b: &str) -> Option<&[Transaction]> {
        self.pairs.get(&pair_id(a, b)).map(Vec::as_slice)
    }

    pub fn clear(&mut self) {
        self.pairs.clear();
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Replaces each expanded aggregated link with one link per transaction.
///
/// Pairs expanded with an empty transaction list keep their aggregated link.
pub fn apply_expansions(links: Vec<GraphLink>, expanded: &ExpandedLinks) -> Vec<GraphLink> {
    if expanded.is_empty() {
        return links;
    }

    let mut out = Vec::with_capacity(links.len());
    for link in links {
        let transactions = match (&link.kind, expanded.transactions(&link.source, &link.target)) {
            (LinkKind::Aggregated { .. }, Some(transactions)) if !transactions.is_empty() => {
                transactions
            }
            _ => {
                out.push(link);
                continue;
            }
        };

        let link_id = pair_id(&link.source, &link.target);
        let total_transactions = transactions.len();
        out.extend(transactions.iter().enumerate().map(|(transaction_index, transaction)| {
            GraphLink {
                source: link.source.clone(),
                target: link.target.clone(),
                kind: LinkKind::Transaction {
                    transaction: transaction.clone(),
                    direction: direction_hint(transaction),
                    link_id: link_id.clone(),
                    transaction_index,
                    total_transactions,
                },
            }
        }));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transaction(volume_usd: f64) -> Transaction {
        Transaction {
            transaction_hash: None,
            block_timestamp: None,
            volume_usd,
            token_symbol: Some("TKN".to_owned()),
        }
    }

    #[test]
    fn pair_id_ignores_order_and_case() {
        assert_eq!(pair_id("B", "a"), "a-b");
        assert_eq!(pair_id("a", "B"), "a-b");
    }

    #[test]
    fn expanded_pair_replaces_its_aggregated_link() {
        let links = vec![
            GraphLink::aggregated("a".into(), "b".into(), 15.0, 10.0, 5.0),
            GraphLink::aggregated("a".into(), "c".into(), 2.0, 1.0, 1.0),
        ];
        let mut expanded = ExpandedLinks::default();
        assert!(expanded.insert("B", "A", vec![transaction(-4.0), transaction(7.0)]));

        let links = apply_expansions(links, &expanded);

        assert_eq!(links.len(), 3);
        let ab = links.iter().filter(|link| link.target == "b").collect::<Vec<_>>();
        assert!(ab.iter().all(|link| link.is_transaction()));
        assert_eq!(ab[0].value(), -4.0);
        assert_eq!(ab[1].value(), 7.0);
        assert!(!links[2].is_transaction());
    }

    #[test]
    fn empty_expansion_keeps_aggregated_link() {
        let links = vec![GraphLink::aggregated("a".into(), "b".into(), 15.0, 10.0, 5.0)];
        let mut expanded = ExpandedLinks::default();
        expanded.insert("a", "b", Vec::new());

        let links = apply_expansions(links, &expanded);
        assert_eq!(links.len(), 1);
        assert!(!links[0].is_transaction());
    }

    #[test]
    fn insert_and_collapse_are_idempotent() {
        let mut expanded = ExpandedLinks::default();
        assert!(expanded.insert("a", "b", vec![transaction(1.0)]));
        assert!(!expanded.insert("b", "a", vec![transaction(1.0)]));
        assert!(expanded.collapse("a", "b"));
        assert!(!expanded.collapse("a", "b"));
        assert!(expanded.is_empty());
    }
}
