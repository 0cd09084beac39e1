use crate::graph::{GraphNode, SizeMetric};

pub const UNIFORM_RADIUS: f32 = 48.0;
pub const MAIN_RADIUS: f32 = 24.0;
const MIN_RADIUS: f32 = 5.0;
const OWNERSHIP_SCALE: f64 = 1_000.0;
const MAIN_COLLISION_MULTIPLIER: f32 = 4.0;
const COLLISION_PADDING: f32 = 2.0;

/// Drawn radius of a node under the active metric and scale factor.
pub fn node_radius(node: &GraphNode, metric: SizeMetric, scale_factor: f32) -> f32 {
    if node.is_main {
        return MAIN_RADIUS * scale_factor;
    }
    let value = match metric {
        SizeMetric::Uniform => return UNIFORM_RADIUS * scale_factor,
        SizeMetric::OwnershipPercentage => node.ownership_percentage * OWNERSHIP_SCALE,
        other => node.metric(other),
    };
    let base = (value.abs().sqrt() / 10.0) as f32 + MIN_RADIUS;
    base * scale_factor
}

pub fn collision_radius(radius: f32, is_main: bool) -> f32 {
    if is_main {
        radius * MAIN_COLLISION_MULTIPLIER
    } else {
        radius + COLLISION_PADDING
    }
}

/// Scale factor that keeps the largest bubble on screen.
pub fn auto_scale_factor(max_value: f64, metric: SizeMetric) -> f32 {
    if metric == SizeMetric::Uniform {
        return 1.0;
    }
    match max_value {
        value if value > 10_000_000.0 => 0.1,
        value if value > 5_000_000.0 => 0.4,
        value if value > 1_000_000.0 => 0.5,
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn node(token_amount: f64, ownership_percentage: f64) -> GraphNode {
        GraphNode {
            id: "a".into(),
            address: "a".into(),
            label: "a".into(),
            has_custom_label: false,
            address_label: None,
            is_main: false,
            token_amount,
            value_usd: -400.0,
            ownership_percentage,
            total_inflow: 0.0,
            total_outflow: 0.0,
            balance_change_24h: 0.0,
            balance_change_7d: 0.0,
            balance_change_30d: 0.0,
            connected_tokens: BTreeSet::new(),
            is_smart_contract: false,
            is_exchange: false,
            custom_highlight: None,
            locked: false,
        }
    }

    #[test]
    fn radius_follows_square_root_of_metric() {
        let holder = node(10_000.0, 0.1);
        assert_eq!(node_radius(&holder, SizeMetric::TokenAmount, 1.0), 15.0);
        assert_eq!(node_radius(&holder, SizeMetric::TokenAmount, 0.5), 7.5);
        assert_eq!(node_radius(&holder, SizeMetric::ValueUsd, 1.0), 7.0);
        assert_eq!(node_radius(&holder, SizeMetric::OwnershipPercentage, 1.0), 6.0);
        assert_eq!(node_radius(&holder, SizeMetric::Uniform, 2.0), 96.0);
    }

    #[test]
    fn main_nodes_collide_wider() {
        assert_eq!(collision_radius(10.0, true), 40.0);
        assert_eq!(collision_radius(10.0, false), 12.0);
    }

    #[test]
    fn auto_scale_thresholds() {
        assert_eq!(auto_scale_factor(40_000_000.0, SizeMetric::TokenAmount), 0.1);
        assert_eq!(auto_scale_factor(10_000_001.0, SizeMetric::TokenAmount), 0.1);
        assert_eq!(auto_scale_factor(10_000_000.0, SizeMetric::TokenAmount), 0.4);
        assert_eq!(auto_scale_factor(2_000_000.0, SizeMetric::ValueUsd), 0.5);
        assert_eq!(auto_scale_factor(1_000_000.0, SizeMetric::TokenAmount), 1.0);
        assert_eq!(auto_scale_factor(500_000.0, SizeMetric::TokenAmount), 1.0);
        assert_eq!(auto_scale_factor(1e12, SizeMetric::Uniform), 1.0);
    }
}
