use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SizeMetric {
    #[default]
    TokenAmount,
    ValueUsd,
    OwnershipPercentage,
    Uniform,
}

impl SizeMetric {
    pub const ALL: [SizeMetric; 4] = [
        Self::TokenAmount,
        Self::ValueUsd,
        Self::OwnershipPercentage,
        Self::Uniform,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::TokenAmount => "Token Amount",
            Self::ValueUsd => "Value USD",
            Self::OwnershipPercentage => "Ownership %",
            Self::Uniform => "Uniform",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelMode {
    #[default]
    Address,
    Label,
}

pub const MIN_SCALE_FACTOR: f32 = 0.1;
pub const MAX_SCALE_FACTOR: f32 = 2.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub size_metric: SizeMetric,
    pub show_smart_contracts: bool,
    pub show_exchanges: bool,
    /// Inclusive lower bound on the size metric; `None` leaves the range open.
    pub range_min: Option<f64>,
    pub range_max: Option<f64>,
    pub scale_factor: f32,
    pub label_mode: LabelMode,
    pub highlight_shared: bool,
    /// Adds one main node per tracked token for its holders to orbit.
    pub token_hubs: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            size_metric: SizeMetric::TokenAmount,
            show_smart_contracts: true,
            show_exchanges: true,
            range_min: Some(1.0),
            range_max: None,
            scale_factor: 1.0,
            label_mode: LabelMode::Address,
            highlight_shared: false,
            token_hubs: false,
        }
    }
}

impl FilterConfig {
    pub fn set_scale_factor(&mut self, scale_factor: f32) {
        self.scale_factor = scale_factor.clamp(MIN_SCALE_FACTOR, MAX_SCALE_FACTOR);
    }

    /// Whether moving to `other` changes what the builder produces. Label mode and shared
    /// highlighting are read by the painter only.
    pub fn changes_graph(&self, other: &Self) -> bool {
        let layout_inputs = |filters: &Self| Self {
            label_mode: LabelMode::default(),
            highlight_shared: false,
            ..filters.clone()
        };
        layout_inputs(self) != layout_inputs(other)
    }

    /// Range bounds only apply to proportional metrics.
    pub fn within_range(&self, value: f64) -> bool {
        if self.size_metric == SizeMetric::Uniform {
            return true;
        }
        if self.range_min.is_some_and(|min| value < min) {
            return false;
        }
        !self.range_max.is_some_and(|max| value > max)
    }
}

/// Parses a range text field. Blank means unbounded; garbage is logged and ignored.
pub fn parse_bound(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => {
            warn!(input = trimmed, "ignoring unparsable range bound");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_bounds_accept_everything() {
        let filters = FilterConfig {
            range_min: parse_bound(""),
            range_max: parse_bound("  "),
            ..FilterConfig::default()
        };
        assert!(filters.within_range(0.0));
        assert!(filters.within_range(f64::MAX));
    }

    #[test]
    fn bounds_are_inclusive() {
        let filters = FilterConfig {
            range_min: parse_bound("10"),
            range_max: parse_bound("20"),
            ..FilterConfig::default()
        };
        assert!(!filters.within_range(5.0));
        assert!(filters.within_range(10.0));
        assert!(filters.within_range(20.0));
        assert!(!filters.within_range(20.5));
    }

    #[test]
    fn uniform_metric_ignores_range() {
        let filters = FilterConfig {
            size_metric: SizeMetric::Uniform,
            range_min: Some(1_000.0),
            ..FilterConfig::default()
        };
        assert!(filters.within_range(1.0));
    }

    #[test]
    fn display_toggles_do_not_change_the_graph() {
        let filters = FilterConfig::default();
        let display = FilterConfig {
            label_mode: LabelMode::Label,
            highlight_shared: true,
            ..FilterConfig::default()
        };
        assert!(!filters.changes_graph(&display));

        let hubs = FilterConfig {
            token_hubs: true,
            ..display.clone()
        };
        assert!(display.changes_graph(&hubs));
    }

    #[test]
    fn scale_factor_is_clamped() {
        let mut filters = FilterConfig::default();
        filters.set_scale_factor(5.0);
        assert_eq!(filters.scale_factor, MAX_SCALE_FACTOR);
        filters.set_scale_factor(0.0);
        assert_eq!(filters.scale_factor, MIN_SCALE_FACTOR);
        assert_eq!(parse_bound("abc"), None);
    }
}
