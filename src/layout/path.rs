use eframe::egui::{Vec2, vec2};

use crate::graph::{GraphLink, LinkKind};

use super::SimNode;

const MAIN_CURVATURE: f32 = 0.3;
const MAIN_ARROW_T: f32 = 0.95;
const FAN_SPREAD: f32 = 1.0;
const FAN_BASE_DISTANCE: f32 = 25.0;
const FAN_DISTANCE_STEP: f32 = 40.0;

/// Drawable geometry of one link in world coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LinkPath {
    /// An endpoint is not in the simulation.
    Empty,
    Line { from: Vec2, to: Vec2 },
    Curve { from: Vec2, control: Vec2, to: Vec2 },
}

impl LinkPath {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Point at parameter `t` in `[0, 1]`.
    pub fn point_at(&self, t: f32) -> Option<Vec2> {
        match *self {
            Self::Empty => None,
            Self::Line { from, to } => Some(from + (to - from) * t),
            Self::Curve { from, control, to } => Some(quadratic(from, control, to, t)),
        }
    }
}

fn quadratic(from: Vec2, control: Vec2, to: Vec2, t: f32) -> Vec2 {
    let rest = 1.0 - t;
    from * (rest * rest) + control * (2.0 * rest * t) + to * (t * t)
}

/// Endpoints trimmed to the two bubbles' rims, or `None` when the bubbles coincide.
fn rim_points(source: &SimNode, target: &SimNode) -> Option<(Vec2, Vec2, Vec2, f32)> {
    let delta = target.pos - source.pos;
    let length = delta.length();
    if length < f32::EPSILON {
        return None;
    }
    let start = source.pos + delta * (source.radius / length);
    let end = target.pos - delta * (target.radius / length);
    Some((start, end, delta, length))
}

pub fn link_path(link: &GraphLink, source: Option<&SimNode>, target: Option<&SimNode>) -> LinkPath {
    let (Some(source), Some(target)) = (source, target) else {
        return LinkPath::Empty;
    };
    let straight = LinkPath::Line {
        from: source.pos,
        to: target.pos,
    };

    if source.is_main && target.is_main {
        let Some((start, end, delta, _)) = rim_points(source, target) else {
            return straight;
        };
        let middle = (start + end) * 0.5;
        let control = middle + vec2(delta.y, -delta.x) * MAIN_CURVATURE;
        return LinkPath::Curve {
            from: start,
            control,
            to: quadratic(start, control, end, MAIN_ARROW_T),
        };
    }

    let LinkKind::Transaction {
        transaction_index,
        total_transactions,
        ..
    } = link.kind
    else {
        return straight;
    };
    if total_transactions <= 1 {
        return straight;
    }
    let Some((start, end, delta, length)) = rim_points(source, target) else {
        return straight;
    };

    let step = FAN_SPREAD / (total_transactions - 1) as f32;
    let offset = transaction_index as f32 * step - FAN_SPREAD / 2.0;
    let side = if offset < 0.0 { -1.0 } else { 1.0 };
    let normal = vec2(-delta.y, delta.x) / length;
    let bend = FAN_BASE_DISTANCE + offset.abs() * FAN_DISTANCE_STEP;

    LinkPath::Curve {
        from: start,
        control: (start + end) * 0.5 + normal * (bend * side),
        to: end,
    }
}
