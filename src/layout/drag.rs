use eframe::egui::Vec2;

use super::SimNode;

/// Relative placement of a satellite at the moment its hub was grabbed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CapturedSatellite {
    pub index: usize,
    pub angle: f32,
    pub distance: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DragState {
    pub node: usize,
    /// Pointer position at drag start.
    pub start: Vec2,
    /// Pointer minus node centre at drag start.
    pub grab_offset: Vec2,
    /// Set once the pointer travelled past the click threshold.
    pub moved: bool,
    pub satellites: Vec<CapturedSatellite>,
}

/// Returned by [`Simulation::drag_end`](super::Simulation::drag_end).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DragOutcome {
    pub id: String,
    /// The node was moved far enough to be locked in place.
    pub locked: bool,
}

/// Free ordinary nodes that belong to `hub`'s token.
pub(super) fn capture_satellites(nodes: &[SimNode], hub: usize) -> Vec<CapturedSatellite> {
    let Some(hub_node) = nodes.get(hub) else {
        return Vec::new();
    };
    nodes
        .iter()
        .enumerate()
        .filter(|(_, node)| {
            !node.is_main && !node.locked && node.connected_tokens.contains(&hub_node.id)
        })
        .map(|(index, node)| {
            let offset = node.pos - hub_node.pos;
            CapturedSatellite {
                index,
                angle: offset.y.atan2(offset.x),
                distance: offset.length(),
            }
        })
        .collect()
}
