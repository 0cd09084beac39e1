//! Force terms of the bubble layout.
//!
//! Every force reads the same node snapshot and returns one velocity delta per node, so the
//! driver can sum them in any order.

use std::f32::consts::TAU;

use eframe::egui::{Vec2, vec2};

use super::drag::DragState;
use super::quadtree::QuadNode;
use super::{SimLink, SimNode};

const MIN_DISTANCE: f32 = 1e-3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PendulumParams {
    pub ideal_distance: f32,
    pub tolerance: f32,
    pub strength: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForceParams {
    pub link_distance: f32,
    pub link_strength: f32,
    /// Negative values repel.
    pub charge_strength: f32,
    pub theta: f32,
    pub center_strength: f32,
    pub collision_strength: f32,
    pub pendulum: PendulumParams,
    pub buffer_multiplier: f32,
    pub buffer_strength: f32,
    pub drag_pull: f32,
    pub drag_stretch_limit: f32,
    pub drag_stretch_pull: f32,
}

impl Default for ForceParams {
    fn default() -> Self {
        Self {
            link_distance: 150.0,
            link_strength: 0.5,
            charge_strength: -300.0,
            theta: 0.9,
            center_strength: 0.05,
            collision_strength: 0.8,
            pendulum: PendulumParams {
                ideal_distance: 220.0,
                tolerance: 40.0,
                strength: 0.4,
            },
            buffer_multiplier: 6.0,
            buffer_strength: 0.5,
            drag_pull: 0.15,
            drag_stretch_limit: 1.3,
            drag_stretch_pull: 0.2,
        }
    }
}

/// Deterministic unit vector for separating coincident nodes `a` and `b`.
/// Antisymmetric: `separation(a, b) == -separation(b, a)`.
fn separation(a: usize, b: usize) -> Vec2 {
    let (low, high, sign) = if a <= b { (a, b, 1.0) } else { (b, a, -1.0) };
    let angle = ((low as f32) * 0.618_034 + (high as f32) * 0.414_214) * TAU;
    vec2(angle.cos(), angle.sin()) * sign
}

fn zeroed(nodes: &[SimNode]) -> Vec<Vec2> {
    vec![Vec2::ZERO; nodes.len()]
}

/// Spring toward `link_distance`, split between the ends by degree.
pub fn link(nodes: &[SimNode], links: &[SimLink], params: &ForceParams, alpha: f32) -> Vec<Vec2> {
    let mut deltas = zeroed(nodes);
    let mut degree = vec![0usize; nodes.len()];
    for link in links {
        degree[link.source] += 1;
        degree[link.target] += 1;
    }

    for link in links {
        let (source, target) = (&nodes[link.source], &nodes[link.target]);
        let mut offset = (target.pos + target.vel) - (source.pos + source.vel);
        if offset.length() < MIN_DISTANCE {
            offset = separation(link.source, link.target) * MIN_DISTANCE;
        }
        let distance = offset.length();
        let pull = offset * ((distance - params.link_distance) / distance * alpha * params.link_strength);

        let bias =
            degree[link.source] as f32 / (degree[link.source] + degree[link.target]) as f32;
        deltas[link.target] -= pull * bias;
        deltas[link.source] += pull * (1.0 - bias);
    }
    deltas
}

/// Barnes–Hut charge between every pair of nodes.
pub(super) fn many_body(
    nodes: &[SimNode],
    tree: Option<&QuadNode>,
    params: &ForceParams,
    alpha: f32,
) -> Vec<Vec2> {
    let mut deltas = zeroed(nodes);
    let Some(tree) = tree else {
        return deltas;
    };
    let strength = params.charge_strength * alpha;
    for (index, delta) in deltas.iter_mut().enumerate() {
        accumulate_charge(tree, index, nodes, strength, params.theta, delta);
    }
    deltas
}

fn accumulate_charge(
    cell: &QuadNode,
    index: usize,
    nodes: &[SimNode],
    strength: f32,
    theta: f32,
    delta: &mut Vec2,
) {
    if cell.mass <= 0.0 {
        return;
    }
    let point = nodes[index].pos;

    if cell.is_leaf() {
        for &other in &cell.indices {
            if other == index {
                continue;
            }
            let offset = nodes[other].pos - point;
            let distance_sq = offset.length_sq();
            if distance_sq < MIN_DISTANCE * MIN_DISTANCE {
                *delta -= separation(index, other) * strength.abs();
                continue;
            }
            // Closer than one unit behaves like one unit away along the offset.
            let falloff = if distance_sq < 1.0 {
                distance_sq.sqrt()
            } else {
                distance_sq
            };
            *delta += offset * (strength / falloff);
        }
        return;
    }

    let offset = cell.center_of_mass - point;
    let distance_sq = offset.length_sq().max(1.0);
    let far_enough = !cell.bounds.contains(point)
        && cell.bounds.side_length() / distance_sq.sqrt() < theta;
    if far_enough {
        *delta += offset * (strength * cell.mass / distance_sq);
        return;
    }

    for child in cell.children() {
        accumulate_charge(child, index, nodes, strength, theta, delta);
    }
}

/// Pushes overlapping collision discs apart; the smaller disc moves more.
pub(super) fn collision(nodes: &[SimNode], tree: Option<&QuadNode>, params: &ForceParams) -> Vec<Vec2> {
    let mut deltas = zeroed(nodes);
    if let Some(tree) = tree {
        collide_cells(tree, tree, true, nodes, params.collision_strength, &mut deltas);
    }
    deltas
}

fn collide_pair(a: usize, b: usize, nodes: &[SimNode], strength: f32, deltas: &mut [Vec2]) {
    let (ra, rb) = (nodes[a].collision_radius, nodes[b].collision_radius);
    let reach = ra + rb;
    let mut offset = (nodes[a].pos + nodes[a].vel) - (nodes[b].pos + nodes[b].vel);
    let distance_sq = offset.length_sq();
    if distance_sq >= reach * reach {
        return;
    }
    if distance_sq < MIN_DISTANCE * MIN_DISTANCE {
        offset = separation(a, b) * MIN_DISTANCE;
    }
    let distance = offset.length();
    let push = offset * ((reach - distance) / distance * strength);
    let share = rb * rb / (ra * ra + rb * rb).max(f32::EPSILON);
    deltas[a] += push * share;
    deltas[b] -= push * (1.0 - share);
}

fn collide_cells(
    cell_a: &QuadNode,
    cell_b: &QuadNode,
    same_cell: bool,
    nodes: &[SimNode],
    strength: f32,
    deltas: &mut [Vec2],
) {
    if cell_a.bounds.gap_to(cell_b.bounds) > cell_a.max_radius + cell_b.max_radius {
        return;
    }

    if cell_a.is_leaf() && cell_b.is_leaf() {
        if same_cell {
            for (position, &a) in cell_a.indices.iter().enumerate() {
                for &b in &cell_a.indices[position + 1..] {
                    collide_pair(a, b, nodes, strength, deltas);
                }
            }
        } else {
            for &a in &cell_a.indices {
                for &b in &cell_b.indices {
                    collide_pair(a, b, nodes, strength, deltas);
                }
            }
        }
        return;
    }

    if same_cell {
        let children = cell_a.children().collect::<Vec<_>>();
        for (position, child) in children.iter().enumerate() {
            collide_cells(child, child, true, nodes, strength, deltas);
            for other in &children[position + 1..] {
                collide_cells(child, other, false, nodes, strength, deltas);
            }
        }
        return;
    }

    let split_a = if cell_a.is_leaf() {
        false
    } else if cell_b.is_leaf() {
        true
    } else {
        cell_a.bounds.half_extent >= cell_b.bounds.half_extent
    };
    if split_a {
        for child in cell_a.children() {
            collide_cells(child, cell_b, false, nodes, strength, deltas);
        }
    } else {
        for child in cell_b.children() {
            collide_cells(cell_a, child, false, nodes, strength, deltas);
        }
    }
}

/// Independent x and y pulls toward the canvas centre.
pub fn centering(nodes: &[SimNode], center: Vec2, params: &ForceParams, alpha: f32) -> Vec<Vec2> {
    nodes
        .iter()
        .map(|node| (center - node.pos) * (params.center_strength * alpha))
        .collect()
}

/// Keeps free satellites near the ideal distance from their hub, with a dead zone of
/// `tolerance` on both sides.
pub fn pendulum(nodes: &[SimNode], params: &ForceParams, alpha: f32) -> Vec<Vec2> {
    let pendulum = params.pendulum;
    nodes
        .iter()
        .map(|node| {
            let Some(hub) = node.anchor.and_then(|anchor| nodes.get(anchor)) else {
                return Vec2::ZERO;
            };
            if node.is_main || node.locked {
                return Vec2::ZERO;
            }
            let offset = node.pos - hub.pos;
            let distance = offset.length();
            if distance < MIN_DISTANCE
                || (distance - pendulum.ideal_distance).abs() <= pendulum.tolerance
            {
                return Vec2::ZERO;
            }
            -offset * ((distance - pendulum.ideal_distance) / distance * alpha * pendulum.strength)
        })
        .collect()
}

/// Keeps every ordinary node out of the buffer ring around each main node.
pub fn buffer_repulsion(nodes: &[SimNode], params: &ForceParams, alpha: f32) -> Vec<Vec2> {
    let mains = nodes
        .iter()
        .enumerate()
        .filter(|(_, node)| node.is_main)
        .collect::<Vec<_>>();
    let mut deltas = zeroed(nodes);
    if mains.is_empty() {
        return deltas;
    }

    for (index, node) in nodes.iter().enumerate() {
        if node.is_main {
            continue;
        }
        for &(main_index, main) in &mains {
            let buffer = main.radius * params.buffer_multiplier;
            let mut offset = node.pos - main.pos;
            let mut distance = offset.length();
            if distance >= buffer {
                continue;
            }
            if distance < MIN_DISTANCE {
                offset = separation(main_index, index) * MIN_DISTANCE;
                distance = MIN_DISTANCE;
            }
            deltas[index] += offset * ((buffer - distance) / distance * alpha * params.buffer_strength);
        }
    }
    deltas
}

/// While a main node is dragged, pulls its captured satellites toward their captured
/// angle and distance and reins in any that stretch past the limit.
pub(super) fn drag_relative(nodes: &[SimNode], drag: &DragState, params: &ForceParams) -> Vec<Vec2> {
    let mut deltas = zeroed(nodes);
    let Some(hub) = nodes.get(drag.node) else {
        return deltas;
    };
    let hub_pos = hub.pin.unwrap_or(hub.pos);

    for satellite in &drag.satellites {
        let Some(node) = nodes.get(satellite.index) else {
            continue;
        };
        if node.is_main || node.locked {
            continue;
        }

        let ideal = hub_pos + vec2(satellite.angle.cos(), satellite.angle.sin()) * satellite.distance;
        let mut delta = (ideal - node.pos) * params.drag_pull;

        let offset = node.pos - hub_pos;
        let distance = offset.length();
        let limit = satellite.distance * params.drag_stretch_limit;
        if distance > limit {
            delta -= offset * ((distance - limit) / distance * params.drag_stretch_pull);
        }
        deltas[satellite.index] += delta;
    }
    deltas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::drag::CapturedSatellite;

    fn node(id: &str, x: f32, y: f32) -> SimNode {
        SimNode::detached(id, vec2(x, y), 5.0, false)
    }

    fn hub(id: &str, x: f32, y: f32) -> SimNode {
        SimNode::detached(id, vec2(x, y), 24.0, true)
    }

    fn satellite_of(id: &str, x: f32, y: f32, anchor: usize) -> SimNode {
        let mut node = node(id, x, y);
        node.anchor = Some(anchor);
        node
    }

    #[test]
    fn link_pulls_a_stretched_pair_together_symmetrically() {
        let nodes = vec![node("a", 0.0, 0.0), node("b", 300.0, 0.0)];
        let links = [SimLink { source: 0, target: 1 }];

        let deltas = link(&nodes, &links, &ForceParams::default(), 1.0);

        assert!((deltas[0].x - 37.5).abs() < 1e-3);
        assert!((deltas[1].x + 37.5).abs() < 1e-3);
        assert_eq!(deltas[0].y, 0.0);
    }

    #[test]
    fn charge_pushes_nodes_apart() {
        let nodes = vec![node("a", 0.0, 0.0), node("b", 10.0, 0.0), node("c", 0.0, 0.0)];
        let positions = nodes.iter().map(|node| node.pos).collect::<Vec<_>>();
        let tree = QuadNode::build(&positions, &[1.0; 3]);

        let deltas = many_body(&nodes, tree.as_ref(), &ForceParams::default(), 0.1);

        assert!(deltas[1].x > 0.0);
        assert!(deltas[0].is_finite() && deltas[2].is_finite());
        assert!((deltas[0] + deltas[2]).x < 0.0);
        assert!(deltas[0] != deltas[2]);
    }

    #[test]
    fn collision_only_acts_on_overlap() {
        let mut nodes = vec![node("a", 0.0, 0.0), node("b", 10.0, 0.0), node("c", 500.0, 0.0)];
        nodes[0].collision_radius = 7.0;
        nodes[1].collision_radius = 7.0;
        nodes[2].collision_radius = 7.0;
        let positions = nodes.iter().map(|node| node.pos).collect::<Vec<_>>();
        let tree = QuadNode::build(&positions, &[7.0; 3]);

        let deltas = collision(&nodes, tree.as_ref(), &ForceParams::default());

        assert!(deltas[0].x < 0.0);
        assert!(deltas[1].x > 0.0);
        assert!((deltas[0].x + deltas[1].x).abs() < 1e-4);
        assert_eq!(deltas[2], Vec2::ZERO);
    }

    #[test]
    fn centering_scales_with_alpha() {
        let nodes = vec![node("a", 0.0, 100.0)];
        let deltas = centering(&nodes, vec2(100.0, 100.0), &ForceParams::default(), 0.5);
        assert!((deltas[0].x - 2.5).abs() < 1e-4);
        assert_eq!(deltas[0].y, 0.0);
    }

    #[test]
    fn pendulum_ignores_satellites_inside_tolerance() {
        let nodes = vec![
            hub("h", 0.0, 0.0),
            satellite_of("near", 250.0, 0.0, 0),
            satellite_of("far", 400.0, 0.0, 0),
            satellite_of("close", 100.0, 0.0, 0),
        ];

        let deltas = pendulum(&nodes, &ForceParams::default(), 1.0);

        assert_eq!(deltas[0], Vec2::ZERO);
        assert_eq!(deltas[1], Vec2::ZERO);
        assert!((deltas[2].x + 72.0).abs() < 1e-3);
        assert!((deltas[3].x - 48.0).abs() < 1e-3);
    }

    #[test]
    fn pendulum_skips_locked_satellites() {
        let mut nodes = vec![hub("h", 0.0, 0.0), satellite_of("s", 400.0, 0.0, 0)];
        nodes[1].locked = true;
        assert_eq!(pendulum(&nodes, &ForceParams::default(), 1.0)[1], Vec2::ZERO);
    }

    #[test]
    fn buffer_repels_only_inside_the_ring() {
        let nodes = vec![hub("h", 0.0, 0.0), node("in", 100.0, 0.0), node("out", 200.0, 0.0)];

        let deltas = buffer_repulsion(&nodes, &ForceParams::default(), 1.0);

        // ring radius 24 * 6 = 144
        assert!((deltas[1].x - 22.0).abs() < 1e-3);
        assert_eq!(deltas[2], Vec2::ZERO);
        assert_eq!(deltas[0], Vec2::ZERO);
    }

    #[test]
    fn drag_relative_pulls_toward_captured_offset_and_caps_stretch() {
        let mut nodes = vec![hub("h", 100.0, 0.0), node("s", 0.0, 0.0)];
        nodes[0].pin = Some(vec2(100.0, 0.0));
        let drag = DragState {
            node: 0,
            start: Vec2::ZERO,
            grab_offset: Vec2::ZERO,
            moved: true,
            satellites: vec![CapturedSatellite {
                index: 1,
                angle: 0.0,
                distance: 50.0,
            }],
        };

        let deltas = drag_relative(&nodes, &drag, &ForceParams::default());

        // pull (150 - 0) * 0.15 = 22.5, plus stretch (100 - 65) / 100 * 0.2 * 100 = 7
        assert!((deltas[1].x - 29.5).abs() < 1e-3);
        assert_eq!(deltas[0], Vec2::ZERO);
    }
}
