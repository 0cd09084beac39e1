//! Continuous force layout for the bubble map.
//!
//! The simulation cools from `alpha` toward `alpha_target` and stops once alpha falls below
//! `alpha_min`; a drag raises the target so the map stays warm while the pointer is down.

mod drag;
mod forces;
mod path;
mod quadtree;
mod radius;
mod view;

use std::collections::{BTreeSet, HashMap, HashSet};

use eframe::egui::{Vec2, vec2};
use rand::Rng;
use tracing::{debug, trace, warn};

use crate::graph::{Graph, SizeMetric};

pub use drag::{CapturedSatellite, DragOutcome, DragState};
pub use forces::{ForceParams, PendulumParams, buffer_repulsion, centering, link, pendulum};
pub use path::{LinkPath, link_path};
pub use radius::{MAIN_RADIUS, UNIFORM_RADIUS, auto_scale_factor, collision_radius, node_radius};
pub use view::{FOCUS_ZOOM, MAX_ZOOM, MIN_ZOOM, ViewTransform};

use quadtree::QuadNode;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationParams {
    pub forces: ForceParams,
    pub size_metric: SizeMetric,
    pub scale_factor: f32,
    pub alpha_min: f32,
    pub alpha_decay: f32,
    /// Fraction of velocity lost per tick.
    pub velocity_decay: f32,
    pub mount_alpha: f32,
    pub patch_alpha: f32,
    pub drag_alpha_target: f32,
    /// Pointer travel beyond which a drag locks the node.
    pub lock_threshold: f32,
}

impl Default for SimulationParams {
    fn default() -> Self {
        let alpha_min = 0.001_f32;
        Self {
            forces: ForceParams::default(),
            size_metric: SizeMetric::TokenAmount,
            scale_factor: 1.0,
            alpha_min,
            alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
            velocity_decay: 0.7,
            mount_alpha: 0.05,
            patch_alpha: 0.03,
            drag_alpha_target: 0.05,
            lock_threshold: 5.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SimNode {
    pub id: String,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Fixed position; the node ignores forces while set.
    pub pin: Option<Vec2>,
    pub radius: f32,
    pub collision_radius: f32,
    pub is_main: bool,
    pub locked: bool,
    pub connected_tokens: BTreeSet<String>,
    /// Main node this one swings around.
    pub anchor: Option<usize>,
}

impl SimNode {
    /// A free node outside any graph.
    pub fn detached(id: &str, pos: Vec2, radius: f32, is_main: bool) -> Self {
        Self {
            id: id.to_owned(),
            pos,
            vel: Vec2::ZERO,
            pin: None,
            radius,
            collision_radius: collision_radius(radius, is_main),
            is_main,
            locked: false,
            connected_tokens: BTreeSet::new(),
            anchor: None,
        }
    }
}

/// Physics link between two node indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SimLink {
    pub source: usize,
    pub target: usize,
}

/// Position carried over from one mount to the next.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PositionSnapshot {
    pub pos: Vec2,
    pub pin: Option<Vec2>,
}

pub type TickCallback = Box<dyn FnMut(&[SimNode]) + Send>;

pub struct Simulation {
    nodes: Vec<SimNode>,
    index: HashMap<String, usize>,
    links: Vec<SimLink>,
    canvas: Vec2,
    params: SimulationParams,
    alpha: f32,
    alpha_target: f32,
    running: bool,
    drag: Option<DragState>,
    on_tick: Option<TickCallback>,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("nodes", &self.nodes.len())
            .field("links", &self.links.len())
            .field("alpha", &self.alpha)
            .field("running", &self.running)
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Seeds positions from `snapshot` where available and at random inside the canvas
    /// otherwise, then starts warm.
    pub fn mount(
        graph: &Graph,
        canvas: Vec2,
        snapshot: &HashMap<String, PositionSnapshot>,
        params: SimulationParams,
    ) -> Self {
        Self::mount_with_rng(graph, canvas, snapshot, params, &mut rand::rng())
    }

    pub fn mount_with_rng<R: Rng>(
        graph: &Graph,
        canvas: Vec2,
        snapshot: &HashMap<String, PositionSnapshot>,
        params: SimulationParams,
        rng: &mut R,
    ) -> Self {
        let mut reused = 0usize;
        let nodes = graph
            .nodes
            .iter()
            .map(|node| {
                let radius = node_radius(node, params.size_metric, params.scale_factor);
                let previous = snapshot.get(&node.id);
                let pos = match previous {
                    Some(previous) => {
                        reused += 1;
                        previous.pos
                    }
                    None => vec2(
                        rng.random::<f32>() * canvas.x.max(1.0),
                        rng.random::<f32>() * canvas.y.max(1.0),
                    ),
                };
                let pin = node
                    .locked
                    .then(|| previous.and_then(|previous| previous.pin).unwrap_or(pos));

                SimNode {
                    id: node.id.clone(),
                    pos,
                    vel: Vec2::ZERO,
                    pin,
                    radius,
                    collision_radius: collision_radius(radius, node.is_main),
                    is_main: node.is_main,
                    locked: node.locked,
                    connected_tokens: node.connected_tokens.clone(),
                    anchor: None,
                }
            })
            .collect::<Vec<_>>();

        let index = nodes
            .iter()
            .enumerate()
            .map(|(position, node)| (node.id.clone(), position))
            .collect();

        let mut simulation = Self {
            nodes,
            index,
            links: Vec::new(),
            canvas,
            params,
            alpha: params.mount_alpha,
            alpha_target: 0.0,
            running: true,
            drag: None,
            on_tick: None,
        };
        simulation.assign_anchors();
        simulation.links = simulation.physics_links(graph);

        debug!(
            nodes = simulation.nodes.len(),
            links = simulation.links.len(),
            reused,
            "mounted simulation"
        );
        simulation
    }

    /// Swaps in the links of `graph` without touching positions. Fails when the node set
    /// differs from the mounted one.
    pub fn retarget(&mut self, graph: &Graph) -> bool {
        if graph.nodes.len() != self.nodes.len()
            || graph.nodes.iter().any(|node| !self.index.contains_key(&node.id))
        {
            return false;
        }
        for node in &graph.nodes {
            if let Some(&position) = self.index.get(&node.id) {
                let sim = &mut self.nodes[position];
                sim.connected_tokens = node.connected_tokens.clone();
                sim.is_main = node.is_main;
            }
        }
        self.assign_anchors();
        self.links = self.physics_links(graph);
        self.reheat(self.params.patch_alpha);
        debug!(links = self.links.len(), "patched simulation links");
        true
    }

    pub fn set_on_tick(&mut self, callback: TickCallback) {
        self.on_tick = Some(callback);
    }

    pub fn nodes(&self) -> &[SimNode] {
        &self.nodes
    }

    pub fn links(&self) -> &[SimLink] {
        &self.links
    }

    pub fn node(&self, id: &str) -> Option<&SimNode> {
        self.index.get(id).and_then(|&position| self.nodes.get(position))
    }

    pub fn position(&self, id: &str) -> Option<Vec2> {
        self.node(id).map(|node| node.pos)
    }

    /// View that centres `id` in the canvas.
    pub fn zoom_to_node(&self, id: &str) -> Option<ViewTransform> {
        self.position(id)
            .map(|pos| ViewTransform::focus(pos, self.canvas))
    }

    pub fn canvas(&self) -> Vec2 {
        self.canvas
    }

    pub fn set_canvas(&mut self, canvas: Vec2) {
        self.canvas = canvas;
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn reheat(&mut self, alpha: f32) {
        self.alpha = self.alpha.max(alpha);
        self.running = true;
    }

    pub fn snapshot(&self) -> HashMap<String, PositionSnapshot> {
        self.nodes
            .iter()
            .map(|node| {
                (
                    node.id.clone(),
                    PositionSnapshot {
                        pos: node.pos,
                        pin: node.pin,
                    },
                )
            })
            .collect()
    }

    /// Advances one step. Returns `false` when the simulation is stopped.
    pub fn tick(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.alpha += (self.alpha_target - self.alpha) * self.params.alpha_decay;
        let deltas = self.velocity_deltas(self.alpha);

        let keep = 1.0 - self.params.velocity_decay;
        for (node, delta) in self.nodes.iter_mut().zip(deltas) {
            if let Some(pin) = node.pin {
                node.pos = pin;
                node.vel = Vec2::ZERO;
                continue;
            }
            let vel = (node.vel + delta) * keep;
            let pos = node.pos + vel;
            if vel.is_finite() && pos.is_finite() {
                node.vel = vel;
                node.pos = pos;
            } else {
                warn!(node = %node.id, "discarding non-finite step");
                node.vel = Vec2::ZERO;
            }
        }

        if self.alpha < self.params.alpha_min {
            self.running = false;
            trace!("simulation cooled down");
        }
        if let Some(callback) = self.on_tick.as_mut() {
            callback(&self.nodes);
        }
        true
    }

    /// Sum of every force on the current snapshot.
    fn velocity_deltas(&self, alpha: f32) -> Vec<Vec2> {
        let params = &self.params.forces;
        let positions = self.nodes.iter().map(|node| node.pos).collect::<Vec<_>>();
        let radii = self
            .nodes
            .iter()
            .map(|node| node.collision_radius)
            .collect::<Vec<_>>();
        let tree = QuadNode::build(&positions, &radii);
        let center = self.canvas * 0.5;

        let mut terms = vec![
            link(&self.nodes, &self.links, params, alpha),
            forces::many_body(&self.nodes, tree.as_ref(), params, alpha),
            forces::collision(&self.nodes, tree.as_ref(), params),
            centering(&self.nodes, center, params, alpha),
            pendulum(&self.nodes, params, alpha),
            buffer_repulsion(&self.nodes, params, alpha),
        ];
        if let Some(drag) = self.drag.as_ref().filter(|drag| !drag.satellites.is_empty()) {
            terms.push(forces::drag_relative(&self.nodes, drag, params));
        }

        let mut total = vec![Vec2::ZERO; self.nodes.len()];
        for term in terms {
            for (sum, delta) in total.iter_mut().zip(term) {
                *sum += delta;
            }
        }
        total
    }

    /// Pins the node under the pointer and, for a main node, records where its free
    /// satellites sit relative to it.
    pub fn drag_start(&mut self, id: &str, pointer: Vec2) -> bool {
        let Some(&position) = self.index.get(id) else {
            return false;
        };
        self.alpha_target = self.params.drag_alpha_target;
        self.running = true;

        let node = &mut self.nodes[position];
        node.pin = Some(node.pos);
        let grab_offset = pointer - node.pos;
        let satellites = if node.is_main {
            drag::capture_satellites(&self.nodes, position)
        } else {
            Vec::new()
        };
        debug!(node = id, satellites = satellites.len(), "drag started");
        self.drag = Some(DragState {
            node: position,
            start: pointer,
            grab_offset,
            moved: false,
            satellites,
        });
        true
    }

    pub fn drag_move(&mut self, pointer: Vec2) {
        let Some(drag) = self.drag.as_mut() else {
            return;
        };
        if (pointer - drag.start).length() > self.params.lock_threshold {
            drag.moved = true;
        }
        if let Some(node) = self.nodes.get_mut(drag.node) {
            node.pin = Some(pointer - drag.grab_offset);
        }
    }

    /// Releases the pointer. The node stays pinned where it was dropped and is locked if it
    /// actually moved.
    pub fn drag_end(&mut self) -> Option<DragOutcome> {
        let drag = self.drag.take()?;
        self.alpha_target = 0.0;
        let node = self.nodes.get_mut(drag.node)?;
        node.pin = Some(node.pin.unwrap_or(node.pos));
        let locked = drag.moved;
        if locked {
            node.locked = true;
        }
        Some(DragOutcome {
            id: node.id.clone(),
            locked,
        })
    }

    /// Locking pins a node in place; unlocking clears the pin.
    pub fn set_locked(&mut self, id: &str, locked: bool) -> bool {
        let Some(&position) = self.index.get(id) else {
            return false;
        };
        let node = &mut self.nodes[position];
        if node.locked == locked {
            return false;
        }
        node.locked = locked;
        if locked {
            node.pin = Some(node.pin.unwrap_or(node.pos));
        } else {
            node.pin = None;
            self.reheat(self.params.patch_alpha);
        }
        true
    }

    /// Pendulum anchor: the first connected token that is present as a main node.
    fn assign_anchors(&mut self) {
        let mains = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_main)
            .map(|(position, node)| (node.id.clone(), position))
            .collect::<HashMap<_, _>>();
        for node in &mut self.nodes {
            node.anchor = if node.is_main {
                None
            } else {
                node.connected_tokens
                    .iter()
                    .find_map(|token| mains.get(token).copied())
            };
        }
    }

    /// One physics link per connected pair; expanded transaction links share their pair.
    fn physics_links(&self, graph: &Graph) -> Vec<SimLink> {
        let mut seen = HashSet::new();
        graph
            .links
            .iter()
            .filter_map(|link| {
                let source = *self.index.get(&link.source)?;
                let target = *self.index.get(&link.target)?;
                let pair = (source.min(target), source.max(target));
                (source != target && seen.insert(pair)).then_some(SimLink { source, target })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::address::Chain;
    use crate::graph::{FilterConfig, build_graph};
    use crate::session::{NodeOverrides, TokenDataset};
    use crate::source::{HolderRecord, InteractionEdge};

    const CANVAS: Vec2 = vec2(800.0, 600.0);

    fn graph_of(holders: usize, edges: &[(usize, usize)], token_hubs: bool) -> Graph {
        let mut dataset = TokenDataset::new(
            "Tok",
            Chain::Solana,
            (0..holders)
                .map(|index| HolderRecord::new(format!("h{index}"), 100.0))
                .collect(),
        );
        dataset.interactions = edges
            .iter()
            .map(|(a, b)| InteractionEdge::new(&format!("h{a}"), &format!("h{b}"), 1.0, 1.0))
            .collect();
        let filters = FilterConfig {
            token_hubs,
            ..FilterConfig::default()
        };
        build_graph(&[dataset], &filters, &NodeOverrides::default())
    }

    fn mount(graph: &Graph, snapshot: &HashMap<String, PositionSnapshot>) -> Simulation {
        Simulation::mount_with_rng(
            graph,
            CANVAS,
            snapshot,
            SimulationParams::default(),
            &mut StdRng::seed_from_u64(7),
        )
    }

    #[test]
    fn mount_reuses_snapshot_and_places_new_nodes_inside_canvas() {
        let graph = graph_of(3, &[], false);
        let snapshot = HashMap::from([(
            "h0".to_owned(),
            PositionSnapshot {
                pos: vec2(-50.0, 1234.0),
                pin: Some(vec2(1.0, 1.0)),
            },
        )]);

        let simulation = mount(&graph, &snapshot);

        let h0 = simulation.node("h0").expect("h0 mounted");
        assert_eq!(h0.pos, vec2(-50.0, 1234.0));
        assert_eq!(h0.pin, None, "pins only survive for locked nodes");
        for id in ["h1", "h2"] {
            let pos = simulation.position(id).expect("mounted");
            assert!((0.0..=CANVAS.x).contains(&pos.x) && (0.0..=CANVAS.y).contains(&pos.y));
        }
        assert_eq!(simulation.alpha(), 0.05);
        assert!(simulation.is_running());
    }

    #[test]
    fn cools_down_and_stops() {
        let graph = graph_of(5, &[(0, 1), (1, 2)], false);
        let mut simulation = mount(&graph, &HashMap::new());

        let mut ticks = 0;
        while simulation.tick() {
            ticks += 1;
            assert!(ticks < 1_000, "simulation never stopped");
        }

        assert!(simulation.alpha() < simulation.params().alpha_min);
        assert!(!simulation.tick());
        assert!(simulation.nodes().iter().all(|node| node.pos.is_finite()));
    }

    #[test]
    fn pinned_nodes_do_not_move() {
        let graph = graph_of(3, &[(0, 1)], false);
        let mut simulation = mount(&graph, &HashMap::new());
        assert!(simulation.set_locked("h0", true));
        let pinned = simulation.position("h0").expect("h0");

        for _ in 0..20 {
            simulation.tick();
        }

        let h0 = simulation.node("h0").expect("h0");
        assert_eq!(h0.pos, pinned);
        assert_eq!(h0.vel, Vec2::ZERO);

        assert!(simulation.set_locked("h0", false));
        assert_eq!(simulation.node("h0").and_then(|node| node.pin), None);
    }

    #[test]
    fn retarget_keeps_positions_and_rejects_new_nodes() {
        let before = graph_of(3, &[], false);
        let mut simulation = mount(&before, &HashMap::new());
        for _ in 0..200 {
            simulation.tick();
        }
        let positions = simulation.snapshot();

        let after = graph_of(3, &[(0, 2)], false);
        assert!(simulation.retarget(&after));
        assert_eq!(simulation.links().len(), 1);
        assert_eq!(simulation.alpha(), 0.03);
        assert_eq!(simulation.snapshot(), positions);

        assert!(!simulation.retarget(&graph_of(4, &[], false)));
    }

    #[test]
    fn tick_callback_sees_every_node() {
        let graph = graph_of(4, &[], false);
        let mut simulation = mount(&graph, &HashMap::new());
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        simulation.set_on_tick(Box::new(move |nodes| {
            counter.store(nodes.len(), Ordering::SeqCst);
        }));

        simulation.tick();
        assert_eq!(seen.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn short_drag_of_an_ordinary_node_does_not_lock() {
        let graph = graph_of(2, &[], false);
        let mut simulation = mount(&graph, &HashMap::new());
        let start = simulation.position("h0").expect("h0");

        assert!(simulation.drag_start("h0", start));
        simulation.drag_move(start + vec2(3.0, 0.0));
        let outcome = simulation.drag_end().expect("drag in progress");

        assert!(!outcome.locked);
        assert_eq!(simulation.node("h0").and_then(|node| node.pin), Some(start + vec2(3.0, 0.0)));

        let h1 = simulation.position("h1").expect("h1");
        simulation.drag_start("h1", h1);
        simulation.drag_move(h1 + vec2(30.0, 0.0));
        assert!(simulation.drag_end().is_some_and(|outcome| outcome.locked));
        assert!(simulation.node("h1").is_some_and(|node| node.locked));
    }

    #[test]
    fn grabbing_off_centre_does_not_jump_the_node() {
        let graph = graph_of(1, &[], false);
        let mut simulation = mount(&graph, &HashMap::new());
        let centre = simulation.position("h0").expect("h0");
        let grab = centre + vec2(4.0, -3.0);

        let near = |pos: Option<Vec2>, expected: Vec2| {
            pos.is_some_and(|pos| (pos - expected).length() < 1e-3)
        };

        assert!(simulation.drag_start("h0", grab));
        simulation.drag_move(grab);
        assert!(near(simulation.node("h0").and_then(|node| node.pin), centre));

        simulation.drag_move(grab + vec2(20.0, 10.0));
        simulation.tick();
        assert!(near(simulation.position("h0"), centre + vec2(20.0, 10.0)));
    }

    #[test]
    fn dragging_a_main_node_keeps_satellites_close() {
        let graph = graph_of(4, &[], true);
        let hub_pos = vec2(400.0, 300.0);
        let mut snapshot = HashMap::from([(
            "tok".to_owned(),
            PositionSnapshot {
                pos: hub_pos,
                pin: None,
            },
        )]);
        for index in 0..4 {
            let angle = index as f32 * std::f32::consts::FRAC_PI_2;
            snapshot.insert(
                format!("h{index}"),
                PositionSnapshot {
                    pos: hub_pos + vec2(angle.cos(), angle.sin()) * 220.0,
                    pin: None,
                },
            );
        }
        let mut simulation = mount(&graph, &snapshot);
        assert!(simulation.node("h0").is_some_and(|node| node.anchor.is_some()));

        assert!(simulation.drag_start("tok", hub_pos));
        let captured = simulation
            .drag
            .as_ref()
            .map(|drag| drag.satellites.clone())
            .unwrap_or_default();
        assert_eq!(captured.len(), 4);

        for step in 1..=50 {
            simulation.drag_move(hub_pos + vec2(step as f32, 0.0));
            simulation.tick();
        }

        let outcome = simulation.drag_end().expect("drag in progress");
        assert!(outcome.locked);
        assert!(simulation.node("tok").is_some_and(|node| node.locked));

        let mut ticks = 0;
        while simulation.tick() {
            ticks += 1;
            assert!(ticks < 1_000, "simulation never stopped");
        }

        let hub = simulation.position("tok").expect("hub");
        assert_eq!(hub, hub_pos + vec2(50.0, 0.0));
        for satellite in &captured {
            let node = &simulation.nodes()[satellite.index];
            let distance = (node.pos - hub).length();
            assert!(
                distance <= satellite.distance * 1.3,
                "{} settled at {distance}",
                node.id
            );
        }
    }
}
