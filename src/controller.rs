//! Keeps the running simulation in step with the session.
//!
//! Every change goes through the builder. What happens to the simulation depends on which
//! session revision moved: a structural change remounts it with inherited positions, an
//! edge-only change swaps links in place, a lock change touches pins only.

use std::collections::HashMap;

use eframe::egui::Vec2;
use tracing::{debug, info};

use crate::graph::{Graph, GraphLink};
use crate::layout::{
    DragOutcome, LinkPath, PositionSnapshot, SimNode, Simulation, SimulationParams, ViewTransform,
    link_path,
};
use crate::session::{Revisions, Session};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RebuildKind {
    /// Nothing the simulation depends on changed.
    None,
    /// Only pins changed.
    Locks,
    /// Same nodes, new links; positions and velocities kept.
    LinksOnly,
    /// Remounted with positions inherited by id.
    Full,
}

#[derive(Debug)]
pub struct UpdateController {
    graph: Graph,
    simulation: Option<Simulation>,
    /// Last known position of every id seen so far, including nodes currently filtered out.
    positions: HashMap<String, PositionSnapshot>,
    seen: Option<Revisions>,
    canvas: Vec2,
    base_params: SimulationParams,
}

impl UpdateController {
    pub fn new(canvas: Vec2, base_params: SimulationParams) -> Self {
        Self {
            graph: Graph::default(),
            simulation: None,
            positions: HashMap::new(),
            seen: None,
            canvas,
            base_params,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn simulation(&self) -> Option<&Simulation> {
        self.simulation.as_ref()
    }

    pub fn canvas(&self) -> Vec2 {
        self.canvas
    }

    pub fn set_canvas(&mut self, canvas: Vec2) {
        self.canvas = canvas;
        if let Some(simulation) = self.simulation.as_mut() {
            simulation.set_canvas(canvas);
        }
    }

    /// Full rebuild: snapshots the running simulation, rebuilds the graph and remounts.
    pub fn mount_visualization(&mut self, session: &Session) {
        self.remember_positions();
        self.remount(session);
    }

    fn remount(&mut self, session: &Session) {
        let graph = session.processed_data();
        let params = SimulationParams {
            size_metric: session.filters().size_metric,
            scale_factor: session.filters().scale_factor,
            ..self.base_params
        };
        let simulation = Simulation::mount(&graph, self.canvas, &self.positions, params);
        info!(
            nodes = graph.nodes.len(),
            links = graph.links.len(),
            "mounted visualization"
        );
        self.graph = graph;
        self.simulation = Some(simulation);
        self.seen = Some(session.revisions());
    }

    /// Brings the simulation up to date with `session` and reports what it had to do.
    pub fn sync(&mut self, session: &mut Session) -> RebuildKind {
        let evicted = session.take_evicted();
        let current = session.revisions();
        let seen = match self.seen {
            Some(seen) if seen.structure == current.structure => seen,
            _ => {
                // Snapshot first so evicted ids cannot come back through it.
                self.remember_positions();
                self.evict(&evicted);
                self.remount(session);
                return RebuildKind::Full;
            }
        };
        self.evict(&evicted);
        if seen == current {
            return RebuildKind::None;
        }

        let mut kind = RebuildKind::None;
        // Locks first, so the rebuilt nodes below match the mounted ones.
        if seen.locks != current.locks {
            self.apply_locks(session);
            kind = RebuildKind::Locks;
        }
        if seen.interactions != current.interactions {
            if !self.update_links_in_place(session.processed_data()) {
                self.mount_visualization(session);
                return RebuildKind::Full;
            }
            kind = RebuildKind::LinksOnly;
        }
        self.seen = Some(current);
        kind
    }

    /// Swaps in `graph`'s links when its nodes match the mounted ones exactly. Returns
    /// `false` and leaves everything untouched otherwise.
    pub fn update_links_in_place(&mut self, graph: Graph) -> bool {
        if graph.nodes != self.graph.nodes {
            return false;
        }
        let Some(simulation) = self.simulation.as_mut() else {
            return false;
        };
        if !simulation.retarget(&graph) {
            return false;
        }
        debug!(links = graph.links.len(), "updated links in place");
        self.graph = graph;
        true
    }

    /// Applies the session's lock set to the live simulation.
    fn apply_locks(&mut self, session: &Session) {
        for node in &mut self.graph.nodes {
            node.locked = session.is_locked(&node.id);
        }
        if let Some(simulation) = self.simulation.as_mut() {
            for node in &self.graph.nodes {
                simulation.set_locked(&node.id, node.locked);
            }
        }
    }

    /// Forgets remembered positions, e.g. of holders only a removed token had.
    pub fn evict(&mut self, ids: &[String]) {
        if ids.is_empty() {
            return;
        }
        for id in ids {
            self.positions.remove(id);
        }
        debug!(evicted = ids.len(), "evicted node positions");
    }

    fn remember_positions(&mut self) {
        if let Some(simulation) = &self.simulation {
            self.positions.extend(simulation.snapshot());
        }
    }

    pub fn remembered_position(&self, id: &str) -> Option<PositionSnapshot> {
        self.simulation
            .as_ref()
            .and_then(|simulation| simulation.node(id))
            .map(|node| PositionSnapshot {
                pos: node.pos,
                pin: node.pin,
            })
            .or_else(|| self.positions.get(id).copied())
    }

    pub fn tick(&mut self) -> bool {
        self.simulation
            .as_mut()
            .is_some_and(|simulation| simulation.tick())
    }

    pub fn zoom_to_node(&self, id: &str) -> Option<ViewTransform> {
        self.simulation.as_ref()?.zoom_to_node(id)
    }

    /// Topmost node whose bubble contains `world`.
    pub fn node_at(&self, world: Vec2) -> Option<&SimNode> {
        self.simulation.as_ref().and_then(|simulation| {
            simulation
                .nodes()
                .iter()
                .rev()
                .find(|node| (node.pos - world).length() <= node.radius)
        })
    }

    pub fn link_paths(&self) -> Vec<(&GraphLink, LinkPath)> {
        let Some(simulation) = self.simulation.as_ref() else {
            return Vec::new();
        };
        self.graph
            .links
            .iter()
            .map(|link| {
                let path = link_path(link, simulation.node(&link.source), simulation.node(&link.target));
                (link, path)
            })
            .collect()
    }

    pub fn drag_start(&mut self, id: &str, pointer: Vec2) -> bool {
        self.simulation
            .as_mut()
            .is_some_and(|simulation| simulation.drag_start(id, pointer))
    }

    pub fn drag_move(&mut self, pointer: Vec2) {
        if let Some(simulation) = self.simulation.as_mut() {
            simulation.drag_move(pointer);
        }
    }

    /// Ends a drag and records an automatic lock in the session.
    pub fn drag_end(&mut self, session: &mut Session) -> Option<DragOutcome> {
        let outcome = self.simulation.as_mut()?.drag_end()?;
        if outcome.locked {
            session.set_locked(&outcome.id, true);
            if let Some(node) = self.graph.nodes.iter_mut().find(|node| node.id == outcome.id) {
                node.locked = true;
            }
            if let Some(seen) = self.seen.as_mut() {
                seen.locks = session.revisions().locks;
            }
        }
        Some(outcome)
    }
}
