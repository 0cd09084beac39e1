use eframe::egui::{self, PointerButton, Rect, Ui};
use tracing::debug;

use super::super::{DragMode, ViewModel};

impl ViewModel {
    pub(in crate::app) fn handle_graph_zoom(&mut self, ui: &Ui, rect: Rect, response: &egui::Response) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.view.zoom_about(rect.min, pointer, zoom_factor);
    }

    /// Primary drag moves the node under the pointer, or pans when it started on empty
    /// canvas. Secondary and middle drags always pan.
    pub(in crate::app) fn handle_graph_drag(&mut self, rect: Rect, response: &egui::Response) {
        if response.dragged_by(PointerButton::Secondary) || response.dragged_by(PointerButton::Middle) {
            self.view.pan(response.drag_delta());
            return;
        }

        let pointer = response
            .interact_pointer_pos()
            .map(|screen| self.view.screen_to_world(rect.min, screen));

        if response.drag_started_by(PointerButton::Primary) {
            let hit = pointer
                .and_then(|world| self.controller.node_at(world))
                .map(|node| node.id.clone());
            let grabbed = match (hit, pointer) {
                (Some(id), Some(world)) => self.controller.drag_start(&id, world),
                _ => false,
            };
            self.drag = Some(if grabbed { DragMode::Node } else { DragMode::Pan });
        }

        if response.dragged_by(PointerButton::Primary) {
            match (self.drag, pointer) {
                (Some(DragMode::Node), Some(world)) => self.controller.drag_move(world),
                (Some(DragMode::Pan), _) => self.view.pan(response.drag_delta()),
                _ => {}
            }
        }

        if response.drag_stopped() && self.drag.take() == Some(DragMode::Node) {
            if let Some(outcome) = self.controller.drag_end(&mut self.session) {
                debug!(node = %outcome.id, locked = outcome.locked, "drag ended");
            }
        }
    }

    pub(in crate::app) fn handle_graph_click(&mut self, rect: Rect, response: &egui::Response) {
        if !response.clicked() {
            return;
        }
        let Some(pointer) = response.interact_pointer_pos() else {
            return;
        };
        let world = self.view.screen_to_world(rect.min, pointer);
        let hit = self.controller.node_at(world).map(|node| node.id.clone());
        self.set_selected(hit);
    }
}
