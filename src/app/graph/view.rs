use bubblemap::graph::LabelMode;
use bubblemap::layout::LinkPath;
use bubblemap::util::format_usd;
use eframe::egui::epaint::QuadraticBezierShape;
use eframe::egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Sense, Stroke, Ui, vec2};

use super::super::ViewModel;
use super::super::render_utils::{
    MAIN_FILL, NODE_FILL, circle_visible, display_label, draw_background, link_stroke,
    node_stroke_color, path_visible,
};

impl ViewModel {
    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        self.controller.set_canvas(rect.size());
        self.controller.sync(&mut self.session);

        let painter = ui.painter_at(rect);
        draw_background(&painter, rect, self.view);

        self.handle_graph_zoom(ui, rect, &response);
        self.handle_graph_drag(rect, &response);
        self.handle_graph_click(rect, &response);

        let running = self.controller.tick();
        if running || self.is_loading() || response.dragged() {
            ui.ctx().request_repaint();
        }

        if self.controller.graph().nodes.is_empty() {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "No holders match the current filters.",
                FontId::proportional(15.0),
                Color32::GRAY,
            );
            return;
        }

        self.paint_links(&painter, rect);
        let pointer = ui.input(|input| input.pointer.hover_pos());
        let hovered = self.paint_nodes(&painter, rect, pointer);

        if let Some(node) = hovered.and_then(|id| self.controller.graph().node(&id)) {
            let title = display_label(node, LabelMode::Label);
            let address = node.address.clone();
            let details = format!(
                "{} · {:.2}% of supply",
                format_usd(node.value_usd),
                node.ownership_percentage
            );
            response.on_hover_ui_at_pointer(|ui| {
                ui.strong(title);
                ui.small(address);
                ui.label(details);
            });
        }
    }

    fn paint_links(&self, painter: &Painter, rect: Rect) {
        let view = self.view;
        let origin = rect.min;

        for (link, path) in self.controller.link_paths() {
            let stroke = link_stroke(link, view.scale);
            match path {
                LinkPath::Empty => {}
                LinkPath::Line { from, to } => {
                    let points = [view.world_to_screen(origin, from), view.world_to_screen(origin, to)];
                    if path_visible(rect, &points, stroke.width) {
                        painter.line_segment(points, stroke);
                    }
                }
                LinkPath::Curve { from, control, to } => {
                    let points = [
                        view.world_to_screen(origin, from),
                        view.world_to_screen(origin, control),
                        view.world_to_screen(origin, to),
                    ];
                    if path_visible(rect, &points, stroke.width) {
                        painter.add(QuadraticBezierShape::from_points_stroke(
                            points,
                            false,
                            Color32::TRANSPARENT,
                            stroke,
                        ));
                    }
                }
            }
        }
    }

    /// Paints bubbles in simulation order and returns the topmost one under the pointer.
    fn paint_nodes(&self, painter: &Painter, rect: Rect, pointer: Option<Pos2>) -> Option<String> {
        let simulation = self.controller.simulation()?;
        let graph = self.controller.graph();
        let filters = self.session.filters();
        let mut hovered = None;

        for sim_node in simulation.nodes() {
            let Some(node) = graph.node(&sim_node.id) else {
                continue;
            };
            let center = self.view.world_to_screen(rect.min, sim_node.pos);
            let radius = sim_node.radius * self.view.scale;
            if !circle_visible(rect, center, radius) {
                continue;
            }

            let selected = self.selected.as_deref() == Some(node.id.as_str());
            let stroke_color = node_stroke_color(node, selected, filters.highlight_shared);
            let fill = if node.is_main { MAIN_FILL } else { NODE_FILL };
            let width = if selected { 3.0 } else { 1.5 };

            painter.circle_filled(center, radius, fill);
            painter.circle_stroke(center, radius, Stroke::new(width, stroke_color));
            if node.locked {
                painter.circle_filled(center + vec2(radius, -radius) * 0.7, 3.0, stroke_color);
            }
            if radius >= 14.0 {
                painter.text(
                    center,
                    Align2::CENTER_CENTER,
                    display_label(node, filters.label_mode),
                    FontId::proportional((radius * 0.3).clamp(9.0, 14.0)),
                    Color32::WHITE,
                );
            }

            if pointer.is_some_and(|pointer| pointer.distance(center) <= radius) {
                hovered = Some(node.id.clone());
            }
        }

        hovered
    }
}
