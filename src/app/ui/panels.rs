use eframe::egui::{self, Align, Context, Layout};

use super::super::ViewModel;
use super::super::render_utils::{ACCENT, parse_hex};

impl ViewModel {
    pub(in crate::app) fn show(&mut self, ctx: &Context) {
        self.poll_background();

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("bubblemap");
                    ui.separator();
                    ui.label(format!("tokens: {}", self.session.datasets().len()));
                    ui.label(format!("nodes: {}", self.controller.graph().nodes.len()));
                    ui.label(format!("links: {}", self.controller.graph().links.len()));
                    if self.is_loading() {
                        ui.spinner();
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        let state = match self.controller.simulation() {
                            Some(simulation) if simulation.is_running() => {
                                format!("settling (alpha {:.3})", simulation.alpha())
                            }
                            Some(_) => "at rest".to_owned(),
                            None => "no layout".to_owned(),
                        };
                        ui.label(state);
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(330.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.draw_graph(ui));
    }

    pub(in crate::app) fn set_selected(&mut self, selected: Option<String>) {
        if self.selected == selected {
            return;
        }

        let node = selected
            .as_deref()
            .and_then(|id| self.controller.graph().node(id));
        self.label_edit = node
            .filter(|node| node.has_custom_label)
            .map(|node| node.label.clone())
            .unwrap_or_default();
        self.highlight_color = node
            .and_then(|node| node.custom_highlight.as_deref())
            .and_then(parse_hex)
            .unwrap_or(ACCENT);
        self.selected = selected;
    }

    pub(in crate::app) fn focus_node(&mut self, id: &str) {
        if let Some(view) = self.controller.zoom_to_node(id) {
            self.view = view;
        }
        self.set_selected(Some(id.to_owned()));
    }
}
