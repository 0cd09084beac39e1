use std::collections::BTreeMap;

use bubblemap::address::canonical_id;
use bubblemap::graph::{GraphNode, LabelMode};
use bubblemap::util::{format_amount, format_change, format_usd};
use chrono::Local;
use eframe::egui::{self, RichText, TextEdit, Ui};

use super::super::ViewModel;
use super::super::render_utils::{ACCENT, display_label, to_hex};

/// Aggregate of every drawn link between the selection and one other node.
struct Connection {
    other: String,
    label: String,
    value: f64,
    transactions: usize,
}

enum DeletedAction {
    Restore(String),
    Forget(String),
    RestoreAll,
    ForgetAll,
}

fn metric_row(ui: &mut Ui, name: &str, value: String) {
    ui.label(name);
    ui.label(value);
    ui.end_row();
}

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                ui.heading("Selection Details");
                ui.add_space(6.0);
                self.draw_selection(ui);
                ui.separator();
                self.draw_deleted_nodes(ui);
            });
    }

    fn connections(&self, id: &str) -> Vec<Connection> {
        let graph = self.controller.graph();
        let mut by_other = BTreeMap::<&str, (f64, usize)>::new();
        for link in &graph.links {
            let other = if link.source == id {
                link.target.as_str()
            } else if link.target == id {
                link.source.as_str()
            } else {
                continue;
            };
            let entry = by_other.entry(other).or_default();
            entry.0 += link.value().abs();
            if link.is_transaction() {
                entry.1 += 1;
            }
        }

        by_other
            .into_iter()
            .map(|(other, (value, transactions))| Connection {
                other: other.to_owned(),
                label: graph
                    .node(other)
                    .map(|node| display_label(node, LabelMode::Label))
                    .unwrap_or_else(|| other.to_owned()),
                value,
                transactions,
            })
            .collect()
    }

    fn draw_selection(&mut self, ui: &mut Ui) {
        let Some(selected_id) = self.selected.clone() else {
            ui.label("Select a bubble on the map or a row in the holder list.");
            return;
        };
        let Some(node) = self.controller.graph().node(&selected_id).cloned() else {
            ui.label("The selected holder is not on the map any more.");
            return;
        };

        ui.label(RichText::new(node.label.as_str()).strong());
        ui.small(node.address.as_str());
        ui.horizontal_wrapped(|ui| {
            if node.is_main {
                ui.label(RichText::new("Token").color(ACCENT));
            }
            if node.is_smart_contract {
                ui.label("Smart contract");
            }
            if node.is_exchange {
                ui.label("Exchange");
            }
            if node.is_shared() {
                ui.label(format!("Holds {} tracked tokens", node.connected_tokens.len()));
            }
            if node.locked {
                ui.label("Locked");
            }
        });
        if let Some(address_label) = &node.address_label {
            ui.small(format!("Known as: {address_label}"));
        }
        ui.add_space(6.0);

        if !node.is_main {
            Self::draw_holder_metrics(ui, &node);
        }

        ui.separator();
        self.draw_node_actions(ui, &node);
        if self.selected.is_none() {
            return;
        }

        ui.separator();
        ui.label(RichText::new("Interactions").strong());
        self.draw_connections(ui, &node.id);
    }

    fn draw_holder_metrics(ui: &mut Ui, node: &GraphNode) {
        egui::Grid::new("holder_metrics")
            .num_columns(2)
            .striped(true)
            .show(ui, |ui| {
                metric_row(ui, "Tokens", format_amount(node.token_amount));
                metric_row(ui, "Value", format_usd(node.value_usd));
                metric_row(ui, "Ownership", format!("{:.4}%", node.ownership_percentage));
                metric_row(ui, "Inflow", format_amount(node.total_inflow));
                metric_row(ui, "Outflow", format_amount(node.total_outflow));
                metric_row(ui, "24h", format_change(node.balance_change_24h));
                metric_row(ui, "7d", format_change(node.balance_change_7d));
                metric_row(ui, "30d", format_change(node.balance_change_30d));
            });
    }

    fn draw_node_actions(&mut self, ui: &mut Ui, node: &GraphNode) {
        ui.horizontal(|ui| {
            ui.add(
                TextEdit::singleline(&mut self.label_edit)
                    .hint_text("Custom label")
                    .desired_width(170.0),
            );
            if ui.button("Set label").clicked() {
                self.session.set_custom_label(&node.id, &self.label_edit);
            }
        });

        ui.horizontal(|ui| {
            ui.label("Highlight");
            ui.color_edit_button_srgba(&mut self.highlight_color);
            if ui.button("Apply").clicked() {
                let color = to_hex(self.highlight_color);
                self.session.set_custom_highlight(&node.id, Some(&color));
            }
            if ui.button("Clear").clicked() {
                self.session.set_custom_highlight(&node.id, None);
                self.highlight_color = ACCENT;
            }
        });

        let mut delete = false;
        ui.horizontal(|ui| {
            let lock_text = if node.locked { "Unlock" } else { "Lock" };
            if ui.button(lock_text).clicked() {
                self.session.toggle_lock(&node.id);
            }
            let delete_text = if node.is_main { "Remove token" } else { "Delete" };
            if ui.button(delete_text).clicked() {
                delete = true;
            }
        });

        if delete {
            self.session.delete_node(&node.id, node.is_main);
            if node.is_main {
                self.loads
                    .retain(|load| canonical_id(&load.token) != node.id);
            }
            self.selected = None;
        }
    }

    fn draw_connections(&mut self, ui: &mut Ui, id: &str) {
        let connections = self.connections(id);
        if connections.is_empty() {
            ui.label("No interactions with other holders yet.");
            return;
        }

        let mut expand = None;
        let mut collapse = None;
        let mut focus = None;
        for connection in &connections {
            let expanded = self.session.expanded().is_expanded(id, &connection.other);
            let pending = self.is_expanding(id, &connection.other);
            ui.horizontal(|ui| {
                if ui.link(connection.label.as_str()).clicked() {
                    focus = Some(connection.other.clone());
                }
                ui.label(format_usd(connection.value));
                if expanded {
                    ui.small(format!("{} transactions", connection.transactions));
                    if ui.small_button("Collapse").clicked() {
                        collapse = Some(connection.other.clone());
                    }
                } else if pending {
                    ui.spinner();
                } else if ui.small_button("Transactions").clicked() {
                    expand = Some(connection.other.clone());
                }
            });
        }

        if let Some(other) = expand {
            self.request_expansion(id, &other);
        }
        if let Some(other) = collapse {
            self.session.collapse_link(id, &other);
        }
        if let Some(other) = focus {
            self.focus_node(&other);
        }
    }

    fn draw_deleted_nodes(&mut self, ui: &mut Ui) {
        let deleted = self
            .session
            .overrides()
            .deleted_snapshots
            .iter()
            .map(|(id, deleted)| {
                let at = deleted.deleted_at.with_timezone(&Local).format("%H:%M:%S");
                (id.clone(), deleted.node.label.clone(), at.to_string(), deleted.was_main)
            })
            .collect::<Vec<_>>();

        let mut action = None;
        egui::CollapsingHeader::new(format!("Deleted nodes ({})", deleted.len()))
            .default_open(false)
            .show(ui, |ui| {
                if deleted.is_empty() {
                    ui.label("Nothing deleted.");
                    return;
                }
                ui.horizontal(|ui| {
                    if ui.button("Restore all").clicked() {
                        action = Some(DeletedAction::RestoreAll);
                    }
                    if ui.button("Forget all").clicked() {
                        action = Some(DeletedAction::ForgetAll);
                    }
                });
                for (id, label, at, was_main) in &deleted {
                    ui.horizontal(|ui| {
                        ui.label(label.as_str());
                        ui.small(at.as_str());
                        if *was_main {
                            ui.small("(add the token again to restore)");
                        }
                        if ui.small_button("Restore").clicked() {
                            action = Some(DeletedAction::Restore(id.clone()));
                        }
                        if ui.small_button("Forget").clicked() {
                            action = Some(DeletedAction::Forget(id.clone()));
                        }
                    });
                }
            });

        match action {
            Some(DeletedAction::Restore(id)) => {
                self.session.restore_node(&id);
            }
            Some(DeletedAction::Forget(id)) => {
                self.session.forget_deleted(&id);
            }
            Some(DeletedAction::RestoreAll) => {
                self.session.restore_all();
            }
            Some(DeletedAction::ForgetAll) => {
                self.session.forget_all_deleted();
            }
            None => {}
        }
    }
}
