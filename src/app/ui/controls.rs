use bubblemap::graph::{
    GraphNode, LabelMode, MAX_SCALE_FACTOR, MIN_SCALE_FACTOR, SizeMetric, parse_bound,
    truncated_address,
};
use bubblemap::util::format_usd;
use eframe::egui::{self, ProgressBar, RichText, Slider, TextEdit, Ui};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use tracing::debug;

use super::super::ViewModel;
use super::super::render_utils::{RED, display_label};

const HOLDER_ROW_HEIGHT: f32 = 20.0;

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

/// Best score of `query` against the node's label and address.
fn holder_match_score(matcher: &SkimMatcherV2, node: &GraphNode, query: &str) -> Option<i64> {
    let label = fuzzy_match_score(matcher, &node.label, query);
    let address = fuzzy_match_score(matcher, &node.address, query);
    label.max(address)
}

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        self.draw_token_controls(ui);
        ui.separator();
        self.draw_filter_controls(ui);
        ui.separator();
        self.draw_holder_search(ui);
    }

    fn draw_token_controls(&mut self, ui: &mut Ui) {
        ui.heading("Tokens");
        ui.horizontal(|ui| {
            ui.add(
                TextEdit::singleline(&mut self.token_input)
                    .hint_text("Token address")
                    .desired_width(180.0),
            );
            super::chain_selector(ui, "add_token_chain", &mut self.chain);
        });
        if ui.button("Add token").clicked() {
            let token = self.token_input.clone();
            if self.request_token(&token, self.chain) {
                self.token_input.clear();
            }
        }

        if let Some(status) = self.status.clone() {
            ui.horizontal_wrapped(|ui| {
                ui.colored_label(RED, status);
                if ui.small_button("Dismiss").clicked() {
                    self.status = None;
                }
            });
        }

        for (token, _) in &self.pending_tokens {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label(format!("Loading {}", truncated_address(token)));
            });
        }

        let mut remove = None;
        for dataset in self.session.datasets() {
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                ui.label(RichText::new(truncated_address(&dataset.token_address)).strong())
                    .on_hover_text(dataset.token_address.as_str());
                ui.small(dataset.chain.as_str());
                ui.small(format!("{} holders", dataset.holders.len()));
                if ui.small_button("Remove").clicked() {
                    remove = Some(dataset.token_address.clone());
                }
            });

            let load = self
                .loads
                .iter()
                .find(|load| load.token.eq_ignore_ascii_case(&dataset.token_address))
                .filter(|load| !load.finished);
            match load {
                Some(load) => {
                    ui.add(
                        ProgressBar::new(load.progress())
                            .text(format!("interactions {}/{}", load.processed, load.total)),
                    );
                }
                None => {
                    ui.small(format!("{} interactions", dataset.interactions.len()));
                }
            }
        }

        if let Some(token) = remove {
            self.remove_token(&token);
        }
    }

    fn draw_filter_controls(&mut self, ui: &mut Ui) {
        ui.heading("Filters");
        let mut filters = self.session.filters().clone();

        let mut metric = filters.size_metric;
        egui::ComboBox::from_label("Size by")
            .selected_text(metric.label())
            .show_ui(ui, |ui| {
                for option in SizeMetric::ALL {
                    ui.selectable_value(&mut metric, option, option.label());
                }
            });
        if metric != filters.size_metric {
            self.session.set_size_metric(metric);
            filters = self.session.filters().clone();
        }

        ui.checkbox(&mut filters.show_smart_contracts, "Show smart contracts");
        ui.checkbox(&mut filters.show_exchanges, "Show exchanges");
        ui.checkbox(&mut filters.highlight_shared, "Highlight shared holders");
        ui.checkbox(&mut filters.token_hubs, "Token hubs");
        ui.horizontal(|ui| {
            ui.label("Labels");
            ui.radio_value(&mut filters.label_mode, LabelMode::Address, "Address");
            ui.radio_value(&mut filters.label_mode, LabelMode::Label, "Label");
        });

        ui.add_enabled_ui(filters.size_metric != SizeMetric::Uniform, |ui| {
            ui.horizontal(|ui| {
                ui.label("Range");
                ui.add(
                    TextEdit::singleline(&mut self.range_min_text)
                        .hint_text("min")
                        .desired_width(70.0),
                );
                ui.add(
                    TextEdit::singleline(&mut self.range_max_text)
                        .hint_text("max")
                        .desired_width(70.0),
                );
                if ui.button("Apply").clicked() {
                    filters.range_min = parse_bound(&self.range_min_text);
                    filters.range_max = parse_bound(&self.range_max_text);
                }
            });

            let mut scale = filters.scale_factor;
            let response = ui.add(
                Slider::new(&mut scale, MIN_SCALE_FACTOR..=MAX_SCALE_FACTOR).text("Bubble scale"),
            );
            if response.changed() {
                filters.set_scale_factor(scale);
            }
        });

        let auto_scale = ui.button("Auto scale").clicked();
        if self.session.set_filters(filters) {
            debug!("filters changed");
        }
        if auto_scale {
            self.session.apply_auto_scale();
        }
    }

    fn draw_holder_search(&mut self, ui: &mut Ui) {
        ui.heading("Holders");
        ui.add(TextEdit::singleline(&mut self.search).hint_text("Search address or label"));

        let query = self.search.trim();
        let metric = self.session.filters().size_metric;
        let matcher = SkimMatcherV2::default();
        let mut rows = self
            .controller
            .graph()
            .nodes
            .iter()
            .filter(|node| !node.is_main)
            .filter_map(|node| {
                if query.is_empty() {
                    return Some((0, node));
                }
                holder_match_score(&matcher, node, query).map(|score| (score, node))
            })
            .collect::<Vec<_>>();
        if query.is_empty() {
            rows.sort_by(|a, b| b.1.metric(metric).total_cmp(&a.1.metric(metric)));
        } else {
            rows.sort_by(|a, b| b.0.cmp(&a.0));
        }

        let mut focus = None;
        egui::ScrollArea::vertical()
            .id_salt("holder_list")
            .auto_shrink([false, false])
            .show_rows(ui, HOLDER_ROW_HEIGHT, rows.len(), |ui, row_range| {
                for (_, node) in &rows[row_range] {
                    let selected = self.selected.as_deref() == Some(node.id.as_str());
                    let text = format!(
                        "{}  {}",
                        display_label(node, LabelMode::Label),
                        format_usd(node.value_usd)
                    );
                    if ui.selectable_label(selected, text).clicked() {
                        focus = Some(node.id.clone());
                    }
                }
            });

        if let Some(id) = focus {
            self.focus_node(&id);
        }
    }
}
