use std::sync::mpsc::{Receiver, TryRecvError};

use bubblemap::address::{Chain, validate_for_chain};
use bubblemap::controller::UpdateController;
use bubblemap::graph::FilterConfig;
use bubblemap::layout::{SimulationParams, ViewTransform};
use bubblemap::session::{Session, TokenDataset};
use eframe::egui::{self, Color32, Context, vec2};
use tracing::info;

use crate::config::AppConfig;

mod graph;
mod loader;
mod render_utils;
mod ui;

use bubblemap::source::Transaction;
use loader::{LoadEvent, spawn_expansion, spawn_token_load};

pub struct BubbleMapApp {
    config: AppConfig,
    state: AppState,
    token_input: String,
    chain: Chain,
}

enum AppState {
    /// Waiting for a token address.
    Start { error: Option<String> },
    /// First token's holders are on their way.
    Loading { token: String, rx: Receiver<LoadEvent> },
    Ready(Box<ViewModel>),
}

/// Progress of one tracked token's interaction fetch.
struct TokenLoad {
    token: String,
    rx: Receiver<LoadEvent>,
    processed: usize,
    total: usize,
    failed: usize,
    finished: bool,
}

/// Transactions being fetched for the link between two node ids.
struct PendingExpansion {
    source: String,
    target: String,
    rx: Receiver<Result<Vec<Transaction>, String>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DragMode {
    Node,
    Pan,
}

struct ViewModel {
    config: AppConfig,
    session: Session,
    controller: UpdateController,
    view: ViewTransform,
    loads: Vec<TokenLoad>,
    /// Holder loads for additional tokens, before their dataset arrives.
    pending_tokens: Vec<(String, Receiver<LoadEvent>)>,
    expansions: Vec<PendingExpansion>,
    drag: Option<DragMode>,
    selected: Option<String>,
    search: String,
    token_input: String,
    chain: Chain,
    range_min_text: String,
    range_max_text: String,
    label_edit: String,
    highlight_color: Color32,
    status: Option<String>,
}

impl BubbleMapApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: AppConfig) -> Self {
        let chain = config.chain;
        let token_input = config.token.clone().unwrap_or_default();
        let state = match config.token.as_deref() {
            Some(token) => Self::start_load(&config, token, chain),
            None => AppState::Start { error: None },
        };
        Self {
            config,
            state,
            token_input,
            chain,
        }
    }

    fn start_load(config: &AppConfig, token: &str, chain: Chain) -> AppState {
        match validate_for_chain(token, chain) {
            Ok(token) => {
                info!(token = %token, %chain, "loading token");
                AppState::Loading {
                    rx: spawn_token_load(config, token.clone(), chain),
                    token,
                }
            }
            Err(error) => AppState::Start {
                error: Some(error.to_string()),
            },
        }
    }

    fn draw_start(&mut self, ctx: &Context, error: Option<&str>) -> Option<AppState> {
        let mut transition = None;
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(120.0);
                ui.heading("Token holder bubble map");
                ui.add_space(12.0);
                ui.add(
                    egui::TextEdit::singleline(&mut self.token_input)
                        .hint_text("Token address")
                        .desired_width(420.0),
                );
                ui.add_space(6.0);
                ui::chain_selector(ui, "start_chain", &mut self.chain);
                ui.add_space(8.0);
                if ui.button("Load holders").clicked() {
                    transition = Some(Self::start_load(&self.config, &self.token_input, self.chain));
                }
                if let Some(error) = error {
                    ui.add_space(10.0);
                    ui.colored_label(render_utils::RED, error);
                }
            });
        });
        transition
    }
}

impl eframe::App for BubbleMapApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Start { error } => {
                let error = error.clone();
                transition = self.draw_start(ctx, error.as_deref());
            }
            AppState::Loading { token, rx } => {
                match rx.try_recv() {
                    Ok(LoadEvent::Holders(dataset)) => {
                        let token = token.clone();
                        let rx = std::mem::replace(rx, std::sync::mpsc::channel().1);
                        transition = Some(AppState::Ready(Box::new(ViewModel::new(
                            self.config.clone(),
                            dataset,
                            TokenLoad::new(token, rx),
                        ))));
                    }
                    Ok(LoadEvent::Failed(error)) => {
                        transition = Some(AppState::Start { error: Some(error) });
                    }
                    Ok(_) | Err(TryRecvError::Empty) => {}
                    Err(TryRecvError::Disconnected) => {
                        transition = Some(AppState::Start {
                            error: Some("Background load worker disconnected".to_owned()),
                        });
                    }
                }

                let token = token.clone();
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading token holders...");
                        ui.label(token);
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
                ctx.request_repaint();
            }
            AppState::Ready(model) => model.show(ctx),
        }

        if let Some(next_state) = transition {
            self.state = next_state;
        }
    }
}

impl TokenLoad {
    fn new(token: String, rx: Receiver<LoadEvent>) -> Self {
        Self {
            token,
            rx,
            processed: 0,
            total: 0,
            failed: 0,
            finished: false,
        }
    }

    fn progress(&self) -> f32 {
        if self.finished {
            return 1.0;
        }
        if self.total == 0 {
            return 0.0;
        }
        self.processed as f32 / self.total as f32
    }
}

impl ViewModel {
    fn new(config: AppConfig, dataset: TokenDataset, load: TokenLoad) -> Self {
        let chain = dataset.chain;
        let mut session = Session::new(FilterConfig::default());
        session.track_token(dataset);
        session.apply_auto_scale();

        Self {
            controller: UpdateController::new(vec2(1000.0, 800.0), SimulationParams::default()),
            config,
            session,
            view: ViewTransform::default(),
            loads: vec![load],
            pending_tokens: Vec::new(),
            expansions: Vec::new(),
            drag: None,
            selected: None,
            search: String::new(),
            token_input: String::new(),
            chain,
            range_min_text: "1".to_owned(),
            range_max_text: String::new(),
            label_edit: String::new(),
            highlight_color: render_utils::ACCENT,
            status: None,
        }
    }

    fn is_loading(&self) -> bool {
        !self.pending_tokens.is_empty()
            || !self.expansions.is_empty()
            || self.loads.iter().any(|load| !load.finished)
    }

    /// Adds another token to the map. Returns `false` when the input is rejected.
    fn request_token(&mut self, token: &str, chain: Chain) -> bool {
        let token = match validate_for_chain(token, chain) {
            Ok(token) => token,
            Err(error) => {
                self.status = Some(error.to_string());
                return false;
            }
        };
        let already_loading = self
            .pending_tokens
            .iter()
            .any(|(pending, _)| pending.eq_ignore_ascii_case(&token));
        if self.session.is_tracked(&token) || already_loading {
            self.status = Some(format!("{token} is already on the map"));
            return false;
        }

        info!(token = %token, %chain, "adding token");
        let rx = spawn_token_load(&self.config, token.clone(), chain);
        self.pending_tokens.push((token, rx));
        self.status = None;
        true
    }

    fn remove_token(&mut self, token: &str) {
        let evicted = self.session.remove_token(token);
        // Dropping the receiver stops the worker at its next send.
        self.loads.retain(|load| !load.token.eq_ignore_ascii_case(token));
        info!(token, evicted = evicted.len(), "removed token");
        if self
            .selected
            .as_ref()
            .is_some_and(|selected| evicted.contains(selected))
        {
            self.selected = None;
        }
    }

    fn request_expansion(&mut self, source: &str, target: &str) {
        if self.is_expanding(source, target) {
            return;
        }
        let graph = self.controller.graph();
        let (Some(source_node), Some(target_node)) = (graph.node(source), graph.node(target)) else {
            return;
        };
        let (source_address, target_address) = (source_node.address.clone(), target_node.address.clone());
        let Some(chain) = self.chain_of(source) else {
            return;
        };
        self.expansions.push(PendingExpansion {
            source: source.to_owned(),
            target: target.to_owned(),
            rx: spawn_expansion(&self.config, chain, source_address, target_address),
        });
    }

    fn is_expanding(&self, a: &str, b: &str) -> bool {
        self.expansions.iter().any(|pending| {
            (pending.source == a && pending.target == b) || (pending.source == b && pending.target == a)
        })
    }

    /// Chain of the first tracked token `id` belongs to.
    fn chain_of(&self, id: &str) -> Option<Chain> {
        let node = self.controller.graph().node(id)?;
        self.session
            .datasets()
            .iter()
            .find(|dataset| node.connected_tokens.contains(&dataset.token_id()))
            .map(|dataset| dataset.chain)
    }

    fn poll_background(&mut self) {
        for (token, rx) in std::mem::take(&mut self.pending_tokens) {
            match rx.try_recv() {
                Ok(LoadEvent::Holders(dataset)) => {
                    self.session.track_token(dataset);
                    self.loads.push(TokenLoad::new(token, rx));
                }
                Ok(LoadEvent::Failed(error)) => self.status = Some(error),
                Ok(_) | Err(TryRecvError::Empty) => self.pending_tokens.push((token, rx)),
                Err(TryRecvError::Disconnected) => {
                    self.status = Some(format!("Loading {token} stopped unexpectedly"));
                }
            }
        }

        for load in &mut self.loads {
            loop {
                match load.rx.try_recv() {
                    Ok(LoadEvent::Interactions { token, event }) => {
                        load.processed += 1;
                        load.total = event.holder_count;
                        if event.failed {
                            load.failed += 1;
                        }
                        self.session.append_interactions(&token, event.edges);
                    }
                    Ok(LoadEvent::Finished { token, edges }) => {
                        info!(token = %token, edges, failed = load.failed, "interaction fetch finished");
                        load.finished = true;
                    }
                    Ok(LoadEvent::Failed(error)) => {
                        self.status = Some(error);
                        load.finished = true;
                    }
                    Ok(LoadEvent::Holders(_)) => {}
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        load.finished = true;
                        break;
                    }
                }
            }
        }

        for pending in std::mem::take(&mut self.expansions) {
            match pending.rx.try_recv() {
                Ok(Ok(transactions)) => {
                    info!(
                        source = %pending.source,
                        target = %pending.target,
                        transactions = transactions.len(),
                        "expanded link"
                    );
                    self.session
                        .expand_link(&pending.source, &pending.target, transactions);
                }
                Ok(Err(error)) => self.status = Some(error),
                Err(TryRecvError::Empty) => self.expansions.push(pending),
                Err(TryRecvError::Disconnected) => {}
            }
        }
    }
}
