//! Background workers. Each one owns a current-thread tokio runtime on its own OS thread
//! and reports back to the UI over a std channel that is polled every frame.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use anyhow::{Context, Result};
use bubblemap::address::Chain;
use bubblemap::fetcher::{InteractionEvent, InteractionFetcher, load_token, spawn_interaction_stream};
use bubblemap::session::TokenDataset;
use bubblemap::source::{ProxyClient, Transaction, TransactionSource};
use tokio::runtime::Runtime;
use tracing::{debug, warn};

use crate::config::AppConfig;

pub(super) enum LoadEvent {
    Holders(TokenDataset),
    Interactions {
        token: String,
        event: InteractionEvent,
    },
    Finished {
        token: String,
        edges: usize,
    },
    Failed(String),
}

fn runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the loader runtime")
}

pub(super) fn spawn_token_load(config: &AppConfig, token: String, chain: Chain) -> Receiver<LoadEvent> {
    let (tx, rx) = mpsc::channel();
    let config = config.clone();

    thread::spawn(move || {
        if let Err(error) = run_token_load(&config, &token, chain, &tx) {
            warn!(token = %token, error = %format!("{error:#}"), "token load failed");
            let _ = tx.send(LoadEvent::Failed(format!("{error:#}")));
        }
    });

    rx
}

fn run_token_load(config: &AppConfig, token: &str, chain: Chain, tx: &Sender<LoadEvent>) -> Result<()> {
    let runtime = runtime()?;
    let client = ProxyClient::new(&config.api_base, config.request_timeout)
        .context("failed to build the HTTP client")?;

    runtime.block_on(async {
        let dataset = match load_token(&client, token, chain, config.holders_per_page).await {
            Ok(dataset) => dataset,
            Err(error) => {
                // Already user-facing; no context prefix.
                let _ = tx.send(LoadEvent::Failed(error.to_string()));
                return Ok(());
            }
        };

        let token_address = dataset.token_address.clone();
        let holders = dataset.holders.clone();
        if tx.send(LoadEvent::Holders(dataset)).is_err() {
            return Ok(());
        }

        let fetcher = Arc::new(InteractionFetcher::new(client, config.fetcher));
        let (mut events, handle) =
            spawn_interaction_stream(fetcher, holders, chain, config.timeframe_days);
        while let Some(event) = events.recv().await {
            let forwarded = tx.send(LoadEvent::Interactions {
                token: token_address.clone(),
                event,
            });
            if forwarded.is_err() {
                debug!(token = %token_address, "viewer dropped the load, stopping interaction fetch");
                handle.abort();
                return Ok(());
            }
        }

        let edges = handle.await.context("interaction fetch task failed")?;
        let _ = tx.send(LoadEvent::Finished {
            token: token_address,
            edges: edges.len(),
        });
        Ok::<_, anyhow::Error>(())
    })
}

pub(super) fn spawn_expansion(
    config: &AppConfig,
    chain: Chain,
    source: String,
    target: String,
) -> Receiver<Result<Vec<Transaction>, String>> {
    let (tx, rx) = mpsc::channel();
    let config = config.clone();

    thread::spawn(move || {
        let transactions = fetch_transactions(&config, chain, &source, &target)
            .map_err(|error| format!("{error:#}"));
        let _ = tx.send(transactions);
    });

    rx
}

fn fetch_transactions(
    config: &AppConfig,
    chain: Chain,
    source: &str,
    target: &str,
) -> Result<Vec<Transaction>> {
    let runtime = runtime()?;
    let client = ProxyClient::new(&config.api_base, config.request_timeout)
        .context("failed to build the HTTP client")?;
    runtime
        .block_on(client.fetch_transactions(source, target, chain, config.timeframe_days))
        .with_context(|| format!("failed to load transactions between {source} and {target}"))
}
