//! Rate-limited discovery of holder-to-holder interactions.
//!
//! Each holder costs one counterparty request. Requests go out in fixed-size batches; a
//! batch always settles completely before the next one starts, and a fixed delay sits
//! between batches so the sustained rate stays at `batch_size` requests per delay.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::address::{Chain, canonical_id, validate_for_chain};
use crate::error::LoadError;
use crate::session::TokenDataset;
use crate::source::{
    CounterpartiesPage, CounterpartySource, HolderRecord, HolderSource, InteractionEdge,
};

pub const DEFAULT_BATCH_SIZE: usize = 15;
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_secs(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetcherConfig {
    pub batch_size: usize,
    pub batch_delay: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay: DEFAULT_BATCH_DELAY,
        }
    }
}

/// Emitted once per processed holder, including holders whose request failed.
#[derive(Clone, Debug, PartialEq)]
pub struct InteractionEvent {
    pub holder_index: usize,
    pub holder_count: usize,
    pub edges: Vec<InteractionEdge>,
    pub failed: bool,
}

pub struct InteractionFetcher<S> {
    source: S,
    config: FetcherConfig,
}

impl<S: CounterpartySource> InteractionFetcher<S> {
    pub fn new(source: S, config: FetcherConfig) -> Self {
        Self { source, config }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Resolves with every discovered edge. Never fails: a holder whose lookup errors
    /// contributes no edges and is reported through `on_event` with `failed = true`.
    pub async fn find_interactions<F>(
        &self,
        holders: &[HolderRecord],
        chain: Chain,
        timeframe_days: u32,
        mut on_event: F,
    ) -> Vec<InteractionEdge>
    where
        F: FnMut(InteractionEvent),
    {
        let holder_ids = holders.iter().map(HolderRecord::id).collect::<HashSet<_>>();
        let batch_size = self.config.batch_size.max(1);
        let batch_count = holders.len().div_ceil(batch_size);
        let mut all_edges = Vec::new();

        info!(
            holders = holders.len(),
            batches = batch_count,
            batch_size,
            timeframe_days,
            "finding holder interactions"
        );

        for (batch_index, batch) in holders.chunks(batch_size).enumerate() {
            if batch_index > 0 {
                tokio::time::sleep(self.config.batch_delay).await;
            }
            debug!(
                batch = batch_index + 1,
                batches = batch_count,
                requests = batch.len(),
                "processing counterparty batch"
            );

            let offset = batch_index * batch_size;
            let mut pending = batch
                .iter()
                .enumerate()
                .map(|(position, holder)| async move {
                    let result = self
                        .source
                        .fetch_counterparties(&holder.address, chain, timeframe_days)
                        .await;
                    (offset + position, holder, result)
                })
                .collect::<FuturesUnordered<_>>();

            while let Some((holder_index, holder, result)) = pending.next().await {
                let (edges, failed) = match result {
                    Ok(page) => (matching_edges(holder, &page, &holder_ids), false),
                    Err(error) => {
                        warn!(holder = %holder.address, %error, "counterparty lookup failed");
                        (Vec::new(), true)
                    }
                };

                if !edges.is_empty() {
                    debug!(holder = %holder.address, matches = edges.len(), "holder interacts with other holders");
                }
                all_edges.extend(edges.iter().cloned());
                on_event(InteractionEvent {
                    holder_index,
                    holder_count: holders.len(),
                    edges,
                    failed,
                });
            }
        }

        info!(
            edges = all_edges.len(),
            holders = holders.len(),
            "holder interactions complete"
        );
        all_edges
    }
}

/// Runs [`InteractionFetcher::find_interactions`] on the current runtime and forwards its
/// events through a channel. The join handle yields the full edge list.
pub fn spawn_interaction_stream<S>(
    fetcher: Arc<InteractionFetcher<S>>,
    holders: Vec<HolderRecord>,
    chain: Chain,
    timeframe_days: u32,
) -> (
    UnboundedReceiver<InteractionEvent>,
    JoinHandle<Vec<InteractionEdge>>,
)
where
    S: CounterpartySource + Send + Sync + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(async move {
        fetcher
            .find_interactions(&holders, chain, timeframe_days, |event| {
                // The receiver going away only means nobody is watching progress any more.
                let _ = tx.send(event);
            })
            .await
    });
    (rx, handle)
}

/// Validates `token_address` for `chain` and fetches its holders.
///
/// Any failure here is fatal to the load: no dataset is created.
pub async fn load_token<S: HolderSource>(
    source: &S,
    token_address: &str,
    chain: Chain,
    per_page: u32,
) -> Result<TokenDataset, LoadError> {
    let token_address = validate_for_chain(token_address, chain)?;
    let page = source
        .fetch_holders(&token_address, chain, per_page)
        .await
        .map_err(|source_error| {
            error!(token = %token_address, %chain, error = %source_error, "holder fetch failed");
            LoadError::Holders(source_error)
        })?;

    if page.data.is_empty() {
        warn!(token = %token_address, %chain, "token has no holders");
        return Err(LoadError::NoHolders);
    }
    info!(token = %token_address, %chain, holders = page.data.len(), "loaded token holders");
    Ok(TokenDataset::new(token_address, chain, page.data))
}

fn matching_edges(
    holder: &HolderRecord,
    page: &CounterpartiesPage,
    holder_ids: &HashSet<String>,
) -> Vec<InteractionEdge> {
    let holder_id = holder.id();
    page.counterparties
        .iter()
        .filter(|counterparty| {
            let id = canonical_id(&counterparty.interacting_address);
            id != holder_id && holder_ids.contains(&id)
        })
        .map(|counterparty| {
            InteractionEdge::new(
                &holder.address,
                &counterparty.interacting_address,
                counterparty.vol_in,
                counterparty.vol_out,
            )
        })
        .collect()
}
