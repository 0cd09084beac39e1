//! Boundary to the analytics proxy.
//!
//! The fetcher and the loaders only see these traits, so tests can swap the HTTP client
//! for an in-memory source.

mod http;
mod schema;

use std::future::Future;

use crate::address::Chain;
use crate::error::SourceError;

pub use http::{ProxyClient, date_range};
pub use schema::{
    Counterparty, CounterpartiesPage, HolderRecord, HoldersPage, InteractionEdge, Pagination,
    Transaction, parse_counterparties, parse_transactions,
};

/// Longest window the counterparty endpoint accepts.
pub const MAX_TIMEFRAME_DAYS: u32 = 365;

pub trait HolderSource {
    /// Holders with at least one token, largest balances first.
    fn fetch_holders(
        &self,
        token_address: &str,
        chain: Chain,
        per_page: u32,
    ) -> impl Future<Output = Result<HoldersPage, SourceError>> + Send;
}

pub trait CounterpartySource {
    /// Addresses `holder_address` transacted with over the last `timeframe_days`
    /// (capped at [`MAX_TIMEFRAME_DAYS`]).
    fn fetch_counterparties(
        &self,
        holder_address: &str,
        chain: Chain,
        timeframe_days: u32,
    ) -> impl Future<Output = Result<CounterpartiesPage, SourceError>> + Send;
}

pub trait TransactionSource {
    fn fetch_transactions(
        &self,
        address: &str,
        counterparty: &str,
        chain: Chain,
        timeframe_days: u32,
    ) -> impl Future<Output = Result<Vec<Transaction>, SourceError>> + Send;
}
