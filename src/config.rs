use std::time::Duration;

use anyhow::{Context, Result, bail};
use bubblemap::address::Chain;
use bubblemap::fetcher::{DEFAULT_BATCH_SIZE, FetcherConfig};
use bubblemap::source::MAX_TIMEFRAME_DAYS;
use clap::Parser;
use tracing::warn;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// Base URL of the analytics proxy.
    #[arg(long, env = "BUBBLEMAP_API_BASE", default_value = "http://localhost:3000")]
    api_base: String,

    /// Token to load on start-up.
    #[arg(long, env = "BUBBLEMAP_TOKEN")]
    token: Option<String>,

    #[arg(long, env = "BUBBLEMAP_CHAIN", default_value = "solana")]
    chain: String,

    #[arg(long, env = "BUBBLEMAP_HOLDERS_PER_PAGE", default_value_t = 100)]
    holders_per_page: u32,

    /// Counterparty look-back window, capped at 365 days.
    #[arg(long, env = "BUBBLEMAP_TIMEFRAME_DAYS", default_value_t = MAX_TIMEFRAME_DAYS)]
    timeframe_days: u32,

    #[arg(long, env = "BUBBLEMAP_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    #[arg(long, env = "BUBBLEMAP_BATCH_DELAY_MS", default_value_t = 1000)]
    batch_delay_ms: u64,

    #[arg(long, env = "BUBBLEMAP_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    /// Tracing filter such as `bubblemap=debug`. Falls back to `RUST_LOG`.
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api_base: String,
    pub token: Option<String>,
    pub chain: Chain,
    pub holders_per_page: u32,
    pub timeframe_days: u32,
    pub fetcher: FetcherConfig,
    pub request_timeout: Duration,
}

impl Args {
    pub fn into_config(self) -> Result<AppConfig> {
        let chain = self
            .chain
            .parse::<Chain>()
            .with_context(|| format!("invalid chain {:?}", self.chain))?;
        if self.batch_size == 0 {
            bail!("batch size must be at least 1");
        }
        if self.holders_per_page == 0 {
            bail!("holders per page must be at least 1");
        }

        let timeframe_days = if self.timeframe_days > MAX_TIMEFRAME_DAYS {
            warn!(
                requested = self.timeframe_days,
                max = MAX_TIMEFRAME_DAYS,
                "timeframe capped"
            );
            MAX_TIMEFRAME_DAYS
        } else {
            self.timeframe_days
        };

        Ok(AppConfig {
            api_base: self.api_base,
            token: self.token.filter(|token| !token.trim().is_empty()),
            chain,
            holders_per_page: self.holders_per_page,
            timeframe_days,
            fetcher: FetcherConfig {
                batch_size: self.batch_size,
                batch_delay: Duration::from_millis(self.batch_delay_ms),
            },
            request_timeout: Duration::from_secs(self.timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_become_config_with_capped_timeframe() {
        let args = Args::try_parse_from([
            "bubblemap",
            "--chain",
            "Ethereum",
            "--timeframe-days",
            "900",
            "--batch-delay-ms",
            "250",
        ])
        .expect("valid flags");
        let config = args.into_config().expect("valid config");

        assert_eq!(config.chain, Chain::Ethereum);
        assert_eq!(config.timeframe_days, MAX_TIMEFRAME_DAYS);
        assert_eq!(config.fetcher.batch_delay, Duration::from_millis(250));
    }

    #[test]
    fn unknown_chain_is_rejected() {
        let args = Args::try_parse_from(["bubblemap", "--chain", "dogechain"]).expect("parses");
        assert!(args.into_config().is_err());
    }
}
