use std::time::Duration;

use chrono::{Days, Local, NaiveDate};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::address::Chain;
use crate::error::SourceError;

use super::schema::{ErrorBody, parse_counterparties, parse_transactions};
use super::{
    CounterpartiesPage, CounterpartySource, HolderSource, HoldersPage, MAX_TIMEFRAME_DAYS,
    Transaction, TransactionSource,
};

const HOLDERS_PATH: &str = "/api/nansen/api/v1/tgm/holders";
const COUNTERPARTIES_PATH: &str = "/api/nansen/api/beta/profiler/address/counterparties";
const TRANSACTIONS_PATH: &str = "/api/nansen/api/beta/profiler/address/transactions";
const COUNTERPARTIES_PER_PAGE: u32 = 100;

/// HTTP client for the serverless proxy in front of the analytics API.
#[derive(Clone, Debug)]
pub struct ProxyClient {
    client: reqwest::Client,
    base_url: String,
}

impl ProxyClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    async fn post_json(&self, endpoint: &'static str, body: &Value) -> Result<Value, SourceError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|body| body.message())
                .unwrap_or(text);
            return Err(SourceError::Status {
                endpoint,
                status: status.as_u16(),
                message,
            });
        }

        response.json::<Value>().await.map_err(|error| SourceError::Schema {
            endpoint,
            reason: error.to_string(),
        })
    }
}

/// `(from, to)` as `YYYY-MM-DD`, with the window capped at [`MAX_TIMEFRAME_DAYS`].
pub fn date_range(today: NaiveDate, timeframe_days: u32) -> (String, String) {
    let days = timeframe_days.min(MAX_TIMEFRAME_DAYS);
    let from = today
        .checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MIN);
    (
        from.format("%Y-%m-%d").to_string(),
        today.format("%Y-%m-%d").to_string(),
    )
}

impl HolderSource for ProxyClient {
    async fn fetch_holders(
        &self,
        token_address: &str,
        chain: Chain,
        per_page: u32,
    ) -> Result<HoldersPage, SourceError> {
        let body = json!({
            "chain": chain.as_str(),
            "token_address": token_address,
            "aggregate_by_entity": false,
            "label_type": "all_holders",
            "pagination": { "page": 1, "per_page": per_page },
            "filters": { "token_amount": { "min": 1 } },
            "order_by": [{ "field": "token_amount", "direction": "DESC" }],
        });

        let value = self.post_json(HOLDERS_PATH, &body).await?;
        let page = serde_json::from_value::<HoldersPage>(value).map_err(|error| {
            SourceError::Schema {
                endpoint: HOLDERS_PATH,
                reason: error.to_string(),
            }
        })?;
        info!(token = token_address, %chain, holders = page.data.len(), "fetched holders");
        Ok(page)
    }
}

impl CounterpartySource for ProxyClient {
    async fn fetch_counterparties(
        &self,
        holder_address: &str,
        chain: Chain,
        timeframe_days: u32,
    ) -> Result<CounterpartiesPage, SourceError> {
        let (from, to) = date_range(Local::now().date_naive(), timeframe_days);
        let body = json!({
            "parameters": {
                "walletAddresses": [holder_address],
                "chain": chain.as_str(),
                "sourceInput": "Combined",
                "groupBy": "wallet",
                "timeRange": { "from": from, "to": to },
            },
            "pagination": { "page": 1, "recordsPerPage": COUNTERPARTIES_PER_PAGE },
        });

        let value = self.post_json(COUNTERPARTIES_PATH, &body).await?;
        let page = parse_counterparties(&value).map_err(|reason| SourceError::Schema {
            endpoint: COUNTERPARTIES_PATH,
            reason,
        })?;
        debug!(
            holder = holder_address,
            counterparties = page.counterparties.len(),
            "fetched counterparties"
        );
        Ok(page)
    }
}

impl TransactionSource for ProxyClient {
    async fn fetch_transactions(
        &self,
        address: &str,
        counterparty: &str,
        chain: Chain,
        timeframe_days: u32,
    ) -> Result<Vec<Transaction>, SourceError> {
        let (from, to) = date_range(Local::now().date_naive(), timeframe_days);
        let body = json!({
            "parameters": {
                "walletAddresses": [address],
                "chain": chain.as_str(),
                "hideSpamToken": true,
            },
            "filters": {
                "blockTimestamp": { "from": from, "to": to },
                "counterparty_address": counterparty,
            },
            "pagination": { "page": 1, "recordsPerPage": COUNTERPARTIES_PER_PAGE },
        });

        let value = self.post_json(TRANSACTIONS_PATH, &body).await?;
        parse_transactions(&value).map_err(|reason| SourceError::Schema {
            endpoint: TRANSACTIONS_PATH,
            reason,
        })
    }
}
