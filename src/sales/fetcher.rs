//! Paginated client for the `srt_station_sales` endpoint.

use std::time::Duration;

use percent_encoding::percent_decode_str;
use reqwest::header::{ACCEPT, HeaderValue};
use reqwest::{Method, Request, Url};
use tracing::{debug, info, warn};

use crate::config::SrtConfig;
use crate::error::{Result, SalesError};
use crate::fetch::HttpClient;
use crate::fetch::auth::UrlParam;
use crate::sales::types::{DateRange, FetchResult, SalesPage};

const SALES_PATH: &str = "/v1/srt_station_sales";
const SERVICE_KEY_PARAM: &str = "serviceKey";
const ACCEPT_VALUE: &str = "application/json, text/xml";

/// Walks every page of the station-sales dataset for a date range.
///
/// Pages are requested one at a time in increasing order. The first failing
/// page aborts the whole fetch and nothing accumulated so far is returned.
pub struct SalesFetcher<C> {
    client: C,
    config: SrtConfig,
}

impl<C: HttpClient> SalesFetcher<C> {
    pub fn new(client: C, config: SrtConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &SrtConfig {
        &self.config
    }

    /// Fetches all sales records whose run date falls inside `range`.
    ///
    /// # Errors
    ///
    /// [`SalesError::Configuration`] when no API key is set (checked before
    /// any request), otherwise the error of the first page that failed.
    #[tracing::instrument(skip(self), fields(start = %range.start(), end = %range.end()))]
    pub async fn fetch_sales(&self, range: &DateRange) -> Result<FetchResult> {
        let key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| SalesError::Configuration("API key not configured".to_string()))?;

        let client = UrlParam {
            inner: &self.client,
            param_name: SERVICE_KEY_PARAM.to_string(),
            key: decode_service_key(key),
        };

        let page_size = self.config.page_size;
        let mut records = Vec::new();
        let mut page = 1;

        loop {
            let body = self.fetch_page(&client, range, page).await?;
            let data = body.data.unwrap_or_default();
            let received = data.len();
            records.extend(data);

            debug!(
                page,
                received,
                accumulated = records.len(),
                reported_total = body.total_count,
                "Page received"
            );

            let short_page = received < page_size as usize;
            let past_reported_total = body
                .total_count
                .is_some_and(|total| u64::from(page) >= last_page(total, page_size));
            let at_ceiling = page >= self.config.max_pages;

            if short_page || past_reported_total || at_ceiling {
                if at_ceiling && !short_page && !past_reported_total {
                    warn!(
                        max_pages = self.config.max_pages,
                        reported_total = body.total_count,
                        "Stopped at page ceiling, results may be incomplete"
                    );
                }
                break;
            }

            page += 1;
            if !self.config.page_delay.is_zero() {
                tokio::time::sleep(self.config.page_delay).await;
            }
        }

        info!(records = records.len(), pages = page, "Sales fetch complete");

        Ok(FetchResult {
            total_count: records.len(),
            records,
            page_count: page,
        })
    }

    async fn fetch_page<H: HttpClient>(
        &self,
        client: &H,
        range: &DateRange,
        page: u32,
    ) -> Result<SalesPage> {
        let url = page_url(&self.config.base_url, range, page, self.config.page_size)?;
        let mut req = Request::new(Method::GET, url);
        req.headers_mut()
            .insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));

        let timeout = self.config.request_timeout;
        let exchange = async {
            let resp = client.execute(req).await?;
            let status = resp.status();
            let body = resp.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        let (status, body) = match tokio::time::timeout(timeout, exchange).await {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => return Err(transport_error(e, page, timeout)),
            Err(_) => return Err(SalesError::Timeout { page, after: timeout }),
        };

        if !status.is_success() {
            warn!(page, status = status.as_u16(), body = %body, "Upstream returned error status");
            return Err(SalesError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| SalesError::InvalidResponse(format!("page {page}: {e}")))
    }
}

/// Builds the URL for one page, without the service key.
fn page_url(base_url: &str, range: &DateRange, page: u32, page_size: u32) -> Result<Url> {
    let endpoint = format!("{}{}", base_url.trim_end_matches('/'), SALES_PATH);
    let mut url = Url::parse(&endpoint).map_err(|e| {
        SalesError::Configuration(format!("invalid SRT_API_ENDPOINT '{base_url}': {e}"))
    })?;

    url.query_pairs_mut()
        .append_pair("page", &page.to_string())
        .append_pair("perPage", &page_size.to_string())
        .append_pair("cond[RUN_YMD::GTE]", &range.compact_start())
        .append_pair("cond[RUN_YMD::LTE]", &range.compact_end());

    Ok(url)
}

/// Index of the last page that can hold data, i.e. `ceil(total / page_size)`.
fn last_page(total: u64, page_size: u32) -> u64 {
    total.div_ceil(u64::from(page_size.max(1)))
}

/// Data-portal keys are often handed out percent-encoded. Decode once so the
/// key is not encoded twice when it goes on the URL.
fn decode_service_key(key: &str) -> String {
    percent_decode_str(key)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| key.to_string())
}

fn transport_error(e: reqwest::Error, page: u32, after: Duration) -> SalesError {
    if e.is_timeout() {
        SalesError::Timeout { page, after }
    } else {
        SalesError::Network(e.to_string())
    }
}
