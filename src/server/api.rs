use crate::analyzers::{ChartSeries, Projection, Selection, aggregate, project};
use crate::error::SalesError;
use crate::fetch::HttpClient;
use crate::sales::{DateRange, FetchResult};
use crate::server::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Query;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Query parameters for `/api/srt`.
#[derive(Debug, Deserialize)]
pub struct SalesQuery {
    /// Start date (YYYY-MM-DD)
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,

    /// End date (YYYY-MM-DD)
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
}

/// Query parameters for `/api/srt/chart`.
#[derive(Debug, Deserialize)]
pub struct ChartQuery {
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,

    #[serde(rename = "endDate")]
    pub end_date: Option<String>,

    /// Stations to show (can be repeated: station=수서&station=동탄)
    #[serde(default)]
    pub station: Vec<String>,

    /// Routes to show (can be repeated)
    #[serde(default)]
    pub route: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChartResponse {
    series: ChartSeries,
    selection: Selection,
    projection: Projection,
    page_count: u32,
}

impl IntoResponse for SalesError {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// GET /api/srt - every sales record in the range, across all upstream pages.
///
/// Example: /api/srt?startDate=2024-06-01&endDate=2024-08-31
#[instrument(skip(state))]
pub async fn sales_handler<C: HttpClient + 'static>(
    State(state): State<AppState<C>>,
    Query(params): Query<SalesQuery>,
) -> Response {
    match load_sales(&state, params.start_date.as_deref(), params.end_date.as_deref()).await {
        Ok(result) => (StatusCode::OK, Json(result.as_ref())).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /api/srt/chart - the aggregated series plus a projection for the
/// requested stations and routes. Without any, the first three of each are
/// selected.
///
/// Example: /api/srt/chart?startDate=2024-06-01&endDate=2024-08-31&station=수서&route=경부선
#[instrument(skip(state))]
pub async fn chart_handler<C: HttpClient + 'static>(
    State(state): State<AppState<C>>,
    Query(params): Query<ChartQuery>,
) -> Response {
    let result =
        match load_sales(&state, params.start_date.as_deref(), params.end_date.as_deref()).await {
            Ok(result) => result,
            Err(e) => return e.into_response(),
        };

    let series = aggregate(&result.records);
    if series.skipped_records > 0 {
        warn!(
            skipped = series.skipped_records,
            "Records with unparseable run dates left out of the series"
        );
    }

    let selection = Selection::new(params.station, params.route).or_default_for(&series);
    let projection = project(&series, &selection);
    debug!(
        buckets = series.buckets.len(),
        combinations = projection.totals.len(),
        total = projection.total,
        "Chart projection computed"
    );

    let body = ChartResponse {
        series,
        selection,
        projection,
        page_count: result.page_count,
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// GET /health
pub async fn health_handler<C: HttpClient + 'static>(
    State(state): State<AppState<C>>,
) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "apiKeyConfigured": state.fetcher.config().api_key.is_some(),
    }))
}

/// Validates the range, then serves it from the query cache or the upstream.
async fn load_sales<C: HttpClient + 'static>(
    state: &AppState<C>,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<Arc<FetchResult>, SalesError> {
    let range = DateRange::parse(start, end).inspect_err(|e| {
        info!(error = %e, "Rejected sales request");
    })?;

    if let Some(hit) = state.cache.get(&range).await {
        return Ok(hit);
    }

    info!(start = %range.start(), end = %range.end(), "Fetching sales from upstream");
    match state.fetcher.fetch_sales(&range).await {
        Ok(result) => Ok(state.cache.insert(range, result).await),
        Err(e) => {
            error!(error = %e, "Sales fetch failed");
            Err(e)
        }
    }
}
