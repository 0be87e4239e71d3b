//! Records returned by the station-sales API and the request/result types
//! around them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;

use crate::error::{Result, SalesError};

const MISSING_DATES: &str = "startDate and endDate parameters are required";

/// One row of the upstream `srt_station_sales` dataset.
///
/// The row is held exactly as the upstream sent it, so records pass through
/// the proxy unchanged: absent keys stay absent and `null`s stay `null`. The
/// accessors below read the columns the aggregation needs and tolerate
/// missing, `null` or oddly typed values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SalesRecord {
    raw: Map<String, Value>,
}

const RUN_DATE: &str = "RUN_YMD";
const STATION_NAME: &str = "SELLNG_STN_NM";
const ROUTE_NAME: &str = "ROUTE_NM";
const SELL_QUANTITY: &str = "SELLNG_QNTY";

impl SalesRecord {
    pub fn new(run_date: &str, station: &str, route: &str, sell_quantity: u64) -> Self {
        let mut raw = Map::new();
        raw.insert(RUN_DATE.to_string(), Value::from(run_date));
        raw.insert(STATION_NAME.to_string(), Value::from(station));
        raw.insert(ROUTE_NAME.to_string(), Value::from(route));
        raw.insert(SELL_QUANTITY.to_string(), Value::from(sell_quantity));
        Self { raw }
    }

    /// Any column of the row, as sent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.get(key)
    }

    /// `RUN_YMD` as text. A numeric value such as `20240601` is stringified.
    pub fn run_date(&self) -> Option<Cow<'_, str>> {
        match self.raw.get(RUN_DATE)? {
            Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            Value::Number(n) => Some(Cow::Owned(n.to_string())),
            _ => None,
        }
    }

    /// Parses the run date; `None` unless it is exactly eight digits forming
    /// a real calendar date.
    pub fn run_day(&self) -> Option<NaiveDate> {
        let run_date = self.run_date()?;
        let raw = run_date.trim();
        if raw.len() != 8 || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        NaiveDate::parse_from_str(raw, "%Y%m%d").ok()
    }

    /// `SELLNG_QNTY`, counting absent, `null` and non-numeric values as 0.
    /// Numeric strings are accepted; negative and fractional values are
    /// clamped and truncated.
    pub fn sell_quantity(&self) -> u64 {
        match self.raw.get(SELL_QUANTITY) {
            Some(Value::Number(n)) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f > 0.0).map(|f| f as u64))
                .unwrap_or(0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }

    /// Station name, or `None` when absent, `null` or empty.
    pub fn station(&self) -> Option<&str> {
        self.text(STATION_NAME)
    }

    /// Route name, or `None` when absent, `null` or empty.
    pub fn route(&self) -> Option<&str> {
        self.text(ROUTE_NAME)
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.raw
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// Inclusive range of run dates to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(SalesError::InvalidRequest(format!(
                "startDate {start} is after endDate {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn single_day(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    /// Parses the `startDate`/`endDate` query values (`YYYY-MM-DD`).
    ///
    /// Missing or empty values, unparseable dates and reversed ranges are all
    /// [`SalesError::InvalidRequest`].
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self> {
        let start = start.map(str::trim).filter(|s| !s.is_empty());
        let end = end.map(str::trim).filter(|s| !s.is_empty());

        let (Some(start), Some(end)) = (start, end) else {
            return Err(SalesError::InvalidRequest(MISSING_DATES.to_string()));
        };

        Self::new(parse_day("startDate", start)?, parse_day("endDate", end)?)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Start date in the upstream's `YYYYMMDD` form.
    pub fn compact_start(&self) -> String {
        self.start.format("%Y%m%d").to_string()
    }

    /// End date in the upstream's `YYYYMMDD` form.
    pub fn compact_end(&self) -> String {
        self.end.format("%Y%m%d").to_string()
    }
}

fn parse_day(name: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        SalesError::InvalidRequest(format!("{name} '{value}' is not a YYYY-MM-DD date"))
    })
}

/// Everything one fetch produced, in page arrival order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchResult {
    #[serde(rename = "data")]
    pub records: Vec<SalesRecord>,
    pub total_count: usize,
    pub page_count: u32,
}

/// One page of the upstream response. Only the fields the fetcher needs.
#[derive(Debug, Deserialize)]
pub(crate) struct SalesPage {
    #[serde(default)]
    pub(crate) data: Option<Vec<SalesRecord>>,
    #[serde(rename = "totalCount", default)]
    pub(crate) total_count: Option<u64>,
}
