//! Output formatting and persistence for aggregated sales.
//!
//! Supports JSON logging and CSV append of a [`ChartSeries`].

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info};

use crate::analyzers::ChartSeries;
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::path::Path;

/// One CSV row: a date, a combination and its summed quantity.
#[derive(Debug, Serialize)]
struct SeriesRow<'a> {
    date: String,
    station: &'a str,
    route: &'a str,
    quantity: u64,
}

/// Logs any serializable value as pretty-printed JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Appends every (date, combination) total of `series` as CSV rows.
///
/// Creates the file with headers if it does not already exist. Returns the
/// number of rows written.
pub fn append_series(path: &str, series: &ChartSeries) -> Result<usize> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending CSV rows");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    let mut rows = 0;
    for bucket in &series.buckets {
        let date = bucket.date_key();
        for (combination, quantity) in &bucket.totals {
            writer.serialize(SeriesRow {
                date: date.clone(),
                station: &combination.station,
                route: &combination.route,
                quantity: *quantity,
            })?;
            rows += 1;
        }
    }
    writer.flush()?;

    Ok(rows)
}
