//! Views over an aggregated [`ChartSeries`] for a chosen set of stations and
//! routes. Cheap enough to recompute on every selection change.

use crate::analyzers::types::{ChartSeries, Combination, DateBucket, serialize_totals};
use crate::analyzers::utility::mean;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// How many stations and routes are pre-selected when the caller picks none.
pub const DEFAULT_SELECTION_SIZE: usize = 3;

/// Stations and routes whose cartesian product forms the shown combinations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub stations: Vec<String>,
    pub routes: Vec<String>,
}

impl Selection {
    pub fn new(stations: Vec<String>, routes: Vec<String>) -> Self {
        Self { stations, routes }
    }

    /// The initial selection: the first few stations and routes of the series.
    pub fn default_for(series: &ChartSeries) -> Self {
        Self {
            stations: series
                .stations
                .iter()
                .take(DEFAULT_SELECTION_SIZE)
                .cloned()
                .collect(),
            routes: series
                .routes
                .iter()
                .take(DEFAULT_SELECTION_SIZE)
                .cloned()
                .collect(),
        }
    }

    /// Fills whichever side is empty from `series`, keeping explicit choices.
    pub fn or_default_for(self, series: &ChartSeries) -> Self {
        let fallback = Self::default_for(series);
        Self {
            stations: if self.stations.is_empty() {
                fallback.stations
            } else {
                self.stations
            },
            routes: if self.routes.is_empty() {
                fallback.routes
            } else {
                self.routes
            },
        }
    }

    /// Station-major cartesian product, duplicates dropped.
    pub fn combinations(&self) -> Vec<Combination> {
        let mut seen = HashSet::new();
        self.stations
            .iter()
            .flat_map(|station| {
                self.routes
                    .iter()
                    .map(move |route| Combination::new(station.clone(), route.clone()))
            })
            .filter(|combination| seen.insert(combination.clone()))
            .collect()
    }
}

/// The series restricted to a [`Selection`], with summary figures.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    /// Every bucket of the source, keeping only selected combinations.
    pub buckets: Vec<DateBucket>,
    /// Sum per selected combination over all buckets. Combinations that never
    /// occur are absent.
    #[serde(serialize_with = "serialize_totals")]
    pub totals: BTreeMap<Combination, u64>,
    pub total: u64,
    /// Mean of `totals`, 0.0 when empty.
    pub average: f64,
}

/// Restricts `series` to the combinations of `selection` and summarizes it.
pub fn project(series: &ChartSeries, selection: &Selection) -> Projection {
    let combinations = selection.combinations();

    let buckets: Vec<DateBucket> = series
        .buckets
        .iter()
        .map(|bucket| DateBucket {
            date: bucket.date,
            totals: combinations
                .iter()
                .filter_map(|c| bucket.quantity(c).map(|q| (c.clone(), q)))
                .collect(),
        })
        .collect();

    let mut totals: BTreeMap<Combination, u64> = BTreeMap::new();
    for bucket in &buckets {
        for (combination, quantity) in &bucket.totals {
            let total = totals.entry(combination.clone()).or_insert(0);
            *total = total.saturating_add(*quantity);
        }
    }

    let total = totals.values().fold(0u64, |sum, q| sum.saturating_add(*q));
    let values: Vec<f64> = totals.values().map(|&q| q as f64).collect();

    Projection {
        buckets,
        totals,
        total,
        average: mean(&values),
    }
}
