use crate::analyzers::types::{ChartSeries, Combination, DateBucket};
use crate::sales::SalesRecord;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

/// Folds raw sales records into a per-date, per-combination [`ChartSeries`].
///
/// Quantities sharing a date and a (station, route) pair are summed. Records
/// without a station or route still open their date's bucket and contribute
/// their names to the distinct sets, but add nothing to any total. A record
/// whose run date cannot be parsed is counted in `skipped_records` and
/// otherwise ignored.
///
/// Totals saturate at `u64::MAX` rather than overflow.
///
/// The result depends only on the multiset of records, not their order.
pub fn aggregate(records: &[SalesRecord]) -> ChartSeries {
    let mut by_date: BTreeMap<NaiveDate, BTreeMap<Combination, u64>> = BTreeMap::new();
    let mut stations = BTreeSet::new();
    let mut routes = BTreeSet::new();
    let mut skipped_records = 0;

    for record in records {
        let station = record.station();
        let route = record.route();

        if let Some(station) = station {
            stations.insert(station);
        }
        if let Some(route) = route {
            routes.insert(route);
        }

        let Some(date) = record.run_day() else {
            skipped_records += 1;
            continue;
        };

        let totals = by_date.entry(date).or_default();

        if let (Some(station), Some(route)) = (station, route) {
            let total = totals.entry(Combination::new(station, route)).or_insert(0);
            *total = total.saturating_add(record.sell_quantity());
        }
    }

    ChartSeries {
        buckets: by_date
            .into_iter()
            .map(|(date, totals)| DateBucket { date, totals })
            .collect(),
        stations: stations.into_iter().map(str::to_string).collect(),
        routes: routes.into_iter().map(str::to_string).collect(),
        skipped_records,
    }
}
