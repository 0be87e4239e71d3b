//! Data types used by the aggregation pipeline.

use chrono::NaiveDate;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// A (station, route) pair that sales are grouped under.
///
/// Kept as a pair rather than a joined string so names containing `-` cannot
/// collide. [`fmt::Display`] renders the `"{station}-{route}"` label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Combination {
    pub station: String,
    pub route: String,
}

impl Combination {
    pub fn new(station: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            station: station.into(),
            route: route.into(),
        }
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.station, self.route)
    }
}

/// Summed sell quantities for one calendar date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateBucket {
    /// Serialized as `YYYY-MM-DD`.
    pub date: NaiveDate,
    #[serde(serialize_with = "serialize_totals")]
    pub totals: BTreeMap<Combination, u64>,
}

impl DateBucket {
    /// The bucket's date as a `YYYY-MM-DD` key.
    pub fn date_key(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    pub fn quantity(&self, combination: &Combination) -> Option<u64> {
        self.totals.get(combination).copied()
    }
}

/// Time series ready for charting, plus the names seen in the source records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    /// Sorted ascending by date, one bucket per date.
    pub buckets: Vec<DateBucket>,
    /// Distinct non-empty station names, sorted.
    pub stations: Vec<String>,
    /// Distinct non-empty route names, sorted.
    pub routes: Vec<String>,
    /// Records whose run date could not be parsed.
    pub skipped_records: usize,
}

#[derive(Serialize)]
struct CombinationTotal<'a> {
    station: &'a str,
    route: &'a str,
    label: String,
    quantity: u64,
}

/// Writes a combination map as a JSON array, since object keys must be strings.
pub(crate) fn serialize_totals<S>(
    totals: &BTreeMap<Combination, u64>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut seq = serializer.serialize_seq(Some(totals.len()))?;
    for (combination, quantity) in totals {
        seq.serialize_element(&CombinationTotal {
            station: &combination.station,
            route: &combination.route,
            label: combination.to_string(),
            quantity: *quantity,
        })?;
    }
    seq.end()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_joins_with_hyphen() {
        assert_eq!(Combination::new("수서", "경부선").to_string(), "수서-경부선");
    }

    #[test]
    fn test_hyphenated_names_stay_distinct() {
        let a = Combination::new("A-B", "C");
        let b = Combination::new("A", "B-C");
        assert_eq!(a.to_string(), b.to_string());
        assert_ne!(a, b);
    }

    #[test]
    fn test_bucket_serializes_totals_as_array() {
        let bucket = DateBucket {
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            totals: BTreeMap::from([(Combination::new("수서", "경부선"), 12)]),
        };

        let value = serde_json::to_value(&bucket).unwrap();
        assert_eq!(
            value,
            json!({
                "date": "2024-06-01",
                "totals": [
                    { "station": "수서", "route": "경부선", "label": "수서-경부선", "quantity": 12 }
                ]
            })
        );
    }
}
