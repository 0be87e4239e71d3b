//! Sales aggregation and chart projections.
//!
//! [`aggregate`](aggregate::aggregate) folds raw records into a per-date
//! series keyed by (station, route), and
//! [`project`](projection::project) narrows that series to a selection and
//! summarizes it.

pub mod aggregate;
pub mod projection;
pub mod types;
pub mod utility;

pub use aggregate::aggregate;
pub use projection::{Projection, Selection, project};
pub use types::{ChartSeries, Combination, DateBucket};
