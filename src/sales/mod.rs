//! Fetching station-sales records from the upstream data portal.

pub mod fetcher;
pub mod types;

pub use fetcher::SalesFetcher;
pub use types::{DateRange, FetchResult, SalesRecord};
