//! Candidate record sources
//!
//! A fetcher produces the full candidate record set for one run, or a
//! terminal `FetchError` once its own retries are spent. Callers never see
//! transport or markup details.

mod errors;
mod file;
mod geonames;
mod table;

pub use errors::{FetchError, FetchResult};
pub use file::JsonlFileFetcher;
pub use geonames::{backoff_delay, is_retryable_status, GeoNamesFetcher, RetryPolicy, GEONAMES_URL};
pub use table::parse_country_table;

use crate::dataset::Record;

/// Source of candidate records.
pub trait SourceFetcher {
    fn fetch(&self) -> FetchResult<Vec<Record>>;

    /// Short human-readable description for logs.
    fn describe(&self) -> String;
}

impl<T: SourceFetcher + ?Sized> SourceFetcher for Box<T> {
    fn fetch(&self) -> FetchResult<Vec<Record>> {
        (**self).fetch()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
