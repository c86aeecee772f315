//! Scan pipeline: universe → metrics source → scoring → filtered, ranked
//! result list, plus the text digest and tabular exports built from it.

mod digest;
mod error;
mod export;
mod fixtures;
mod scanner;

pub use digest::{to_digest, DIGEST_TITLE, SOFT_DISCLAIMER};
pub use error::OrchestratorError;
pub use export::{to_csv, to_json};
pub use fixtures::FixtureSource;
pub use scanner::{
    is_available, ScanFilters, ScanReport, ScanSummary, Scanner, MAX_PLAUSIBLE_PRICE,
    MIN_MARKET_CAP,
};
