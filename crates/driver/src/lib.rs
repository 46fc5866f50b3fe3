//! Ledgerscope Driver crate root
//!
//! Block ingestion, range scraping and the driver that runs them against a node and `ClickHouse`.

pub mod driver;
pub mod ingestor;
pub mod scraper;
pub mod session;
pub mod trace_mode;

#[cfg(test)]
mod test_utils;

pub use driver::{Driver, resume_start, scrape_with_retry};
pub use ingestor::{ExtractionError, IngestSummary, ingest_block};
pub use scraper::{ScrapeReport, scrape_range};
pub use session::{ClickhouseSession, ScrapeSettings, Session};
pub use trace_mode::TraceMode;
