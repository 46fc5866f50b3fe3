//! Core primitives for the Ledgerscope project.
/// Error kinds shared by the extraction pipeline
pub mod error;
/// Typed node response records
pub mod records;
/// Backoff helpers for caller-level retries
pub mod retries;

pub use error::IngestError;
