//! Runtime utilities for Ledgerscope.

pub mod shutdown;

pub use shutdown::{ShutdownSignal, run_until_shutdown};
