//! Common utilities module
//!
//! This module contains shared utilities used across the scan pipeline.

pub mod error;

pub use error::{Result, ScanError};
