//! Image and table I/O modules
//!
//! Image discovery and decoding using the `image` crate, and CSV artifacts
//! using the `csv` crate.

pub mod decoder;
pub mod table;
