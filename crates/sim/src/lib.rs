//! Simulated MIFARE Classic reader and card
//!
//! A pure in-memory stand-in for the reader hardware, faithful to the one
//! protocol rule the scan core leans on: a failed authentication leaves the
//! card mute until it has been halted and re-selected. Anything built on
//! [`tagscan_reader::ReaderDriver`] can run against this crate unchanged.
//!
//! ## Overview
//!
//! - [`SimCard`]: sector keys and block storage, with builders for
//!   NDEF-formatted and factory-fresh cards plus raw 1K image import
//! - [`SimReader`]: the [`ReaderDriver`](tagscan_reader::ReaderDriver)
//!   implementation, with card removal simulation and instrumentation
//!   counters for tests

#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub mod card;
pub mod reader;

pub use card::{ImageError, SimCard, SimSector};
pub use reader::SimReader;
