//! Capability interface and wire types for contactless MIFARE Classic readers
//!
//! This crate defines the boundary between the sector-scan core and the
//! reader hardware. A reader chip (MFRC522, PN5180, ...) is driven through
//! the [`ReaderDriver`] trait; register maps, SPI plumbing and antenna
//! bring-up live behind it and never leak into the scan logic.
//!
//! ## Overview
//!
//! - [`ReaderDriver`]: presence detection, select, sector authentication,
//!   block reads, halt and crypto teardown as a capability interface
//! - [`DriverError`]: the failure taxonomy reader chips actually report
//! - [`types`]: UID, SAK-derived card families and MIFARE key material
//!
//! Implementations are expected to be dumb pipes: the protocol rules (most
//! importantly the mandatory card recovery after a failed authentication)
//! are enforced one layer up, by the session type in `tagscan-classic`.

#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub mod driver;
pub mod error;
pub mod types;

pub use driver::ReaderDriver;
pub use error::DriverError;
pub use types::{CardIdentity, CardType, KeySide, MifareKey, Uid};
