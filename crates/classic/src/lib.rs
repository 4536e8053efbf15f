//! MIFARE Classic sector authentication and read core
//!
//! The state machine that turns a card in the field into a scan report:
//! try an ordered sequence of well-known keys per sector, recover the
//! card's session after every refused attempt (a protocol requirement,
//! since a failed authenticate leaves the card mute), then read and
//! decode the sector's data blocks.
//!
//! ## Overview
//!
//! - [`CardSession`]: exclusive owner of the reader driver; presence
//!   polling, authentication with mandatory post-failure recovery,
//!   block reads, release
//! - [`KeyCatalog`]: the key fallback precedence as data
//! - [`SectorAuthenticator`]: one pass over the catalog per sector
//! - [`BlockReader`]: data-block reads with per-block failure isolation,
//!   printable decoding and NDEF TLV detection
//! - [`Scanner`]: walks all sectors, aggregates the [`ScanReport`],
//!   keeps going past denied sectors, survives a lost card
//!
//! Failures that the protocol can recover from are absorbed where they
//! happen; denied sectors, unreadable blocks and a lost card travel as
//! report data, never as errors.

#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub mod authenticator;
pub mod blocks;
pub mod error;
pub mod event;
pub mod keys;
pub mod scan;
pub mod sector;
pub mod session;

pub use authenticator::{AuthOutcome, SectorAuthenticator};
pub use blocks::{BlockContent, BlockReader, BlockRecord, NdefTlv};
pub use error::{Error, Result};
pub use event::{StatusEvent, StatusEventHandler};
pub use keys::{KeyCandidate, KeyCatalog, KeySource};
pub use scan::{ScanConfig, ScanReport, Scanner, SectorScan};
pub use sector::Sector;
pub use session::{CardSession, Timings};

pub use tagscan_reader::{CardIdentity, CardType, DriverError, KeySide, MifareKey, ReaderDriver, Uid};
