//! Scan orchestration: one report per card
//!
//! The scanner walks every sector of a Classic card in ascending order,
//! appending an entry per sector regardless of outcome. A denied sector
//! never stops the walk; a card pulled out of the field mid-scan ends it
//! with the partial report intact.

use std::fmt;

use tagscan_reader::{CardIdentity, ReaderDriver};
use tracing::{debug, info, warn};

use crate::authenticator::{AuthOutcome, SectorAuthenticator};
use crate::blocks::{BlockReader, BlockRecord, NdefTlv};
use crate::error::{Error, Result};
use crate::event::{StatusEvent, StatusEventHandler};
use crate::keys::KeyCatalog;
use crate::sector::{SECTOR_COUNT_1K, Sector};
use crate::session::{CardSession, Timings};

/// Scan configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    /// Number of sectors to walk, ascending from 0
    pub sector_count: u8,
    /// Radio settle timings
    pub timings: Timings,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            sector_count: SECTOR_COUNT_1K,
            timings: Timings::default(),
        }
    }
}

impl ScanConfig {
    /// The default configuration (16 sectors, hardware timings)
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the number of sectors to walk
    pub const fn with_sector_count(mut self, count: u8) -> Self {
        self.sector_count = count;
        self
    }

    /// Override the settle timings
    pub const fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }
}

/// Everything learned about one sector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectorScan {
    /// The sector
    pub sector: Sector,
    /// Which candidate opened it, if any
    pub outcome: AuthOutcome,
    /// Per-block results; empty when the sector was denied
    pub blocks: Vec<BlockRecord>,
    /// NDEF TLV header found at the start of the sector's first data block
    pub ndef: Option<NdefTlv>,
}

/// Aggregated result of scanning one card
///
/// Built incrementally, one entry per scanned sector in ascending order.
/// A scan cut short by a lost card returns whatever was built; partial
/// reports are never discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    /// Identity of the scanned card
    pub identity: CardIdentity,
    /// One entry per scanned sector
    pub sectors: Vec<SectorScan>,
}

impl ScanReport {
    const fn new(identity: CardIdentity) -> Self {
        Self {
            identity,
            sectors: Vec::new(),
        }
    }

    /// Sectors that were opened
    pub fn granted(&self) -> impl Iterator<Item = &SectorScan> {
        self.sectors.iter().filter(|entry| entry.outcome.is_granted())
    }

    /// Sectors that refused every candidate
    pub fn denied(&self) -> impl Iterator<Item = &SectorScan> {
        self.sectors
            .iter()
            .filter(|entry| !entry.outcome.is_granted())
    }

    /// Whether any scanned sector starts with an NDEF TLV header
    pub fn has_ndef(&self) -> bool {
        self.sectors.iter().any(|entry| entry.ndef.is_some())
    }
}

/// Walks a card's sectors and aggregates the report
pub struct Scanner<D: ReaderDriver> {
    session: CardSession<D>,
    authenticator: SectorAuthenticator,
    block_reader: BlockReader,
    config: ScanConfig,
    status: Option<Box<dyn StatusEventHandler>>,
    announced_waiting: bool,
}

impl<D: ReaderDriver> fmt::Debug for Scanner<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scanner")
            .field("session", &self.session)
            .field("config", &self.config)
            .field("has_status_handler", &self.status.is_some())
            .finish()
    }
}

impl<D: ReaderDriver> Scanner<D> {
    /// Scanner over `driver` with the default config and catalog
    pub fn new(driver: D) -> Self {
        Self::with_config(driver, ScanConfig::default())
    }

    /// Scanner over `driver` with an explicit config
    pub fn with_config(driver: D, config: ScanConfig) -> Self {
        Self {
            session: CardSession::with_timings(driver, config.timings),
            authenticator: SectorAuthenticator::new(KeyCatalog::standard()),
            block_reader: BlockReader::new(),
            config,
            status: None,
            announced_waiting: false,
        }
    }

    /// Attach a status-event handler
    pub fn with_status_handler<H>(mut self, handler: H) -> Self
    where
        H: StatusEventHandler + 'static,
    {
        self.status = Some(Box::new(handler));
        self
    }

    /// The wrapped session
    pub const fn session(&self) -> &CardSession<D> {
        &self.session
    }

    /// Mutable access to the wrapped session
    pub const fn session_mut(&mut self) -> &mut CardSession<D> {
        &mut self.session
    }

    /// Probe the reader chip. Scanning never begins on a dead chip.
    pub fn initialize(&mut self) -> Result<u8> {
        match self.session.probe() {
            Ok(version) => {
                info!(version = %format_args!("{version:#04x}"), "reader chip ready");
                Ok(version)
            }
            Err(error) => {
                warn!(%error, "reader chip not responding");
                self.emit(StatusEvent::HardwareFault);
                Err(error)
            }
        }
    }

    /// One cooperative poll step: scan the card in the field, if any.
    ///
    /// `Ok(None)` while the field is empty. A non-Classic card yields an
    /// empty report without a single sector being attempted. A card lost
    /// mid-scan yields the partial report built so far. The card is
    /// released in every case.
    pub fn poll_once(&mut self) -> Result<Option<ScanReport>> {
        let Some(identity) = self.session.poll()? else {
            if !self.announced_waiting {
                self.announced_waiting = true;
                self.emit(StatusEvent::Waiting);
            }
            return Ok(None);
        };
        self.announced_waiting = false;

        info!(uid = %identity.uid, card_type = %identity.card_type(), "card selected");
        let mut report = ScanReport::new(identity);

        if !identity.card_type().is_classic() {
            debug!(card_type = %identity.card_type(), "not a MIFARE Classic card, skipping scan");
            self.session.release();
            return Ok(Some(report));
        }

        self.emit(StatusEvent::Scanning);
        for index in 0..self.config.sector_count {
            let sector = Sector::new(index);
            match self.scan_sector(sector, &mut report) {
                Ok(()) => {}
                Err(Error::CardLost) => {
                    warn!(%sector, "card lost, keeping partial report");
                    break;
                }
                Err(error) => {
                    self.session.release();
                    return Err(error);
                }
            }
            self.session.pace_sectors();
        }

        info!(
            sectors = report.sectors.len(),
            granted = report.granted().count(),
            "scan finished"
        );
        self.session.release();
        Ok(Some(report))
    }

    fn scan_sector(&mut self, sector: Sector, report: &mut ScanReport) -> Result<()> {
        let outcome = self.authenticator.authenticate(&mut self.session, sector)?;
        let (blocks, ndef) = match outcome {
            AuthOutcome::Granted(_) => {
                self.emit(StatusEvent::SectorSuccess(sector));
                self.block_reader.read_sector(&mut self.session, sector)
            }
            AuthOutcome::Denied => {
                self.emit(StatusEvent::SectorDenied(sector));
                (Vec::new(), None)
            }
        };
        report.sectors.push(SectorScan {
            sector,
            outcome,
            blocks,
            ndef,
        });
        Ok(())
    }

    fn emit(&mut self, event: StatusEvent) {
        if let Some(handler) = &mut self.status {
            handler.handle_event(event);
        }
    }
}
