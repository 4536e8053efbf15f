//! Card session: exclusive owner of the reader driver
//!
//! The session enforces the one protocol rule everything else depends on:
//! after a failed authentication the card's crypto session is in an
//! unknown state and the card must be halted and re-selected before it
//! will answer anything again. `authenticate` performs that recovery
//! before it returns, so callers can simply move on to the next key
//! candidate.

use std::thread;
use std::time::Duration;

use tagscan_reader::{CardIdentity, DriverError, KeySide, MifareKey, ReaderDriver};
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::sector::Sector;

/// Minimum settle delays the radio interface requires between operations
///
/// These are timing contracts with the card, not throttling: dropping
/// them makes the next operation race the card's state transition.
/// `Default` carries the hardware values; [`Timings::immediate`] is for
/// simulated transports only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Wait after stopping Crypto1 before the next authenticate
    pub pre_auth_settle: Duration,
    /// Wait after halting a card mid-failure before re-selecting it
    pub recovery_settle: Duration,
    /// Pace between consecutive sector scans
    pub sector_pace: Duration,
    /// Poll interval while waiting for a card
    pub poll_interval: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            pre_auth_settle: Duration::from_millis(10),
            recovery_settle: Duration::from_millis(50),
            sector_pace: Duration::from_millis(100),
            poll_interval: Duration::from_millis(50),
        }
    }
}

impl Timings {
    /// The hardware timings
    pub fn new() -> Self {
        Self::default()
    }

    /// No waits at all. Only sound against simulated transports.
    pub const fn immediate() -> Self {
        Self {
            pre_auth_settle: Duration::ZERO,
            recovery_settle: Duration::ZERO,
            sector_pace: Duration::ZERO,
            poll_interval: Duration::ZERO,
        }
    }

    /// Override the pre-authenticate settle
    pub const fn with_pre_auth_settle(mut self, value: Duration) -> Self {
        self.pre_auth_settle = value;
        self
    }

    /// Override the post-failure recovery settle
    pub const fn with_recovery_settle(mut self, value: Duration) -> Self {
        self.recovery_settle = value;
        self
    }

    /// Override the inter-sector pace
    pub const fn with_sector_pace(mut self, value: Duration) -> Self {
        self.sector_pace = value;
        self
    }

    /// Override the poll interval
    pub const fn with_poll_interval(mut self, value: Duration) -> Self {
        self.poll_interval = value;
        self
    }
}

/// Session with the card currently in the field
///
/// Owns the driver exclusively; every other component borrows the
/// session. The selected identity is held only while the card is.
#[derive(Debug)]
pub struct CardSession<D: ReaderDriver> {
    driver: D,
    timings: Timings,
    selected: Option<CardIdentity>,
}

impl<D: ReaderDriver> CardSession<D> {
    /// Wrap a driver with default timings
    pub fn new(driver: D) -> Self {
        Self::with_timings(driver, Timings::default())
    }

    /// Wrap a driver with explicit timings
    pub const fn with_timings(driver: D, timings: Timings) -> Self {
        Self {
            driver,
            timings,
            selected: None,
        }
    }

    /// The configured timings
    pub const fn timings(&self) -> &Timings {
        &self.timings
    }

    /// Identity selected by the last poll, if the card is still held
    pub const fn selected(&self) -> Option<&CardIdentity> {
        self.selected.as_ref()
    }

    /// The wrapped driver
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// Mutable access to the wrapped driver
    pub const fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Probe the reader chip.
    ///
    /// A version register reading 0x00 or 0xFF means the chip is not
    /// wired up or not answering; scanning never begins in that case.
    pub fn probe(&mut self) -> Result<u8> {
        let version = self.driver.chip_version()?;
        trace!(version = %format_args!("{version:#04x}"), "chip version register");
        if version == 0x00 || version == 0xFF {
            return Err(Error::HardwareFault { version });
        }
        Ok(version)
    }

    /// Non-blocking poll for a card: present and selectable, or `None`.
    ///
    /// An empty field and a card that fails selection are both a normal
    /// `None`; chip-level problems belong to [`probe`](Self::probe).
    pub fn poll(&mut self) -> Result<Option<CardIdentity>> {
        match self.driver.request_card() {
            Ok(true) => {}
            Ok(false) => return Ok(None),
            Err(error) => {
                trace!(%error, "presence check failed, treating as empty field");
                return Ok(None);
            }
        }
        match self.driver.select() {
            Ok(identity) => {
                debug!(uid = %identity.uid, sak = %format_args!("{:#04x}", identity.sak), "card selected");
                self.selected = Some(identity);
                Ok(Some(identity))
            }
            Err(error) => {
                trace!(%error, "selection failed, treating as empty field");
                Ok(None)
            }
        }
    }

    /// Authenticate `sector`'s trailer block with `key` on `side`.
    ///
    /// `Ok(false)` means the candidate was refused and the card has
    /// already been recovered (halted and re-selected); the protocol
    /// demands that recovery before any further authenticate.
    /// `Err(CardLost)` means the recovery could not re-select the card.
    pub fn authenticate(&mut self, sector: Sector, key: &MifareKey, side: KeySide) -> Result<bool> {
        // The crypto unit must be off before (re)authenticating.
        self.driver.stop_crypto();
        self.wait(self.timings.pre_auth_settle);

        match self.driver.authenticate(sector.trailer_block(), key, side) {
            Ok(()) => {
                trace!(sector = sector.index(), side = %side, "authenticated");
                Ok(true)
            }
            Err(error) => {
                debug!(sector = sector.index(), side = %side, %error, "candidate refused, recovering card");
                self.reactivate()?;
                Ok(false)
            }
        }
    }

    /// Halt the card, reset the crypto unit and re-select the card.
    ///
    /// Required after every failed authenticate: the card stops
    /// answering until it has been halted and selected again.
    pub fn reactivate(&mut self) -> Result<()> {
        let _ = self.driver.halt();
        self.driver.stop_crypto();
        self.wait(self.timings.recovery_settle);

        let present = self.driver.request_card().unwrap_or(false);
        if !present {
            warn!("card gone while recovering");
            self.selected = None;
            return Err(Error::CardLost);
        }
        match self.driver.select() {
            Ok(identity) => {
                self.selected = Some(identity);
                Ok(())
            }
            Err(error) => {
                debug!(%error, "re-select failed");
                self.selected = None;
                Err(Error::CardLost)
            }
        }
    }

    /// Read one 16-byte block of the currently authenticated sector.
    ///
    /// Failures are returned as driver errors for the caller to record;
    /// a failed read does not trigger recovery.
    pub fn read_block(&mut self, block: u8) -> std::result::Result<[u8; 16], DriverError> {
        self.driver.read_block(block)
    }

    /// Halt the card and clear crypto state. Idempotent; safe on an
    /// empty field.
    pub fn release(&mut self) {
        if let Err(error) = self.driver.halt() {
            debug!(%error, "halt on release failed");
        }
        self.driver.stop_crypto();
        self.selected = None;
    }

    /// Inter-sector pacing (radio timing contract)
    pub(crate) fn pace_sectors(&self) {
        self.wait(self.timings.sector_pace);
    }

    fn wait(&self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagscan_sim::{SimCard, SimReader};

    fn session(card: SimCard) -> CardSession<SimReader> {
        CardSession::with_timings(SimReader::new(card), Timings::immediate())
    }

    #[test]
    fn poll_on_empty_field_is_not_an_error() {
        let mut session =
            CardSession::with_timings(SimReader::empty(), Timings::immediate());
        assert_eq!(session.poll().unwrap(), None);
        assert!(session.selected().is_none());
    }

    #[test]
    fn poll_selects_a_present_card() {
        let mut session = session(SimCard::ndef_formatted(&[0x01, 0x02, 0x03, 0x04]));
        let identity = session.poll().unwrap().unwrap();
        assert_eq!(identity.uid.to_string(), "01:02:03:04");
        assert_eq!(session.selected(), Some(&identity));
    }

    #[test]
    fn refused_candidate_recovers_the_card() {
        let mut session = session(SimCard::ndef_formatted(&[0x01, 0x02, 0x03, 0x04]));
        session.poll().unwrap().unwrap();

        let sector = Sector::new(1);
        assert!(
            !session
                .authenticate(sector, &MifareKey::ZERO, KeySide::A)
                .unwrap()
        );
        // recovery ran: one initial select plus one re-select
        assert_eq!(session.driver().select_count(), 2);

        // and the card answers the next candidate
        assert!(
            session
                .authenticate(sector, &MifareKey::NDEF, KeySide::A)
                .unwrap()
        );
        // no recovery after a success
        assert_eq!(session.driver().select_count(), 2);
    }

    #[test]
    fn lost_card_surfaces_during_recovery() {
        let mut session = session(SimCard::ndef_formatted(&[0x01, 0x02, 0x03, 0x04]));
        session.poll().unwrap().unwrap();
        session.driver_mut().remove_card();

        let result = session.authenticate(Sector::new(1), &MifareKey::NDEF, KeySide::A);
        assert_eq!(result.unwrap_err(), Error::CardLost);
        assert!(session.selected().is_none());
    }

    #[test]
    fn probe_flags_a_dead_chip() {
        let mut session = CardSession::with_timings(
            SimReader::empty().with_chip_version(0x00),
            Timings::immediate(),
        );
        assert_eq!(
            session.probe().unwrap_err(),
            Error::HardwareFault { version: 0x00 }
        );
    }

    #[test]
    fn hardware_timings_are_preserved() {
        // timing contracts with the radio interface, not tunables
        let timings = Timings::default();
        assert_eq!(timings.pre_auth_settle, Duration::from_millis(10));
        assert_eq!(timings.recovery_settle, Duration::from_millis(50));
        assert_eq!(timings.sector_pace, Duration::from_millis(100));
        assert_eq!(timings.poll_interval, Duration::from_millis(50));
    }

    #[test]
    fn release_is_idempotent() {
        let mut session = session(SimCard::ndef_formatted(&[0x01, 0x02, 0x03, 0x04]));
        session.poll().unwrap().unwrap();
        session.release();
        session.release();
        assert!(session.selected().is_none());
    }
}
