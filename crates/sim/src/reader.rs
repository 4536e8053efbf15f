//! `ReaderDriver` implementation backed by a simulated card
//!
//! The state machine mirrors how a real card behaves on the radio side.
//! The detail that matters most to the scan core: a failed authentication
//! puts the card in a mute state where only a halt brings it back. A
//! caller that skips the halt/re-select recovery will see every further
//! operation fail, exactly like on hardware.

use tagscan_reader::{CardIdentity, DriverError, KeySide, MifareKey, ReaderDriver};
use tracing::trace;

use crate::card::SimCard;

/// Protocol state of the simulated card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CardState {
    /// In the field, not selected
    Idle,
    /// Selected and answering
    Active,
    /// Halted; a wake-up request brings it back to idle
    Halted,
    /// A failed authentication broke the crypto session; the card
    /// ignores everything except a halt
    Stuck,
}

/// Simulated reader with at most one card in the field
#[derive(Debug)]
pub struct SimReader {
    card: Option<SimCard>,
    state: CardState,
    /// Sector the chip currently holds an authenticated state for
    authed_sector: Option<u8>,
    /// Blocks that refuse to read even when authenticated
    bad_blocks: Vec<u8>,
    /// Successful reads left before the card leaves the field
    reads_until_vanish: Option<u32>,
    version: u8,

    // instrumentation for tests
    auth_attempts: u32,
    auth_failures: u32,
    select_count: u32,
    halt_count: u32,
    read_requests: Vec<u8>,
}

impl SimReader {
    /// Reader with `card` in the field
    pub fn new(card: SimCard) -> Self {
        Self {
            card: Some(card),
            state: CardState::Idle,
            authed_sector: None,
            bad_blocks: Vec::new(),
            reads_until_vanish: None,
            version: 0x92,
            auth_attempts: 0,
            auth_failures: 0,
            select_count: 0,
            halt_count: 0,
            read_requests: Vec::new(),
        }
    }

    /// Reader with an empty field
    pub fn empty() -> Self {
        let mut reader = Self::new(SimCard::factory_fresh(&[0, 0, 0, 1]));
        reader.card = None;
        reader
    }

    /// Override the chip version register (0x00/0xFF simulate a dead chip)
    pub const fn with_chip_version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }

    /// Put a card into the field
    pub fn insert(&mut self, card: SimCard) {
        self.card = Some(card);
        self.state = CardState::Idle;
        self.authed_sector = None;
    }

    /// Pull the card out of the field immediately
    pub fn remove_card(&mut self) {
        self.card = None;
        self.state = CardState::Idle;
        self.authed_sector = None;
    }

    /// Let the card vanish after `reads` more successful block reads
    pub fn vanish_after_reads(&mut self, reads: u32) {
        self.reads_until_vanish = Some(reads);
    }

    /// Make a block refuse to read even when its sector is authenticated
    pub fn fail_block_read(&mut self, block: u8) {
        self.bad_blocks.push(block);
    }

    /// Authentication attempts seen so far
    pub const fn auth_attempts(&self) -> u32 {
        self.auth_attempts
    }

    /// Authentication attempts that were refused
    pub const fn auth_failures(&self) -> u32 {
        self.auth_failures
    }

    /// Successful selects (initial select plus one per recovery cycle)
    pub const fn select_count(&self) -> u32 {
        self.select_count
    }

    /// Halts requested by the caller
    pub const fn halt_count(&self) -> u32 {
        self.halt_count
    }

    /// Every block number that was passed to `read_block`
    pub fn read_requests(&self) -> &[u8] {
        &self.read_requests
    }

    fn card(&self) -> Result<&SimCard, DriverError> {
        self.card.as_ref().ok_or(DriverError::NoCard)
    }
}

impl ReaderDriver for SimReader {
    fn request_card(&mut self) -> Result<bool, DriverError> {
        if self.card.is_none() {
            return Ok(false);
        }
        match self.state {
            // A card mid-failed-authentication does not answer requests;
            // it has to be halted first.
            CardState::Stuck => Ok(false),
            CardState::Halted => {
                trace!("wake-up, card back to idle");
                self.state = CardState::Idle;
                Ok(true)
            }
            CardState::Idle | CardState::Active => Ok(true),
        }
    }

    fn select(&mut self) -> Result<CardIdentity, DriverError> {
        let identity = {
            let card = self.card()?;
            CardIdentity::new(*card.uid(), card.atqa(), card.sak())
        };
        match self.state {
            CardState::Idle | CardState::Active => {
                self.state = CardState::Active;
                self.select_count += 1;
                Ok(identity)
            }
            CardState::Halted | CardState::Stuck => Err(DriverError::Timeout),
        }
    }

    fn do_authenticate(
        &mut self,
        block: u8,
        key: &MifareKey,
        side: KeySide,
    ) -> Result<(), DriverError> {
        self.auth_attempts += 1;
        let accepted = {
            let card = self.card()?;
            self.state == CardState::Active && card.sector(block / 4).accepts(key, side)
        };

        if self.state != CardState::Active {
            self.auth_failures += 1;
            return Err(DriverError::Timeout);
        }

        if accepted {
            self.authed_sector = Some(block / 4);
            Ok(())
        } else {
            // Wrong key: the card stops answering until halted.
            self.auth_failures += 1;
            self.authed_sector = None;
            self.state = CardState::Stuck;
            Err(DriverError::Timeout)
        }
    }

    fn do_read_block(&mut self, block: u8) -> Result<[u8; 16], DriverError> {
        self.read_requests.push(block);

        if let Some(0) = self.reads_until_vanish {
            self.remove_card();
        }
        let card = self.card.as_ref().ok_or(DriverError::NoCard)?;

        if self.state != CardState::Active || self.authed_sector != Some(block / 4) {
            return Err(DriverError::Nack);
        }
        if self.bad_blocks.contains(&block) {
            return Err(DriverError::Crc);
        }

        let data = card.block(block);
        if let Some(reads) = &mut self.reads_until_vanish {
            *reads -= 1;
        }
        Ok(data)
    }

    fn halt(&mut self) -> Result<(), DriverError> {
        self.halt_count += 1;
        if self.card.is_some() {
            self.state = CardState::Halted;
        }
        self.authed_sector = None;
        Ok(())
    }

    fn stop_crypto(&mut self) {
        self.authed_sector = None;
    }

    fn chip_version(&mut self) -> Result<u8, DriverError> {
        Ok(self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selected_reader() -> SimReader {
        let mut reader = SimReader::new(SimCard::ndef_formatted(&[0x01, 0x02, 0x03, 0x04]));
        assert!(reader.request_card().unwrap());
        reader.select().unwrap();
        reader
    }

    #[test]
    fn failed_auth_leaves_card_mute_until_halt() {
        let mut reader = selected_reader();

        // wrong key for sector 1
        let refused = reader.authenticate(7, &MifareKey::ZERO, KeySide::A);
        assert!(refused.is_err());

        // right key, but the card is stuck: still refused
        let stuck = reader.authenticate(7, &MifareKey::NDEF, KeySide::A);
        assert!(stuck.is_err());
        assert!(!reader.request_card().unwrap());

        // halt + wake-up + select recovers it
        reader.halt().unwrap();
        assert!(reader.request_card().unwrap());
        reader.select().unwrap();
        assert!(reader.authenticate(7, &MifareKey::NDEF, KeySide::A).is_ok());
    }

    #[test]
    fn read_requires_matching_authenticated_sector() {
        let mut reader = selected_reader();
        reader
            .authenticate(7, &MifareKey::NDEF, KeySide::A)
            .unwrap();

        assert!(reader.read_block(4).is_ok());
        // block 12 sits in sector 3, which is not authenticated
        assert_eq!(reader.read_block(12), Err(DriverError::Nack));
    }

    #[test]
    fn stop_crypto_drops_authenticated_state() {
        let mut reader = selected_reader();
        reader
            .authenticate(7, &MifareKey::NDEF, KeySide::A)
            .unwrap();
        reader.stop_crypto();
        assert_eq!(reader.read_block(4), Err(DriverError::Nack));
    }

    #[test]
    fn vanished_card_fails_reads() {
        let mut reader = selected_reader();
        reader.vanish_after_reads(1);
        reader
            .authenticate(7, &MifareKey::NDEF, KeySide::A)
            .unwrap();

        assert!(reader.read_block(4).is_ok());
        assert_eq!(reader.read_block(5), Err(DriverError::NoCard));
        assert!(!reader.request_card().unwrap());
    }

    #[test]
    fn empty_field_reports_no_card() {
        let mut reader = SimReader::empty();
        assert!(!reader.request_card().unwrap());
        assert_eq!(reader.select().unwrap_err(), DriverError::NoCard);
    }
}
