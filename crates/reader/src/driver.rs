//! Capability interface onto the reader controller
//!
//! Everything the scan core needs from the hardware fits in seven
//! operations. Chips differ in registers and bring-up, not in capability,
//! so implementations adapt whatever bus and register map they have to
//! the trait below.

use std::fmt;

use tracing::{debug, trace};

use crate::error::DriverError;
use crate::types::{CardIdentity, KeySide, MifareKey};

/// Capability interface for a contactless reader controller
///
/// The driver handle is a single exclusive resource: one logical operation
/// at a time, owned by the session layer. Implementations hold whatever
/// chip state they need but must not enforce protocol policy; in
/// particular, recovery after a failed authentication is the session's
/// job, not the driver's.
pub trait ReaderDriver: Send + fmt::Debug {
    /// Check whether a card is present in the field and ready to select.
    ///
    /// Non-blocking; an empty field is a normal `Ok(false)`. The request
    /// also wakes halted cards.
    fn request_card(&mut self) -> Result<bool, DriverError>;

    /// Run anticollision and select the card, returning its identity.
    fn select(&mut self) -> Result<CardIdentity, DriverError>;

    /// Authenticate the sector containing `block` with `key` on `side`.
    ///
    /// A failed call leaves the card's crypto session in an unknown state:
    /// the card will ignore further commands until it has been halted and
    /// re-selected. Callers own that recovery.
    fn authenticate(
        &mut self,
        block: u8,
        key: &MifareKey,
        side: KeySide,
    ) -> Result<(), DriverError> {
        trace!(block, side = %side, "authenticating");
        let result = self.do_authenticate(block, key, side);
        if let Err(error) = &result {
            debug!(block, side = %side, %error, "authentication refused");
        }
        result
    }

    /// Implementation of [`authenticate`](Self::authenticate)
    fn do_authenticate(
        &mut self,
        block: u8,
        key: &MifareKey,
        side: KeySide,
    ) -> Result<(), DriverError>;

    /// Read a 16-byte block.
    ///
    /// Valid only while the containing sector is authenticated.
    fn read_block(&mut self, block: u8) -> Result<[u8; 16], DriverError> {
        trace!(block, "reading block");
        let result = self.do_read_block(block);
        match &result {
            Ok(data) => trace!(block, data = %hex::encode_upper(data), "block read"),
            Err(error) => debug!(block, %error, "block read failed"),
        }
        result
    }

    /// Implementation of [`read_block`](Self::read_block)
    fn do_read_block(&mut self, block: u8) -> Result<[u8; 16], DriverError>;

    /// Halt the selected card (ISO14443 HLTA).
    fn halt(&mut self) -> Result<(), DriverError>;

    /// Stop the chip's Crypto1 unit, ending any authenticated state.
    fn stop_crypto(&mut self);

    /// Read the chip's version register.
    ///
    /// Works without a card; 0x00 and 0xFF mean the chip is not wired up
    /// or not answering.
    fn chip_version(&mut self) -> Result<u8, DriverError>;
}

#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct MockDriver {
    /// Scripted authenticate results, consumed front to back
    pub auth_results: Vec<Result<(), DriverError>>,
    /// Scripted read results, consumed front to back
    pub read_results: Vec<Result<[u8; 16], DriverError>>,
    /// Blocks that were passed to authenticate
    pub auth_blocks: Vec<u8>,
    /// Blocks that were passed to read_block
    pub read_blocks: Vec<u8>,
}

#[cfg(test)]
impl ReaderDriver for MockDriver {
    fn request_card(&mut self) -> Result<bool, DriverError> {
        Ok(true)
    }

    fn select(&mut self) -> Result<CardIdentity, DriverError> {
        let uid = crate::types::Uid::new(&[0x01, 0x02, 0x03, 0x04]).unwrap();
        Ok(CardIdentity::new(uid, [0x00, 0x04], 0x08))
    }

    fn do_authenticate(
        &mut self,
        block: u8,
        _key: &MifareKey,
        _side: KeySide,
    ) -> Result<(), DriverError> {
        self.auth_blocks.push(block);
        if self.auth_results.is_empty() {
            Ok(())
        } else {
            self.auth_results.remove(0)
        }
    }

    fn do_read_block(&mut self, block: u8) -> Result<[u8; 16], DriverError> {
        self.read_blocks.push(block);
        if self.read_results.is_empty() {
            Ok([0u8; 16])
        } else {
            self.read_results.remove(0)
        }
    }

    fn halt(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    fn stop_crypto(&mut self) {}

    fn chip_version(&mut self) -> Result<u8, DriverError> {
        Ok(0x92)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authenticate_delegates_and_passes_result() {
        let mut driver = MockDriver {
            auth_results: vec![Err(DriverError::Timeout), Ok(())],
            ..MockDriver::default()
        };

        let key = MifareKey::NDEF;
        assert_eq!(
            driver.authenticate(7, &key, KeySide::A),
            Err(DriverError::Timeout)
        );
        assert_eq!(driver.authenticate(7, &key, KeySide::B), Ok(()));
        assert_eq!(driver.auth_blocks, vec![7, 7]);
    }

    #[test]
    fn read_block_delegates() {
        let mut driver = MockDriver {
            read_results: vec![Ok([0xAB; 16])],
            ..MockDriver::default()
        };

        assert_eq!(driver.read_block(4), Ok([0xAB; 16]));
        assert_eq!(driver.read_blocks, vec![4]);
    }
}
