//! Error types for reader driver operations

use thiserror::Error;

/// Failures a [`ReaderDriver`](crate::ReaderDriver) implementation can report
///
/// The taxonomy follows what contactless reader chips expose on the wire: a
/// silent card, a garbled answer, a MIFARE NAK. Whether a failure is
/// recoverable is not decided here; the session layer owns that policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// No card in the field
    #[error("no card in the field")]
    NoCard,

    /// The card did not answer within the protocol timeout
    #[error("card did not answer in time")]
    Timeout,

    /// More than one card answered during anticollision
    #[error("collision in the field")]
    Collision,

    /// CRC check failed on the card's answer
    #[error("CRC mismatch in card answer")]
    Crc,

    /// The card answered with a MIFARE NAK
    #[error("card refused the command (NAK)")]
    Nack,

    /// The answer did not fit the chip's FIFO buffer
    #[error("answer exceeds buffer")]
    Buffer,

    /// The reader chip itself failed
    #[error("reader chip error")]
    Device,

    /// Implementation-specific failure with a message
    #[error("{0}")]
    Other(String),
}

impl DriverError {
    /// Create an implementation-specific failure
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other(message.into())
    }
}
