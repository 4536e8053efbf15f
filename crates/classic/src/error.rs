//! Error type for the scan core
//!
//! Only failures that genuinely end processing live here. A refused key
//! candidate is absorbed by the session's recovery; a denied sector or an
//! unreadable block travels inside the scan report as data.

use tagscan_reader::DriverError;
use thiserror::Error;

/// Result alias for scan-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failures that end processing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The reader chip did not answer sanely at startup; scanning never
    /// begins on a dead chip
    #[error("reader chip not responding (version register {version:#04x})")]
    HardwareFault {
        /// What the version register returned
        version: u8,
    },

    /// The card left the field and could not be re-selected; the scan of
    /// this card is over, the partial report stands
    #[error("card lost during scan")]
    CardLost,

    /// Driver failure outside the recoverable paths
    #[error(transparent)]
    Driver(#[from] DriverError),
}
