//! Data-block contents: raw bytes, printable rendering, NDEF detection

use std::fmt;

use tagscan_reader::{DriverError, ReaderDriver};
use tracing::debug;

use crate::sector::Sector;
use crate::session::CardSession;

/// NDEF Type-Length-Value header found at the start of a block
///
/// Presence is signalled by the tag byte 0x03; the following length byte
/// is carried along when it is non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NdefTlv {
    /// Length byte following the 0x03 tag, if non-zero
    pub length: Option<u8>,
}

/// The raw 16 bytes of one data block plus derived renderings
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BlockContent {
    block: u8,
    bytes: [u8; 16],
}

impl BlockContent {
    /// Content of `block`
    pub const fn new(block: u8, bytes: [u8; 16]) -> Self {
        Self { block, bytes }
    }

    /// Absolute block number
    pub const fn block(&self) -> u8 {
        self.block
    }

    /// The raw bytes
    pub const fn bytes(&self) -> &[u8; 16] {
        &self.bytes
    }

    /// Uppercase hex rendering of the raw bytes
    pub fn hex(&self) -> String {
        hex::encode_upper(self.bytes)
    }

    /// Printable rendering: ASCII 0x20..=0x7E as-is, zero bytes omitted,
    /// everything else as `.`
    pub fn printable(&self) -> String {
        self.bytes
            .iter()
            .filter_map(|&byte| match byte {
                0x20..=0x7E => Some(byte as char),
                0x00 => None,
                _ => Some('.'),
            })
            .collect()
    }

    /// NDEF TLV header, present iff the block starts with 0x03
    pub fn ndef_tlv(&self) -> Option<NdefTlv> {
        (self.bytes[0] == 0x03).then(|| NdefTlv {
            length: (self.bytes[1] != 0).then_some(self.bytes[1]),
        })
    }
}

impl fmt::Debug for BlockContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockContent({}: {})", self.block, self.hex())
    }
}

/// Outcome of one block read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockRecord {
    /// Block read and decoded
    Read(BlockContent),
    /// Block refused to read; the rest of the sector continues
    Unreadable {
        /// Absolute block number
        block: u8,
        /// What the driver reported
        error: DriverError,
    },
}

impl BlockRecord {
    /// Absolute block number
    pub const fn block(&self) -> u8 {
        match self {
            Self::Read(content) => content.block(),
            Self::Unreadable { block, .. } => *block,
        }
    }

    /// Content if the read succeeded
    pub const fn content(&self) -> Option<&BlockContent> {
        match self {
            Self::Read(content) => Some(content),
            Self::Unreadable { .. } => None,
        }
    }
}

/// Reads the data blocks of an authenticated sector
///
/// The trailer block is never requested. A block that refuses to read is
/// recorded and the remaining blocks of the sector are still attempted.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockReader;

impl BlockReader {
    /// A block reader
    pub const fn new() -> Self {
        Self
    }

    /// Read every data block of `sector`.
    ///
    /// The session must hold an authenticated state for this sector.
    /// Returns the per-block records and the sector's NDEF TLV header,
    /// which lives at the start of the first data block.
    pub fn read_sector<D: ReaderDriver>(
        &self,
        session: &mut CardSession<D>,
        sector: Sector,
    ) -> (Vec<BlockRecord>, Option<NdefTlv>) {
        let mut records = Vec::with_capacity(sector.data_blocks().len());
        for block in sector.data_blocks() {
            match session.read_block(block) {
                Ok(bytes) => records.push(BlockRecord::Read(BlockContent::new(block, bytes))),
                Err(error) => {
                    debug!(block, %error, "block unreadable");
                    records.push(BlockRecord::Unreadable { block, error });
                }
            }
        }

        let ndef = match records.first() {
            Some(BlockRecord::Read(content)) => content.ndef_tlv(),
            _ => None,
        };
        (records, ndef)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(bytes: [u8; 16]) -> BlockContent {
        BlockContent::new(4, bytes)
    }

    #[test]
    fn printable_keeps_ascii_drops_zeros_dots_the_rest() {
        let mut bytes = [0u8; 16];
        bytes[..6].copy_from_slice(b"Hello\x01");
        bytes[6] = 0x1F; // below printable range
        bytes[7] = 0x7F; // above printable range
        bytes[8] = 0x20; // lowest printable
        bytes[9] = 0x7E; // highest printable
        // bytes 10..16 stay zero and must vanish from the rendering
        assert_eq!(content(bytes).printable(), "Hello... ~");
    }

    #[test]
    fn ndef_tlv_iff_leading_tag_byte() {
        let mut bytes = [0u8; 16];
        bytes[0] = 0x03;
        bytes[1] = 0x0E;
        assert_eq!(
            content(bytes).ndef_tlv(),
            Some(NdefTlv {
                length: Some(0x0E)
            })
        );

        bytes[0] = 0x02;
        assert_eq!(content(bytes).ndef_tlv(), None);
    }

    #[test]
    fn zero_length_tlv_has_no_length() {
        let mut bytes = [0u8; 16];
        bytes[0] = 0x03;
        assert_eq!(content(bytes).ndef_tlv(), Some(NdefTlv { length: None }));
    }

    #[test]
    fn hex_rendering() {
        let mut bytes = [0u8; 16];
        bytes[0] = 0xAB;
        assert!(content(bytes).hex().starts_with("AB00"));
    }
}
