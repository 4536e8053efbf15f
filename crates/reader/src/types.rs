//! Wire-level types shared by every reader implementation

use std::fmt;

use derive_more::Display;

/// Longest UID ISO14443A defines (triple-size)
pub const MAX_UID_LEN: usize = 10;

/// Card UID as returned by anticollision/select
///
/// Single, double and triple size UIDs (4, 7 or 10 bytes) are stored in a
/// fixed backing array; the value is immutable once the card is selected.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Uid {
    bytes: [u8; MAX_UID_LEN],
    len: u8,
}

impl Uid {
    /// Create a UID from raw bytes.
    ///
    /// Returns `None` unless the slice is 4 to 10 bytes long.
    pub fn new(bytes: &[u8]) -> Option<Self> {
        if !(4..=MAX_UID_LEN).contains(&bytes.len()) {
            return None;
        }
        let mut buf = [0u8; MAX_UID_LEN];
        buf[..bytes.len()].copy_from_slice(bytes);
        Some(Self {
            bytes: buf,
            len: bytes.len() as u8,
        })
    }

    /// The UID bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// Number of UID bytes (4, 7 or 10)
    pub const fn len(&self) -> usize {
        self.len as usize
    }

    /// A UID is never empty; provided for slice-like completeness
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Display for Uid {
    /// Colon-separated uppercase hex, e.g. `DE:AD:BE:EF`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.as_bytes().iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uid({self})")
    }
}

/// Card families derived from the SAK byte (NXP AN10833)
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum CardType {
    /// MIFARE Mini (320 bytes)
    #[display("MIFARE Mini")]
    Mini,
    /// MIFARE Classic 1K
    #[display("MIFARE Classic 1K")]
    Classic1k,
    /// MIFARE Classic 4K
    #[display("MIFARE Classic 4K")]
    Classic4k,
    /// MIFARE Ultralight / NTAG family
    #[display("MIFARE Ultralight")]
    Ultralight,
    /// ISO14443-4 compliant card (DESFire and friends)
    #[display("ISO14443-4")]
    Iso14443_4,
    /// Anything else
    #[display("unknown")]
    Unknown,
}

impl CardType {
    /// Derive the card family from the SAK byte.
    ///
    /// Bit 7 is masked off first; it only signals UID completeness.
    pub const fn from_sak(sak: u8) -> Self {
        match sak & 0x7F {
            0x09 => Self::Mini,
            0x08 => Self::Classic1k,
            0x18 => Self::Classic4k,
            0x00 => Self::Ultralight,
            0x20 => Self::Iso14443_4,
            _ => Self::Unknown,
        }
    }

    /// Whether sector authentication applies to this family
    pub const fn is_classic(&self) -> bool {
        matches!(self, Self::Mini | Self::Classic1k | Self::Classic4k)
    }
}

/// Identity of a selected card
///
/// Immutable once selection completes; discard it when the card is halted
/// or lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardIdentity {
    /// Card UID from cascade select
    pub uid: Uid,
    /// Answer to request (two bytes, LSB first as received)
    pub atqa: [u8; 2],
    /// Select acknowledge byte
    pub sak: u8,
}

impl CardIdentity {
    /// Bundle up a selection result
    pub const fn new(uid: Uid, atqa: [u8; 2], sak: u8) -> Self {
        Self { uid, atqa, sak }
    }

    /// Card family derived from the SAK byte
    pub const fn card_type(&self) -> CardType {
        CardType::from_sak(self.sak)
    }

    /// SAK 0x08 is what NDEF-formatted Classic 1K cards report
    pub const fn looks_ndef_formatted(&self) -> bool {
        self.sak == 0x08
    }
}

/// A 6-byte MIFARE Classic sector key
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MifareKey([u8; 6]);

impl MifareKey {
    /// MAD key protecting sector 0 (NXP AN10787)
    pub const MAD: Self = Self([0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5]);

    /// NDEF key for the data sectors of an NDEF-formatted card
    /// (NXP AN1304/AN1305)
    pub const NDEF: Self = Self([0xD3, 0xF7, 0xD3, 0xF7, 0xD3, 0xF7]);

    /// Factory default transport key
    pub const FACTORY_DEFAULT: Self = Self([0xFF; 6]);

    /// All-zero key
    pub const ZERO: Self = Self([0x00; 6]);

    /// Key from raw bytes
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// The raw key bytes
    pub const fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl From<[u8; 6]> for MifareKey {
    fn from(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for MifareKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.0))
    }
}

impl fmt::Debug for MifareKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MifareKey({self})")
    }
}

/// Which of a sector's two credentials is presented
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeySide {
    /// Key A
    #[display("A")]
    A,
    /// Key B
    #[display("B")]
    B,
}

impl KeySide {
    /// MIFARE authentication command byte for this side
    pub const fn command(&self) -> u8 {
        match self {
            Self::A => 0x60,
            Self::B => 0x61,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uid_length_bounds() {
        assert!(Uid::new(&[0x01, 0x02, 0x03]).is_none());
        assert!(Uid::new(&[0u8; 11]).is_none());

        let uid = Uid::new(&[0x04, 0xA1, 0xB2, 0xC3, 0xD4, 0xE5, 0xF6]).unwrap();
        assert_eq!(uid.len(), 7);
        assert_eq!(uid.as_bytes(), &[0x04, 0xA1, 0xB2, 0xC3, 0xD4, 0xE5, 0xF6]);
    }

    #[test]
    fn uid_display_uses_colons() {
        let uid = Uid::new(&[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
        assert_eq!(uid.to_string(), "DE:AD:BE:EF");
    }

    #[test]
    fn card_type_from_sak() {
        assert_eq!(CardType::from_sak(0x09), CardType::Mini);
        assert_eq!(CardType::from_sak(0x08), CardType::Classic1k);
        // bit 7 set means incomplete UID, not a different family
        assert_eq!(CardType::from_sak(0x88), CardType::Classic1k);
        assert_eq!(CardType::from_sak(0x18), CardType::Classic4k);
        assert_eq!(CardType::from_sak(0x00), CardType::Ultralight);
        assert_eq!(CardType::from_sak(0x20), CardType::Iso14443_4);
        assert_eq!(CardType::from_sak(0x42), CardType::Unknown);
    }

    #[test]
    fn classic_families() {
        assert!(CardType::Mini.is_classic());
        assert!(CardType::Classic1k.is_classic());
        assert!(CardType::Classic4k.is_classic());
        assert!(!CardType::Ultralight.is_classic());
        assert!(!CardType::Unknown.is_classic());
    }

    #[test]
    fn well_known_keys() {
        assert_eq!(MifareKey::MAD.to_string(), "A0A1A2A3A4A5");
        assert_eq!(MifareKey::NDEF.to_string(), "D3F7D3F7D3F7");
        assert_eq!(MifareKey::FACTORY_DEFAULT.to_string(), "FFFFFFFFFFFF");
        assert_eq!(MifareKey::ZERO.to_string(), "000000000000");
    }

    #[test]
    fn key_side_commands() {
        assert_eq!(KeySide::A.command(), 0x60);
        assert_eq!(KeySide::B.command(), 0x61);
    }
}
