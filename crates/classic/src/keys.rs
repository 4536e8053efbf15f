//! The key fallback policy as data
//!
//! The well-known keys come from the NXP NDEF application notes
//! (AN1304/AN1305): the MAD key guards sector 0, the NDEF key the data
//! sectors. Cards that were never NDEF-formatted tend to still carry the
//! factory transport key, or occasionally an all-zero key, so those come
//! last. Iterating a fixed list keeps the precedence testable tier by
//! tier instead of burying it in nested branches.

use std::fmt;

use derive_more::Display;
use tagscan_reader::{KeySide, MifareKey};

use crate::sector::Sector;

/// Where a candidate key comes from
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// MAD key, sector 0 (NXP application directory)
    #[display("MAD key")]
    Mad,
    /// NDEF key, data sectors of an NDEF-formatted card
    #[display("NDEF key")]
    Ndef,
    /// Factory default transport key
    #[display("default key")]
    FactoryDefault,
    /// All-zero key
    #[display("zero key")]
    Zero,
}

impl KeySource {
    /// The 6-byte key value this source names
    pub const fn key(&self) -> MifareKey {
        match self {
            Self::Mad => MifareKey::MAD,
            Self::Ndef => MifareKey::NDEF,
            Self::FactoryDefault => MifareKey::FACTORY_DEFAULT,
            Self::Zero => MifareKey::ZERO,
        }
    }
}

/// One authentication attempt: a well-known key and the side to present
/// it on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyCandidate {
    /// Which well-known key
    pub source: KeySource,
    /// Key A or Key B
    pub side: KeySide,
}

impl KeyCandidate {
    /// Candidate from source and side
    pub const fn new(source: KeySource, side: KeySide) -> Self {
        Self { source, side }
    }

    /// The 6-byte key value
    pub const fn key(&self) -> MifareKey {
        self.source.key()
    }
}

impl fmt::Display for KeyCandidate {
    /// e.g. `NDEF key / A`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.source, self.side)
    }
}

/// Ordered candidate list per sector
///
/// The precedence is fixed and total: {primary, A} → {primary, B} →
/// {default, A} → {zero, A}, where the primary key is the MAD key for
/// sector 0 and the NDEF key for every other sector.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyCatalog;

impl KeyCatalog {
    /// The documented fallback policy
    pub const fn standard() -> Self {
        Self
    }

    /// Primary key source for a sector
    pub const fn primary(sector: Sector) -> KeySource {
        if sector.index() == 0 {
            KeySource::Mad
        } else {
            KeySource::Ndef
        }
    }

    /// Candidates for `sector` in precedence order
    pub fn candidates(&self, sector: Sector) -> [KeyCandidate; 4] {
        let primary = Self::primary(sector);
        [
            KeyCandidate::new(primary, KeySide::A),
            KeyCandidate::new(primary, KeySide::B),
            KeyCandidate::new(KeySource::FactoryDefault, KeySide::A),
            KeyCandidate::new(KeySource::Zero, KeySide::A),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sector_zero_leads_with_mad() {
        let catalog = KeyCatalog::standard();
        let candidates = catalog.candidates(Sector::new(0));
        assert_eq!(
            candidates,
            [
                KeyCandidate::new(KeySource::Mad, KeySide::A),
                KeyCandidate::new(KeySource::Mad, KeySide::B),
                KeyCandidate::new(KeySource::FactoryDefault, KeySide::A),
                KeyCandidate::new(KeySource::Zero, KeySide::A),
            ]
        );
    }

    #[test]
    fn data_sectors_lead_with_ndef() {
        let catalog = KeyCatalog::standard();
        for index in 1..16 {
            let candidates = catalog.candidates(Sector::new(index));
            assert_eq!(candidates[0].source, KeySource::Ndef);
            assert_eq!(candidates[0].side, KeySide::A);
            assert_eq!(candidates[1].source, KeySource::Ndef);
            assert_eq!(candidates[1].side, KeySide::B);
        }
    }

    #[test]
    fn sources_resolve_to_well_known_keys() {
        assert_eq!(KeySource::Mad.key(), MifareKey::MAD);
        assert_eq!(KeySource::Ndef.key(), MifareKey::NDEF);
        assert_eq!(KeySource::FactoryDefault.key(), MifareKey::FACTORY_DEFAULT);
        assert_eq!(KeySource::Zero.key(), MifareKey::ZERO);
    }

    #[test]
    fn candidate_labels() {
        let candidate = KeyCandidate::new(KeySource::Ndef, KeySide::A);
        assert_eq!(candidate.to_string(), "NDEF key / A");
        let fallback = KeyCandidate::new(KeySource::FactoryDefault, KeySide::A);
        assert_eq!(fallback.to_string(), "default key / A");
    }
}
