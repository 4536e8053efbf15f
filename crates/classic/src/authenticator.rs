//! Sector authentication: one pass over the key catalog

use tagscan_reader::ReaderDriver;
use tracing::debug;

use crate::error::Result;
use crate::keys::{KeyCandidate, KeyCatalog};
use crate::sector::Sector;
use crate::session::CardSession;

/// Which candidate, if any, opened a sector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Sector opened with this candidate
    Granted(KeyCandidate),
    /// Every candidate refused
    Denied,
}

impl AuthOutcome {
    /// The candidate that succeeded, if any
    pub const fn granted(&self) -> Option<&KeyCandidate> {
        match self {
            Self::Granted(candidate) => Some(candidate),
            Self::Denied => None,
        }
    }

    /// Whether the sector was opened
    pub const fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(_))
    }
}

/// Runs the fixed candidate order against one sector
///
/// Run once per sector: the first accepted candidate is terminal, an
/// exhausted catalog is a denial. A refused candidate is never retried
/// within the pass; by the time the next candidate is attempted the
/// session has already recovered the card.
#[derive(Debug, Clone, Copy, Default)]
pub struct SectorAuthenticator {
    catalog: KeyCatalog,
}

impl SectorAuthenticator {
    /// Authenticator over `catalog`
    pub const fn new(catalog: KeyCatalog) -> Self {
        Self { catalog }
    }

    /// Try every candidate for `sector` in order.
    pub fn authenticate<D: ReaderDriver>(
        &self,
        session: &mut CardSession<D>,
        sector: Sector,
    ) -> Result<AuthOutcome> {
        for candidate in self.catalog.candidates(sector) {
            if session.authenticate(sector, &candidate.key(), candidate.side)? {
                debug!(%sector, %candidate, "sector opened");
                return Ok(AuthOutcome::Granted(candidate));
            }
        }
        debug!(%sector, "all candidates refused");
        Ok(AuthOutcome::Denied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeySource;
    use crate::session::Timings;
    use tagscan_reader::{KeySide, MifareKey};
    use tagscan_sim::{SimCard, SimReader};

    fn session_for(card: SimCard) -> CardSession<SimReader> {
        let mut session = CardSession::with_timings(SimReader::new(card), Timings::immediate());
        session.poll().unwrap().unwrap();
        session
    }

    #[test]
    fn first_candidate_wins_without_fallback() {
        let mut session = session_for(SimCard::ndef_formatted(&[0x01, 0x02, 0x03, 0x04]));
        let authenticator = SectorAuthenticator::default();

        let outcome = authenticator
            .authenticate(&mut session, Sector::new(1))
            .unwrap();
        let candidate = outcome.granted().unwrap();
        assert_eq!(candidate.source, KeySource::Ndef);
        assert_eq!(candidate.side, KeySide::A);
        assert_eq!(session.driver().auth_attempts(), 1);
    }

    #[test]
    fn fallback_reaches_the_default_key() {
        let card = SimCard::ndef_formatted(&[0x01, 0x02, 0x03, 0x04]).with_sector_keys(
            3,
            MifareKey::FACTORY_DEFAULT,
            MifareKey::ZERO,
        );
        let mut session = session_for(card);
        let authenticator = SectorAuthenticator::default();

        let outcome = authenticator
            .authenticate(&mut session, Sector::new(3))
            .unwrap();
        let candidate = outcome.granted().unwrap();
        assert_eq!(candidate.source, KeySource::FactoryDefault);
        assert_eq!(candidate.side, KeySide::A);
        // NDEF/A and NDEF/B were refused first
        assert_eq!(session.driver().auth_failures(), 2);
    }

    #[test]
    fn exhausted_catalog_is_denied() {
        let card = SimCard::ndef_formatted(&[0x01, 0x02, 0x03, 0x04]).with_locked_sector(5);
        let mut session = session_for(card);
        let authenticator = SectorAuthenticator::default();

        let outcome = authenticator
            .authenticate(&mut session, Sector::new(5))
            .unwrap();
        assert_eq!(outcome, AuthOutcome::Denied);
        assert_eq!(session.driver().auth_attempts(), 4);
    }
}
