//! In-memory MIFARE Classic 1K card

use tagscan_reader::{KeySide, MifareKey, Uid};
use thiserror::Error;

/// Sectors on a Classic 1K card
pub const SECTOR_COUNT: usize = 16;
/// Blocks per sector
pub const BLOCKS_PER_SECTOR: usize = 4;
/// Total blocks on the card
pub const BLOCK_COUNT: usize = SECTOR_COUNT * BLOCKS_PER_SECTOR;
/// Size of a raw 1K card image
pub const IMAGE_SIZE: usize = BLOCK_COUNT * 16;

/// Access bits + general purpose byte of an NDEF data sector (AN1304)
const NDEF_ACCESS: [u8; 4] = [0x7F, 0x07, 0x88, 0x40];
/// Access bits + general purpose byte of the MAD sector (AN10787)
const MAD_ACCESS: [u8; 4] = [0x78, 0x77, 0x88, 0xC1];
/// Factory access bits of a transport-configuration card
const FACTORY_ACCESS: [u8; 4] = [0xFF, 0x07, 0x80, 0x69];

/// One simulated sector: the two credentials and four blocks of storage
#[derive(Debug, Clone)]
pub struct SimSector {
    /// Key accepted on side A
    pub key_a: MifareKey,
    /// Key accepted on side B
    pub key_b: MifareKey,
    /// Raw block content, trailer included
    pub blocks: [[u8; 16]; BLOCKS_PER_SECTOR],
    /// Refuse every authentication attempt regardless of key
    pub locked: bool,
}

impl SimSector {
    fn new(key_a: MifareKey, key_b: MifareKey, access: [u8; 4]) -> Self {
        let mut blocks = [[0u8; 16]; BLOCKS_PER_SECTOR];
        blocks[BLOCKS_PER_SECTOR - 1] = trailer(&key_a, access, &key_b);
        Self {
            key_a,
            key_b,
            blocks,
            locked: false,
        }
    }

    /// Whether `key` presented on `side` opens this sector
    pub fn accepts(&self, key: &MifareKey, side: KeySide) -> bool {
        if self.locked {
            return false;
        }
        match side {
            KeySide::A => *key == self.key_a,
            KeySide::B => *key == self.key_b,
        }
    }
}

/// Trailer layout: key A, access bits + GPB, key B
fn trailer(key_a: &MifareKey, access: [u8; 4], key_b: &MifareKey) -> [u8; 16] {
    let mut block = [0u8; 16];
    block[..6].copy_from_slice(key_a.as_bytes());
    block[6..10].copy_from_slice(&access);
    block[10..].copy_from_slice(key_b.as_bytes());
    block
}

/// Block 0: UID, BCC, SAK, ATQA, manufacturer filler
fn manufacturer_block(uid: &Uid, sak: u8, atqa: [u8; 2]) -> [u8; 16] {
    let mut block = [0u8; 16];
    let bytes = uid.as_bytes();
    block[..bytes.len()].copy_from_slice(bytes);
    if bytes.len() == 4 {
        block[4] = bytes.iter().fold(0, |acc, b| acc ^ b);
        block[5] = sak;
        block[6] = atqa[0];
        block[7] = atqa[1];
    }
    block
}

/// Raw card image did not parse
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    /// A 1K image is exactly 64 blocks of 16 bytes
    #[error("card image must be {IMAGE_SIZE} bytes, got {0}")]
    WrongLength(usize),
    /// The UID in block 0 is not usable
    #[error("block 0 does not hold a valid UID")]
    BadUid,
}

/// A simulated card: identity plus sixteen sectors
#[derive(Debug, Clone)]
pub struct SimCard {
    uid: Uid,
    atqa: [u8; 2],
    sak: u8,
    sectors: Vec<SimSector>,
}

impl SimCard {
    /// An NDEF-formatted 1K card: MAD keys on sector 0, NDEF keys on the
    /// data sectors, an empty NDEF TLV at the start of sector 1.
    pub fn ndef_formatted(uid: &[u8]) -> Self {
        let uid = Uid::new(uid).expect("UID must be 4-10 bytes");
        let atqa = [0x00, 0x04];
        let sak = 0x08;

        let mut sectors = Vec::with_capacity(SECTOR_COUNT);

        let mut mad = SimSector::new(MifareKey::MAD, MifareKey::FACTORY_DEFAULT, MAD_ACCESS);
        mad.blocks[0] = manufacturer_block(&uid, sak, atqa);
        mad.blocks[1] = mad_block(0x01);
        mad.blocks[2] = mad_block(0x00);
        sectors.push(mad);

        for index in 1..SECTOR_COUNT {
            let mut sector =
                SimSector::new(MifareKey::NDEF, MifareKey::FACTORY_DEFAULT, NDEF_ACCESS);
            if index == 1 {
                // Empty NDEF message: TLV tag, zero length, terminator
                sector.blocks[0][..3].copy_from_slice(&[0x03, 0x00, 0xFE]);
            }
            sectors.push(sector);
        }

        Self {
            uid,
            atqa,
            sak,
            sectors,
        }
    }

    /// A factory-fresh card: transport keys everywhere, zeroed data
    pub fn factory_fresh(uid: &[u8]) -> Self {
        let uid = Uid::new(uid).expect("UID must be 4-10 bytes");
        let atqa = [0x00, 0x04];
        let sak = 0x08;

        let mut sectors: Vec<_> = (0..SECTOR_COUNT)
            .map(|_| {
                SimSector::new(
                    MifareKey::FACTORY_DEFAULT,
                    MifareKey::FACTORY_DEFAULT,
                    FACTORY_ACCESS,
                )
            })
            .collect();
        sectors[0].blocks[0] = manufacturer_block(&uid, sak, atqa);

        Self {
            uid,
            atqa,
            sak,
            sectors,
        }
    }

    /// Load a raw 1K image (64 blocks of 16 bytes, trailers included).
    ///
    /// Sector keys are taken from the trailer blocks; the UID from the
    /// first four bytes of block 0.
    pub fn from_image(bytes: &[u8]) -> Result<Self, ImageError> {
        if bytes.len() != IMAGE_SIZE {
            return Err(ImageError::WrongLength(bytes.len()));
        }
        let uid = Uid::new(&bytes[..4]).ok_or(ImageError::BadUid)?;

        let mut sectors = Vec::with_capacity(SECTOR_COUNT);
        for index in 0..SECTOR_COUNT {
            let base = index * BLOCKS_PER_SECTOR * 16;
            let mut blocks = [[0u8; 16]; BLOCKS_PER_SECTOR];
            for (offset, block) in blocks.iter_mut().enumerate() {
                let start = base + offset * 16;
                block.copy_from_slice(&bytes[start..start + 16]);
            }
            let trailer = blocks[BLOCKS_PER_SECTOR - 1];
            sectors.push(SimSector {
                key_a: MifareKey::new(trailer[..6].try_into().expect("6 bytes")),
                key_b: MifareKey::new(trailer[10..].try_into().expect("6 bytes")),
                blocks,
                locked: false,
            });
        }

        Ok(Self {
            uid,
            atqa: [0x00, 0x04],
            sak: 0x08,
            sectors,
        })
    }

    /// Override the SAK byte (e.g. 0x00 to simulate an Ultralight)
    pub fn with_sak(mut self, sak: u8) -> Self {
        self.sak = sak;
        self
    }

    /// Replace both credentials of one sector
    pub fn with_sector_keys(mut self, sector: u8, key_a: MifareKey, key_b: MifareKey) -> Self {
        let s = &mut self.sectors[sector as usize];
        s.key_a = key_a;
        s.key_b = key_b;
        let access = s.blocks[BLOCKS_PER_SECTOR - 1][6..10]
            .try_into()
            .expect("4 bytes");
        s.blocks[BLOCKS_PER_SECTOR - 1] = trailer(&key_a, access, &key_b);
        self
    }

    /// Make one sector refuse every authentication attempt
    pub fn with_locked_sector(mut self, sector: u8) -> Self {
        self.sectors[sector as usize].locked = true;
        self
    }

    /// Replace the content of an absolute block number
    pub fn with_block(mut self, block: u8, data: [u8; 16]) -> Self {
        let (sector, offset) = split_block(block);
        self.sectors[sector].blocks[offset] = data;
        self
    }

    /// The card's UID
    pub const fn uid(&self) -> &Uid {
        &self.uid
    }

    /// The card's ATQA
    pub const fn atqa(&self) -> [u8; 2] {
        self.atqa
    }

    /// The card's SAK byte
    pub const fn sak(&self) -> u8 {
        self.sak
    }

    /// One sector's storage and credentials
    pub fn sector(&self, index: u8) -> &SimSector {
        &self.sectors[index as usize]
    }

    pub(crate) fn block(&self, block: u8) -> [u8; 16] {
        let (sector, offset) = split_block(block);
        self.sectors[sector].blocks[offset]
    }
}

const fn split_block(block: u8) -> (usize, usize) {
    (
        block as usize / BLOCKS_PER_SECTOR,
        block as usize % BLOCKS_PER_SECTOR,
    )
}

/// A MAD block: info byte + seven NDEF AID entries (0x03E1)
fn mad_block(info: u8) -> [u8; 16] {
    let mut block = [0u8; 16];
    block[0] = 0x0F;
    block[1] = info;
    for chunk in block[2..].chunks_exact_mut(2) {
        chunk.copy_from_slice(&[0x03, 0xE1]);
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ndef_card_keys() {
        let card = SimCard::ndef_formatted(&[0x01, 0x02, 0x03, 0x04]);
        assert!(card.sector(0).accepts(&MifareKey::MAD, KeySide::A));
        assert!(!card.sector(0).accepts(&MifareKey::NDEF, KeySide::A));
        assert!(card.sector(5).accepts(&MifareKey::NDEF, KeySide::A));
        assert!(
            card.sector(5)
                .accepts(&MifareKey::FACTORY_DEFAULT, KeySide::B)
        );
        assert!(!card.sector(5).accepts(&MifareKey::NDEF, KeySide::B));
    }

    #[test]
    fn locked_sector_refuses_everything() {
        let card = SimCard::ndef_formatted(&[0x01, 0x02, 0x03, 0x04]).with_locked_sector(7);
        assert!(!card.sector(7).accepts(&MifareKey::NDEF, KeySide::A));
        assert!(
            !card
                .sector(7)
                .accepts(&MifareKey::FACTORY_DEFAULT, KeySide::A)
        );
    }

    #[test]
    fn ndef_tlv_sits_in_sector_one() {
        let card = SimCard::ndef_formatted(&[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(card.block(4)[..3], [0x03, 0x00, 0xFE]);
    }

    #[test]
    fn image_round_trip_of_keys() {
        let mut image = vec![0u8; IMAGE_SIZE];
        image[..4].copy_from_slice(&[0xAA, 0xBB, 0xCC, 0xDD]);
        // sector 3 trailer: key A = NDEF, key B = default
        let trailer_start = (3 * BLOCKS_PER_SECTOR + 3) * 16;
        image[trailer_start..trailer_start + 6].copy_from_slice(MifareKey::NDEF.as_bytes());
        image[trailer_start + 10..trailer_start + 16]
            .copy_from_slice(MifareKey::FACTORY_DEFAULT.as_bytes());

        let card = SimCard::from_image(&image).unwrap();
        assert_eq!(card.uid().as_bytes(), &[0xAA, 0xBB, 0xCC, 0xDD]);
        assert!(card.sector(3).accepts(&MifareKey::NDEF, KeySide::A));
        assert!(
            card.sector(3)
                .accepts(&MifareKey::FACTORY_DEFAULT, KeySide::B)
        );
    }

    #[test]
    fn image_length_is_checked() {
        assert_eq!(
            SimCard::from_image(&[0u8; 100]).unwrap_err(),
            ImageError::WrongLength(100)
        );
    }
}
