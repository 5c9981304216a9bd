//! Fixed-size binary record for the display preference.
//!
//! Layout (little endian):
//!
//! | bytes  | field                          |
//! |--------|--------------------------------|
//! | 0..4   | magic `"MJP1"`                 |
//! | 4      | version                        |
//! | 5..11  | namespace tag `"player"`       |
//! | 11     | flags, bit 0 = invert          |
//! | 12..16 | FNV-1a checksum of bytes 0..12 |

use super::DisplayPreference;

pub const RECORD_LEN: usize = 16;
pub const RECORD_MAGIC: u32 = u32::from_le_bytes(*b"MJP1");
pub const RECORD_VERSION: u8 = 1;
pub const RECORD_NAMESPACE: [u8; 6] = *b"player";

const FLAG_INVERT: u8 = 0x01;
const CHECKSUM_OFFSET: usize = 12;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RecordError {
    /// Record belongs to this player but fails its checksum.
    Corrupted,
}

pub fn encode(preference: &DisplayPreference) -> [u8; RECORD_LEN] {
    let mut buf = [0u8; RECORD_LEN];
    buf[0..4].copy_from_slice(&RECORD_MAGIC.to_le_bytes());
    buf[4] = RECORD_VERSION;
    buf[5..11].copy_from_slice(&RECORD_NAMESPACE);
    buf[11] = if preference.invert { FLAG_INVERT } else { 0 };
    let checksum = checksum32(&buf[..CHECKSUM_OFFSET]);
    buf[CHECKSUM_OFFSET..].copy_from_slice(&checksum.to_le_bytes());
    buf
}

/// Decodes a stored record.
///
/// Erased flash, other magics, unknown versions and foreign namespaces all
/// read as "nothing saved yet".
pub fn decode(buf: &[u8; RECORD_LEN]) -> Result<Option<DisplayPreference>, RecordError> {
    if buf.iter().all(|b| *b == 0xFF) {
        return Ok(None);
    }

    let magic = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    if magic != RECORD_MAGIC || buf[4] != RECORD_VERSION || buf[5..11] != RECORD_NAMESPACE {
        return Ok(None);
    }

    let expected = u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]);
    if checksum32(&buf[..CHECKSUM_OFFSET]) != expected {
        return Err(RecordError::Corrupted);
    }

    Ok(Some(DisplayPreference::new(buf[11] & FLAG_INVERT != 0)))
}

/// 32-bit FNV-1a.
pub fn checksum32(bytes: &[u8]) -> u32 {
    let mut hash = 0x811C9DC5u32;
    for b in bytes {
        hash ^= *b as u32;
        hash = hash.wrapping_mul(16777619);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_polarities_survive_encoding() {
        for invert in [false, true] {
            let pref = DisplayPreference::new(invert);
            assert_eq!(decode(&encode(&pref)), Ok(Some(pref)));
        }
    }

    #[test]
    fn layout_is_stable() {
        let buf = encode(&DisplayPreference::new(true));
        assert_eq!(&buf[0..4], b"MJP1");
        assert_eq!(buf[4], 1);
        assert_eq!(&buf[5..11], b"player");
        assert_eq!(buf[11], 0x01);
    }

    #[test]
    fn erased_sector_reads_as_first_boot() {
        assert_eq!(decode(&[0xFF; RECORD_LEN]), Ok(None));
    }

    #[test]
    fn foreign_records_are_ignored() {
        let mut other_magic = encode(&DisplayPreference::new(false));
        other_magic[0] = b'X';
        assert_eq!(decode(&other_magic), Ok(None));

        let mut other_namespace = encode(&DisplayPreference::new(false));
        other_namespace[5..11].copy_from_slice(b"reader");
        assert_eq!(decode(&other_namespace), Ok(None));

        let mut newer = encode(&DisplayPreference::new(false));
        newer[4] = 2;
        assert_eq!(decode(&newer), Ok(None));
    }

    #[test]
    fn flipped_flag_bit_fails_checksum() {
        let mut buf = encode(&DisplayPreference::new(false));
        buf[11] ^= FLAG_INVERT;
        assert_eq!(decode(&buf), Err(RecordError::Corrupted));
    }

    #[test]
    fn fnv_reference_values() {
        assert_eq!(checksum32(b""), 0x811C9DC5);
        assert_eq!(checksum32(b"a"), 0xE40C292C);
    }
}
