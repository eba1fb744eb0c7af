//! Minimal decoding of the identification data the diagnostics print.

use serde::Serialize;

/// Standard SCSI INQUIRY allocation length.
pub const INQUIRY_LEN: usize = 36;

/// ATA IDENTIFY DEVICE data is one 512-byte sector.
pub const IDENTIFY_LEN: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Inquiry {
    pub peripheral_type: u8,
    pub removable: bool,
    pub vendor: String,
    pub product: String,
    pub revision: String,
}

fn ascii_field(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_matches(|c: char| c == ' ' || c == '\0')
        .to_string()
}

pub fn parse_inquiry(buf: &[u8]) -> Option<Inquiry> {
    if buf.len() < INQUIRY_LEN {
        return None;
    }
    Some(Inquiry {
        peripheral_type: buf[0] & 0x1f,
        removable: buf[1] & 0x80 != 0,
        vendor: ascii_field(&buf[8..16]),
        product: ascii_field(&buf[16..32]),
        revision: ascii_field(&buf[32..36]),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identify {
    pub model: String,
    pub serial: String,
    pub firmware: String,
    pub lba48: bool,
    /// User-addressable sectors.
    pub sectors: u64,
}

fn word(buf: &[u8], index: usize) -> u16 {
    u16::from_le_bytes([buf[index * 2], buf[index * 2 + 1]])
}

/// ATA strings store two characters per word, first character in the high byte.
fn ata_string(buf: &[u8], words: std::ops::Range<usize>) -> String {
    let bytes: Vec<u8> = words
        .flat_map(|i| word(buf, i).to_be_bytes())
        .collect();
    ascii_field(&bytes)
}

pub fn parse_identify(buf: &[u8]) -> Option<Identify> {
    if buf.len() < IDENTIFY_LEN {
        return None;
    }
    let lba48 = word(buf, 83) & (1 << 10) != 0;
    let sectors = if lba48 {
        (100..104)
            .rev()
            .fold(0u64, |acc, i| (acc << 16) | u64::from(word(buf, i)))
    } else {
        u64::from(word(buf, 60)) | (u64::from(word(buf, 61)) << 16)
    };
    Some(Identify {
        model: ata_string(buf, 27..47),
        serial: ata_string(buf, 10..20),
        firmware: ata_string(buf, 23..27),
        lba48,
        sectors,
    })
}
