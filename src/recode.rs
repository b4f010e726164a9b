//! Windows-1250 (Central European) file names to the legacy byte form the
//! design tool writes into reorganized output.
//!
//! Per input byte:
//!
//! - below `0x80`: copied unchanged;
//! - `0x80..=0xFF` whose code point fits in a byte (the Latin-1 identical
//!   slots, plus the five undefined positions `0x81 0x83 0x88 0x90 0x98`):
//!   the 2-byte UTF-8 form of the raw byte, `0xC0 | b >> 6, 0x80 | b & 0x3F`;
//! - `0x80..=0xFF` whose code point lies above `0xFF`: the code point as a
//!   big-endian byte pair, so `0x8A` (U+0160) becomes `01 60`.
//!
//! The last rule does not yield valid UTF-8, so names are produced as raw
//! bytes rather than a `String`.  Every input byte produces output and
//! recoding never fails.

/// Unicode code points for bytes `0x80..=0xFF`; `0` marks an undefined slot.
const CP1250_HIGH: [u16; 128] = [
    0x20AC, 0x0000, 0x201A, 0x0000, 0x201E, 0x2026, 0x2020, 0x2021,
    0x0000, 0x2030, 0x0160, 0x2039, 0x015A, 0x0164, 0x017D, 0x0179,
    0x0000, 0x2018, 0x2019, 0x201C, 0x201D, 0x2022, 0x2013, 0x2014,
    0x0000, 0x2122, 0x0161, 0x203A, 0x015B, 0x0165, 0x017E, 0x017A,
    0x00A0, 0x02C7, 0x02D8, 0x0141, 0x00A4, 0x0104, 0x00A6, 0x00A7,
    0x00A8, 0x00A9, 0x015E, 0x00AB, 0x00AC, 0x00AD, 0x00AE, 0x017B,
    0x00B0, 0x00B1, 0x02DB, 0x0142, 0x00B4, 0x00B5, 0x00B6, 0x00B7,
    0x00B8, 0x0105, 0x015F, 0x00BB, 0x013D, 0x02DD, 0x013E, 0x017C,
    0x0154, 0x00C1, 0x00C2, 0x0102, 0x00C4, 0x0139, 0x0106, 0x00C7,
    0x010C, 0x00C9, 0x0118, 0x00CB, 0x011A, 0x00CD, 0x00CE, 0x010E,
    0x0110, 0x0143, 0x0147, 0x00D3, 0x00D4, 0x0150, 0x00D6, 0x00D7,
    0x0158, 0x016E, 0x00DA, 0x0170, 0x00DC, 0x00DD, 0x0162, 0x00DF,
    0x0155, 0x00E1, 0x00E2, 0x0103, 0x00E4, 0x013A, 0x0107, 0x00E7,
    0x010D, 0x00E9, 0x0119, 0x00EB, 0x011B, 0x00ED, 0x00EE, 0x010F,
    0x0111, 0x0144, 0x0148, 0x00F3, 0x00F4, 0x0151, 0x00F6, 0x00F7,
    0x0159, 0x016F, 0x00FA, 0x0171, 0x00FC, 0x00FD, 0x0163, 0x02D9,
];

/// Recode one CP1250 byte, appending its legacy form to `out`.
pub fn recode_byte(byte: u8, out: &mut Vec<u8>) {
    if byte < 0x80 {
        out.push(byte);
        return;
    }
    match CP1250_HIGH[usize::from(byte - 0x80)] {
        cp if cp > 0xFF => out.extend_from_slice(&cp.to_be_bytes()),
        _ => out.extend_from_slice(&[0xC0 | (byte >> 6), 0x80 | (byte & 0x3F)]),
    }
}

/// Recode a CP1250 byte string.
pub fn cp1250_to_utf8(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() * 2);
    for &b in bytes {
        recode_byte(b, &mut out);
    }
    out
}
