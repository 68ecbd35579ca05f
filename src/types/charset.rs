//! Character data decoding
//!
//! Only the character sets a proxy realistically meets are converted
//! exactly. Anything else is treated as UTF-8 with lossy replacement, which
//! keeps the record readable without failing the connection.

/// AL32UTF8
pub const AL32UTF8: u16 = 873;
/// UTF8 (CESU-8)
pub const UTF8: u16 = 871;
/// AL16UTF16, the usual national character set
pub const AL16UTF16: u16 = 2000;
/// US7ASCII
pub const US7ASCII: u16 = 1;
/// WE8ISO8859P1
pub const WE8ISO8859P1: u16 = 31;

/// Decode character data sent in `charset_id`
pub fn decode_text(data: &[u8], charset_id: u16) -> String {
    match charset_id {
        AL16UTF16 => {
            let units: Vec<u16> = data
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        WE8ISO8859P1 => data.iter().map(|&b| char::from(b)).collect(),
        _ => String::from_utf8_lossy(data).into_owned(),
    }
}
