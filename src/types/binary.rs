//! BINARY_FLOAT and BINARY_DOUBLE decoding
//!
//! Both are IEEE 754 big-endian values with the sign handling changed so
//! that the bytes sort correctly: a positive value has its sign bit set, a
//! negative value has every bit inverted.

use crate::error::{Error, Result};

/// Undo the sort-order transform in place
fn restore_ieee(bytes: &mut [u8]) {
    if bytes[0] & 0x80 != 0 {
        bytes[0] &= 0x7F;
    } else {
        bytes.iter_mut().for_each(|b| *b = !*b);
    }
}

/// Decode a BINARY_FLOAT (4 bytes)
pub fn decode_binary_float(data: &[u8]) -> Result<f32> {
    let mut raw: [u8; 4] = data
        .get(..4)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| Error::Conversion(format!("BINARY_FLOAT needs 4 bytes, got {}", data.len())))?;
    restore_ieee(&mut raw);
    Ok(f32::from_be_bytes(raw))
}

/// Decode a BINARY_DOUBLE (8 bytes)
pub fn decode_binary_double(data: &[u8]) -> Result<f64> {
    let mut raw: [u8; 8] = data
        .get(..8)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| Error::Conversion(format!("BINARY_DOUBLE needs 8 bytes, got {}", data.len())))?;
    restore_ieee(&mut raw);
    Ok(f64::from_be_bytes(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_float() {
        // 1.5f32 = 0x3FC00000, sign bit set on the wire
        assert_eq!(decode_binary_float(&[0xBF, 0xC0, 0x00, 0x00]).unwrap(), 1.5);
    }

    #[test]
    fn test_negative_float() {
        // -1.5f32 = 0xBFC00000, inverted on the wire
        assert_eq!(decode_binary_float(&[0x40, 0x3F, 0xFF, 0xFF]).unwrap(), -1.5);
    }

    #[test]
    fn test_double() {
        let mut wire = 2.25f64.to_be_bytes();
        wire[0] |= 0x80;
        assert_eq!(decode_binary_double(&wire).unwrap(), 2.25);

        let wire: Vec<u8> = (-2.25f64).to_be_bytes().iter().map(|b| !b).collect();
        assert_eq!(decode_binary_double(&wire).unwrap(), -2.25);
    }

    #[test]
    fn test_short_input() {
        assert!(decode_binary_float(&[0x80]).is_err());
        assert!(decode_binary_double(&[0x80; 4]).is_err());
    }
}
