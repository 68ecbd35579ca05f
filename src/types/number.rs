//! NUMBER decoding
//!
//! A NUMBER travels as an exponent byte followed by base-100 mantissa
//! digits. Positive values set the high bit of the exponent and store each
//! digit plus one. Negative values invert the exponent, store `101 - digit`
//! and usually end with a 102 terminator.
//!
//! Which Rust value a NUMBER becomes depends on the column's precision and
//! scale, see [`number_value`].

use crate::error::{Error, Result};

/// A decoded NUMBER in its canonical decimal text form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecimalText {
    /// Digits with optional sign and decimal point
    pub text: String,
    /// No fractional part
    pub is_integer: bool,
}

/// The typed result of decoding a NUMBER column or bind
#[derive(Debug, Clone, PartialEq)]
pub enum NumberValue {
    /// Scale 0 and precision up to 18
    Integer(i64),
    /// Scale 0 and above the signed 64-bit range
    Unsigned(u64),
    /// Positive scale, kept as text to preserve every digit
    Decimal(String),
    /// Everything else
    Float(f64),
}

/// Decode the wire bytes of a NUMBER into decimal text
pub fn decode_number_text(data: &[u8]) -> Result<DecimalText> {
    let (&exponent_byte, mantissa) = data
        .split_first()
        .ok_or_else(|| Error::Conversion("empty NUMBER".to_string()))?;
    let positive = exponent_byte & 0x80 != 0;

    if mantissa.is_empty() {
        if positive {
            return Ok(DecimalText { text: "0".to_string(), is_integer: true });
        }
        return Ok(DecimalText { text: "-1e126".to_string(), is_integer: false });
    }

    let exponent = if positive {
        exponent_byte as i32 - 193
    } else {
        (!exponent_byte) as i32 - 193
    };
    let mantissa = match mantissa.split_last() {
        Some((&102, head)) if !positive => head,
        _ => mantissa,
    };

    let mut digits: Vec<u8> = Vec::with_capacity(mantissa.len() * 2);
    for &byte in mantissa {
        let pair = if positive { byte.wrapping_sub(1) } else { 101u8.wrapping_sub(byte) };
        if pair > 99 {
            return Err(Error::Conversion(format!("invalid NUMBER digit byte {}", byte)));
        }
        digits.push(pair / 10);
        digits.push(pair % 10);
    }

    // position of the decimal point counted in digits from the left
    let mut point = (exponent + 1) * 2;
    while digits.first() == Some(&0) {
        digits.remove(0);
        point -= 1;
    }
    while digits.last() == Some(&0) && digits.len() as i32 > point.max(0) {
        digits.pop();
    }

    let mut text = String::with_capacity(digits.len() + 4);
    if !positive {
        text.push('-');
    }
    let is_integer = point >= digits.len() as i32;
    if point <= 0 {
        text.push_str("0.");
        text.extend(std::iter::repeat('0').take((-point) as usize));
        text.extend(digits.iter().map(|d| char::from(b'0' + d)));
    } else {
        for (i, d) in digits.iter().enumerate() {
            if i as i32 == point {
                text.push('.');
            }
            text.push(char::from(b'0' + d));
        }
        for _ in digits.len() as i32..point {
            text.push('0');
        }
    }
    if digits.is_empty() {
        text = "0".to_string();
    }

    Ok(DecimalText { text, is_integer })
}

/// Decode a NUMBER the way the column describes it
pub fn number_value(data: &[u8], precision: u8, scale: u8) -> Result<NumberValue> {
    let decimal = decode_number_text(data)?;
    if scale == 0 && precision <= 18 {
        return integer_part(&decimal.text).map(NumberValue::Integer);
    }
    if scale == 0 && decimal.is_integer {
        if let Ok(value) = decimal.text.parse::<u64>() {
            if value > i64::MAX as u64 {
                return Ok(NumberValue::Unsigned(value));
            }
        }
    }
    if scale > 0 {
        return Ok(NumberValue::Decimal(decimal.text));
    }
    decimal
        .text
        .parse::<f64>()
        .map(NumberValue::Float)
        .map_err(|e| Error::Conversion(format!("NUMBER {} as float: {}", decimal.text, e)))
}

/// Truncate decimal text to its integer part
fn integer_part(text: &str) -> Result<i64> {
    let whole = text.split('.').next().unwrap_or(text);
    match whole {
        "" | "-" | "-0" => Ok(0),
        _ => whole
            .parse()
            .map_err(|e| Error::Conversion(format!("NUMBER {} as integer: {}", text, e))),
    }
}
