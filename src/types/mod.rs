//! Column and bind value decoding
//!
//! Each submodule turns the wire bytes of one family of types into a Rust
//! value. The per-column dispatch lives in [`crate::row`].

mod binary;
mod catalog;
mod charset;
mod cursor;
mod date;
mod interval;
mod lob;
mod number;
mod rowid;

pub use binary::{decode_binary_double, decode_binary_float};
pub use catalog::{data_type_code, data_type_name, describe_data_type};
pub use charset::{decode_text, AL16UTF16, AL32UTF8, US7ASCII, UTF8, WE8ISO8859P1};
pub use cursor::RefCursor;
pub use date::{decode_datetime, OracleDateTime};
pub use interval::{decode_interval_ds, decode_interval_ym, IntervalDs, IntervalYm};
pub use lob::{LobData, LobLocator};
pub use number::{decode_number_text, number_value, DecimalText, NumberValue};
pub use rowid::{RowId, URowId, ROWID_LENGTH};
