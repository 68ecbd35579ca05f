//! Buffer abstractions for TNS protocol encoding/decoding
//!
//! [`ReadBuffer`] is the bounds-checked cursor every decoder reads through;
//! [`WriteBuffer`] produces the same encodings for building packets.

mod read;
mod write;

pub use read::{KeyValue, ReadBuffer};
pub use write::WriteBuffer;
