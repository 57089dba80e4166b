//! Reference wire codec for sbuf schemas.
//!
//! Generated bindings in every target language must produce byte streams
//! identical to this implementation; the cross-language test vectors live in
//! this crate's `tests/` directory.

mod codec;
mod error;
mod primitive;
mod value;

pub use codec::{decode, decode_args, encode, encode_args};
pub use error::WireError;
pub use primitive::{bits_len, get_bit, set_bit};
pub use value::{Value, zero_value};
