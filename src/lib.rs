//! Decoder for the Python pickle format, protocols 0 through 2.
//!
//! Pickle is a small stack machine: each opcode pushes a value, builds a
//! container out of values already on the stack, or stores/fetches values in
//! a memo table. [`decode`] runs that machine over a byte buffer and returns
//! the single value left when the stream reaches STOP.
//!
//! Only data opcodes are implemented. Anything that would import a class or
//! call a constructor (GLOBAL, REDUCE, BUILD, ...) is rejected as an invalid
//! opcode, as are the opcodes introduced by protocol 3 and later.
//!
//! ```
//! use pickle_decode::{decode, Value};
//!
//! let val = decode(b"\x80\x02]q\x00(K\x01K\x02K\x03e.").unwrap();
//! assert_eq!(val, Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]));
//! ```

mod config;
mod cursor;
mod decode;
mod error;
mod heap;
mod json;
mod literal;
mod memo;
mod opcodes;
mod types;

pub use crate::config::DecoderConfig;
pub use crate::error::DecodeError;
pub use crate::types::Value;
pub use num_bigint::BigInt;

/// Decode one pickle stream with the default limits.
pub fn decode(data: &[u8]) -> Result<Value, DecodeError> {
    decode_with_config(data, &DecoderConfig::default())
}

/// Decode one pickle stream.
///
/// Every call owns its own stack, marks and memo, so calls may run
/// concurrently on different threads.
pub fn decode_with_config(data: &[u8], config: &DecoderConfig) -> Result<Value, DecodeError> {
    decode::decode_pickle(data, config).inspect_err(|err| {
        tracing::debug!(len = data.len(), error = %err, "pickle decode failed");
    })
}
