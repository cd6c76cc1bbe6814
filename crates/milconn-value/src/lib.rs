//! Variable kinds and the typed value codec for milconn.
//!
//! The controller exchanges five scalar kinds, each carried as an unsigned
//! integer of fixed width:
//! - `BOOL` (1 byte), `BYTE` (1 byte), `WORD` (2 bytes)
//! - `DWORD` (4 bytes), `LWORD` (8 bytes)
//!
//! Callers work with [`Value`] (booleans, integers, floats) and fit it to a
//! kind with [`Value::encode`]. Floats travel as their raw IEEE-754 bits.

pub mod codec;
pub mod error;
pub mod kind;
pub mod wire;

pub use codec::{decode_f32, decode_f64, encode_f32, encode_f64, encode_int, Value};
pub use error::{Result, ValueError};
pub use kind::{Address, VarKind};
pub use wire::{Interpretation, WireValue};
