use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::codec::{decode_f32, decode_f64, Value};
use crate::error::{Result, ValueError};
use crate::kind::VarKind;

/// A value in the unsigned representation the transport carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum WireValue {
    Bool(bool),
    Byte(u8),
    Word(u16),
    DWord(u32),
    LWord(u64),
}

/// How a caller wants a raw wire value presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpretation {
    /// Unsigned integer, as received.
    #[default]
    Raw,
    /// Two's complement at the kind's width.
    Signed,
    /// IEEE-754 bit pattern (DWORD as f32, LWORD as f64).
    Float,
}

impl WireValue {
    /// Kind carried by this value.
    pub const fn kind(self) -> VarKind {
        match self {
            WireValue::Bool(_) => VarKind::Bool,
            WireValue::Byte(_) => VarKind::Byte,
            WireValue::Word(_) => VarKind::Word,
            WireValue::DWord(_) => VarKind::DWord,
            WireValue::LWord(_) => VarKind::LWord,
        }
    }

    /// Widened unsigned value.
    pub const fn as_u64(self) -> u64 {
        match self {
            WireValue::Bool(v) => v as u64,
            WireValue::Byte(v) => v as u64,
            WireValue::Word(v) => v as u64,
            WireValue::DWord(v) => v as u64,
            WireValue::LWord(v) => v,
        }
    }

    /// Build a wire value from an unsigned integer, checking the kind's range.
    pub fn from_raw(kind: VarKind, raw: u64) -> Result<Self> {
        if raw > kind.max_value() {
            return Err(ValueError::OutOfRange {
                kind,
                value: i128::from(raw),
                max: kind.max_value(),
            });
        }
        // Range checked above; the narrowing casts are lossless.
        Ok(match kind {
            VarKind::Bool => WireValue::Bool(raw == 1),
            VarKind::Byte => WireValue::Byte(raw as u8),
            VarKind::Word => WireValue::Word(raw as u16),
            VarKind::DWord => WireValue::DWord(raw as u32),
            VarKind::LWord => WireValue::LWord(raw),
        })
    }

    /// Zero value for a kind.
    pub const fn zero(kind: VarKind) -> Self {
        match kind {
            VarKind::Bool => WireValue::Bool(false),
            VarKind::Byte => WireValue::Byte(0),
            VarKind::Word => WireValue::Word(0),
            VarKind::DWord => WireValue::DWord(0),
            VarKind::LWord => WireValue::LWord(0),
        }
    }

    /// Append the kind-width little-endian image to `dst`.
    pub fn put_le(self, dst: &mut BytesMut) {
        dst.reserve(self.kind().width());
        match self {
            WireValue::Bool(v) => dst.put_u8(u8::from(v)),
            WireValue::Byte(v) => dst.put_u8(v),
            WireValue::Word(v) => dst.put_u16_le(v),
            WireValue::DWord(v) => dst.put_u32_le(v),
            WireValue::LWord(v) => dst.put_u64_le(v),
        }
    }

    /// The kind-width little-endian image.
    pub fn to_le_bytes(self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.kind().width());
        self.put_le(&mut buf);
        buf.freeze()
    }

    /// Present the raw value the way the caller asks.
    ///
    /// `Float` is only meaningful for DWORD and LWORD; the transport does not
    /// remember whether a slot was written as a float.
    pub fn interpret(self, how: Interpretation) -> Result<Value> {
        match (how, self) {
            (_, WireValue::Bool(v)) => Ok(Value::Bool(v)),
            (Interpretation::Raw, other) => Ok(Value::Int(i128::from(other.as_u64()))),
            (Interpretation::Signed, WireValue::Byte(v)) => Ok(Value::Int(i128::from(v as i8))),
            (Interpretation::Signed, WireValue::Word(v)) => Ok(Value::Int(i128::from(v as i16))),
            (Interpretation::Signed, WireValue::DWord(v)) => Ok(Value::Int(i128::from(v as i32))),
            (Interpretation::Signed, WireValue::LWord(v)) => Ok(Value::Int(i128::from(v as i64))),
            (Interpretation::Float, WireValue::DWord(v)) => Ok(Value::F32(decode_f32(v))),
            (Interpretation::Float, WireValue::LWord(v)) => Ok(Value::F64(decode_f64(v))),
            (Interpretation::Float, other) => Err(ValueError::TypeMismatch {
                kind: other.kind(),
                got: "float",
            }),
        }
    }
}

impl fmt::Display for WireValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireValue::Bool(v) => write!(f, "{v}"),
            other => write!(f, "{}", other.as_u64()),
        }
    }
}

impl From<bool> for WireValue {
    fn from(v: bool) -> Self {
        WireValue::Bool(v)
    }
}

impl From<u8> for WireValue {
    fn from(v: u8) -> Self {
        WireValue::Byte(v)
    }
}

impl From<u16> for WireValue {
    fn from(v: u16) -> Self {
        WireValue::Word(v)
    }
}

impl From<u32> for WireValue {
    fn from(v: u32) -> Self {
        WireValue::DWord(v)
    }
}

impl From<u64> for WireValue {
    fn from(v: u64) -> Self {
        WireValue::LWord(v)
    }
}
