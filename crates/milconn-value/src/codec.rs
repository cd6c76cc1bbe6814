//! Bit-exact conversion between caller values and wire values.
//!
//! Floats are never converted numerically: their IEEE-754 bit pattern is
//! reinterpreted as the unsigned integer of the same width. Reads return the
//! raw integer; callers that wrote a float reinterpret on the way back.

use std::fmt;

use crate::error::{Result, ValueError};
use crate::kind::VarKind;
use crate::wire::WireValue;

/// A value as a caller thinks of it, before it is fitted to a kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i128),
    F32(f32),
    F64(f64),
}

impl Value {
    fn type_name(self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
        }
    }

    /// Fit this value to `kind`.
    ///
    /// BOOL takes only booleans, BYTE and WORD only integers, DWORD integers or
    /// `f32`, LWORD integers or `f64`.
    pub fn encode(self, kind: VarKind) -> Result<WireValue> {
        match (kind, self) {
            (VarKind::Bool, Value::Bool(v)) => Ok(WireValue::Bool(v)),
            (VarKind::Bool, other) => Err(ValueError::TypeMismatch {
                kind,
                got: other.type_name(),
            }),
            (_, Value::Int(v)) => encode_int(v, kind),
            (VarKind::DWord, Value::F32(v)) => Ok(WireValue::DWord(encode_f32(v))),
            (VarKind::LWord, Value::F64(v)) => Ok(WireValue::LWord(encode_f64(v))),
            (_, other) => Err(ValueError::TypeMismatch {
                kind,
                got: other.type_name(),
            }),
        }
    }

    /// Parse text typed by an operator into a value suited to `kind`.
    ///
    /// Integers accept decimal or `0x` hex. DWORD and LWORD fall back to
    /// `f32`/`f64` when the text is not an integer.
    pub fn parse(kind: VarKind, input: &str) -> Result<Self> {
        let text = input.trim();
        let parse_err = || ValueError::Parse {
            kind,
            input: input.to_string(),
        };

        if kind == VarKind::Bool {
            return match text.to_ascii_lowercase().as_str() {
                "true" | "1" | "on" => Ok(Value::Bool(true)),
                "false" | "0" | "off" => Ok(Value::Bool(false)),
                _ => Err(parse_err()),
            };
        }

        if let Some(int) = parse_int(text) {
            return Ok(Value::Int(int));
        }

        match kind {
            VarKind::DWord => text.parse::<f32>().map(Value::F32).map_err(|_| parse_err()),
            VarKind::LWord => text.parse::<f64>().map(Value::F64).map_err(|_| parse_err()),
            _ => Err(parse_err()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::F32(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::F32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

macro_rules! int_into_value {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(i128::from(v))
            }
        })*
    };
}

int_into_value!(u8, u16, u32, u64, i8, i16, i32, i64);

/// Reinterpret an `f32` bit pattern as `u32`.
pub fn encode_f32(value: f32) -> u32 {
    value.to_bits()
}

/// Reinterpret an `f64` bit pattern as `u64`.
pub fn encode_f64(value: f64) -> u64 {
    value.to_bits()
}

/// Reinterpret a `u32` read from a DWORD slot as `f32`.
pub fn decode_f32(raw: u32) -> f32 {
    f32::from_bits(raw)
}

/// Reinterpret a `u64` read from an LWORD slot as `f64`.
pub fn decode_f64(raw: u64) -> f64 {
    f64::from_bits(raw)
}

/// Fit an integer to an unsigned kind, rejecting anything outside
/// `0..=kind.max_value()`.
pub fn encode_int(value: i128, kind: VarKind) -> Result<WireValue> {
    if kind == VarKind::Bool {
        return Err(ValueError::TypeMismatch {
            kind,
            got: "integer",
        });
    }
    let raw = u64::try_from(value).map_err(|_| ValueError::OutOfRange {
        kind,
        value,
        max: kind.max_value(),
    })?;
    WireValue::from_raw(kind, raw)
}

fn parse_int(text: &str) -> Option<i128> {
    if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        return i128::from_str_radix(hex, 16).ok();
    }
    text.parse::<i128>().ok()
}
