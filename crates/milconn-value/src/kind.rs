//! Variable kinds understood by the controller.
//!
//! The numeric discriminants are part of the native request primitive and
//! must not change.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ValueError};

/// Remote memory slot identifier. Meaning is external configuration.
pub type Address = u32;

/// One of the five scalar wire types.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarKind {
    Bool = 0,
    Byte = 1,
    Word = 2,
    DWord = 3,
    LWord = 4,
}

impl VarKind {
    /// All kinds in discriminant order.
    pub const ALL: [VarKind; 5] = [
        VarKind::Bool,
        VarKind::Byte,
        VarKind::Word,
        VarKind::DWord,
        VarKind::LWord,
    ];

    /// Wire width in bytes.
    pub const fn width(self) -> usize {
        match self {
            VarKind::Bool | VarKind::Byte => 1,
            VarKind::Word => 2,
            VarKind::DWord => 4,
            VarKind::LWord => 8,
        }
    }

    /// Largest unsigned value the kind can carry.
    pub const fn max_value(self) -> u64 {
        match self {
            VarKind::Bool => 1,
            VarKind::Byte => u8::MAX as u64,
            VarKind::Word => u16::MAX as u64,
            VarKind::DWord => u32::MAX as u64,
            VarKind::LWord => u64::MAX,
        }
    }

    /// Discriminant passed to the native request primitive.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Position in [`VarKind::ALL`], usable as an array index.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Lowercase name.
    pub const fn name(self) -> &'static str {
        match self {
            VarKind::Bool => "bool",
            VarKind::Byte => "byte",
            VarKind::Word => "word",
            VarKind::DWord => "dword",
            VarKind::LWord => "lword",
        }
    }

    /// Kind for a native discriminant.
    pub fn from_u8(raw: u8) -> Result<Self> {
        Self::ALL
            .get(usize::from(raw))
            .copied()
            .ok_or(ValueError::UnknownKind(raw))
    }
}

impl fmt::Display for VarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VarKind::Bool => "BOOL",
            VarKind::Byte => "BYTE",
            VarKind::Word => "WORD",
            VarKind::DWord => "DWORD",
            VarKind::LWord => "LWORD",
        })
    }
}

impl FromStr for VarKind {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == lowered)
            .ok_or_else(|| ValueError::UnknownKindName(s.to_string()))
    }
}

impl TryFrom<u8> for VarKind {
    type Error = ValueError;

    fn try_from(raw: u8) -> Result<Self> {
        Self::from_u8(raw)
    }
}
