use crate::kind::VarKind;

/// Errors raised while validating or converting a value for the wire.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValueError {
    /// Integer does not fit the unsigned range of the target kind.
    #[error("{value} is out of range for {kind} (0..={max})")]
    OutOfRange { kind: VarKind, value: i128, max: u64 },

    /// The value's type cannot be carried by the target kind.
    #[error("{kind} cannot carry a {got} value")]
    TypeMismatch { kind: VarKind, got: &'static str },

    /// Unknown numeric kind discriminant.
    #[error("unknown variable kind {0} (expected 0..=4)")]
    UnknownKind(u8),

    /// Unknown kind name.
    #[error("unknown variable kind '{0}' (expected bool, byte, word, dword or lword)")]
    UnknownKindName(String),

    /// Text could not be parsed as a value of the target kind.
    #[error("cannot parse '{input}' as a {kind} value")]
    Parse { kind: VarKind, input: String },
}

pub type Result<T> = std::result::Result<T, ValueError>;
