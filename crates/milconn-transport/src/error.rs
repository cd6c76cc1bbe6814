/// Errors that can occur at the native transport boundary.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The native library refused to allocate a client instance.
    #[error("failed to create client instance from native library")]
    CreateFailed,

    /// The host string cannot be handed to the native library.
    #[error("invalid host '{host}': {reason}")]
    InvalidHost { host: String, reason: &'static str },
}

pub type Result<T> = std::result::Result<T, TransportError>;
