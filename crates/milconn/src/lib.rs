//! Client runtime for Milteksan PLC/CNC controllers.
//!
//! The controller vendor ships a native protocol engine that does nothing on
//! its own: it has to be pumped, and it reports responses through per-kind
//! flags. milconn wraps it in a thread-safe client with bounded waits.
//!
//! # Crate Structure
//!
//! - [`value`]: variable kinds, wire values, float bit-pattern codec
//! - [`transport`]: the native engine boundary and a simulated controller
//! - [`client`]: connection lifecycle, protocol pump, typed accessors
//!
//! ```no_run
//! use std::sync::Arc;
//! use milconn::client::Client;
//! use milconn::transport::SimTransport;
//!
//! let client = Client::new(Arc::new(SimTransport::new()));
//! client.connect_default("192.168.1.254", 60000)?;
//! client.set_dword_f32(150, 123.456)?;
//! let raw = client.get_dword(150)?;
//! assert_eq!(milconn::value::decode_f32(raw), 123.456);
//! # Ok::<(), milconn::client::ClientError>(())
//! ```

/// Re-export value types.
pub mod value {
    pub use milconn_value::*;
}

/// Re-export transport types.
pub mod transport {
    pub use milconn_transport::*;
}

/// Re-export client types.
pub mod client {
    pub use milconn_client::*;
}

pub use milconn_client::{Client, ClientConfig, ClientError, ErrorClass};
pub use milconn_value::{Address, Value, VarKind, WireValue};
