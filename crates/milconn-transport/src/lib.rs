//! Native transport boundary for milconn.
//!
//! The protocol engine that talks to the controller is an opaque native
//! component. This crate describes the entry points milconn relies on as the
//! [`Transport`] trait and ships two implementations:
//! - [`SimTransport`], an in-process simulated controller
//! - `NativeTransport`, a binding to `libmilconnapi` (behind the `native` feature)
//!
//! This is the lowest layer that does I/O. Everything else builds on the
//! trait defined here.

pub mod error;
pub mod sim;
pub mod traits;

#[cfg(feature = "native")]
pub mod native;

pub use error::{Result, TransportError};
pub use sim::{SimConfig, SimHandle, SimStats, SimTransport};
pub use traits::{validate_host, Transport};

#[cfg(feature = "native")]
pub use native::{NativeHandle, NativeTransport};
