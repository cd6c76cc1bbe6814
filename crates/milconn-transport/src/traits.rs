use milconn_value::{Address, VarKind, WireValue};

use crate::error::{Result, TransportError};

/// Entry points of the native protocol engine.
///
/// Every call is non-blocking from the engine's point of view: `connect_to_server`
/// only starts an attempt, `request_value` only queues a fetch. Nothing moves
/// until `process_messages` is called, repeatedly and frequently.
///
/// Arrival markers are process-wide and per kind, not per address: the engine
/// sets the marker when a response of that kind lands in its cache, and expects
/// the consumer to clear it.
pub trait Transport: Send + Sync + 'static {
    /// Per-client session handle. Only valid between `create_client` and
    /// `destroy_client`.
    type Handle: Send + Sync + 'static;

    /// Allocate a client instance.
    fn create_client(&self) -> Result<Self::Handle>;

    /// Release a client instance. The handle must not be used afterwards.
    fn destroy_client(&self, handle: Self::Handle);

    /// Start a connection attempt. `true` means the attempt was accepted;
    /// completion is observed through [`Transport::is_connected`].
    fn connect_to_server(&self, handle: &Self::Handle, host: &str, port: u16) -> bool;

    /// Close the connection.
    fn disconnect_from_server(&self, handle: &Self::Handle);

    /// Engine-reported liveness.
    fn is_connected(&self, handle: &Self::Handle) -> bool;

    /// Run one inbound/outbound processing cycle.
    fn process_messages(&self, handle: &Self::Handle);

    /// Ask the controller for the value at `address`.
    fn request_value(&self, handle: &Self::Handle, address: Address, kind: VarKind);

    /// Read the engine's cached value for `(kind, address)`.
    fn get_value(&self, handle: &Self::Handle, address: Address, kind: VarKind)
        -> Option<WireValue>;

    /// Write a value. `false` means the engine rejected the send.
    fn set_value(&self, handle: &Self::Handle, address: Address, value: WireValue) -> bool;

    /// Whether a response of `kind` arrived since the marker was last cleared.
    fn arrived(&self, kind: VarKind) -> bool;

    /// Clear the arrival marker for `kind`.
    fn clear_arrived(&self, kind: VarKind);
}

/// Reject host strings the native engine cannot take.
pub fn validate_host(host: &str) -> Result<()> {
    if host.trim().is_empty() {
        return Err(TransportError::InvalidHost {
            host: host.to_string(),
            reason: "host must not be empty",
        });
    }
    if host.contains('\0') {
        return Err(TransportError::InvalidHost {
            host: host.replace('\0', "\\0"),
            reason: "host must not contain NUL bytes",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_host_accepts_addresses_and_names() {
        assert!(validate_host("192.168.1.254").is_ok());
        assert!(validate_host("plc-01.local").is_ok());
    }

    #[test]
    fn validate_host_rejects_empty_and_nul() {
        assert!(matches!(
            validate_host("  "),
            Err(TransportError::InvalidHost { .. })
        ));
        assert!(matches!(
            validate_host("plc\0evil"),
            Err(TransportError::InvalidHost { .. })
        ));
    }
}
