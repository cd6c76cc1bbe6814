//! Request/response correlation.
//!
//! The engine signals arrivals per kind, not per address, so two outstanding
//! requests of one kind could not be told apart. Gets of the same kind are
//! therefore serialized by a per-kind gate; gets of different kinds proceed in
//! parallel. The pump hands each arrival to the single request registered for
//! its kind, after skipping arrivals owed to requests that already timed out.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use milconn_transport::Transport;
use milconn_value::{Address, VarKind, WireValue};
use tracing::debug;

use crate::client::Client;
use crate::error::{ClientError, Result};
use crate::session::InFlight;

impl<T: Transport> Client<T> {
    /// Request `(kind, address)` and wait up to `timeout` for the response.
    pub(crate) fn request_and_wait(
        &self,
        kind: VarKind,
        address: Address,
        timeout: Duration,
    ) -> Result<WireValue> {
        let deadline = Instant::now() + timeout;
        let timed_out = || ClientError::Timeout {
            kind,
            address,
            timeout,
        };

        if !self.is_connected() {
            return Err(ClientError::not_connected());
        }

        let _gate = self.gates[kind.index()]
            .try_lock_for(timeout)
            .ok_or_else(timed_out)?;

        let response = {
            let mut guard = self.shared.session.lock();
            let session = &mut *guard;
            session.live_handle()?;
            let transport = &self.shared.transport;
            let (reply, response) = mpsc::sync_channel(1);
            // A marker the pump has not seen yet answers an abandoned
            // request, or nothing.
            if transport.arrived(kind) {
                transport.clear_arrived(kind);
                session.in_flight.discard_abandoned(kind);
            }
            let handle = session.live_handle()?;
            transport.request_value(handle, address, kind);
            session.in_flight.insert(kind, InFlight::new(address, reply));
            response
        };
        debug!(%kind, address, "value requested");

        let remaining = deadline.saturating_duration_since(Instant::now());
        match response.recv_timeout(remaining) {
            Ok(result) => result,
            Err(RecvTimeoutError::Disconnected) => Err(ClientError::Connection(
                "session closed while waiting for response".to_string(),
            )),
            Err(RecvTimeoutError::Timeout) => {
                self.shared.session.lock().in_flight.abandon(kind);
                // The pump may have completed the request after the wait
                // expired but before it was withdrawn.
                match response.try_recv() {
                    Ok(result) => result,
                    Err(_) => {
                        debug!(%kind, address, ?timeout, "request timed out");
                        Err(timed_out())
                    }
                }
            }
        }
    }
}
