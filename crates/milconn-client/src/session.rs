//! State shared between callers and the pump thread.
//!
//! Everything that touches the native handle goes through [`Shared::session`].
//! The lock is held for native calls and state mutation only, never while a
//! caller waits for a response.

use std::sync::mpsc::SyncSender;
use std::sync::Arc;

use milconn_transport::Transport;
use milconn_value::{Address, VarKind, WireValue};
use parking_lot::Mutex;
use tracing::warn;

use crate::error::{ClientError, Result};

/// What the pump reports to a thread blocked in `connect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LinkEvent {
    Up,
    Aborted,
}

/// A get waiting for its response.
pub(crate) struct InFlight {
    pub address: Address,
    reply: SyncSender<Result<WireValue>>,
}

impl InFlight {
    pub fn new(address: Address, reply: SyncSender<Result<WireValue>>) -> Self {
        Self { address, reply }
    }

    /// Hand the outcome to the waiter. A waiter that already gave up is fine.
    pub fn complete(self, result: Result<WireValue>) {
        let _ = self.reply.try_send(result);
    }
}

/// At most one outstanding request per kind, plus a count per kind of
/// requests that timed out while their response was still on the way.
///
/// The engine answers requests of one kind in order and signals each answer
/// through the same per-kind marker, so the next `abandoned[kind]` arrivals
/// belong to requests nobody waits for any more.
#[derive(Default)]
pub(crate) struct InFlightTable {
    slots: [Option<InFlight>; 5],
    abandoned: [u32; 5],
}

impl InFlightTable {
    pub fn insert(&mut self, kind: VarKind, request: InFlight) {
        if self.slots[kind.index()].replace(request).is_some() {
            warn!(%kind, "replaced an in-flight request that was never completed");
        }
    }

    pub fn take(&mut self, kind: VarKind) -> Option<InFlight> {
        self.slots[kind.index()].take()
    }

    /// Withdraw a request whose waiter gave up. Its response, when it lands,
    /// is discarded instead of completing a later request.
    pub fn abandon(&mut self, kind: VarKind) {
        if self.take(kind).is_some() {
            let count = &mut self.abandoned[kind.index()];
            *count = count.saturating_add(1);
        }
    }

    /// Account one arrival of `kind` against abandoned requests. `true` means
    /// the arrival answered an abandoned request and must not be routed.
    pub fn discard_abandoned(&mut self, kind: VarKind) -> bool {
        let count = &mut self.abandoned[kind.index()];
        if *count == 0 {
            return false;
        }
        *count -= 1;
        true
    }

    #[cfg(test)]
    pub fn abandoned(&self, kind: VarKind) -> u32 {
        self.abandoned[kind.index()]
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Complete every outstanding request with a connection error. Responses
    /// still owed by the old session will never arrive, so abandoned counts
    /// reset too.
    pub fn fail_all(&mut self, reason: &str) {
        for slot in &mut self.slots {
            if let Some(request) = slot.take() {
                request.complete(Err(ClientError::Connection(reason.to_string())));
            }
        }
        self.abandoned = [0; 5];
    }
}

pub(crate) struct Session<H> {
    pub handle: Option<H>,
    pub connected: bool,
    pub endpoint: Option<(String, u16)>,
    pub link_waiter: Option<SyncSender<LinkEvent>>,
    pub in_flight: InFlightTable,
}

impl<H> Default for Session<H> {
    fn default() -> Self {
        Self {
            handle: None,
            connected: false,
            endpoint: None,
            link_waiter: None,
            in_flight: InFlightTable::default(),
        }
    }
}

impl<H> Session<H> {
    /// The handle, if the session is locally considered connected.
    pub fn live_handle(&self) -> Result<&H> {
        match (self.connected, self.handle.as_ref()) {
            (true, Some(handle)) => Ok(handle),
            _ => Err(ClientError::not_connected()),
        }
    }

    /// Downgrade after the transport reported the link gone. The handle stays
    /// until the next disconnect or connect tears it down.
    pub fn mark_lost(&mut self, reason: &str) {
        if self.connected {
            warn!(reason, "connection lost");
        }
        self.connected = false;
        self.in_flight.fail_all(reason);
    }
}

pub(crate) struct Shared<T: Transport> {
    pub transport: Arc<T>,
    pub session: Mutex<Session<T::Handle>>,
}

impl<T: Transport> Shared<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            session: Mutex::new(Session::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;

    #[test]
    fn fail_all_completes_every_waiter_with_connection_error() {
        let mut table = InFlightTable::default();
        let (tx_a, rx_a) = mpsc::sync_channel(1);
        let (tx_b, rx_b) = mpsc::sync_channel(1);
        table.insert(VarKind::Bool, InFlight::new(1, tx_a));
        table.insert(VarKind::LWord, InFlight::new(2, tx_b));

        table.fail_all("client disconnected");

        assert!(table.is_empty());
        for rx in [rx_a, rx_b] {
            let err = rx.recv().unwrap().unwrap_err();
            assert!(matches!(err, ClientError::Connection(ref m) if m == "client disconnected"));
        }
    }

    #[test]
    fn abandoned_requests_absorb_their_arrivals_in_order() {
        let mut table = InFlightTable::default();
        let (tx, _rx) = mpsc::sync_channel(1);
        table.insert(VarKind::DWord, InFlight::new(1, tx));
        table.abandon(VarKind::DWord);
        table.abandon(VarKind::DWord);

        assert_eq!(table.abandoned(VarKind::DWord), 1, "second abandon had no request");
        assert_eq!(table.abandoned(VarKind::Word), 0);
        assert!(table.discard_abandoned(VarKind::DWord));
        assert!(!table.discard_abandoned(VarKind::DWord));
    }

    #[test]
    fn fail_all_forgets_abandoned_requests() {
        let mut table = InFlightTable::default();
        let (tx, _rx) = mpsc::sync_channel(1);
        table.insert(VarKind::Byte, InFlight::new(4, tx));
        table.abandon(VarKind::Byte);
        table.fail_all("connection lost");
        assert!(!table.discard_abandoned(VarKind::Byte));
    }

    #[test]
    fn complete_after_waiter_left_is_silent() {
        let (tx, rx) = mpsc::sync_channel(1);
        drop(rx);
        InFlight::new(7, tx).complete(Ok(WireValue::Byte(1)));
    }

    #[test]
    fn live_handle_requires_connected_flag() {
        let mut session: Session<u8> = Session::default();
        assert!(session.live_handle().is_err());
        session.handle = Some(1);
        assert!(session.live_handle().is_err());
        session.connected = true;
        assert_eq!(*session.live_handle().unwrap(), 1);
        session.mark_lost("link down");
        assert!(session.live_handle().is_err());
        assert_eq!(session.handle, Some(1));
    }
}
