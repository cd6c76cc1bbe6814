//! Background thread that drives the native engine.
//!
//! The engine only makes progress inside `process_messages`. The pump calls it
//! on a fixed interval for as long as a session exists, reports link-up to a
//! pending connect, notices link loss, and routes each arrival to the request
//! waiting for that kind.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use milconn_transport::Transport;
use milconn_value::VarKind;
use tracing::{debug, trace, warn};

use crate::error::{ClientError, Result};
use crate::session::{LinkEvent, Shared};

/// Owner side of a running pump thread.
pub(crate) struct PumpHandle {
    stop: Sender<()>,
    // Disconnects when the thread exits, including by panic.
    exited: Receiver<()>,
    thread: JoinHandle<()>,
}

impl PumpHandle {
    pub fn spawn<T: Transport>(shared: Arc<Shared<T>>, interval: Duration) -> Result<Self> {
        let (stop, stop_rx) = mpsc::channel();
        let (exit_tx, exited) = mpsc::channel::<()>();
        let thread = thread::Builder::new()
            .name("milconn-pump".to_string())
            .spawn(move || {
                let _exit = exit_tx;
                run(&shared, &stop_rx, interval);
            })
            .map_err(|err| ClientError::Api(format!("failed to spawn pump thread: {err}")))?;
        debug!(?interval, "pump started");
        Ok(Self {
            stop,
            exited,
            thread,
        })
    }

    /// Signal the thread and wait up to `grace` for it to finish. A pump
    /// stuck past the grace period is detached.
    pub fn stop(self, grace: Duration) {
        let _ = self.stop.send(());
        match self.exited.recv_timeout(grace) {
            Err(RecvTimeoutError::Timeout) => {
                warn!(?grace, "pump did not stop in time; detaching");
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if self.thread.join().is_err() {
                    warn!("pump thread panicked");
                }
                debug!("pump stopped");
            }
        }
    }
}

fn run<T: Transport>(shared: &Shared<T>, stop: &Receiver<()>, interval: Duration) {
    loop {
        cycle(shared);
        match stop.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// One processing cycle.
pub(crate) fn cycle<T: Transport>(shared: &Shared<T>) {
    let transport = &*shared.transport;
    let mut guard = shared.session.lock();
    let session = &mut *guard;
    let Some(handle) = session.handle.as_ref() else {
        return;
    };

    transport.process_messages(handle);
    let live = transport.is_connected(handle);

    if live {
        if let Some(waiter) = session.link_waiter.take() {
            let _ = waiter.try_send(LinkEvent::Up);
        }
    } else if session.connected {
        session.mark_lost("connection lost");
        return;
    }

    for kind in VarKind::ALL {
        if !transport.arrived(kind) {
            continue;
        }
        transport.clear_arrived(kind);
        if session.in_flight.discard_abandoned(kind) {
            trace!(%kind, "discarded response to an abandoned request");
            continue;
        }
        let Some(request) = session.in_flight.take(kind) else {
            trace!(%kind, "discarded arrival with no waiting request");
            continue;
        };
        match transport.get_value(handle, request.address, kind) {
            Some(value) => {
                trace!(%kind, address = request.address, "response routed");
                request.complete(Ok(value));
            }
            None => {
                debug!(%kind, address = request.address, "arrival without a cached value; still waiting");
                session.in_flight.insert(kind, request);
            }
        }
    }
}
