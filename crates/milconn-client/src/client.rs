//! Connection lifecycle.
//!
//! A [`Client`] owns at most one native handle and at most one pump thread at a
//! time. Connect and disconnect are serialized by the lifecycle lock, which
//! also owns the running pump.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use milconn_transport::{validate_host, Transport};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::pump::PumpHandle;
use crate::session::{LinkEvent, Shared};

/// Client for one controller.
///
/// All methods take `&self`; share a client across threads with `Arc`.
/// Dropping the client disconnects it.
pub struct Client<T: Transport> {
    pub(crate) shared: Arc<Shared<T>>,
    pub(crate) config: ClientConfig,
    lifecycle: Mutex<Option<PumpHandle>>,
    pub(crate) gates: [Mutex<()>; 5],
}

impl<T: Transport> Client<T> {
    /// Client over `transport` with default timing.
    pub fn new(transport: Arc<T>) -> Self {
        Self::with_config(transport, ClientConfig::default())
    }

    pub fn with_config(transport: Arc<T>, config: ClientConfig) -> Self {
        Self {
            shared: Arc::new(Shared::new(transport)),
            config,
            lifecycle: Mutex::new(None),
            gates: std::array::from_fn(|_| Mutex::new(())),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.shared.transport
    }

    /// Host and port of the current or last session.
    pub fn endpoint(&self) -> Option<(String, u16)> {
        self.shared.session.lock().endpoint.clone()
    }

    /// Connect with the configured default timeout.
    pub fn connect_default(&self, host: &str, port: u16) -> Result<()> {
        self.connect(host, port, self.config.connect_timeout)
    }

    /// Connect to `host:port`, waiting at most `timeout` for the link.
    ///
    /// A no-op when already connected. Concurrent callers are serialized, so
    /// only one native handle and one pump ever exist. On failure every
    /// resource acquired by the attempt is released before returning.
    pub fn connect(&self, host: &str, port: u16, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        validate_host(host)?;
        let mut pump_slot = self.lifecycle.lock();

        if self.shared.session.lock().connected {
            warn!(host, port, "already connected");
            return Ok(());
        }
        if pump_slot.is_some() || self.shared.session.lock().handle.is_some() {
            debug!("releasing stale session before reconnecting");
            self.shutdown_session(pump_slot.take(), "session replaced");
        }

        let transport = &self.shared.transport;
        let handle = transport.create_client()?;
        if !transport.connect_to_server(&handle, host, port) {
            release_handle(transport.as_ref(), handle);
            return Err(ClientError::Connection(format!(
                "connection attempt to {host}:{port} was rejected"
            )));
        }

        let (link_tx, link_rx) = mpsc::sync_channel(1);
        {
            let mut session = self.shared.session.lock();
            session.handle = Some(handle);
            session.link_waiter = Some(link_tx);
            session.endpoint = Some((host.to_string(), port));
        }
        info!(host, port, ?timeout, "connecting");

        let pump = match PumpHandle::spawn(self.shared.clone(), self.config.pump_interval) {
            Ok(pump) => pump,
            Err(err) => {
                self.shutdown_session(None, "connect failed");
                return Err(err);
            }
        };

        let remaining = deadline.saturating_duration_since(Instant::now());
        let failure = match link_rx.recv_timeout(remaining) {
            Ok(LinkEvent::Up) => {
                self.shared.session.lock().connected = true;
                *pump_slot = Some(pump);
                info!(host, port, "connected");
                return Ok(());
            }
            Ok(LinkEvent::Aborted) | Err(RecvTimeoutError::Disconnected) => {
                format!("connection attempt to {host}:{port} was aborted")
            }
            Err(RecvTimeoutError::Timeout) => {
                format!("connection to {host}:{port} timed out after {timeout:?}")
            }
        };
        warn!(host, port, reason = %failure, "connect failed");
        self.shutdown_session(Some(pump), "connect failed");
        Err(ClientError::Connection(failure))
    }

    /// Tear down the session. Idempotent and infallible.
    ///
    /// Aborts a connect in progress, fails outstanding gets with a connection
    /// error, stops the pump and releases the native handle.
    pub fn disconnect(&self) {
        if let Some(waiter) = self.shared.session.lock().link_waiter.take() {
            let _ = waiter.try_send(LinkEvent::Aborted);
        }

        let mut pump_slot = self.lifecycle.lock();
        let pump = pump_slot.take();
        if pump.is_none() && self.shared.session.lock().handle.is_none() {
            debug!("disconnect: no session");
            return;
        }
        info!("disconnecting");
        self.shutdown_session(pump, "client disconnected");
        info!("disconnected");
    }

    /// Whether the session is up.
    ///
    /// Re-checks the transport's own liveness when the local state says
    /// connected, and downgrades the local state if the link is gone.
    pub fn is_connected(&self) -> bool {
        let mut guard = self.shared.session.lock();
        let session = &mut *guard;
        let Ok(handle) = session.live_handle() else {
            return false;
        };
        if self.shared.transport.is_connected(handle) {
            return true;
        }
        session.mark_lost("connection lost");
        false
    }

    fn shutdown_session(&self, pump: Option<PumpHandle>, reason: &str) {
        {
            let mut session = self.shared.session.lock();
            session.connected = false;
            session.link_waiter = None;
            session.in_flight.fail_all(reason);
        }
        if let Some(pump) = pump {
            pump.stop(self.config.shutdown_grace);
        }
        let handle = self.shared.session.lock().handle.take();
        if let Some(handle) = handle {
            release_handle(self.shared.transport.as_ref(), handle);
        }
    }
}

impl<T: Transport> Drop for Client<T> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Best-effort native teardown. Panics from the transport are logged and
/// swallowed.
fn release_handle<T: Transport>(transport: &T, handle: T::Handle) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        if transport.is_connected(&handle) {
            transport.disconnect_from_server(&handle);
        }
        transport.destroy_client(handle);
    }));
    if outcome.is_err() {
        warn!("native teardown panicked; handle abandoned");
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use milconn_transport::{SimConfig, SimTransport};

    use super::*;
    use crate::error::ErrorClass;
    use crate::test_support::{fast_config, sim_client};

    #[test]
    fn connect_and_disconnect_release_everything() {
        let (sim, client) = sim_client(SimConfig::default());
        client.connect("127.0.0.1", 60000, Duration::from_secs(2)).unwrap();
        assert!(client.is_connected());
        assert_eq!(sim.live_handles(), 1);
        assert_eq!(client.endpoint(), Some(("127.0.0.1".to_string(), 60000)));

        client.disconnect();
        assert!(!client.is_connected());
        assert_eq!(sim.live_handles(), 0);
        let stats = sim.stats();
        assert_eq!(stats.creates, 1);
        assert_eq!(stats.destroys, 1);
        assert_eq!(stats.disconnects, 1);
    }

    #[test]
    fn connect_when_connected_is_noop() {
        let (sim, client) = sim_client(SimConfig::default());
        client.connect("plc", 60000, Duration::from_secs(2)).unwrap();
        client.connect("plc", 60000, Duration::from_secs(2)).unwrap();
        assert_eq!(sim.stats().creates, 1);
        assert_eq!(sim.live_handles(), 1);
    }

    #[test]
    fn connect_timeout_releases_handle_and_stops_pump() {
        let (sim, client) = sim_client(SimConfig {
            connect_latency: None,
            ..SimConfig::default()
        });
        let timeout = Duration::from_millis(100);
        let started = Instant::now();

        let err = client.connect("10.0.0.1", 60000, timeout).unwrap_err();

        let elapsed = started.elapsed();
        assert_eq!(err.class(), ErrorClass::Connection);
        assert!(elapsed >= timeout, "returned early: {elapsed:?}");
        assert!(elapsed < timeout + Duration::from_millis(500), "{elapsed:?}");
        assert!(!client.is_connected());
        assert_eq!(sim.live_handles(), 0);
        assert_eq!(sim.stats().disconnects, 0, "link never came up");

        let cycles = sim.stats().cycles;
        thread::sleep(Duration::from_millis(50));
        assert_eq!(sim.stats().cycles, cycles, "pump still running");
    }

    #[test]
    fn connect_timeout_counts_time_spent_in_connect_call() {
        let (sim, client) = sim_client(SimConfig {
            connect_latency: None,
            connect_call_delay: Duration::from_millis(80),
            ..SimConfig::default()
        });
        let timeout = Duration::from_millis(100);
        let started = Instant::now();

        let err = client.connect("10.0.0.1", 60000, timeout).unwrap_err();

        let elapsed = started.elapsed();
        assert_eq!(err.class(), ErrorClass::Connection);
        assert!(elapsed >= timeout, "returned early: {elapsed:?}");
        assert!(elapsed < Duration::from_millis(170), "waited past the deadline: {elapsed:?}");
        assert_eq!(sim.live_handles(), 0);
    }

    #[test]
    fn create_failure_surfaces_without_leaking() {
        let (sim, client) = sim_client(SimConfig {
            fail_create: true,
            ..SimConfig::default()
        });
        let err = client.connect("plc", 1, Duration::from_secs(1)).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Api);
        assert_eq!(sim.live_handles(), 0);
    }

    #[test]
    fn invalid_host_is_rejected_before_native_calls() {
        let (sim, client) = sim_client(SimConfig::default());
        let err = client.connect("", 60000, Duration::from_secs(1)).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Validation);
        assert_eq!(sim.stats().creates, 0);
    }

    #[test]
    fn disconnect_twice_is_safe() {
        let (sim, client) = sim_client(SimConfig::default());
        client.disconnect();
        client.connect("plc", 60000, Duration::from_secs(2)).unwrap();
        client.disconnect();
        client.disconnect();
        assert_eq!(sim.stats().destroys, 1);
    }

    #[test]
    fn concurrent_connects_create_one_session() {
        let (sim, client) = sim_client(SimConfig::default());
        let client = Arc::new(client);
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let client = client.clone();
                thread::spawn(move || client.connect("plc", 60000, Duration::from_secs(2)))
            })
            .collect();
        for worker in workers {
            worker.join().unwrap().unwrap();
        }
        assert_eq!(sim.stats().creates, 1);
        assert_eq!(sim.live_handles(), 1);
    }

    #[test]
    fn disconnect_aborts_pending_connect() {
        let (sim, client) = sim_client(SimConfig {
            connect_latency: None,
            ..SimConfig::default()
        });
        let client = Arc::new(client);
        let connecting = {
            let client = client.clone();
            thread::spawn(move || {
                let started = Instant::now();
                let result = client.connect("plc", 60000, Duration::from_secs(10));
                (result, started.elapsed())
            })
        };
        thread::sleep(Duration::from_millis(50));
        client.disconnect();

        let (result, elapsed) = connecting.join().unwrap();
        assert!(matches!(result, Err(ClientError::Connection(ref m)) if m.contains("aborted")));
        assert!(elapsed < Duration::from_secs(2), "{elapsed:?}");
        assert_eq!(sim.live_handles(), 0);
    }

    #[test]
    fn link_loss_downgrades_and_reconnect_recreates() {
        let (sim, client) = sim_client(SimConfig::default());
        client.connect("plc", 60000, Duration::from_secs(2)).unwrap();

        sim.drop_link();
        assert!(!client.is_connected());

        client.connect("plc", 60000, Duration::from_secs(2)).unwrap();
        assert!(client.is_connected());
        assert_eq!(sim.stats().creates, 2);
        assert_eq!(sim.live_handles(), 1);
    }

    #[test]
    fn pump_notices_link_loss_on_its_own() {
        let (sim, client) = sim_client(SimConfig::default());
        client.connect("plc", 60000, Duration::from_secs(2)).unwrap();
        sim.drop_link();
        thread::sleep(Duration::from_millis(100));
        assert!(!client.shared.session.lock().connected);
    }

    #[test]
    fn drop_releases_session() {
        let sim = Arc::new(SimTransport::new());
        {
            let client = Client::with_config(sim.clone(), fast_config());
            client.connect("plc", 60000, Duration::from_secs(2)).unwrap();
            assert_eq!(sim.live_handles(), 1);
        }
        assert_eq!(sim.live_handles(), 0);
    }
}
