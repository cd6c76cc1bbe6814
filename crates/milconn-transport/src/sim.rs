//! In-process simulated controller.
//!
//! Behaves like the native engine from the client's point of view: connect
//! attempts complete after a latency, requested values land in a per-session
//! cache and raise the kind's arrival marker after a response latency, and
//! nothing progresses unless `process_messages` is driven. Used by the test
//! suites and by the CLI's `--sim` mode.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use milconn_value::{Address, VarKind, WireValue};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::{validate_host, Transport};

/// Timing and failure knobs for the simulated controller.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Time from `connect_to_server` until the link reports up.
    /// `None` means the link never comes up.
    pub connect_latency: Option<Duration>,
    /// How long the `connect_to_server` call itself blocks.
    pub connect_call_delay: Duration,
    /// Time from `request_value` until the response is cached.
    /// `None` means requests are never answered.
    pub response_latency: Option<Duration>,
    /// Reject every `set_value` call.
    pub reject_sets: bool,
    /// Refuse to allocate client instances.
    pub fail_create: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            connect_latency: Some(Duration::from_millis(20)),
            connect_call_delay: Duration::ZERO,
            response_latency: Some(Duration::from_millis(5)),
            reject_sets: false,
            fail_create: false,
        }
    }
}

/// Session handle issued by [`SimTransport`].
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct SimHandle(u64);

/// Native call counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimStats {
    pub creates: u64,
    pub destroys: u64,
    pub connects: u64,
    pub disconnects: u64,
    pub cycles: u64,
    pub requests: u64,
    pub gets: u64,
    pub sets: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    Idle,
    Connecting { ready_at: Option<Instant> },
    Up,
    Down,
}

struct PendingResponse {
    kind: VarKind,
    address: Address,
    due: Instant,
}

struct Session {
    link: Link,
    cache: HashMap<(VarKind, Address), WireValue>,
    pending: VecDeque<PendingResponse>,
}

impl Session {
    fn new() -> Self {
        Self {
            link: Link::Idle,
            cache: HashMap::new(),
            pending: VecDeque::new(),
        }
    }
}

#[derive(Default)]
struct Counters {
    creates: AtomicU64,
    destroys: AtomicU64,
    connects: AtomicU64,
    disconnects: AtomicU64,
    cycles: AtomicU64,
    requests: AtomicU64,
    gets: AtomicU64,
    sets: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Simulated controller implementing [`Transport`].
pub struct SimTransport {
    config: Mutex<SimConfig>,
    sessions: Mutex<HashMap<u64, Session>>,
    memory: Mutex<HashMap<(VarKind, Address), WireValue>>,
    arrived: [AtomicBool; 5],
    next_handle: AtomicU64,
    counters: Counters,
}

impl SimTransport {
    /// Simulated controller with default timing.
    pub fn new() -> Self {
        Self::with_config(SimConfig::default())
    }

    /// Simulated controller with explicit timing and failure knobs.
    pub fn with_config(config: SimConfig) -> Self {
        Self {
            config: Mutex::new(config),
            sessions: Mutex::new(HashMap::new()),
            memory: Mutex::new(HashMap::new()),
            arrived: Default::default(),
            next_handle: AtomicU64::new(1),
            counters: Counters::default(),
        }
    }

    /// Seed controller memory.
    pub fn preset(&self, address: Address, value: WireValue) {
        self.memory.lock().insert((value.kind(), address), value);
    }

    /// Builder form of [`SimTransport::preset`].
    pub fn with_preset(self, address: Address, value: WireValue) -> Self {
        self.preset(address, value);
        self
    }

    /// Current controller memory at `(kind, address)`.
    pub fn memory(&self, kind: VarKind, address: Address) -> Option<WireValue> {
        self.memory.lock().get(&(kind, address)).copied()
    }

    /// Replace the timing and failure knobs. Affects later calls only.
    pub fn reconfigure(&self, f: impl FnOnce(&mut SimConfig)) {
        f(&mut self.config.lock());
    }

    /// Drop every live link, as if the controller went away.
    pub fn drop_link(&self) {
        let mut sessions = self.sessions.lock();
        for session in sessions.values_mut() {
            if matches!(session.link, Link::Up | Link::Connecting { .. }) {
                session.link = Link::Down;
                session.pending.clear();
            }
        }
        info!("sim: link dropped");
    }

    /// Raise an arrival marker without a matching request.
    pub fn inject_arrival(&self, kind: VarKind) {
        self.arrived[kind.index()].store(true, Ordering::SeqCst);
    }

    /// Number of client instances not yet destroyed.
    pub fn live_handles(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Snapshot of native call counters.
    pub fn stats(&self) -> SimStats {
        let c = &self.counters;
        SimStats {
            creates: c.creates.load(Ordering::Relaxed),
            destroys: c.destroys.load(Ordering::Relaxed),
            connects: c.connects.load(Ordering::Relaxed),
            disconnects: c.disconnects.load(Ordering::Relaxed),
            cycles: c.cycles.load(Ordering::Relaxed),
            requests: c.requests.load(Ordering::Relaxed),
            gets: c.gets.load(Ordering::Relaxed),
            sets: c.sets.load(Ordering::Relaxed),
        }
    }

    fn with_session<T>(&self, handle: &SimHandle, f: impl FnOnce(&mut Session) -> T) -> Option<T> {
        self.sessions.lock().get_mut(&handle.0).map(f)
    }
}

impl Default for SimTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for SimTransport {
    type Handle = SimHandle;

    fn create_client(&self) -> Result<SimHandle> {
        bump(&self.counters.creates);
        if self.config.lock().fail_create {
            return Err(TransportError::CreateFailed);
        }
        let id = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.sessions.lock().insert(id, Session::new());
        debug!(handle = id, "sim: client created");
        Ok(SimHandle(id))
    }

    fn destroy_client(&self, handle: SimHandle) {
        bump(&self.counters.destroys);
        self.sessions.lock().remove(&handle.0);
        debug!(handle = handle.0, "sim: client destroyed");
    }

    fn connect_to_server(&self, handle: &SimHandle, host: &str, port: u16) -> bool {
        bump(&self.counters.connects);
        if validate_host(host).is_err() {
            return false;
        }
        let call_delay = self.config.lock().connect_call_delay;
        if !call_delay.is_zero() {
            std::thread::sleep(call_delay);
        }
        let ready_at = self
            .config
            .lock()
            .connect_latency
            .map(|latency| Instant::now() + latency);
        debug!(host, port, "sim: connect attempt");
        self.with_session(handle, |session| {
            session.link = Link::Connecting { ready_at };
        })
        .is_some()
    }

    fn disconnect_from_server(&self, handle: &SimHandle) {
        bump(&self.counters.disconnects);
        self.with_session(handle, |session| {
            session.link = Link::Idle;
            session.pending.clear();
        });
    }

    fn is_connected(&self, handle: &SimHandle) -> bool {
        self.with_session(handle, |session| session.link == Link::Up)
            .unwrap_or(false)
    }

    fn process_messages(&self, handle: &SimHandle) {
        bump(&self.counters.cycles);
        let now = Instant::now();
        let mut sessions = self.sessions.lock();
        let Some(session) = sessions.get_mut(&handle.0) else {
            return;
        };

        if let Link::Connecting {
            ready_at: Some(ready_at),
        } = session.link
        {
            if now >= ready_at {
                session.link = Link::Up;
                debug!(handle = handle.0, "sim: link up");
            }
        }

        if session.link != Link::Up {
            return;
        }

        // One marker per kind, so at most one response per kind per cycle.
        let memory = self.memory.lock();
        let mut delivered = [false; 5];
        while let Some(next) = session.pending.front() {
            if next.due > now || delivered[next.kind.index()] {
                break;
            }
            delivered[next.kind.index()] = true;
            let Some(response) = session.pending.pop_front() else {
                break;
            };
            let value = memory
                .get(&(response.kind, response.address))
                .copied()
                .unwrap_or(WireValue::zero(response.kind));
            session
                .cache
                .insert((response.kind, response.address), value);
            self.arrived[response.kind.index()].store(true, Ordering::SeqCst);
        }
    }

    fn request_value(&self, handle: &SimHandle, address: Address, kind: VarKind) {
        bump(&self.counters.requests);
        let latency = self.config.lock().response_latency;
        self.with_session(handle, |session| {
            if session.link != Link::Up {
                return;
            }
            if let Some(latency) = latency {
                session.pending.push_back(PendingResponse {
                    kind,
                    address,
                    due: Instant::now() + latency,
                });
            }
        });
    }

    fn get_value(&self, handle: &SimHandle, address: Address, kind: VarKind) -> Option<WireValue> {
        bump(&self.counters.gets);
        self.with_session(handle, |session| session.cache.get(&(kind, address)).copied())
            .flatten()
    }

    fn set_value(&self, handle: &SimHandle, address: Address, value: WireValue) -> bool {
        bump(&self.counters.sets);
        if self.config.lock().reject_sets {
            return false;
        }
        let up = self
            .with_session(handle, |session| session.link == Link::Up)
            .unwrap_or(false);
        if up {
            self.memory.lock().insert((value.kind(), address), value);
        }
        up
    }

    fn arrived(&self, kind: VarKind) -> bool {
        self.arrived[kind.index()].load(Ordering::SeqCst)
    }

    fn clear_arrived(&self, kind: VarKind) {
        self.arrived[kind.index()].store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn instant_sim() -> SimTransport {
        SimTransport::with_config(SimConfig {
            connect_latency: Some(Duration::ZERO),
            response_latency: Some(Duration::ZERO),
            ..SimConfig::default()
        })
    }

    fn connected(sim: &SimTransport) -> SimHandle {
        let handle = sim.create_client().unwrap();
        assert!(sim.connect_to_server(&handle, "127.0.0.1", 60000));
        sim.process_messages(&handle);
        assert!(sim.is_connected(&handle));
        handle
    }

    #[test]
    fn link_requires_processing_cycles() {
        let sim = SimTransport::with_config(SimConfig {
            connect_latency: Some(Duration::from_millis(10)),
            ..SimConfig::default()
        });
        let handle = sim.create_client().unwrap();
        assert!(sim.connect_to_server(&handle, "plc", 1));
        assert!(!sim.is_connected(&handle));

        thread::sleep(Duration::from_millis(15));
        assert!(!sim.is_connected(&handle), "no cycle has run yet");
        sim.process_messages(&handle);
        assert!(sim.is_connected(&handle));
    }

    #[test]
    fn request_caches_value_and_raises_marker() {
        let sim = instant_sim().with_preset(150, WireValue::DWord(0x42F6_E979));
        let handle = connected(&sim);

        sim.request_value(&handle, 150, VarKind::DWord);
        assert!(!sim.arrived(VarKind::DWord));
        sim.process_messages(&handle);

        assert!(sim.arrived(VarKind::DWord));
        assert!(!sim.arrived(VarKind::Word));
        assert_eq!(
            sim.get_value(&handle, 150, VarKind::DWord),
            Some(WireValue::DWord(0x42F6_E979))
        );
        sim.clear_arrived(VarKind::DWord);
        assert!(!sim.arrived(VarKind::DWord));
    }

    #[test]
    fn same_kind_responses_land_one_per_cycle() {
        let sim = instant_sim()
            .with_preset(1, WireValue::Word(10))
            .with_preset(2, WireValue::Word(20));
        let handle = connected(&sim);

        sim.request_value(&handle, 1, VarKind::Word);
        sim.request_value(&handle, 2, VarKind::Word);
        sim.process_messages(&handle);
        assert_eq!(sim.get_value(&handle, 1, VarKind::Word), Some(WireValue::Word(10)));
        assert_eq!(sim.get_value(&handle, 2, VarKind::Word), None);

        sim.clear_arrived(VarKind::Word);
        sim.process_messages(&handle);
        assert!(sim.arrived(VarKind::Word));
        assert_eq!(sim.get_value(&handle, 2, VarKind::Word), Some(WireValue::Word(20)));
    }

    #[test]
    fn unknown_address_reads_zero() {
        let sim = instant_sim();
        let handle = connected(&sim);
        sim.request_value(&handle, 9, VarKind::Word);
        sim.process_messages(&handle);
        assert_eq!(
            sim.get_value(&handle, 9, VarKind::Word),
            Some(WireValue::Word(0))
        );
    }

    #[test]
    fn sets_write_memory_only_when_up() {
        let sim = instant_sim();
        let handle = sim.create_client().unwrap();
        assert!(!sim.set_value(&handle, 1, WireValue::Bool(true)));
        assert_eq!(sim.memory(VarKind::Bool, 1), None);

        assert!(sim.connect_to_server(&handle, "plc", 1));
        sim.process_messages(&handle);
        assert!(sim.set_value(&handle, 1, WireValue::Bool(true)));
        assert_eq!(sim.memory(VarKind::Bool, 1), Some(WireValue::Bool(true)));

        sim.reconfigure(|cfg| cfg.reject_sets = true);
        assert!(!sim.set_value(&handle, 1, WireValue::Bool(false)));
    }

    #[test]
    fn drop_link_reports_disconnected() {
        let sim = instant_sim();
        let handle = connected(&sim);
        sim.drop_link();
        assert!(!sim.is_connected(&handle));
        sim.process_messages(&handle);
        assert!(!sim.is_connected(&handle));
    }

    #[test]
    fn never_connecting_link_stays_down() {
        let sim = SimTransport::with_config(SimConfig {
            connect_latency: None,
            ..SimConfig::default()
        });
        let handle = sim.create_client().unwrap();
        assert!(sim.connect_to_server(&handle, "plc", 1));
        sim.process_messages(&handle);
        assert!(!sim.is_connected(&handle));
    }

    #[test]
    fn counts_calls_and_live_handles() {
        let sim = instant_sim();
        let handle = connected(&sim);
        assert_eq!(sim.live_handles(), 1);
        sim.destroy_client(handle);
        assert_eq!(sim.live_handles(), 0);

        let stats = sim.stats();
        assert_eq!(stats.creates, 1);
        assert_eq!(stats.destroys, 1);
        assert_eq!(stats.connects, 1);
        assert_eq!(stats.sets, 0);
    }

    #[test]
    fn fail_create_is_reported() {
        let sim = SimTransport::with_config(SimConfig {
            fail_create: true,
            ..SimConfig::default()
        });
        assert!(matches!(
            sim.create_client(),
            Err(TransportError::CreateFailed)
        ));
    }
}
