//! Client runtime for Milteksan controllers.
//!
//! A [`Client`] owns one session with a controller: a native handle, a pump
//! thread that drives the protocol engine, and a correlator that matches
//! responses to the gets waiting for them. The engine itself sits behind the
//! [`Transport`](milconn_transport::Transport) trait.

#[cfg(feature = "async")]
pub mod asynchronous;
pub mod config;
pub mod error;

mod accessors;
mod client;
mod correlator;
mod pump;
mod session;

#[cfg(feature = "async")]
pub use asynchronous::AsyncClient;
pub use client::Client;
pub use config::{ClientConfig, ConfigError};
pub use error::{ClientError, ErrorClass, Result};

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::time::Duration;

    use milconn_transport::{SimConfig, SimTransport};

    use crate::{Client, ClientConfig};

    pub fn fast_config() -> ClientConfig {
        ClientConfig {
            pump_interval: Duration::from_millis(2),
            ..ClientConfig::default()
        }
    }

    pub fn sim_client(config: SimConfig) -> (Arc<SimTransport>, Client<SimTransport>) {
        let sim = Arc::new(SimTransport::with_config(config));
        let client = Client::with_config(sim.clone(), fast_config());
        (sim, client)
    }

    pub fn connected_sim_client(config: SimConfig) -> (Arc<SimTransport>, Client<SimTransport>) {
        let (sim, client) = sim_client(config);
        client
            .connect("127.0.0.1", 60000, Duration::from_secs(2))
            .expect("sim connect");
        (sim, client)
    }
}
