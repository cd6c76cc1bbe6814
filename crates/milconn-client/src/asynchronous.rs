//! Async facade over [`Client`] for tokio callers.
//!
//! Every operation runs on tokio's blocking pool, so an await never parks a
//! runtime worker on a native wait.

use std::sync::Arc;
use std::time::Duration;

use milconn_transport::Transport;
use milconn_value::{Address, Value, VarKind, WireValue};

use crate::client::Client;
use crate::error::{ClientError, Result};

/// Cloneable async handle to a shared [`Client`].
pub struct AsyncClient<T: Transport> {
    inner: Arc<Client<T>>,
}

impl<T: Transport> Clone for AsyncClient<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Transport> AsyncClient<T> {
    pub fn new(client: Client<T>) -> Self {
        Self {
            inner: Arc::new(client),
        }
    }

    /// The blocking client underneath.
    pub fn blocking(&self) -> &Arc<Client<T>> {
        &self.inner
    }

    async fn run<R, F>(&self, op: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&Client<T>) -> Result<R> + Send + 'static,
    {
        let client = self.inner.clone();
        tokio::task::spawn_blocking(move || op(&client))
            .await
            .map_err(|err| ClientError::Api(format!("blocking task failed: {err}")))?
    }

    pub async fn connect(&self, host: &str, port: u16, timeout: Duration) -> Result<()> {
        let host = host.to_string();
        self.run(move |client| client.connect(&host, port, timeout))
            .await
    }

    pub async fn disconnect(&self) -> Result<()> {
        self.run(|client| {
            client.disconnect();
            Ok(())
        })
        .await
    }

    pub fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    pub async fn get(&self, kind: VarKind, address: Address, timeout: Duration) -> Result<WireValue> {
        self.run(move |client| client.get(kind, address, timeout))
            .await
    }

    pub async fn set(&self, kind: VarKind, address: Address, value: Value) -> Result<()> {
        self.run(move |client| client.set(kind, address, value))
            .await
    }

    pub async fn write(&self, address: Address, value: WireValue) -> Result<()> {
        self.run(move |client| client.write(address, value)).await
    }
}
