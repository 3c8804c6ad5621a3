//! Device transport: one TCP exchange per issuance
//!
//! The issuance protocol has no length header and no terminator byte. The
//! client writes its frame, half-closes the write side, and accumulates
//! reply bytes until the device closes the connection. Connections are
//! never pooled or reused; each exchange owns a fresh, short-lived socket.

use crate::error::{DeviceError, DeviceResult};
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{info, instrument, warn};

/// Connection parameters for the card issuance device
///
/// Constructed once from configuration and passed in explicitly; there is
/// no ambient/global device state.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub host: String,
    pub port: u16,
    /// One timer over the whole exchange: connect + write + read
    pub timeout: Duration,
}

impl DeviceConfig {
    /// Create a config with the default 60 second exchange timeout
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: Duration::from_secs(60),
        }
    }

    /// Override the exchange timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Trait for a device exchange, one request/response per call
#[allow(async_fn_in_trait)]
pub trait DeviceLink {
    /// Send an encoded frame and return the accumulated reply bytes
    async fn exchange(&self, frame: &[u8]) -> DeviceResult<Vec<u8>>;

    /// Cheap reachability check, used to fail fast before a batch run
    async fn is_online(&self) -> bool;
}

/// TCP card issuance device
#[derive(Debug, Clone)]
pub struct NetworkDevice {
    config: DeviceConfig,
}

impl NetworkDevice {
    pub fn new(config: DeviceConfig) -> DeviceResult<Self> {
        if config.host.is_empty() {
            return Err(DeviceError::InvalidConfig("Empty device host".to_string()));
        }
        if config.port == 0 {
            return Err(DeviceError::InvalidConfig("Device port is 0".to_string()));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    fn connection_error(&self, e: impl std::fmt::Display) -> DeviceError {
        DeviceError::Connection(format!("{}:{}: {}", self.config.host, self.config.port, e))
    }

    async fn exchange_inner(&self, frame: &[u8]) -> DeviceResult<Vec<u8>> {
        let addr = (self.config.host.as_str(), self.config.port);

        let mut stream = TcpStream::connect(addr)
            .await
            .map_err(|e| self.connection_error(e))?;

        stream
            .write_all(frame)
            .await
            .map_err(|e| self.connection_error(e))?;
        stream.flush().await.map_err(|e| self.connection_error(e))?;
        // End-of-request is signaled by closing our write side; the device
        // replies and then closes its end, which is the only reply framing
        // the protocol has.
        stream.shutdown().await.map_err(|e| self.connection_error(e))?;

        let mut reply = Vec::new();
        // A mid-read reset is a socket failure like a refused connect
        stream
            .read_to_end(&mut reply)
            .await
            .map_err(|e| self.connection_error(e))?;
        Ok(reply)
    }
}

impl DeviceLink for NetworkDevice {
    /// Connect probe only; no frame is exchanged
    #[instrument(fields(host = %self.config.host, port = self.config.port))]
    async fn is_online(&self) -> bool {
        let check_timeout = Duration::from_millis(500);
        let addr = (self.config.host.as_str(), self.config.port);

        match tokio::time::timeout(check_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                warn!(error = %e, "Device offline");
                false
            }
            Err(_) => {
                warn!("Device probe timeout");
                false
            }
        }
    }

    #[instrument(skip(self, frame), fields(host = %self.config.host, port = self.config.port, frame_len = frame.len()))]
    async fn exchange(&self, frame: &[u8]) -> DeviceResult<Vec<u8>> {
        let started = Instant::now();

        let reply = match tokio::time::timeout(self.config.timeout, self.exchange_inner(frame)).await {
            Ok(result) => result?,
            Err(_) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                warn!(elapsed_ms, "Device exchange timed out");
                return Err(DeviceError::Timeout { elapsed_ms });
            }
        };

        if reply.is_empty() {
            warn!("Device closed connection with no reply");
            return Err(DeviceError::NoResponse);
        }

        info!(
            reply_len = reply.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Device exchange complete"
        );
        Ok(reply)
    }
}
