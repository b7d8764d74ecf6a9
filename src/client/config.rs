//! Channel configuration.

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::core::{ConfigError, DEFAULT_ADDRESS, DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_MIN_DELAY, MAX_DELAY_FACTOR};
use crate::transport::{SecureTransport, TransportOptions};

/// Signaling channel configuration.
///
/// Deserializable so embedding applications can load it from their own
/// config files:
///
/// ```toml
/// address = "wss://signal.example.com"
/// min_delay_ms = 500
/// max_delay_ms = 5000
/// secure_transport = "tls12_only"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChannelConfig {
    /// Signaling server URL (`ws://` or `wss://`).
    pub address: String,

    /// First retry delay in milliseconds.
    pub min_delay_ms: u64,

    /// Retry delay ceiling in milliseconds (`10 × min_delay_ms` if unset).
    pub max_delay_ms: Option<u64>,

    /// TLS protocol selection.
    pub secure_transport: SecureTransport,

    /// Largest inbound message accepted, in bytes.
    pub max_message_size: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_owned(),
            min_delay_ms: millis(DEFAULT_MIN_DELAY),
            max_delay_ms: None,
            secure_transport: SecureTransport::Default,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl ChannelConfig {
    /// First retry delay.
    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    /// Retry delay ceiling.
    pub fn max_delay(&self) -> Duration {
        match self.max_delay_ms {
            Some(ms) => Duration::from_millis(ms),
            None => self.min_delay().saturating_mul(MAX_DELAY_FACTOR),
        }
    }

    /// Transport options derived from this config.
    pub fn transport_options(&self) -> TransportOptions {
        TransportOptions::default()
            .secure_transport(self.secure_transport)
            .max_message_size(self.max_message_size)
    }

    /// Check the address scheme and delay bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.address).map_err(|e| ConfigError::InvalidAddress {
            address: self.address.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(ConfigError::InvalidAddress {
                address: self.address.clone(),
                reason: format!("unsupported scheme {:?}", url.scheme()),
            });
        }

        if self.min_delay_ms == 0 {
            return Err(ConfigError::ZeroMinDelay);
        }
        if let Some(max_ms) = self.max_delay_ms {
            if max_ms < self.min_delay_ms {
                return Err(ConfigError::DelayBounds {
                    min_ms: self.min_delay_ms,
                    max_ms,
                });
            }
        }
        Ok(())
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

/// Builder for [`ChannelConfig`].
#[derive(Debug, Default)]
pub struct ChannelConfigBuilder {
    config: ChannelConfig,
}

impl ChannelConfigBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the signaling server URL.
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.config.address = address.into();
        self
    }

    /// Set the first retry delay.
    pub fn min_delay(mut self, delay: Duration) -> Self {
        self.config.min_delay_ms = millis(delay);
        self
    }

    /// Set the retry delay ceiling.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.config.max_delay_ms = Some(millis(delay));
        self
    }

    /// Set the TLS protocol selection.
    pub fn secure_transport(mut self, mode: SecureTransport) -> Self {
        self.config.secure_transport = mode;
        self
    }

    /// Set the inbound message size limit.
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.config.max_message_size = size;
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<ChannelConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
