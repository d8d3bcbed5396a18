//! Configuration types for the link

use crate::crc::{register, GeneratorPoly};
use crate::error::{LinkError, Result};
use std::time::Duration;

/// Link configuration builder
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Generator polynomial for frame checksums, as a bit string
    pub generator: String,
    /// How long to wait for an ACK/NACK before retransmitting
    pub ack_timeout: Duration,
    /// Pause between attempts after a NACK or a timeout
    pub retry_delay: Duration,
    /// Total transmissions per send before giving up
    pub max_retries: u32,
    /// Timeout for opening an outbound transport connection
    pub connect_timeout: Duration,
    /// Flip one payload bit after framing, to exercise the NACK path
    pub inject_bit_error: bool,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            generator: "1011".to_string(),
            ack_timeout: Duration::from_secs(2),
            retry_delay: Duration::from_millis(200),
            max_retries: 3,
            connect_timeout: Duration::from_secs(2),
            inject_bit_error: false,
        }
    }
}

impl LinkConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the generator polynomial bit string
    pub fn generator(mut self, bits: impl Into<String>) -> Self {
        self.generator = bits.into();
        self
    }

    /// Set the ACK wait timeout
    pub fn ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }

    /// Set the pause between retransmission attempts
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set the number of transmissions before giving up
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the outbound connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Enable or disable outbound bit-error injection
    pub fn inject_bit_error(mut self, enabled: bool) -> Self {
        self.inject_bit_error = enabled;
        self
    }

    /// Parse and validate the configured generator polynomial
    pub fn parsed_generator(&self) -> Result<GeneratorPoly> {
        let poly = GeneratorPoly::parse(&self.generator)?;
        if poly.width() < 1 || poly.width() > register::MAX_WIDTH {
            return Err(LinkError::config(format!(
                "frame checksums need a 1-8 bit generator, got {} bits",
                poly.width()
            )));
        }
        Ok(poly)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.parsed_generator()?;

        if self.max_retries == 0 {
            return Err(LinkError::config("max retries must be greater than 0"));
        }

        if self.ack_timeout.is_zero() {
            return Err(LinkError::config("ack timeout must be greater than 0"));
        }

        Ok(())
    }
}

/// Preset configurations for common use cases
impl LinkConfig {
    /// Short timeouts for unit and integration tests
    pub fn testing() -> Self {
        Self::default()
            .ack_timeout(Duration::from_millis(50))
            .retry_delay(Duration::from_millis(5))
            .connect_timeout(Duration::from_millis(250))
    }

    /// Deliberately corrupt outbound DATA frames to demonstrate
    /// NACK-driven retransmission
    pub fn fault_injection() -> Self {
        Self::default().inject_bit_error(true)
    }
}
