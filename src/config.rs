//! Receive settings shared by every capture source, and the default block size.

use crate::error::{Error, Result};

/// Size of one capture block, in bytes. Each sample is 2 bytes; this holds 1024 samples.
pub const BUFF_SIZE: usize = 2_048;

/// Bytes per sample. Samples are 16-bit signed, little endian.
pub const BYTES_PER_SAMPLE: usize = 2;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Reasons a configuration is rejected.
pub enum ConfigError {
    /// Sample rate must be non-zero.
    ZeroSampleRate,
    /// A blocking read needs a non-zero time budget.
    ZeroTimeout,
    /// The capture buffer must hold at least one sample.
    BufferTooSmall,
    /// The read timeout is shorter than the time it takes to fill one block.
    TimeoutTooShort,
    /// The peripheral's clock can't be divided down to the requested bit clock.
    ClockDivider,
    /// The filter oversampling ratio is outside the range the filter order supports.
    OversamplingRatio,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Configuration for a PDM receive channel, and for the polling task that drains it.
/// Data width is fixed at 16 bits, mono.
pub struct PdmRxConfig {
    /// Output (PCM) sample rate, in Hz.
    pub sample_rate_hz: u32,
    /// Strobe data on the falling clock edge instead of the rising one. For a mic with
    /// its L/R select pin tied high, this is usually `true`.
    pub clk_inverted: bool,
    /// Maximum time a single blocking read may wait for a full block, in ms.
    pub read_timeout_ms: u32,
    /// Time the receive task waits between blocks, in ms.
    pub poll_interval_ms: u32,
}

impl Default for PdmRxConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 16_000,
            clk_inverted: false,
            read_timeout_ms: 1_000,
            poll_interval_ms: 50,
        }
    }
}

impl PdmRxConfig {
    /// Check the settings for values no capture source can honor.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate_hz == 0 {
            return Err(Error::ConfigError(ConfigError::ZeroSampleRate));
        }
        if self.read_timeout_ms == 0 {
            return Err(Error::ConfigError(ConfigError::ZeroTimeout));
        }
        Ok(())
    }

    /// Check that a block of `bytes` holds a sample, and that a read can fill it before
    /// timing out.
    pub fn validate_block(&self, bytes: usize) -> Result<()> {
        if Self::samples_per_block(bytes) == 0 {
            return Err(Error::ConfigError(ConfigError::BufferTooSmall));
        }
        if self.read_timeout_ms < self.block_duration_ms(bytes) {
            return Err(Error::ConfigError(ConfigError::TimeoutTooShort));
        }
        Ok(())
    }

    /// How many samples a block of `bytes` holds.
    pub fn samples_per_block(bytes: usize) -> usize {
        bytes / BYTES_PER_SAMPLE
    }

    /// Time it takes to capture one full block of `bytes` at this sample rate, in ms,
    /// rounded up.
    pub fn block_duration_ms(&self, bytes: usize) -> u32 {
        let samples = Self::samples_per_block(bytes) as u64;
        let rate = self.sample_rate_hz.max(1) as u64;
        (samples * 1_000).div_ceil(rate) as u32
    }
}
