//! The receive loop: block on a capture read, remove the block's DC offset, print it, then
//! wait before the next read.

use embedded_hal::delay::DelayNs;
use embedded_io::Write;

use crate::{
    block::SampleBlock,
    capture::PdmCapture,
    config::{BUFF_SIZE, PdmRxConfig},
    error::Result,
    sink,
};

/// Drains a PDM capture source to a console. `N` is the capture block size in bytes.
pub struct PdmRxTask<C, W, D, const N: usize = BUFF_SIZE> {
    capture: C,
    sink: W,
    delay: D,
    pub cfg: PdmRxConfig,
}

impl<C, W, D, const N: usize> PdmRxTask<C, W, D, N>
where
    C: PdmCapture,
    W: Write,
    D: DelayNs,
{
    /// Create the task. `capture` must already be configured and enabled.
    pub fn new(capture: C, sink: W, delay: D, cfg: PdmRxConfig) -> Result<Self> {
        cfg.validate()?;
        cfg.validate_block(N)?;

        Ok(Self {
            capture,
            sink,
            delay,
            cfg,
        })
    }

    /// Run a single cycle: read one block, and write it to the sink with its mean removed.
    /// Returns the number of samples written.
    ///
    /// If the read fails or returns no whole sample, the error is returned and nothing is
    /// written for this cycle.
    pub fn poll_once(&mut self) -> Result<usize> {
        // Scratch space for this cycle only.
        let mut buf = [0_u8; N];

        let bytes_read = self.capture.read(&mut buf, self.cfg.read_timeout_ms)?;
        let block = SampleBlock::from_bytes(&buf[..bytes_read.min(N)]);

        let corrected = block.normalized()?;

        #[cfg(feature = "defmt")]
        defmt::trace!("Block: {} samples, DC offset {}", block.len(), corrected.mean());

        sink::write_samples(&mut self.sink, corrected)
    }

    /// Run one cycle with `poll_once`, then wait `poll_interval_ms`. The wait happens whether
    /// or not the cycle succeeded.
    pub fn poll_and_wait(&mut self) -> Result<usize> {
        let result = self.poll_once();

        if let Err(_e) = &result {
            #[cfg(feature = "defmt")]
            defmt::warn!("Skipping PDM block: {}", _e);
        }

        self.delay.delay_ms(self.cfg.poll_interval_ms);
        result
    }

    /// Poll forever, waiting `poll_interval_ms` between cycles. Failed cycles are skipped.
    pub fn run(&mut self) -> ! {
        loop {
            let _ = self.poll_and_wait();
        }
    }

    /// Stop the task, and return its capture source, sink, and delay.
    pub fn release(self) -> (C, W, D) {
        (self.capture, self.sink, self.delay)
    }
}
