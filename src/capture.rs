//! The capture source the receive task reads from. A concrete source owns its peripheral;
//! it's created by an init call (eg `dfsdm::PdmRx::new`), and handed to the task.

use crate::error::Result;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Reasons a capture read delivers no block.
pub enum CaptureError {
    /// No sample arrived before the read's time budget ran out.
    Timeout,
    /// Samples arrived faster than they were read, and some were lost.
    Overrun,
    /// The microphone clock isn't toggling; it's likely disconnected, or not powered.
    ClockAbsent,
}

/// A source of 16-bit PCM samples, from a PDM microphone.
pub trait PdmCapture {
    /// Blocking read of up to `buf.len()` bytes of little-endian `i16` samples. Waits at most
    /// `timeout_ms` for the buffer to fill, and returns the number of valid bytes written.
    ///
    /// If nothing could be read, returns an error, and the contents of `buf` are unspecified.
    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize>;
}

impl<T: PdmCapture + ?Sized> PdmCapture for &mut T {
    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize> {
        T::read(self, buf, timeout_ms)
    }
}
