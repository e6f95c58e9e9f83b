//! A view of the valid bytes from one capture read, as 16-bit samples.

use core::slice::ChunksExact;

use crate::{
    config::BYTES_PER_SAMPLE,
    error::Result,
    normalize::{Normalized, normalize_iter},
};

/// One capture block. Borrowed from the scratch buffer the capture source filled;
/// nothing is kept once the block is processed.
#[derive(Clone, Copy, Debug)]
pub struct SampleBlock<'a> {
    bytes: &'a [u8],
}

impl<'a> SampleBlock<'a> {
    /// Interpret the bytes a capture read returned as little-endian `i16` samples. A
    /// trailing odd byte is not a whole sample, and is ignored.
    pub fn from_bytes(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Number of whole samples in the block.
    pub fn len(&self) -> usize {
        self.bytes.len() / BYTES_PER_SAMPLE
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over the samples, in capture order.
    pub fn samples(&self) -> Samples<'a> {
        Samples {
            chunks: self.bytes.chunks_exact(BYTES_PER_SAMPLE),
        }
    }

    /// The block with its DC offset removed.
    pub fn normalized(&self) -> Result<Normalized<Samples<'a>>> {
        normalize_iter(self.samples())
    }
}

/// Iterator over the samples of a `SampleBlock`.
#[derive(Clone, Debug)]
pub struct Samples<'a> {
    chunks: ChunksExact<'a, u8>,
}

impl Iterator for Samples<'_> {
    type Item = i16;

    fn next(&mut self) -> Option<i16> {
        self.chunks.next().map(|c| i16::from_le_bytes([c[0], c[1]]))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl ExactSizeIterator for Samples<'_> {}

impl DoubleEndedIterator for Samples<'_> {
    fn next_back(&mut self) -> Option<i16> {
        self.chunks
            .next_back()
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
    }
}
