//! DC offset removal. Each block has its arithmetic mean subtracted from every sample,
//! which removes the slowly-varying bias the capture path adds.
//!
//! The mean is accumulated in an `i64`, and uses truncating (toward zero) division. The
//! mean of `i16` values always fits in an `i16`, but `sample - mean` may not: corrected
//! samples saturate at `i16::MIN` and `i16::MAX`.

use core::{iter::Copied, slice};

use crate::error::{Error, Result};

/// Compute the truncating arithmetic mean of a block. Returns `Error::EmptyInput` if
/// there are no samples.
pub fn block_mean<I>(samples: I) -> Result<i16>
where
    I: IntoIterator<Item = i16>,
{
    let mut sum: i64 = 0;
    let mut count: i64 = 0;

    for sample in samples {
        sum += sample as i64;
        count += 1;
    }

    if count == 0 {
        return Err(Error::EmptyInput);
    }

    // Rust integer division truncates toward zero. The result is bounded by the
    // extremes of the inputs, so it fits.
    Ok((sum / count) as i16)
}

/// Remove the DC offset from a block of samples. The returned iterator yields one
/// corrected sample per input sample, in order.
pub fn normalize(samples: &[i16]) -> Result<Normalized<Copied<slice::Iter<'_, i16>>>> {
    normalize_iter(samples.iter().copied())
}

/// Like `normalize`, but over any sample iterator that can be walked twice; once for the
/// mean, and once for the output. Used for samples decoded directly from a byte buffer.
pub fn normalize_iter<I>(samples: I) -> Result<Normalized<I::IntoIter>>
where
    I: IntoIterator<Item = i16>,
    I::IntoIter: Clone,
{
    let samples = samples.into_iter();
    let mean = block_mean(samples.clone())?;

    Ok(Normalized { samples, mean })
}

/// Remove the DC offset from a block in place. Returns the mean that was removed.
pub fn normalize_in_place(samples: &mut [i16]) -> Result<i16> {
    let mean = block_mean(samples.iter().copied())?;

    for sample in samples.iter_mut() {
        *sample = sample.saturating_sub(mean);
    }

    Ok(mean)
}

/// Iterator over a block with its mean removed. Created by `normalize` and
/// `normalize_iter`.
#[derive(Clone, Debug)]
pub struct Normalized<I> {
    samples: I,
    mean: i16,
}

impl<I> Normalized<I> {
    /// The DC offset being removed from this block.
    pub fn mean(&self) -> i16 {
        self.mean
    }
}

impl<I: Iterator<Item = i16>> Iterator for Normalized<I> {
    type Item = i16;

    fn next(&mut self) -> Option<i16> {
        self.samples.next().map(|s| s.saturating_sub(self.mean))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.samples.size_hint()
    }
}

impl<I: ExactSizeIterator<Item = i16>> ExactSizeIterator for Normalized<I> {}

impl<I: DoubleEndedIterator<Item = i16>> DoubleEndedIterator for Normalized<I> {
    fn next_back(&mut self) -> Option<i16> {
        self.samples.next_back().map(|s| s.saturating_sub(self.mean))
    }
}
