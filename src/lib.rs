//! This library reads audio from a PDM microphone, removes the DC offset of each captured
//! block, and streams the corrected samples to a console, one integer per line.
//!
//! The core (`normalize`, `block`, `sink`, and `rx_task`) is hardware-independent. The
//! `dfsdm` module provides a capture source for STM32 MCUs that have a DFSDM peripheral;
//! select one with a feature, eg `h743` or `l4x6`.
//!
//! Example:
//! ```ignore
//! let mut mic = PdmRx::new(dp.DFSDM, Filter::F0, DfsdmChannel::C1, cfg, Default::default(), hclk)?;
//! mic.enable()?;
//!
//! let delay = Delay::new(cp.SYST, hclk);
//! let mut task: PdmRxTask<_, _, _> = PdmRxTask::new(mic, uart, delay, cfg)?;
//! task.run();
//! ```

#![no_std]

// L4 PAC
#[cfg(feature = "l4x6")]
pub use stm32l4::stm32l4x6 as pac;

// H7 PAC
#[cfg(feature = "h735")]
pub use stm32h7::stm32h735 as pac;

#[cfg(feature = "h743")]
pub use stm32h7::stm32h743 as pac;

#[cfg(feature = "h743v")]
pub use stm32h7::stm32h743v as pac;

#[cfg(feature = "h747cm7")]
pub use stm32h7::stm32h747cm7 as pac;

#[cfg(feature = "h753")]
pub use stm32h7::stm32h753 as pac;

#[cfg(feature = "h753v")]
pub use stm32h7::stm32h753v as pac;

pub mod block;
pub mod capture;
pub mod config;
#[cfg(hw)]
pub mod delay;
pub mod dfsdm;
pub mod error;
pub mod normalize;
pub mod rx_task;
pub mod sink;
#[cfg(hw)]
mod util;

pub use crate::{
    block::SampleBlock,
    capture::{CaptureError, PdmCapture},
    config::{BUFF_SIZE, ConfigError, PdmRxConfig},
    error::{Error, Result},
    normalize::{block_mean, normalize, normalize_in_place},
    rx_task::PdmRxTask,
};
