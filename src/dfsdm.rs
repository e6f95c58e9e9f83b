//! PDM microphone capture using the Digital filter for sigma delta modulators (DFSDM)
//! peripheral. See H742 RM, chapter 30, and AN5027: "Interfacing PDM digital microphones
//! using STM32 MCUs and MPUs".
//!
//! The DFSDM drives the mic's clock from its CKOUT pin, and its Sinc filter decimates the
//! 1-bit PDM stream into PCM; we read one 24-bit result per output sample, and reduce it to
//! 16 bits.
//!
//! Pin setup (CKOUT, and DATINy in their alternate functions) is left to the application.

use crate::{
    capture::CaptureError,
    config::{BYTES_PER_SAMPLE, ConfigError},
    error::{Error, Result},
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Filter {
    F0,
    F1,
    #[cfg(flt23)]
    F2,
    #[cfg(flt23)]
    F3,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DfsdmChannel {
    C0 = 0,
    C1 = 1,
    C2 = 2,
    C3 = 3,
    C4 = 4,
    C5 = 5,
    C6 = 6,
    C7 = 7,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
/// Sinc filter order. Sets FLTxFCR register, FORD field.
pub enum FilterOrder {
    /// FastSinc filter type
    FastSinc = 0,
    /// Sinc1 filter type
    Sinc1 = 1,
    /// Sinc2 filter type
    Sinc2 = 2,
    /// Sinc3 filter type
    Sinc3 = 3,
    /// Sinc4 filter type
    Sinc4 = 4,
    /// Sinc5 filter type
    Sinc5 = 5,
}

impl FilterOrder {
    /// Largest filter oversampling ratio (FOSR) this order supports.
    /// H742 RM, section 30.4.8: Digital filter configuration.
    pub fn max_oversampling_ratio(&self) -> u16 {
        match self {
            Self::Sinc4 => 215,
            Self::Sinc5 => 73,
            _ => 1_024,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
/// Toggle clock clourse between system and audio clocks. Sets CH0CFGR1 register, CKOUTSRC field.
pub enum DfsdmClockSrc {
    /// Source for output clock is from system clock
    SysClk = 0,
    /// Source for output clock is from audio clock
    AudioClk = 1,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Set conversions to regular, continous, or contiuous fast mode. Sets FLTxCR1 register, RCONT
/// and FAST fields.
pub enum Continuous {
    /// The regular channel is converted just once for each conversion request
    OneShot,
    /// The regular channel is converted repeatedly after each conversion request
    Continuous,
    /// Fast conversion mode enabled.
    /// When converting a regular conversion in continuous mode, having enabled the fast mode causes
    /// each conversion (except the first) to execute faster than in standard mode. This bit has no effect on
    /// conversions which are not continuous.
    ContinuousFastMode,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Configuration for the DFSDM peripheral. Defaults follow the PDM mic AN.
pub struct DfsdmConfig {
    pub clock_src: DfsdmClockSrc,
    /// Speed of the clock selected by `clock_src`, in Hz. CKOUT is divided down from this.
    pub clock_speed: u32,
    pub continuous: Continuous,
    pub filter_order: FilterOrder,
    /// Sinc filter oversampling ratio. Also known as decimation ratio. 1 - 1024.
    pub filter_oversampling_ratio: u16,
    /// Integrator oversampling ratio. Also known as averaging ratio. 1 - 256.
    pub integrator_oversampling_ratio: u16,
}

impl Default for DfsdmConfig {
    fn default() -> Self {
        Self {
            clock_src: DfsdmClockSrc::AudioClk,
            clock_speed: 12_288_000,
            continuous: Continuous::ContinuousFastMode,
            filter_order: FilterOrder::Sinc4,
            filter_oversampling_ratio: 64,
            integrator_oversampling_ratio: 1,
        }
    }
}

impl DfsdmConfig {
    pub fn validate(&self) -> Result<()> {
        if self.filter_oversampling_ratio == 0
            || self.filter_oversampling_ratio > self.filter_order.max_oversampling_ratio()
            || self.integrator_oversampling_ratio == 0
            || self.integrator_oversampling_ratio > 256
        {
            return Err(Error::ConfigError(ConfigError::OversamplingRatio));
        }
        Ok(())
    }

    /// The CKOUT divider that makes the filter output `sample_rate` samples per second.
    /// PDM mic AN: Divider = DFSDM Clock Source / (AUDIO_SAMPLING_FREQUENCY × DECIMATION_FACTOR)
    ///
    /// The clock must divide evenly, and the divider must be between 2 and 256.
    pub fn ckout_divider(&self, sample_rate: u32) -> Result<u32> {
        let ckout = sample_rate as u64
            * self.filter_oversampling_ratio as u64
            * self.integrator_oversampling_ratio as u64;

        if ckout == 0 || self.clock_speed as u64 % ckout != 0 {
            return Err(Error::ConfigError(ConfigError::ClockDivider));
        }

        let divider = self.clock_speed as u64 / ckout;
        if !(2..=256).contains(&divider) {
            return Err(Error::ConfigError(ConfigError::ClockDivider));
        }

        Ok(divider as u32)
    }

    /// Peak magnitude of the filter output, for a full-scale input.
    pub fn gain(&self) -> u64 {
        let fosr = self.filter_oversampling_ratio as u64;
        let iosr = self.integrator_oversampling_ratio as u64;

        match self.filter_order {
            FilterOrder::FastSinc => 2 * fosr.pow(2) * iosr,
            order => fosr.pow(order as u32) * iosr,
        }
    }

    /// Right bit-shift (DTRBS) that keeps the filter output within the 24-bit data register.
    pub fn data_right_shift(&self) -> u8 {
        let gain = self.gain().max(1);
        // Bits of magnitude needed, not counting sign.
        let bits = 64 - (gain - 1).leading_zeros();
        bits.saturating_sub(23).min(31) as u8
    }
}

/// Convert the 24-bit RDATA field of FLTxRDATAR to a 16-bit sample.
pub fn pcm_from_rdata(rdata: u32) -> i16 {
    // Sign-extend from 24 bits, then keep the top 16.
    let sample = ((rdata << 8) as i32) >> 8;
    (sample >> 8) as i16
}

// FLTxISR and FLTxICR bit positions. H742 RM, section 30.7.
#[cfg_attr(not(hw), allow(dead_code))]
pub(crate) const REOCF: u32 = 1 << 1;
#[cfg_attr(not(hw), allow(dead_code))]
pub(crate) const ROVRF: u32 = 1 << 3;
#[cfg_attr(not(hw), allow(dead_code))]
const CKABF_SHIFT: u32 = 16;

/// CKABF bit for a channel. Clock absence flags only exist in FLT0ISR and FLT0ICR, whichever
/// filter the channel feeds.
#[cfg_attr(not(hw), allow(dead_code))]
pub(crate) fn ckab_flag(channel: DfsdmChannel) -> u32 {
    1 << (CKABF_SHIFT + channel as u32)
}

#[cfg_attr(not(hw), allow(dead_code))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
/// Outcome of one poll of the filter status while waiting for a sample.
pub(crate) enum SampleStatus {
    /// A conversion result is waiting in RDATAR.
    Ready,
    /// Nothing yet; wait and poll again.
    Pending,
}

/// Decide what a poll of the status registers means for a read in progress.
/// `isr` is the data filter's FLTxISR; `flt0_isr` is FLT0ISR, read after an attempt to clear
/// this channel's CKABF. `budget_us` is the time left in the read.
#[cfg_attr(not(hw), allow(dead_code))]
pub(crate) fn sample_status(
    isr: u32,
    flt0_isr: u32,
    channel: DfsdmChannel,
    budget_us: u32,
) -> Result<SampleStatus> {
    // CKABF can only be cleared while the clock is running; if it stays set, the mic is gone.
    if flt0_isr & ckab_flag(channel) != 0 {
        return Err(CaptureError::ClockAbsent.into());
    }
    if isr & ROVRF != 0 {
        return Err(CaptureError::Overrun.into());
    }
    if isr & REOCF != 0 {
        return Ok(SampleStatus::Ready);
    }
    if budget_us == 0 {
        return Err(CaptureError::Timeout.into());
    }
    Ok(SampleStatus::Pending)
}

/// Fill `buf` with little-endian samples from `next_sample`, which is handed the remaining
/// time budget in µs. The first result is dropped: RDATAR still holds the last conversion
/// from before the read started, so it isn't contiguous with the rest of the block.
#[cfg_attr(not(hw), allow(dead_code))]
pub(crate) fn fill_block<F>(buf: &mut [u8], timeout_ms: u32, mut next_sample: F) -> Result<usize>
where
    F: FnMut(&mut u32) -> Result<i16>,
{
    let mut budget_us = timeout_ms.saturating_mul(1_000);
    let mut bytes_read = 0;

    next_sample(&mut budget_us)?;

    for sample in buf.chunks_exact_mut(BYTES_PER_SAMPLE) {
        let pcm = next_sample(&mut budget_us)?;
        sample.copy_from_slice(&pcm.to_le_bytes());
        bytes_read += BYTES_PER_SAMPLE;
    }

    Ok(bytes_read)
}

#[cfg(hw)]
pub use self::periph::PdmRx;

#[cfg(hw)]
mod periph {
    use core::ops::Deref;

    use cortex_m::{asm, interrupt::free};

    use super::*;
    use crate::{
        capture::PdmCapture,
        config::PdmRxConfig,
        pac::{RCC, dfsdm as dfsdm_p},
        util::{bounded_loop, rcc_en_reset},
    };

    /// A mono PDM microphone on one DFSDM channel, decimated by one filter. This is the
    /// handle the receive task reads from.
    pub struct PdmRx<R> {
        regs: R,
        filter: Filter,
        channel: DfsdmChannel,
        pub cfg: PdmRxConfig,
        pub dfsdm_cfg: DfsdmConfig,
        /// Core cycles in one µs; used to pace the timeout while polling.
        cycles_per_us: u32,
    }

    impl<R> PdmRx<R>
    where
        R: Deref<Target = dfsdm_p::RegisterBlock>,
    {
        /// Initialize the DFSDM for a PDM mic, including enabling and resetting its RCC
        /// peripheral clock. `hclk` is the core clock speed, in Hz. Call `enable` to start
        /// conversions.
        pub fn new(
            regs: R,
            filter: Filter,
            channel: DfsdmChannel,
            cfg: PdmRxConfig,
            dfsdm_cfg: DfsdmConfig,
            hclk: u32,
        ) -> Result<Self> {
            cfg.validate()?;
            dfsdm_cfg.validate()?;
            let divider = dfsdm_cfg.ckout_divider(cfg.sample_rate_hz)?;

            free(|_| {
                let rcc = unsafe { &(*RCC::ptr()) };
                #[cfg(feature = "l4")]
                rcc_en_reset!(apb2, dfsdm, rcc);
                #[cfg(feature = "h7")]
                rcc_en_reset!(apb2, dfsdm1, rcc);
            });

            // Global settings live in CH0CFGR1. The output clock signal frequency must be in
            // the range 0 - 20 MHz. CKOUTDIV holds the divider, minus one.
            regs.ch(0).cfgr1().modify(|_, w| unsafe {
                w.ckoutsrc().bit(dfsdm_cfg.clock_src as u8 != 0);
                w.ckoutdiv().bits((divider - 1) as u8)
            });

            // Configuration of serial channels for PDM microphone input:
            // • Input from this channel's own pins (CHINSEL = 0).
            // • Clock from the internal CKOUT, which also drives the mic (SPICKSEL = 1).
            // • SPI with rising edge to strobe data (SITP = 0), or falling (SITP = 1).
            // • Clock absence detection on.
            let ch = regs.ch(channel as usize);
            ch.cfgr1().modify(|_, w| unsafe {
                w.chinsel().clear_bit();
                w.datmpx().bits(0);
                w.datpack().bits(0);
                w.spicksel().bits(1);
                w.sitp().bits(cfg.clk_inverted as u8);
                w.ckaben().set_bit()
            });

            // Final data right bit-shift, to fit the 24-bit data register. No offset; DC
            // is removed in software.
            ch.cfgr2().modify(|_, w| unsafe {
                w.dtrbs().bits(dfsdm_cfg.data_right_shift());
                w.offset().bits(0)
            });

            let flt = regs.flt(filter as usize);

            // FOSR and IOSR hold their ratio, minus one.
            flt.fcr().modify(|_, w| unsafe {
                w.ford().bits(dfsdm_cfg.filter_order as u8);
                w.fosr().bits(dfsdm_cfg.filter_oversampling_ratio - 1);
                w.iosr().bits((dfsdm_cfg.integrator_oversampling_ratio - 1) as u8)
            });

            flt.cr1().modify(|_, w| unsafe {
                w.rcont().bit(dfsdm_cfg.continuous != Continuous::OneShot);
                w.fast()
                    .bit(dfsdm_cfg.continuous == Continuous::ContinuousFastMode);
                w.rsync().clear_bit();
                w.rch().bits(channel as u8)
            });

            Ok(Self {
                regs,
                filter,
                channel,
                cfg,
                dfsdm_cfg,
                cycles_per_us: (hclk / 1_000_000).max(1),
            })
        }

        /// Enables the DFSDM, the channel, and the filter, then starts regular conversions.
        /// Waits for the mic clock to be detected on the channel; returns
        /// `CaptureError::ClockAbsent` if it isn't.
        ///
        /// The DFSDM interface is globally enabled by setting DFSDMEN=1 in the
        /// CH0CFGR1 register. Once DFSDM is globally enabled, all input channels (y=0..7)
        /// and digital filters FLTx (x=0..3) start to work if their enable bits are set (channel
        /// enable bit CHEN in CHyCFGR1 and FLTx enable bit DFEN in
        /// FLTxCR1).
        pub fn enable(&mut self) -> Result<()> {
            self.regs.ch(0).cfgr1().modify(|_, w| w.dfsdmen().set_bit());
            self.regs
                .ch(self.channel as usize)
                .cfgr1()
                .modify(|_, w| w.chen().set_bit());
            self.regs
                .flt(self.filter as usize)
                .cr1()
                .modify(|_, w| w.dfen().set_bit());

            // CKABF is set until the channel has seen a few clock edges; it can only be
            // cleared once the clock is running.
            let ckab = ckab_flag(self.channel);
            bounded_loop!(
                self.flt0_status() & ckab != 0,
                Error::CaptureError(CaptureError::ClockAbsent),
                {
                    self.clear_clock_absent();
                }
            );

            // Regular conversions can be launched by software: by writing ‘1’ to RSWSTART in the
            // FLTxCR1 register.
            self.regs
                .flt(self.filter as usize)
                .cr1()
                .modify(|_, w| w.rswstart().set_bit());

            Ok(())
        }

        /// Stops conversions, and disables the filter, the channel, and the DFSDM.
        /// By clearing DFEN, any conversion which may be in progress is immediately stopped and
        /// FLTx is put into stop mode.
        pub fn disable(&mut self) {
            self.regs
                .flt(self.filter as usize)
                .cr1()
                .modify(|_, w| w.dfen().clear_bit());
            self.regs
                .ch(self.channel as usize)
                .cfgr1()
                .modify(|_, w| w.chen().clear_bit());
            self.regs.ch(0).cfgr1().modify(|_, w| w.dfsdmen().clear_bit());
        }

        /// Disable the peripheral, and release its register block.
        pub fn free(mut self) -> R {
            self.disable();
            self.regs
        }

        fn status(&self) -> u32 {
            self.regs.flt(self.filter as usize).isr().read().bits()
        }

        fn flt0_status(&self) -> u32 {
            self.regs.flt(0).isr().read().bits()
        }

        fn clear_flags(&mut self, flags: u32) {
            self.regs
                .flt(self.filter as usize)
                .icr()
                .write(|w| unsafe { w.bits(flags) });
        }

        fn clear_clock_absent(&mut self) {
            let ckab = ckab_flag(self.channel);
            self.regs.flt(0).icr().write(|w| unsafe { w.bits(ckab) });
        }

        /// Wait for the next conversion, and read it. Draws the wait from `budget_us`.
        fn next_sample(&mut self, budget_us: &mut u32) -> Result<i16> {
            loop {
                let isr = self.status();

                let mut flt0_isr = self.flt0_status();
                if flt0_isr & ckab_flag(self.channel) != 0 {
                    self.clear_clock_absent();
                    flt0_isr = self.flt0_status();
                }

                match sample_status(isr, flt0_isr, self.channel, *budget_us) {
                    Ok(SampleStatus::Ready) => break,
                    Ok(SampleStatus::Pending) => {
                        *budget_us -= 1;
                        asm::delay(self.cycles_per_us);
                    }
                    Err(e) => {
                        self.clear_flags(ROVRF);
                        return Err(e);
                    }
                }
            }

            // Reading RDATAR clears REOCF.
            let rdata = self
                .regs
                .flt(self.filter as usize)
                .rdatar()
                .read()
                .rdata()
                .bits();
            Ok(pcm_from_rdata(rdata))
        }
    }

    impl<R> PdmCapture for PdmRx<R>
    where
        R: Deref<Target = dfsdm_p::RegisterBlock>,
    {
        fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize> {
            // Conversions keep running while the task is idle, so an overrun from before
            // this read is expected. Only an overrun during the read loses data.
            self.clear_flags(ROVRF);

            fill_block(buf, timeout_ms, |budget_us| self.next_sample(budget_us))
        }
    }
}
