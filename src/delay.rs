//! Hardware delays, using Cortex-m systick. Thin wrapper of `cortex-m::delay::Delay`, for
//! the receive task's poll interval.

use cortex_m::{self, peripheral::SYST};
use embedded_hal::delay::DelayNs;

/// System timer (SysTick) as a delay provider
pub struct Delay {
    cortex_m_delay: cortex_m::delay::Delay,
}

impl Delay {
    /// Configures the system timer (SysTick) as a delay provider. `systick_hz` is the
    /// SysTick clock speed; usually HCLK.
    pub fn new(syst: SYST, systick_hz: u32) -> Self {
        Self {
            cortex_m_delay: cortex_m::delay::Delay::new(syst, systick_hz),
        }
    }

    /// Delay using the Cortex-M systick for a certain duration, µs. This is the core delay
    /// code all other functions, including the EH trait ones call indirectly.
    pub fn delay_us(&mut self, us: u32) {
        self.cortex_m_delay.delay_us(us);
    }

    /// Delay using the Cortex-M systick for a certain duration, ms.
    pub fn delay_ms(&mut self, ms: u32) {
        self.cortex_m_delay.delay_ms(ms);
    }

    /// Release the SysTick peripheral.
    pub fn free(self) -> SYST {
        self.cortex_m_delay.free()
    }
}

impl DelayNs for Delay {
    fn delay_ns(&mut self, ns: u32) {
        Delay::delay_us(self, ns.div_ceil(1_000));
    }

    fn delay_us(&mut self, us: u32) {
        Delay::delay_us(self, us);
    }

    fn delay_ms(&mut self, ms: u32) {
        Delay::delay_ms(self, ms);
    }
}
