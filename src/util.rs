//! This is an internal module that contains utility functionality used by other modules.

/// Upper bound on iterations for a loop waiting on a register flag.
pub(crate) const MAX_ITERS: u32 = 300_000;

/// Enables and resets peripheral clocks on various RCC registesr.
/// The first argument is a `apb2` etc to specify the reg block. The second is something like
/// `dfsdm1`, and the third is a `pac::RCC`.
macro_rules! rcc_en_reset {
    (apb2, $periph:expr, $rcc:expr) => {
        paste::paste! {
            $rcc.apb2enr().modify(|_, w| w.[<$periph en>]().set_bit());
            $rcc.apb2rstr().modify(|_, w| w.[<$periph rst>]().set_bit());
            $rcc.apb2rstr().modify(|_, w| w.[<$periph rst>]().clear_bit());
        }
    };
}

pub(crate) use rcc_en_reset;

/// Loop while `$cond` holds, running `$on_iteration` each pass. Returns `Err($err)` from the
/// enclosing function if the condition is still true after `MAX_ITERS` passes.
macro_rules! bounded_loop {
    ($cond:expr, $err:expr, $on_iteration:block) => {
        let mut i: u32 = 0;
        while $cond {
            $on_iteration
            i += 1;
            if i >= crate::util::MAX_ITERS {
                return Err($err);
            }
        }
    };
    ($cond:expr, $err:expr) => {
        bounded_loop!($cond, $err, {})
    };
}

pub(crate) use bounded_loop;
