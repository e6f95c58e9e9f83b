use cfg_aliases::cfg_aliases;

fn main() {
    cfg_aliases! {
        // A PAC is selected, so the DFSDM driver and SysTick delay are available.
        hw: { any(feature = "l4", feature = "h7") },
        // DFSDM filters 2 and 3 only exist on H7.
        flt23: { feature = "h7" },
    }
}
