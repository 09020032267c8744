//! Non-maskable interrupt handling for the HSE clock security system.
//!
//! The standby procedure enables the clock security system, so an HSE failure while the
//! chip goes down raises an NMI. The NMI vector has to be bound by the application with
//! [`bind_nmi_handler!`](crate::bind_nmi_handler):
//!
//! ```rust,ignore
//! stm32h747_lowpower::bind_nmi_handler!();
//! ```

use crate::rcc;
use crate::regs::{Mmio, RegisterBus};

/// Source of a non-maskable interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NmiCause {
    /// HSE clock security system.
    ClockSecurity,
    /// Anything else.
    Unexpected,
}

/// Work out why the NMI fired.
///
/// The `HSECSSF` flag is not looked at: the chip sometimes raises the NMI without setting
/// it. An enabled clock security system is taken as the cause instead.
pub fn classify<B: RegisterBus + ?Sized>(bus: &B) -> NmiCause {
    if rcc::css_enabled(bus) {
        NmiCause::ClockSecurity
    } else {
        NmiCause::Unexpected
    }
}

/// Handle an NMI. A clock-security NMI is acknowledged; any other cause halts the core.
pub fn on_nmi<B: RegisterBus + ?Sized>(bus: &B) {
    match classify(bus) {
        NmiCause::ClockSecurity => rcc::clear_css_flag(bus),
        NmiCause::Unexpected => loop {
            core::hint::spin_loop();
        },
    }
}

#[doc(hidden)]
pub unsafe fn __nmi_handler() {
    on_nmi(&Mmio::new());
}

/// Bind the NMI vector to [`nmi::on_nmi`](crate::nmi::on_nmi).
///
/// Defines the `NonMaskableInt` handler symbol, so it replaces the default handler of the
/// runtime crate.
#[macro_export]
macro_rules! bind_nmi_handler {
    () => {
        #[allow(non_snake_case)]
        #[no_mangle]
        unsafe extern "C" fn NonMaskableInt() {
            $crate::nmi::__nmi_handler();
        }
    };
}
