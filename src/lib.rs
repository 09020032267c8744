#![cfg_attr(not(test), no_std)]
#![doc = include_str!("../README.md")]
#![allow(unsafe_op_in_unsafe_fn)]

#[cfg(not(any(feature = "stm32h747xi-cm7", feature = "stm32h747xi-cm4")))]
compile_error!("Select the core with the `stm32h747xi-cm7` or `stm32h747xi-cm4` feature.");

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

#[cfg(feature = "unstable-pac")]
pub use stm32_metapac as pac;
#[cfg(not(feature = "unstable-pac"))]
pub(crate) use stm32_metapac as pac;

mod utils;

pub mod cpu;
pub mod deep_sleep;
mod exti;
mod flash;
mod low_power;
pub mod nmi;
mod nvic;
pub mod option_bytes;
pub mod pwr;
mod rcc;
pub mod regs;
pub mod rtc;
mod standby;
pub mod time;

// Reexports
pub use embassy_hal_internal::interrupt::Priority;
pub use embassy_hal_internal::Peripheral;

pub use cpu::Core;
pub use low_power::{Error, LowPower};
pub use option_bytes::OptionBytes;
pub use pwr::{CpuMode, VoltageScale};
pub use time::WakeupDelay;

embassy_hal_internal::peripherals! {
    FLASH,
    PWR,
    RCC,
    RTC,
    EXTI,
}

/// Low-power configuration.
pub mod config {
    use crate::pwr::VoltageScale;
    use crate::Priority;

    /// Configuration passed to [`LowPower::new`](crate::LowPower::new).
    #[non_exhaustive]
    #[derive(Debug, Clone, Copy)]
    pub struct Config {
        /// Regulator voltage scale set before entering Standby.
        pub standby_voltage_scale: VoltageScale,
        /// NVIC priority of the RTC wakeup interrupt.
        pub rtc_wakeup_priority: Priority,
        /// Number of polls before a hardware handshake with a timeout is given up on.
        pub ready_polls: u32,
    }

    impl Default for Config {
        fn default() -> Self {
            Self {
                standby_voltage_scale: VoltageScale::Scale1,
                rtc_wakeup_priority: Priority::P0,
                ready_polls: 100_000,
            }
        }
    }
}
pub use config::Config;

/// Take the peripheral singletons.
///
/// This should only be called once at startup, otherwise it panics.
pub fn init() -> Peripherals {
    Peripherals::take()
}
