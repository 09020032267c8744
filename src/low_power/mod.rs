//! The [`LowPower`] handle.

use core::marker::PhantomData;

use embassy_hal_internal::Peripheral;

use crate::cpu::Core;
use crate::deep_sleep::{CpuStats, DeepSleepGate, PeripheralShutdown};
use crate::option_bytes::{self, OptionBytes};
use crate::pwr::{self, CpuMode};
use crate::regs::{Mmio, Platform};
use crate::{peripherals, Config};

/// Low-power error.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The flash control registers did not unlock.
    FlashUnlockFailed,
    /// The option-byte control register did not unlock.
    ObUnlockFailed,
    /// The flash stayed busy or reported an error while the option bytes were programmed.
    ObProgramFailed,
    /// Loading the new option bytes did not reset the chip.
    ObLaunchFailed,
    /// The option bytes do not allow Standby Mode. See [`LowPower::prepare_option_bytes`].
    ObNotPrepared,
    /// The D1 domain did not power down.
    M7StandbyFailed,
    /// The D2 domain did not power down.
    M4StandbyFailed,
    /// The wakeup delay exceeds what the RTC wakeup timer can count.
    WakeupDelayTooLong,
    /// The LSE oscillator did not start.
    EnableLseFailed,
    /// The RTC could not be clocked from the LSE.
    SelectLseFailed,
    /// The regulator did not reach the standby voltage scale.
    VoltageScalingFailed,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::FlashUnlockFailed => write!(f, "flash unlock failed"),
            Error::ObUnlockFailed => write!(f, "option byte unlock failed"),
            Error::ObProgramFailed => write!(f, "option byte programming failed"),
            Error::ObLaunchFailed => write!(f, "option byte launch failed"),
            Error::ObNotPrepared => write!(f, "option bytes not prepared for standby"),
            Error::M7StandbyFailed => write!(f, "Cortex-M7 standby failed"),
            Error::M4StandbyFailed => write!(f, "Cortex-M4 standby failed"),
            Error::WakeupDelayTooLong => write!(f, "wakeup delay too long"),
            Error::EnableLseFailed => write!(f, "LSE did not start"),
            Error::SelectLseFailed => write!(f, "RTC clock selection failed"),
            Error::VoltageScalingFailed => write!(f, "voltage scaling failed"),
        }
    }
}

impl core::error::Error for Error {}

/// Power-state control of the STM32H747.
///
/// One instance owns the FLASH, PWR, RCC, RTC and EXTI singletons. The same handle is used on
/// both cores; it finds out which core it runs on when it is created.
pub struct LowPower<'d, P: Platform = Mmio> {
    pub(crate) hw: P,
    pub(crate) core: Core,
    pub(crate) config: Config,
    _phantom: PhantomData<&'d ()>,
}

impl<'d> LowPower<'d, Mmio> {
    pub fn new(
        _flash: impl Peripheral<P = peripherals::FLASH> + 'd,
        _pwr: impl Peripheral<P = peripherals::PWR> + 'd,
        _rcc: impl Peripheral<P = peripherals::RCC> + 'd,
        _rtc: impl Peripheral<P = peripherals::RTC> + 'd,
        _exti: impl Peripheral<P = peripherals::EXTI> + 'd,
        config: Config,
    ) -> Self {
        Self::with_platform(Mmio::new(), config)
    }
}

impl<'d, P: Platform> LowPower<'d, P> {
    /// Create a handle on top of another register backend.
    pub fn with_platform(hw: P, config: Config) -> Self {
        let core = Core::current(&hw);
        debug!("low power: running on {:?}", core);
        Self {
            hw,
            core,
            config,
            _phantom: PhantomData,
        }
    }

    /// Core this handle runs on.
    pub fn core(&self) -> Core {
        self.core
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Currently active option bytes.
    pub fn option_bytes(&self) -> OptionBytes {
        option_bytes::read_current(&self.hw)
    }

    /// Check that the option bytes allow Standby Mode.
    ///
    /// Returns [`Error::ObNotPrepared`] until [`prepare_option_bytes`](Self::prepare_option_bytes)
    /// has been run once on the chip.
    pub fn check_option_bytes(&self) -> Result<(), Error> {
        option_bytes::check(&self.hw)
    }

    /// Program the option bytes for Standby Mode.
    ///
    /// Disables the reset of D1 and D2 on standby entry and the Cortex-M4 boot. On success
    /// the chip resets and this never returns; the returned value says which step failed.
    ///
    /// The option bytes are non-volatile and only need to be programmed once.
    pub fn prepare_option_bytes(&mut self) -> Error {
        option_bytes::prepare(&self.hw, self.config.ready_polls)
    }

    /// Whether the chip was in `mode` before this boot.
    pub fn was_in_cpu_mode(&self, mode: CpuMode) -> bool {
        pwr::was_in_mode(&self.hw, mode)
    }

    /// Clear the flags read by [`was_in_cpu_mode`](Self::was_in_cpu_mode).
    pub fn reset_previous_cpu_mode_flags(&mut self) {
        pwr::clear_mode_flags(&self.hw);
    }

    /// Microseconds since boot.
    pub fn time_since_boot(&self, stats: &impl CpuStats) -> u64 {
        stats.uptime_us()
    }

    /// Microseconds spent idle, in any sleep mode.
    pub fn time_spent_idle(&self, stats: &impl CpuStats) -> u64 {
        stats.idle_time_us()
    }

    pub fn time_spent_in_sleep(&self, stats: &impl CpuStats) -> u64 {
        stats.sleep_time_us()
    }

    pub fn time_spent_in_deep_sleep(&self, stats: &impl CpuStats) -> u64 {
        stats.deep_sleep_time_us()
    }

    /// Whether the idle loop may enter Deep Sleep right now.
    pub fn can_deep_sleep(&self, gate: &impl DeepSleepGate) -> bool {
        gate.can_deep_sleep()
    }

    /// Shut down the peripherals that keep the chip out of Deep Sleep: the USB PHY, then the
    /// microsecond ticker.
    pub fn allow_deep_sleep(&mut self, peripherals: &mut impl PeripheralShutdown) {
        debug!("low power: releasing deep sleep locks");
        peripherals.deinit_usb_phy();
        peripherals.stop_us_ticker();
    }

    /// Number of deep-sleep locks currently held.
    #[deprecated(note = "diagnostic aid for deep-sleep lock problems, may be removed")]
    pub fn number_of_deep_sleep_locks(&self, gate: &impl DeepSleepGate) -> u16 {
        gate.deep_sleep_lock_count()
    }
}
