//! Standby Mode entry for both cores.
//!
//! The full chip reaches Standby once both CPU domains are down. The Cortex-M4 side puts D2
//! into standby and lets D3 follow; the Cortex-M7 side does all the preparation (flash idle,
//! regulator, interrupt lines, optional RTC wakeup, bus resets) and then powers down D1.
//!
//! Standby needs the option bytes prepared first, see
//! [`LowPower::check_option_bytes`](crate::LowPower::check_option_bytes).
//!
//! ```rust,ignore
//! use stm32h747_lowpower::{Config, LowPower, WakeupDelay};
//!
//! let p = stm32h747_lowpower::init();
//! let mut low_power = LowPower::new(p.FLASH, p.PWR, p.RCC, p.RTC, p.EXTI, Config::default());
//!
//! let e = low_power.standby_m7_with_wakeup(WakeupDelay::from_mins(10));
//! // Only reached if the chip did not power down.
//! ```

use crate::cpu::Core;
use crate::pwr::{self, D3DomainMode, Domain};
use crate::regs::Platform;
use crate::time::WakeupDelay;
use crate::{exti, flash, nvic, rcc, rtc, Config, Error, LowPower};

impl<'d, P: Platform> LowPower<'d, P> {
    /// Put the D1 domain into Standby with no wakeup timer. Only `NRST` wakes the chip up.
    ///
    /// Never returns when the chip powers down; the returned error says why it did not.
    pub fn standby_m7(&mut self) -> Error {
        self.standby_m7_inner(None)
    }

    /// Put the D1 domain into Standby and wake up after `delay`.
    ///
    /// The delay must be shorter than [`rtc::MAX_WAKEUP_SECS`] seconds, otherwise
    /// [`Error::WakeupDelayTooLong`] is returned without touching any register.
    ///
    /// Delays above 131071 seconds are accepted but wake the chip early: the wakeup timer
    /// reload is 16 bits wide, so a delay of `secs` seconds is counted as
    /// `65536 + (secs - 65536) % 65536` seconds.
    pub fn standby_m7_with_wakeup(&mut self, delay: WakeupDelay) -> Error {
        self.standby_m7_inner(Some(delay))
    }

    /// Put the D2 domain into Standby.
    ///
    /// Called on the Cortex-M4. Never returns when the domain powers down.
    pub fn standby_m4(&mut self) -> Error {
        info!("standby: D2 going down");

        critical_section::with(|_| {
            flash::wait_ready(&self.hw);
            exti::quiesce(&self.hw, Core::Cm4);
            pwr::enter_standby(&self.hw, self.core, Domain::D3);
            pwr::enter_standby(&self.hw, self.core, Domain::D2);
        });

        warn!("standby: D2 did not power down");
        Error::M4StandbyFailed
    }

    fn standby_m7_inner(&mut self, delay: Option<WakeupDelay>) -> Error {
        let wakeup_secs = match delay {
            Some(delay) if delay.as_secs() >= u64::from(rtc::MAX_WAKEUP_SECS) => {
                warn!("standby: wakeup delay of {} s is too long", delay.as_secs());
                return Error::WakeupDelayTooLong;
            }
            Some(delay) => Some(delay.as_secs() as u32),
            None => None,
        };

        match wakeup_secs {
            Some(secs) => info!("standby: D1 going down, wakeup in {} s", secs),
            None => info!("standby: D1 going down, wakeup on reset only"),
        }

        let (hw, core, config) = (&self.hw, self.core, &self.config);
        let result = critical_section::with(|_| power_down_d1(hw, core, config, wakeup_secs));

        let error = match result {
            Ok(()) => Error::M7StandbyFailed,
            Err(e) => e,
        };
        warn!("standby: D1 did not power down: {}", error);
        error
    }
}

fn power_down_d1<P: Platform + ?Sized>(
    hw: &P,
    core: Core,
    config: &Config,
    wakeup_secs: Option<u32>,
) -> Result<(), Error> {
    let polls = config.ready_polls;

    flash::wait_ready(hw);
    pwr::config_d3_domain(hw, D3DomainMode::Stop);
    pwr::control_voltage_scaling(hw, config.standby_voltage_scale, polls)
        .map_err(|_| Error::VoltageScalingFailed)?;

    exti::mask_all(hw, Core::Cm7);
    if wakeup_secs.is_some() {
        exti::enable_rtc_wakeup_line(hw);
    }
    exti::clear_pending(hw, Core::Cm7);

    if let Some(secs) = wakeup_secs {
        rtc::configure_wakeup(hw, secs, polls)?;
    }
    exti::clear_pending(hw, Core::Cm7);

    nvic::disable_and_clear_all(hw);
    if wakeup_secs.is_some() {
        nvic::set_priority(hw, nvic::rtc_wkup(), config.rtc_wakeup_priority);
        nvic::enable(hw, nvic::rtc_wkup());
    }

    rcc::enable_css(hw);
    rcc::reset_all_buses(hw);
    rcc::allocate_flash_to_cm4(hw);

    if core == Core::Cm7 {
        hw.clean_dcache();
    }
    pwr::enter_standby(hw, core, Domain::D1);
    Ok(())
}
