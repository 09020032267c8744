//! User option bytes that gate Standby Mode.
//!
//! For the whole chip to reach Standby, neither the D1 nor the D2 domain may be reset when
//! it enters standby, and the Cortex-M4 boot must be disabled so that the M7 controls when
//! the M4 runs. These are one-time-programmable user option bytes: programming them takes an
//! unlock → program → launch sequence, and the new values only apply after the reset the
//! launch triggers.
//!
//! ```rust,ignore
//! use stm32h747_lowpower::{Error, LowPower};
//!
//! # fn f(low_power: &mut LowPower) {
//! if low_power.check_option_bytes() == Err(Error::ObNotPrepared) {
//!     // Only returns if programming failed.
//!     let e = low_power.prepare_option_bytes();
//! }
//! # }
//! ```

use crate::flash;
use crate::fmt::Hex32;
use crate::pac::flash::regs::Optsr;
use crate::regs::RegisterBus;
use crate::Error;

/// Parsed view of the standby-related bits of `FLASH_OPTSR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OptionBytes {
    raw: u32,
}

impl OptionBytes {
    pub const fn from_raw(raw: u32) -> Self {
        Self { raw }
    }

    /// Raw `FLASH_OPTSR` value.
    pub const fn raw(&self) -> u32 {
        self.raw
    }

    fn optsr(&self) -> Optsr {
        Optsr(self.raw)
    }

    /// D1 keeps running through a standby request instead of being reset (`NRST_STBY_D1`).
    pub fn no_reset_on_d1_standby(&self) -> bool {
        self.optsr().nrst_stby_d1()
    }

    /// D2 keeps running through a standby request instead of being reset (`NRST_STBY_D2`).
    pub fn no_reset_on_d2_standby(&self) -> bool {
        self.optsr().nrst_stby_d2()
    }

    /// The Cortex-M4 boots on its own after reset (`BCM4`).
    pub fn cm4_boot_enabled(&self) -> bool {
        self.optsr().bcm4()
    }

    /// All three bits hold the values Standby Mode needs.
    pub fn is_standby_ready(&self) -> bool {
        self.no_reset_on_d1_standby() && self.no_reset_on_d2_standby() && !self.cm4_boot_enabled()
    }
}

/// Set the three standby bits of `optsr` to the values Standby Mode needs.
fn make_standby_ready(optsr: &mut Optsr) {
    optsr.set_nrst_stby_d1(true);
    optsr.set_nrst_stby_d2(true);
    optsr.set_bcm4(false);
}

/// Currently active option bytes.
pub(crate) fn read_current<B: RegisterBus + ?Sized>(bus: &B) -> OptionBytes {
    OptionBytes::from_raw(flash::optsr_cur().read(bus))
}

pub(crate) fn check<B: RegisterBus + ?Sized>(bus: &B) -> Result<(), Error> {
    let ob = read_current(bus);
    if ob.is_standby_ready() {
        Ok(())
    } else {
        debug!("option bytes not prepared for standby: optsr={}", Hex32(ob.raw()));
        Err(Error::ObNotPrepared)
    }
}

/// Program the standby option bytes and launch them. Only returns on failure.
pub(crate) fn prepare<B: RegisterBus + ?Sized>(bus: &B, polls: u32) -> Error {
    if flash::unlock(bus).is_err() {
        warn!("option bytes: flash unlock failed");
        return Error::FlashUnlockFailed;
    }
    if flash::ob_unlock(bus).is_err() {
        warn!("option bytes: option byte unlock failed");
        return Error::ObUnlockFailed;
    }

    if program(bus, polls).is_err() {
        warn!("option bytes: programming failed");
        flash::ob_lock(bus);
        flash::lock(bus);
        return Error::ObProgramFailed;
    }

    info!("option bytes: launching, the chip resets now");
    match flash::ob_launch(bus, polls) {
        Ok(()) => warn!("option bytes: launch returned without reset"),
        Err(e) => warn!("option bytes: launch failed: {:?}", e),
    }

    // Still running, so the reset did not happen.
    flash::ob_lock(bus);
    flash::lock(bus);
    Error::ObLaunchFailed
}

fn program<B: RegisterBus + ?Sized>(bus: &B, polls: u32) -> Result<(), ()> {
    flash::wait_for_last_operation(bus, polls)?;
    flash::optsr_prg().modify(bus, |v| {
        let mut optsr = Optsr(v);
        make_standby_ready(&mut optsr);
        optsr.0
    });
    Ok(())
}
