//! Reset and clock control: backup-domain clocking for the RTC, the HSE clock security
//! system and the blanket peripheral resets done before power-down.

use crate::pac::rcc::regs::{Bdcr, Cicr, Cr};
use crate::pac::rcc::vals::Rtcsel;
use crate::pac::RCC;
use crate::pwr;
use crate::regs::{Platform, Reg, RegisterBus};
use crate::utils::poll_until;

pub(crate) fn cr() -> Reg {
    Reg::at(RCC.cr().as_ptr())
}

pub(crate) fn cicr() -> Reg {
    Reg::at(RCC.cicr().as_ptr())
}

pub(crate) fn bdcr() -> Reg {
    Reg::at(RCC.bdcr().as_ptr())
}

pub(crate) fn c2_ahb3enr() -> Reg {
    Reg::at(RCC.c2_ahb3enr().as_ptr())
}

/// `FLASHEN` of `C2_AHB3ENR`. The register block leaves the flash allocation bit out.
pub(crate) const AHB3ENR_FLASHEN: u32 = 1 << 8;

/// Bus reset registers, in the order they are pulsed before power-down.
pub(crate) fn bus_resets() -> [Reg; 9] {
    [
        Reg::at(RCC.ahb3rstr().as_ptr()),
        Reg::at(RCC.ahb1rstr().as_ptr()),
        Reg::at(RCC.ahb2rstr().as_ptr()),
        Reg::at(RCC.apb3rstr().as_ptr()),
        Reg::at(RCC.apb1lrstr().as_ptr()),
        Reg::at(RCC.apb1hrstr().as_ptr()),
        Reg::at(RCC.apb2rstr().as_ptr()),
        Reg::at(RCC.apb4rstr().as_ptr()),
        Reg::at(RCC.ahb4rstr().as_ptr()),
    ]
}

fn read_bdcr<B: RegisterBus + ?Sized>(bus: &B) -> Bdcr {
    Bdcr(bdcr().read(bus))
}

fn modify_bdcr<B: RegisterBus + ?Sized>(bus: &B, f: impl FnOnce(&mut Bdcr)) {
    bdcr().modify(bus, |v| {
        let mut w = Bdcr(v);
        f(&mut w);
        w.0
    });
}

/// Turn the 32.768 kHz LSE oscillator on and wait for it to stabilize.
pub(crate) fn enable_lse<B: RegisterBus + ?Sized>(bus: &B, polls: u32) -> Result<(), ()> {
    pwr::enable_backup_access(bus, polls)?;

    modify_bdcr(bus, |w| w.set_lseon(true));
    poll_until(|| read_bdcr(bus).lserdy(), polls)
}

/// Clock the RTC from the LSE.
///
/// `RTCSEL` can only be changed after a backup-domain reset, so a different selection is
/// cleared with a `BDRST` pulse that keeps the rest of `BDCR` (the LSE settings included).
pub(crate) fn select_rtc_lse<B: RegisterBus + ?Sized>(bus: &B, polls: u32) -> Result<(), ()> {
    pwr::enable_backup_access(bus, polls)?;

    let current = read_bdcr(bus);
    if current.rtcsel() != Rtcsel::LSE {
        trace!("rcc: backup domain reset to change RTCSEL");
        // The reset leaves RTCSEL at "no clock".
        let mut keep = current;
        keep.set_rtcsel(Rtcsel::from_bits(0));
        modify_bdcr(bus, |w| w.set_bdrst(true));
        modify_bdcr(bus, |w| w.set_bdrst(false));
        bdcr().write(bus, keep.0);
    }

    poll_until(|| read_bdcr(bus).lserdy(), polls)?;
    modify_bdcr(bus, |w| w.set_rtcsel(Rtcsel::LSE));
    Ok(())
}

pub(crate) fn enable_rtc<B: RegisterBus + ?Sized>(bus: &B) {
    modify_bdcr(bus, |w| w.set_rtcen(true));
}

/// Enable the HSE clock security system. A failure of the HSE then raises an NMI.
pub(crate) fn enable_css<B: RegisterBus + ?Sized>(bus: &B) {
    cr().modify(bus, |v| {
        let mut w = Cr(v);
        w.set_hsecsson(true);
        w.0
    });
}

pub(crate) fn css_enabled<B: RegisterBus + ?Sized>(bus: &B) -> bool {
    Cr(cr().read(bus)).hsecsson()
}

pub(crate) fn clear_css_flag<B: RegisterBus + ?Sized>(bus: &B) {
    let mut w = Cicr(0);
    w.set_hsecssc(true);
    cicr().write(bus, w.0);
}

/// Force then release the reset of every peripheral on every bus.
pub(crate) fn reset_all_buses<B: RegisterBus + ?Sized>(bus: &B) {
    for reg in &bus_resets() {
        reg.write(bus, u32::MAX);
        reg.write(bus, 0);
    }
}

/// Allocate the flash to the Cortex-M4, so that the Cortex-M7 takes the M4's state into
/// account before the flash is powered off.
///
/// The barrier stands in for the read-back the vendor macro does after the write.
pub(crate) fn allocate_flash_to_cm4<P: Platform + ?Sized>(hw: &P) {
    c2_ahb3enr().set_bits(hw, AHB3ENR_FLASHEN);
    hw.dsb();
}
