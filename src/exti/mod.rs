//! Extended interrupt and event controller.
//!
//! Each core has its own bank of mask and pending registers: C1 for the Cortex-M7 and C2 for
//! the Cortex-M4. Lines that are reserved, or that must stay unmasked for the chip to wake
//! up, are encoded in the register definitions below.

use crate::cpu::Core;
use crate::nvic;
use crate::pac::EXTI;
use crate::regs::{Reg, RegisterBus};

pub(crate) fn rtsr1() -> Reg {
    Reg::at(EXTI.rtsr(0).as_ptr())
}

/// EXTI line of the RTC wakeup timer.
pub(crate) const RTC_WAKEUP_LINE: u32 = 1 << 19;

pub(crate) struct Bank {
    pub imr1: Reg,
    pub pr1: Reg,
    pub imr2: Reg,
    pub pr2: Reg,
    pub imr3: Reg,
    pub pr3: Reg,
}

/// Mask and pending registers of `core`.
pub(crate) fn bank_of(core: Core) -> Bank {
    let cpu = EXTI.cpu(match core {
        Core::Cm7 => 0,
        Core::Cm4 => 1,
    });
    Bank {
        imr1: Reg::at(cpu.imr(0).as_ptr()),
        // Lines 22 and up have no pending bit.
        pr1: Reg::at(cpu.pr(0).as_ptr()).reserved(0x003F_FFFF, 0),
        // Line 45 is reserved and must be kept set.
        imr2: Reg::at(cpu.imr(1).as_ptr()).reserved(u32::MAX, 1 << 13),
        pr2: Reg::at(cpu.pr(1).as_ptr()).reserved(1 << 17 | 1 << 19, 0),
        imr3: Reg::at(cpu.imr(2).as_ptr()).reserved(0x01F5_FFFF, 0),
        pr3: Reg::at(cpu.pr(2).as_ptr()).reserved(1 << 18 | 1 << 20 | 1 << 21 | 1 << 22, 0),
    }
}

/// Mask every maskable line of `core`'s bank.
pub(crate) fn mask_all<B: RegisterBus + ?Sized>(bus: &B, core: Core) {
    let bank = bank_of(core);
    bank.imr1.write(bus, 0);
    bank.imr2.write(bus, 0);
    bank.imr3.write(bus, 0);
}

/// Clear every pending line of `core`'s bank.
pub(crate) fn clear_pending<B: RegisterBus + ?Sized>(bus: &B, core: Core) {
    let bank = bank_of(core);
    bank.pr1.write(bus, u32::MAX);
    bank.pr2.write(bus, u32::MAX);
    bank.pr3.write(bus, u32::MAX);
}

/// Mask and clear everything `core` could be interrupted by, EXTI and NVIC both.
pub(crate) fn quiesce<B: RegisterBus + ?Sized>(bus: &B, core: Core) {
    mask_all(bus, core);
    clear_pending(bus, core);
    nvic::disable_and_clear_all(bus);
}

/// Unmask the RTC wakeup line for the Cortex-M7.
pub(crate) fn enable_rtc_wakeup_line<B: RegisterBus + ?Sized>(bus: &B) {
    bank_of(Core::Cm7).imr1.set_bits(bus, RTC_WAKEUP_LINE);
}

pub(crate) fn enable_rtc_wakeup_rising_edge<B: RegisterBus + ?Sized>(bus: &B) {
    rtsr1().set_bits(bus, RTC_WAKEUP_LINE);
}
