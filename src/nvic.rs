//! Nested vectored interrupt controller, as seen from the executing core.
//!
//! Each core has its own NVIC at the same address, so these functions act on the core
//! that calls them.

use core::mem::offset_of;

use cortex_m::interrupt::InterruptNumber;
use cortex_m::peripheral::{nvic, NVIC};
use embassy_hal_internal::interrupt::Priority;

use crate::pac;
use crate::regs::{Reg, RegisterBus};

/// Number of 32-bit enable/pending words covering every interrupt line.
pub(crate) const WORDS: u32 = 8;

/// RTC wakeup timer interrupt, routed through EXTI line 19.
pub(crate) fn rtc_wkup() -> u16 {
    pac::Interrupt::RTC_WKUP.number()
}

fn word(offset: usize, n: u32) -> Reg {
    Reg::at(NVIC::PTR.wrapping_byte_add(offset + 4 * n as usize))
}

pub(crate) fn icer(n: u32) -> Reg {
    word(offset_of!(nvic::RegisterBlock, icer), n)
}

pub(crate) fn icpr(n: u32) -> Reg {
    word(offset_of!(nvic::RegisterBlock, icpr), n)
}

pub(crate) fn iser(n: u32) -> Reg {
    word(offset_of!(nvic::RegisterBlock, iser), n)
}

/// Priority word `n`, holding the priorities of interrupts `4n` to `4n + 3`.
pub(crate) fn ipr(n: u32) -> Reg {
    word(offset_of!(nvic::RegisterBlock, ipr), n)
}

/// Disable every interrupt, then clear every pending one.
pub(crate) fn disable_and_clear_all<B: RegisterBus + ?Sized>(bus: &B) {
    for n in 0..WORDS {
        icer(n).write(bus, u32::MAX);
    }
    for n in 0..WORDS {
        icpr(n).write(bus, u32::MAX);
    }
}

/// Set the priority of `irq`. The value is already aligned to the implemented priority bits.
pub(crate) fn set_priority<B: RegisterBus + ?Sized>(bus: &B, irq: u16, priority: Priority) {
    let irq = u32::from(irq);
    let shift = (irq % 4) * 8;
    ipr(irq / 4).modify(bus, |v| (v & !(0xFF << shift)) | (u32::from(priority as u8) << shift));
}

pub(crate) fn enable<B: RegisterBus + ?Sized>(bus: &B, irq: u16) {
    let irq = u32::from(irq);
    iser(irq / 32).write(bus, 1 << (irq % 32));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regs::sim::{Access, SimBus};

    #[test]
    fn register_addresses() {
        assert_eq!(iser(0).addr(), 0xE000_E100);
        assert_eq!(icer(1).addr(), 0xE000_E184);
        assert_eq!(icpr(7).addr(), 0xE000_E29C);
        assert_eq!(ipr(0).addr(), 0xE000_E400);
        assert_eq!(rtc_wkup(), 3);
    }

    #[test]
    fn blanket_disable_then_clear() {
        let sim = SimBus::new();
        sim.clear_log();

        disable_and_clear_all(&sim);

        let log = sim.log();
        assert_eq!(log.len(), 16);
        for n in 0..WORDS {
            assert_eq!(log[n as usize], Access::Write(icer(n).addr(), u32::MAX));
            assert_eq!(log[(WORDS + n) as usize], Access::Write(icpr(n).addr(), u32::MAX));
        }
    }

    #[test]
    fn rtc_wakeup_priority_and_enable() {
        let sim = SimBus::new();
        sim.set(ipr(0).addr(), 0x1122_3344);

        set_priority(&sim, rtc_wkup(), Priority::P5);
        enable(&sim, rtc_wkup());

        assert_eq!(sim.get(ipr(0).addr()), 0x5022_3344);
        assert_eq!(sim.writes_to(iser(0).addr()), [1 << 3]);
    }

    #[test]
    fn higher_lines_use_the_next_words() {
        let sim = SimBus::new();

        set_priority(&sim, 149, Priority::P15);
        enable(&sim, 149);

        assert_eq!(sim.get(ipr(37).addr()), 0x0000_F000);
        assert_eq!(sim.writes_to(iser(4).addr()), [1 << 21]);
    }
}
