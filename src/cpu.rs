//! Core identification and the System Control Block bits used for power-down.

use core::mem::offset_of;

use cortex_m::peripheral::{cpuid, scb, CPUID, SCB};

use crate::regs::{Reg, RegisterBus};

pub(crate) fn cpuid() -> Reg {
    Reg::at(CPUID::PTR.wrapping_byte_add(offset_of!(cpuid::RegisterBlock, base)))
}

pub(crate) fn scr() -> Reg {
    Reg::at(SCB::PTR.wrapping_byte_add(offset_of!(scb::RegisterBlock, scr)))
}

pub(crate) const SCR_SLEEPDEEP: u32 = 1 << 2;

const CPUID_PARTNO_SHIFT: u32 = 4;
const CPUID_PARTNO_MASK: u32 = 0xFFF;
const PARTNO_CORTEX_M7: u32 = 0xC27;

/// `CPUID` of the Cortex-M7 r1p1 in the STM32H747.
#[cfg(test)]
pub(crate) const CPUID_CM7: u32 = 0x411F_C271;
/// `CPUID` of the Cortex-M4 r0p1 in the STM32H747.
#[cfg(test)]
pub(crate) const CPUID_CM4: u32 = 0x410F_C241;

/// One of the two cores of the STM32H747.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Core {
    /// Cortex-M7, owner of the D1 domain.
    Cm7,
    /// Cortex-M4, owner of the D2 domain.
    Cm4,
}

impl Core {
    /// Identify the core executing this code from the `CPUID` part number.
    ///
    /// Anything that is not a Cortex-M7 is taken to be the Cortex-M4, as the vendor HAL does.
    pub fn current<B: RegisterBus + ?Sized>(bus: &B) -> Self {
        let partno = (cpuid().read(bus) >> CPUID_PARTNO_SHIFT) & CPUID_PARTNO_MASK;
        if partno == PARTNO_CORTEX_M7 {
            Core::Cm7
        } else {
            Core::Cm4
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regs::sim::SimBus;

    #[test]
    fn identifies_both_cores() {
        assert_eq!(Core::current(&SimBus::with_cpuid(CPUID_CM7)), Core::Cm7);
        assert_eq!(Core::current(&SimBus::with_cpuid(CPUID_CM4)), Core::Cm4);
    }

    #[test]
    fn system_control_addresses() {
        assert_eq!(cpuid().addr(), 0xE000_ED00);
        assert_eq!(scr().addr(), 0xE000_ED10);
    }
}
