//! PWR (power control): voltage scaling, domain standby requests and the sticky
//! "previous mode" flags.

use crate::cpu::{self, Core};
use crate::pac::pwr::regs::{Cpucr, Cr1, Csr1, D3cr};
use crate::pac::pwr::vals::Vos;
use crate::pac::syscfg::regs::Pwrcr;
use crate::pac::{PWR, SYSCFG};
use crate::regs::{Platform, Reg, RegisterBus};
use crate::utils::poll_until;

pub(crate) fn cr1() -> Reg {
    Reg::at(PWR.cr1().as_ptr())
}

pub(crate) fn csr1() -> Reg {
    Reg::at(PWR.csr1().as_ptr())
}

// Software writes PDDS_D1..3, CSSF and RUN_D3. The flags (8:5) are read-only, bit 4 is
// HOLD1/HOLD2 and belongs to the other core's boot control, bits 31:12, 10 and 3 are
// reserved; all of them are written back as read.
const CPUCR_WRITABLE: u32 = 0x0000_0A07;

pub(crate) fn cpucr() -> Reg {
    Reg::at(PWR.cpucr().as_ptr()).reserved(CPUCR_WRITABLE, 0)
}

pub(crate) fn cpu2cr() -> Reg {
    Reg::at(PWR.cpu2cr().as_ptr()).reserved(CPUCR_WRITABLE, 0)
}

/// `D3CR`, of which only `VOS` (15:14) is written.
pub(crate) fn d3cr() -> Reg {
    Reg::at(PWR.d3cr().as_ptr()).reserved(0x0000_C000, 0)
}

/// `SYSCFG_PWRCR`, holding the overdrive enable used for VOS0.
pub(crate) fn syscfg_pwrcr() -> Reg {
    Reg::at(SYSCFG.pwrcr().as_ptr()).reserved(0x0000_0001, 0)
}

fn modify_cpucr<B: RegisterBus + ?Sized>(bus: &B, reg: Reg, f: impl FnOnce(&mut Cpucr)) {
    reg.modify(bus, |v| {
        let mut cpucr = Cpucr(v);
        f(&mut cpucr);
        cpucr.0
    });
}

/// Mode the chip was in before the current boot, as reported by the sticky PWR flags.
///
/// More than one flag can be set at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CpuMode {
    /// The D1 domain (Cortex-M7) was in Standby.
    D1DomainStandby,
    /// The D2 domain (Cortex-M4) was in Standby.
    D2DomainStandby,
    /// The whole chip was in Standby.
    Standby,
    /// The whole chip was in Stop.
    Stop,
}

impl CpuMode {
    pub(crate) fn is_set(self, cpucr: Cpucr) -> bool {
        match self {
            CpuMode::D1DomainStandby => cpucr.sbf_d1(),
            CpuMode::D2DomainStandby => cpucr.sbf_d2(),
            CpuMode::Standby => cpucr.sbf(),
            CpuMode::Stop => cpucr.stopf(),
        }
    }

    #[cfg(test)]
    pub(crate) fn set(self, cpucr: &mut Cpucr) {
        match self {
            CpuMode::D1DomainStandby => cpucr.set_sbf_d1(true),
            CpuMode::D2DomainStandby => cpucr.set_sbf_d2(true),
            CpuMode::Standby => cpucr.set_sbf(true),
            CpuMode::Stop => cpucr.set_stopf(true),
        }
    }
}

/// Regulator voltage scale for the VCORE supply.
///
/// VOS0 is left out: it is VOS1 plus overdrive and is never a valid state to enter standby from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VoltageScale {
    Scale1,
    Scale2,
    Scale3,
}

impl VoltageScale {
    pub(crate) fn vos(self) -> Vos {
        match self {
            VoltageScale::Scale1 => Vos::SCALE1,
            VoltageScale::Scale2 => Vos::SCALE2,
            VoltageScale::Scale3 => Vos::SCALE3,
        }
    }
}

/// Power domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Domain {
    /// Cortex-M7 and its high-performance peripherals.
    D1,
    /// Cortex-M4 and its peripherals.
    D2,
    /// Always-on system domain (RTC, EXTI, backup domain, PWR).
    D3,
}

/// Behavior of the D3 domain while the CPU subsystems are in low-power modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum D3DomainMode {
    /// D3 follows the CPU subsystems into Stop and Standby.
    Stop,
    /// D3 stays in Run mode.
    Run,
}

pub(crate) fn was_in_mode<B: RegisterBus + ?Sized>(bus: &B, mode: CpuMode) -> bool {
    mode.is_set(Cpucr(cpucr().read(bus)))
}

/// Clear all four sticky flags with a single `CSSF` write.
pub(crate) fn clear_mode_flags<B: RegisterBus + ?Sized>(bus: &B) {
    modify_cpucr(bus, cpucr(), |w| w.set_cssf(true));
}

pub(crate) fn config_d3_domain<B: RegisterBus + ?Sized>(bus: &B, mode: D3DomainMode) {
    modify_cpucr(bus, cpucr(), |w| w.set_run_d3(mode == D3DomainMode::Run));
}

fn vos_ready<B: RegisterBus + ?Sized>(bus: &B) -> bool {
    Csr1(csr1().read(bus)).actvosrdy()
}

/// Select the regulator voltage scale and wait for it to be reached.
///
/// Leaving VOS0 first turns off the SYSCFG overdrive and waits for the regulator to settle.
pub(crate) fn control_voltage_scaling<B: RegisterBus + ?Sized>(
    bus: &B,
    scale: VoltageScale,
    polls: u32,
) -> Result<(), ()> {
    let actvos = Vos::from(Csr1(csr1().read(bus)).actvos());
    let overdrive = Pwrcr(syscfg_pwrcr().read(bus)).oden() != 0;

    if actvos == scale.vos() && !overdrive {
        return Ok(());
    }

    if actvos == Vos::SCALE1 && overdrive {
        trace!("pwr: leaving VOS0");
        syscfg_pwrcr().modify(bus, |v| {
            let mut pwrcr = Pwrcr(v);
            pwrcr.set_oden(0);
            pwrcr.0
        });
        poll_until(|| vos_ready(bus), polls)?;
    }

    d3cr().modify(bus, |v| {
        let mut d3cr = D3cr(v);
        d3cr.set_vos(scale.vos());
        d3cr.0
    });
    poll_until(|| vos_ready(bus), polls)
}

/// Set backup-domain write access and wait until it reads back.
pub(crate) fn enable_backup_access<B: RegisterBus + ?Sized>(bus: &B, polls: u32) -> Result<(), ()> {
    cr1().modify(bus, |v| {
        let mut cr1 = Cr1(v);
        cr1.set_dbp(true);
        cr1.0
    });
    poll_until(|| Cr1(cr1().read(bus)).dbp(), polls)
}

/// Request Standby for `domain` from `core`.
///
/// For D1 and D2 this ends in `WFI` with `SLEEPDEEP` set when the domain belongs to the
/// calling core; on hardware that does not return. A request for the other core's domain
/// only records the standby permission. D3 is never entered directly: setting its `PDDS`
/// bits lets it follow the CPU domains down.
pub(crate) fn enter_standby<P: Platform + ?Sized>(hw: &P, core: Core, domain: Domain) {
    match domain {
        Domain::D1 => {
            if core != Core::Cm7 {
                return;
            }
            modify_cpucr(hw, cpucr(), |w| w.set_pdds_d1(true));
            modify_cpucr(hw, cpu2cr(), |w| w.set_pdds_d1(true));
        }
        Domain::D2 => {
            modify_cpucr(hw, cpucr(), |w| w.set_pdds_d2(true));
            if core != Core::Cm4 {
                return;
            }
            modify_cpucr(hw, cpu2cr(), |w| w.set_pdds_d2(true));
        }
        Domain::D3 => {
            modify_cpucr(hw, cpucr(), |w| w.set_pdds_d3(true));
            modify_cpucr(hw, cpu2cr(), |w| w.set_pdds_d3(true));
            return;
        }
    }

    cpu::scr().set_bits(hw, cpu::SCR_SLEEPDEEP);
    hw.dsb();
    hw.isb();
    hw.wfi();
}
