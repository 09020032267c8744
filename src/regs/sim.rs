//! Simulated register file for host tests.
//!
//! Stores every register as a plain word and models the handful of hardware handshakes the
//! drivers wait on: flash and option-byte key sequences, `LSERDY` following `LSEON`,
//! `ACTVOS`/`ACTVOSRDY` following `VOS`, RTC `INITF` following `INIT`, `WUTWF` following
//! `WUTE`, write-zero-to-clear RTC flags and the PWR `CSSF` flag clear. Faults can be
//! injected to make a handshake never complete. Every access is recorded.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::vec::Vec;

use super::{CoreInstructions, RegisterBus};
use crate::pac::flash::regs::{Cr as FlashCr, Optcr, Optsr, Sr};
use crate::pac::pwr::regs::{Cpucr, Cr1, Csr1, D3cr};
use crate::pac::pwr::vals::Vos;
use crate::pac::rcc::regs::Bdcr;
use crate::pac::rtc::regs::{Cr as RtcCr, Isr};
use crate::{cpu, flash, pwr, rcc, rtc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Access {
    Read(u32, u32),
    Write(u32, u32),
    Dsb,
    Isb,
    Wfi,
    CleanDcache,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyState {
    Idle,
    FirstKey,
    /// A wrong key was written; the lock stays set until reset.
    Refused,
}

/// Hardware handshakes that can be made to never complete.
#[derive(Debug, Default)]
pub(crate) struct Faults {
    pub flash_keys_refused: Cell<bool>,
    pub option_keys_refused: Cell<bool>,
    pub flash_queue_stuck: Cell<bool>,
    pub option_launch_stuck: Cell<bool>,
    pub backup_write_refused: Cell<bool>,
    pub lse_dead: Cell<bool>,
    pub lse_lost_after_backup_reset: Cell<bool>,
    pub vos_stuck: Cell<bool>,
}

pub(crate) struct SimBus {
    regs: RefCell<BTreeMap<u32, u32>>,
    log: RefCell<Vec<Access>>,
    keys: RefCell<BTreeMap<u32, KeyState>>,
    pub faults: Faults,
}

const RTC_ISR_RC_W0: u32 = 0x0000_FF20;

fn cpucr_flags() -> u32 {
    let mut flags = Cpucr(0);
    flags.set_stopf(true);
    flags.set_sbf(true);
    flags.set_sbf_d1(true);
    flags.set_sbf_d2(true);
    flags.0
}

impl SimBus {
    /// A register file holding the reset values the drivers care about, on a Cortex-M7.
    pub fn new() -> Self {
        Self::with_cpuid(cpu::CPUID_CM7)
    }

    pub fn with_cpuid(cpuid: u32) -> Self {
        let sim = Self {
            regs: RefCell::new(BTreeMap::new()),
            log: RefCell::new(Vec::new()),
            keys: RefCell::new(BTreeMap::new()),
            faults: Faults::default(),
        };
        sim.set(cpu::cpuid().addr(), cpuid);
        let mut locked = FlashCr(0);
        locked.set_lock(true);
        sim.set(flash::bank(0).cr.addr(), locked.0);
        sim.set(flash::bank(1).cr.addr(), locked.0);
        let mut optcr = Optcr(0);
        optcr.set_optlock(true);
        sim.set(flash::optcr().addr(), optcr.0);
        // Factory option bytes: no reset on D1/D2 standby, both cores boot.
        let mut factory = Optsr(0);
        factory.set_nrst_stby_d1(true);
        factory.set_nrst_stby_d2(true);
        factory.set_bcm4(true);
        factory.set_bcm7(true);
        sim.set(flash::optsr_cur().addr(), factory.0);
        sim.set(flash::optsr_prg().addr(), factory.0);
        sim.set(pwr::cr1().addr(), 0xF000_C000);
        let mut csr1 = Csr1(0);
        csr1.set_actvos(Vos::SCALE3);
        csr1.set_actvosrdy(true);
        sim.set(pwr::csr1().addr(), csr1.0);
        let mut d3cr = D3cr(0);
        d3cr.set_vos(Vos::SCALE3);
        d3cr.set_vosrdy(true);
        sim.set(pwr::d3cr().addr(), d3cr.0);
        sim.set(rtc::isr().addr(), 0x0000_0007);
        sim
    }

    /// Value of a register, without recording an access.
    pub fn get(&self, addr: u32) -> u32 {
        self.regs.borrow().get(&addr).copied().unwrap_or(0)
    }

    /// Preload a register, without recording an access or running the hardware model.
    pub fn set(&self, addr: u32, value: u32) {
        self.regs.borrow_mut().insert(addr, value);
    }

    pub fn log(&self) -> Vec<Access> {
        self.log.borrow().clone()
    }

    pub fn clear_log(&self) {
        self.log.borrow_mut().clear();
    }

    /// Values written to `addr`, in order.
    pub fn writes_to(&self, addr: u32) -> Vec<u32> {
        self.log
            .borrow()
            .iter()
            .filter_map(|a| match *a {
                Access::Write(w, v) if w == addr => Some(v),
                _ => None,
            })
            .collect()
    }

    /// Addresses written inside `start..end`, in order.
    pub fn writes_in(&self, start: u32, end: u32) -> Vec<u32> {
        self.log
            .borrow()
            .iter()
            .filter_map(|a| match *a {
                Access::Write(w, _) if (start..end).contains(&w) => Some(w),
                _ => None,
            })
            .collect()
    }

    /// Number of writes recorded.
    pub fn write_count(&self) -> usize {
        self.log
            .borrow()
            .iter()
            .filter(|a| matches!(a, Access::Write(..)))
            .count()
    }

    /// Index of the first write to `addr` in the log.
    pub fn first_write(&self, addr: u32) -> Option<usize> {
        self.log
            .borrow()
            .iter()
            .position(|a| matches!(*a, Access::Write(w, _) if w == addr))
    }

    /// Index of the first occurrence of `access` in the log.
    pub fn position(&self, access: Access) -> Option<usize> {
        self.log.borrow().iter().position(|a| *a == access)
    }

    fn key_sequence(&self, key_reg: u32, value: u32, key1: u32, key2: u32, refused: bool) -> bool {
        let mut keys = self.keys.borrow_mut();
        let state = keys.get(&key_reg).copied().unwrap_or(KeyState::Idle);
        let (next, unlocked) = match state {
            KeyState::Refused => (KeyState::Refused, false),
            _ if refused => (KeyState::Refused, false),
            KeyState::Idle if value == key1 => (KeyState::FirstKey, false),
            KeyState::FirstKey if value == key2 => (KeyState::Idle, true),
            _ => (KeyState::Refused, false),
        };
        keys.insert(key_reg, next);
        unlocked
    }

    fn store(&self, addr: u32, value: u32) {
        let old = self.get(addr);
        let mut value = value;

        let banks = [flash::bank(0), flash::bank(1)];
        if let Some(bank) = banks.iter().find(|b| b.keyr.addr() == addr) {
            let refused = self.faults.flash_keys_refused.get();
            if self.key_sequence(addr, value, flash::KEY1, flash::KEY2, refused) {
                let mut cr = FlashCr(self.get(bank.cr.addr()));
                cr.set_lock(false);
                self.set(bank.cr.addr(), cr.0);
            }
            return;
        }
        if addr == flash::optkeyr().addr() {
            let refused = self.faults.option_keys_refused.get();
            if self.key_sequence(addr, value, flash::OPTKEY1, flash::OPTKEY2, refused) {
                let mut optcr = Optcr(self.get(flash::optcr().addr()));
                optcr.set_optlock(false);
                self.set(flash::optcr().addr(), optcr.0);
            }
            return;
        }
        if banks.iter().any(|b| b.cr.addr() == addr) {
            // LOCK can be set by software but only cleared by the key sequence.
            let mut cr = FlashCr(value);
            cr.set_lock(cr.lock() || FlashCr(old).lock());
            value = cr.0;
        }
        if addr == flash::optcr().addr() {
            let was_locked = Optcr(old).optlock();
            let mut optcr = Optcr(value);
            optcr.set_optlock(optcr.optlock() || was_locked);
            if optcr.optstart() && !was_locked {
                optcr.set_optstart(false);
                let mut cur = if self.faults.option_launch_stuck.get() {
                    Optsr(self.get(flash::optsr_cur().addr()))
                } else {
                    Optsr(self.get(flash::optsr_prg().addr()))
                };
                cur.set_opt_busy(self.faults.option_launch_stuck.get());
                self.set(flash::optsr_cur().addr(), cur.0);
            }
            value = optcr.0;
        }
        if addr == rcc::bdcr().addr() {
            let mut bdcr = Bdcr(value);
            if bdcr.bdrst() {
                // Backup domain reset clears everything, the oscillator included.
                bdcr = Bdcr(0);
                bdcr.set_bdrst(true);
                if self.faults.lse_lost_after_backup_reset.get() {
                    self.faults.lse_dead.set(true);
                }
            } else {
                bdcr.set_lserdy(bdcr.lseon() && !self.faults.lse_dead.get());
            }
            value = bdcr.0;
        }
        if addr == pwr::cr1().addr() && self.faults.backup_write_refused.get() {
            let mut cr1 = Cr1(value);
            cr1.set_dbp(false);
            value = cr1.0;
        }
        if addr == pwr::d3cr().addr() {
            let mut csr1 = Csr1(self.get(pwr::csr1().addr()));
            if self.faults.vos_stuck.get() {
                csr1.set_actvos(Vos::from_bits(0));
                csr1.set_actvosrdy(false);
            } else {
                csr1.set_actvos(D3cr(value).vos());
                csr1.set_actvosrdy(true);
            }
            self.set(pwr::csr1().addr(), csr1.0);
        }
        if addr == pwr::cpucr().addr() || addr == pwr::cpu2cr().addr() {
            let flags = cpucr_flags();
            if Cpucr(value).cssf() {
                let mut cleared = Cpucr(value & !flags);
                cleared.set_cssf(false);
                value = cleared.0;
            } else {
                value = (value & !flags) | (old & flags);
            }
        }
        if addr == rtc::isr().addr() {
            value = (value & !RTC_ISR_RC_W0) | (old & value & RTC_ISR_RC_W0);
            let mut isr = Isr(value);
            isr.set_initf(isr.init());
            isr.set_wutwf(Isr(old).wutwf());
            value = isr.0;
        }
        if addr == rtc::cr().addr() {
            let mut isr = Isr(self.get(rtc::isr().addr()));
            isr.set_wutwf(!RtcCr(value).wute());
            self.set(rtc::isr().addr(), isr.0);
        }

        self.set(addr, value);
    }

    fn flash_queue_bits(&self, addr: u32, value: u32) -> u32 {
        let is_sr = addr == flash::bank(0).sr.addr() || addr == flash::bank(1).sr.addr();
        if self.faults.flash_queue_stuck.get() && is_sr {
            let mut sr = Sr(value);
            sr.set_qw(true);
            sr.0
        } else {
            value
        }
    }
}

impl RegisterBus for SimBus {
    fn read(&self, addr: u32) -> u32 {
        let value = self.flash_queue_bits(addr, self.get(addr));
        self.log.borrow_mut().push(Access::Read(addr, value));
        value
    }

    fn write(&self, addr: u32, value: u32) {
        self.log.borrow_mut().push(Access::Write(addr, value));
        self.store(addr, value);
    }
}

impl CoreInstructions for SimBus {
    fn dsb(&self) {
        self.log.borrow_mut().push(Access::Dsb);
    }

    fn isb(&self) {
        self.log.borrow_mut().push(Access::Isb);
    }

    fn wfi(&self) {
        self.log.borrow_mut().push(Access::Wfi);
    }

    fn clean_dcache(&self) {
        self.log.borrow_mut().push(Access::CleanDcache);
    }
}
