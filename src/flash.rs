//! Embedded flash controller: lock handling, busy polling and option-byte launch.

use crate::pac::flash::regs::{Cr, Optcr, Optsr, Sr};
use crate::pac::FLASH;
use crate::regs::{Reg, RegisterBus};
use crate::utils::{poll_until, spin_until};

pub(crate) const KEY1: u32 = 0x4567_0123;
pub(crate) const KEY2: u32 = 0xCDEF_89AB;
pub(crate) const OPTKEY1: u32 = 0x0819_2A3B;
pub(crate) const OPTKEY2: u32 = 0x4C5D_6E7F;

pub(crate) fn optkeyr() -> Reg {
    Reg::at(FLASH.optkeyr().as_ptr())
}

pub(crate) fn optcr() -> Reg {
    Reg::at(FLASH.optcr().as_ptr())
}

pub(crate) fn optsr_cur() -> Reg {
    Reg::at(FLASH.optsr_cur().as_ptr())
}

pub(crate) fn optsr_prg() -> Reg {
    Reg::at(FLASH.optsr_prg().as_ptr())
}

/// Control registers of one flash bank.
pub(crate) struct Bank {
    pub keyr: Reg,
    pub cr: Reg,
    pub sr: Reg,
}

pub(crate) fn bank(n: usize) -> Bank {
    let regs = FLASH.bank(n);
    Bank {
        keyr: Reg::at(regs.keyr().as_ptr()),
        cr: Reg::at(regs.cr().as_ptr()),
        sr: Reg::at(regs.sr().as_ptr()),
    }
}

fn banks() -> [Bank; 2] {
    [bank(0), bank(1)]
}

fn is_locked<B: RegisterBus + ?Sized>(bus: &B, bank: &Bank) -> bool {
    Cr(bank.cr.read(bus)).lock()
}

fn has_error(sr: Sr) -> bool {
    sr.wrperr()
        || sr.pgserr()
        || sr.strberr()
        || sr.incerr()
        || sr.operr()
        || sr.rdperr()
        || sr.rdserr()
        || sr.sneccerr1()
        || sr.dbeccerr()
}

/// Block until neither bank has a write queued, buffered or in progress.
///
/// Entering standby with a flash operation in flight keeps the domain from powering down.
/// There is no timeout.
pub(crate) fn wait_ready<B: RegisterBus + ?Sized>(bus: &B) {
    let banks = banks();
    spin_until(|| {
        banks.iter().all(|bank| {
            let sr = Sr(bank.sr.read(bus));
            !(sr.qw() || sr.wbne() || sr.bsy())
        })
    });
}

/// Unlock the control registers of both banks.
pub(crate) fn unlock<B: RegisterBus + ?Sized>(bus: &B) -> Result<(), ()> {
    for bank in &banks() {
        if is_locked(bus, bank) {
            bank.keyr.write(bus, KEY1);
            bank.keyr.write(bus, KEY2);
            if is_locked(bus, bank) {
                return Err(());
            }
        }
    }
    Ok(())
}

pub(crate) fn lock<B: RegisterBus + ?Sized>(bus: &B) {
    for bank in &banks() {
        bank.cr.modify(bus, |v| {
            let mut cr = Cr(v);
            cr.set_lock(true);
            cr.0
        });
    }
}

fn option_locked<B: RegisterBus + ?Sized>(bus: &B) -> bool {
    Optcr(optcr().read(bus)).optlock()
}

/// Unlock the option-byte control register.
pub(crate) fn ob_unlock<B: RegisterBus + ?Sized>(bus: &B) -> Result<(), ()> {
    if option_locked(bus) {
        optkeyr().write(bus, OPTKEY1);
        optkeyr().write(bus, OPTKEY2);
        if option_locked(bus) {
            return Err(());
        }
    }
    Ok(())
}

pub(crate) fn ob_lock<B: RegisterBus + ?Sized>(bus: &B) {
    optcr().modify(bus, |v| {
        let mut optcr = Optcr(v);
        optcr.set_optlock(true);
        optcr.0
    });
}

/// Wait for the write queues of both banks to drain, then check the error flags.
pub(crate) fn wait_for_last_operation<B>(bus: &B, polls: u32) -> Result<(), ()>
where
    B: RegisterBus + ?Sized,
{
    for bank in &banks() {
        poll_until(|| !Sr(bank.sr.read(bus)).qw(), polls)?;
        if has_error(Sr(bank.sr.read(bus))) {
            return Err(());
        }
    }
    Ok(())
}

/// Why loading the option bytes did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum LaunchError {
    /// A bank was still computing a CRC.
    CrcBusy,
    /// `OPT_BUSY` never cleared.
    Busy,
    /// The option-byte change was refused.
    ChangeRefused,
}

/// Start loading the programmed option bytes and wait for the change to complete.
///
/// On the STM32H747 a change of the user option bytes resets the chip before this returns.
pub(crate) fn ob_launch<B: RegisterBus + ?Sized>(bus: &B, polls: u32) -> Result<(), LaunchError> {
    for bank in &banks() {
        poll_until(|| !Sr(bank.sr.read(bus)).crc_busy(), polls).map_err(|_| LaunchError::CrcBusy)?;
    }

    optcr().modify(bus, |v| {
        let mut optcr = Optcr(v);
        optcr.set_optstart(true);
        optcr.0
    });

    poll_until(|| !Optsr(optsr_cur().read(bus)).opt_busy(), polls).map_err(|_| LaunchError::Busy)?;
    if Optsr(optsr_cur().read(bus)).optchangeerr() {
        return Err(LaunchError::ChangeRefused);
    }
    Ok(())
}
