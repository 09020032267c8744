//! RTC wakeup timer.
//!
//! The RTC runs from the LSE with the prescalers set for a 1 Hz `ck_spre`, which the wakeup
//! timer counts down from. Reloads up to 16 bits count `ck_spre` directly; longer delays use
//! the extended clock setting, in which the hardware adds 2^16 to the reload.

use crate::exti;
use crate::pac::rtc::regs::{Cr, Isr, Prer, Wpr, Wutr};
use crate::pac::rtc::vals::{Fmt, Wucksel};
use crate::pac::RTC;
use crate::rcc;
use crate::regs::{Reg, RegisterBus};
use crate::utils::spin_until;
use crate::Error;

pub(crate) fn cr() -> Reg {
    Reg::at(RTC.cr().as_ptr()).reserved(0x00FF_FF7F, 0)
}

pub(crate) fn isr() -> Reg {
    Reg::at(RTC.isr().as_ptr()).reserved(0x0000_FFFF, 0)
}

pub(crate) fn prer() -> Reg {
    Reg::at(RTC.prer().as_ptr()).reserved(0x007F_7FFF, 0)
}

pub(crate) fn wutr() -> Reg {
    Reg::at(RTC.wutr().as_ptr()).reserved(0x0000_FFFF, 0)
}

pub(crate) fn wpr() -> Reg {
    Reg::at(RTC.wpr().as_ptr()).reserved(0x0000_00FF, 0)
}

// 32768 Hz / (127 + 1) / (255 + 1) = 1 Hz
const PREDIV_A: u8 = 127;
const PREDIV_S: u16 = 255;

const WPR_KEY1: u8 = 0xCA;
const WPR_KEY2: u8 = 0x53;
const WPR_LOCK: u8 = 0xFF;

/// Delays from here on use the extended wakeup clock.
pub const EXTENDED_THRESHOLD: u32 = 1 << 16;

/// Longest accepted wakeup delay is one second below this.
pub const MAX_WAKEUP_SECS: u32 = 2 << 17;

/// Clock the wakeup timer counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeupClock {
    /// `ck_spre`, 1 Hz.
    Ckspre,
    /// `ck_spre` with 2^16 added to the reload.
    CkspreExtended,
}

impl WakeupClock {
    pub(crate) fn wucksel(self) -> Wucksel {
        match self {
            WakeupClock::Ckspre => Wucksel::CLOCKSPARE,
            WakeupClock::CkspreExtended => Wucksel::CLOCKSPAREWITHOFFSET,
        }
    }
}

/// Reload value and clock for a wakeup delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WakeupReload {
    pub reload: u32,
    pub clock: WakeupClock,
}

/// Split a delay in seconds into the wakeup timer reload and clock.
///
/// `secs` must be below [`MAX_WAKEUP_SECS`].
pub const fn wakeup_reload(secs: u32) -> WakeupReload {
    if secs < EXTENDED_THRESHOLD {
        WakeupReload {
            reload: secs,
            clock: WakeupClock::Ckspre,
        }
    } else {
        WakeupReload {
            reload: secs - EXTENDED_THRESHOLD,
            clock: WakeupClock::CkspreExtended,
        }
    }
}

fn write_key<B: RegisterBus + ?Sized>(bus: &B, key: u8) {
    let mut w = Wpr(0);
    w.set_key(key);
    wpr().write(bus, w.0);
}

fn modify_cr<B: RegisterBus + ?Sized>(bus: &B, f: impl FnOnce(&mut Cr)) {
    cr().modify(bus, |v| {
        let mut cr = Cr(v);
        f(&mut cr);
        cr.0
    });
}

fn modify_isr<B: RegisterBus + ?Sized>(bus: &B, f: impl FnOnce(&mut Isr)) {
    isr().modify(bus, |v| {
        let mut isr = Isr(v);
        f(&mut isr);
        isr.0
    });
}

fn read_isr<B: RegisterBus + ?Sized>(bus: &B) -> Isr {
    Isr(isr().read(bus))
}

/// Clock the RTC from the LSE and arm the wakeup timer to fire after `secs` seconds.
///
/// The timer interrupt and EXTI line 19 rising edge are enabled; routing the line to the
/// NVIC is left to the caller.
///
/// From 131072 s on the reload no longer fits the 16-bit `WUT` field and only its low 16 bits
/// are written, so the timer fires early.
pub(crate) fn configure_wakeup<B>(bus: &B, secs: u32, polls: u32) -> Result<(), Error>
where
    B: RegisterBus + ?Sized,
{
    rcc::enable_lse(bus, polls).map_err(|_| {
        warn!("rtc: LSE did not start");
        Error::EnableLseFailed
    })?;
    rcc::select_rtc_lse(bus, polls).map_err(|_| {
        warn!("rtc: could not clock the RTC from the LSE");
        Error::SelectLseFailed
    })?;
    rcc::enable_rtc(bus);

    write_key(bus, WPR_KEY1);
    write_key(bus, WPR_KEY2);

    modify_isr(bus, |w| w.set_init(true));
    spin_until(|| read_isr(bus).initf());

    modify_cr(bus, |w| w.set_fmt(Fmt::TWENTY_FOUR_HOUR));
    let mut prescalers = Prer(0);
    prescalers.set_prediv_s(PREDIV_S);
    prer().write(bus, prescalers.0);
    prescalers.set_prediv_a(PREDIV_A);
    prer().write(bus, prescalers.0);

    modify_isr(bus, |w| w.set_init(false));
    spin_until(|| !read_isr(bus).initf());

    modify_cr(bus, |w| {
        w.set_wutie(false);
        w.set_wute(false);
    });
    spin_until(|| read_isr(bus).wutwf());

    let WakeupReload { reload, clock } = wakeup_reload(secs);
    debug!("rtc: wakeup in {} s, reload {} on {:?}", secs, reload, clock);
    if reload > u32::from(u16::MAX) {
        warn!("rtc: reload {} does not fit WUTR and is truncated", reload);
    }
    let mut w = Wutr(wutr().read(bus));
    w.set_wut(reload as u16);
    wutr().write(bus, w.0);
    modify_cr(bus, |w| w.set_wucksel(clock.wucksel()));

    modify_cr(bus, |w| {
        w.set_wute(true);
        w.set_wutie(true);
    });
    exti::enable_rtc_wakeup_rising_edge(bus);

    // The flags are cleared by writing zero; every other flag is written as one to keep it.
    let mut clear = Isr(!0);
    clear.set_wutf(false);
    clear.set_init(read_isr(bus).init());
    isr().write(bus, clear.0);

    write_key(bus, WPR_LOCK);
    Ok(())
}
