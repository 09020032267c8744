//! Time units.

use core::ops::{Add, AddAssign};

/// Delay before the RTC wakes the chip up from Standby Mode.
///
/// Delays add up, so a mixed delay can be written as
/// `WakeupDelay::from_hours(2) + WakeupDelay::from_mins(30)`.
///
/// There is no "forever" value: standby without a wakeup timer is requested with
/// [`LowPower::standby_m7`](crate::LowPower::standby_m7) instead, and the chip then only
/// wakes up on `NRST`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WakeupDelay {
    secs: u64,
}

impl WakeupDelay {
    /// Delay of `hours * 3600 + minutes * 60 + seconds` seconds.
    ///
    /// Components are not range-checked; `(0, 90, 0)` is the same as `(1, 30, 0)`.
    pub const fn new(hours: u64, minutes: u64, seconds: u64) -> Self {
        Self {
            secs: hours
                .wrapping_mul(3600)
                .wrapping_add(minutes.wrapping_mul(60))
                .wrapping_add(seconds),
        }
    }

    pub const fn from_secs(seconds: u64) -> Self {
        Self { secs: seconds }
    }

    pub const fn from_mins(minutes: u64) -> Self {
        Self::new(0, minutes, 0)
    }

    pub const fn from_hours(hours: u64) -> Self {
        Self::new(hours, 0, 0)
    }

    /// Length of the delay in seconds.
    pub const fn as_secs(&self) -> u64 {
        self.secs
    }
}

impl Add for WakeupDelay {
    type Output = WakeupDelay;

    fn add(self, rhs: WakeupDelay) -> WakeupDelay {
        WakeupDelay {
            secs: self.secs.wrapping_add(rhs.secs),
        }
    }
}

impl AddAssign for WakeupDelay {
    fn add_assign(&mut self, rhs: WakeupDelay) {
        *self = *self + rhs;
    }
}

/// Whole seconds; the sub-second part is dropped.
impl From<core::time::Duration> for WakeupDelay {
    fn from(d: core::time::Duration) -> Self {
        Self::from_secs(d.as_secs())
    }
}

/// Whole seconds; the sub-second part is dropped.
#[cfg(feature = "time")]
impl From<embassy_time::Duration> for WakeupDelay {
    fn from(d: embassy_time::Duration) -> Self {
        Self::from_secs(d.as_secs())
    }
}
