//! Deep Sleep and time accounting.
//!
//! Deep Sleep is entered by the runtime's idle loop, not by this crate. The runtime (or RTOS
//! glue) implements these traits, and [`LowPower`](crate::LowPower) exposes them next to the
//! Standby API.

/// CPU time statistics kept by the runtime, in microseconds.
pub trait CpuStats {
    /// Time since boot.
    fn uptime_us(&self) -> u64;
    /// Time spent idle, in any sleep mode.
    fn idle_time_us(&self) -> u64;
    /// Time spent in Sleep Mode.
    fn sleep_time_us(&self) -> u64;
    /// Time spent in Deep Sleep Mode.
    fn deep_sleep_time_us(&self) -> u64;
}

/// Deep-sleep lock bookkeeping. A driver that needs its clocks holds a lock.
pub trait DeepSleepGate {
    /// No lock is held, so the idle loop may enter Deep Sleep.
    fn can_deep_sleep(&self) -> bool;
    /// Number of locks currently held.
    fn deep_sleep_lock_count(&self) -> u16;
}

/// Peripherals that keep the chip out of Deep Sleep until they are shut down.
pub trait PeripheralShutdown {
    /// Power down the USB PHY.
    fn deinit_usb_phy(&mut self);
    /// Stop the microsecond ticker, which otherwise holds a deep-sleep lock.
    fn stop_us_ticker(&mut self);
}
