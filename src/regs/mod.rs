//! Typed register access.
//!
//! Every register this crate touches is described by a [`Reg`]: its address, taken from the
//! PAC register block, the bits software is allowed to change, and the reserved bits the
//! reference manual requires to be written as one. Reserved-bit preservation is therefore
//! enforced here once instead of at each call site. Field values are encoded and decoded
//! with the PAC value types.
//!
//! Accesses go through a [`RegisterBus`], and the handful of instructions the standby
//! procedures need (barriers, `WFI`, D-cache maintenance) go through
//! [`CoreInstructions`]. [`Mmio`] implements both on hardware; tests use a simulated
//! register file.

#[cfg(test)]
pub(crate) mod sim;

/// Word-wide access to memory-mapped registers.
pub trait RegisterBus {
    /// Read the 32-bit register at `addr`.
    fn read(&self, addr: u32) -> u32;
    /// Write `value` to the 32-bit register at `addr`.
    fn write(&self, addr: u32, value: u32);
}

/// Core instructions used around a power-state transition.
pub trait CoreInstructions {
    /// Data synchronization barrier.
    fn dsb(&self);
    /// Instruction synchronization barrier.
    fn isb(&self);
    /// Wait for interrupt. With `SLEEPDEEP` set this is the power-down request.
    fn wfi(&self);
    /// Clean the whole data cache to the point of coherency.
    fn clean_dcache(&self);
}

/// Everything a low-power procedure needs from the platform.
pub trait Platform: RegisterBus + CoreInstructions {}

impl<T: RegisterBus + CoreInstructions + ?Sized> Platform for T {}

impl<T: RegisterBus + ?Sized> RegisterBus for &T {
    #[inline]
    fn read(&self, addr: u32) -> u32 {
        T::read(self, addr)
    }

    #[inline]
    fn write(&self, addr: u32, value: u32) {
        T::write(self, addr, value)
    }
}

impl<T: CoreInstructions + ?Sized> CoreInstructions for &T {
    #[inline]
    fn dsb(&self) {
        T::dsb(self)
    }

    #[inline]
    fn isb(&self) {
        T::isb(self)
    }

    #[inline]
    fn wfi(&self) {
        T::wfi(self)
    }

    #[inline]
    fn clean_dcache(&self) {
        T::clean_dcache(self)
    }
}

/// A 32-bit register with its reserved-bit rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reg {
    addr: u32,
    /// Bits software may change. All other bits keep the value read back.
    writable: u32,
    /// Reserved bits that must always be written as one.
    forced: u32,
}

impl Reg {
    /// A register without reserved bits.
    pub const fn new(addr: u32) -> Self {
        Self {
            addr,
            writable: u32::MAX,
            forced: 0,
        }
    }

    /// The register behind a PAC or `cortex-m` register pointer.
    #[inline]
    pub fn at<T>(ptr: *const T) -> Self {
        Self::new(ptr as usize as u32)
    }

    /// Restrict software to `writable` bits and force `forced` bits to one on every write.
    pub const fn reserved(self, writable: u32, forced: u32) -> Self {
        Self {
            addr: self.addr,
            writable: writable & !forced,
            forced,
        }
    }

    /// Register address.
    pub const fn addr(&self) -> u32 {
        self.addr
    }

    /// Mask of bits software may change.
    pub const fn writable(&self) -> u32 {
        self.writable
    }

    /// Mask of reserved bits forced to one.
    pub const fn forced(&self) -> u32 {
        self.forced
    }

    #[inline]
    pub fn read<B: RegisterBus + ?Sized>(&self, bus: &B) -> u32 {
        bus.read(self.addr)
    }

    /// Write the bits of `value` selected by `mask`, leaving every other bit as read back.
    ///
    /// When every bit is writable and selected the register is written without being read,
    /// which keeps write-one-to-act registers (NVIC `ICER`, RCC reset registers) free of a
    /// spurious read.
    #[inline]
    pub fn write_masked<B: RegisterBus + ?Sized>(&self, bus: &B, value: u32, mask: u32) {
        let mask = mask & self.writable;
        let new = if mask == u32::MAX {
            value
        } else {
            (bus.read(self.addr) & !mask) | (value & mask)
        };
        bus.write(self.addr, new | self.forced);
    }

    /// Write `value`, subject to the reserved-bit rules.
    #[inline]
    pub fn write<B: RegisterBus + ?Sized>(&self, bus: &B, value: u32) {
        self.write_masked(bus, value, u32::MAX)
    }

    /// Read, transform and write back, subject to the reserved-bit rules.
    #[inline]
    pub fn modify<B: RegisterBus + ?Sized>(&self, bus: &B, f: impl FnOnce(u32) -> u32) {
        let old = bus.read(self.addr);
        let new = f(old);
        bus.write(
            self.addr,
            (old & !self.writable) | (new & self.writable) | self.forced,
        );
    }

    #[inline]
    pub fn set_bits<B: RegisterBus + ?Sized>(&self, bus: &B, bits: u32) {
        self.modify(bus, |v| v | bits)
    }

    #[inline]
    pub fn clear_bits<B: RegisterBus + ?Sized>(&self, bus: &B, bits: u32) {
        self.modify(bus, |v| v & !bits)
    }

    /// Whether any of `bits` reads back as one.
    #[inline]
    pub fn any_set<B: RegisterBus + ?Sized>(&self, bus: &B, bits: u32) -> bool {
        self.read(bus) & bits != 0
    }
}

/// Register backend for the real chip: volatile accesses and Cortex-M instructions.
pub struct Mmio {
    _private: (),
}

impl Mmio {
    pub(crate) const fn new() -> Self {
        Self { _private: () }
    }
}

impl RegisterBus for Mmio {
    #[inline]
    fn read(&self, addr: u32) -> u32 {
        // Every address handed to the bus comes from a PAC or `cortex-m` register block.
        unsafe { core::ptr::read_volatile(addr as usize as *const u32) }
    }

    #[inline]
    fn write(&self, addr: u32, value: u32) {
        unsafe { core::ptr::write_volatile(addr as usize as *mut u32, value) }
    }
}

impl CoreInstructions for Mmio {
    #[inline]
    fn dsb(&self) {
        cortex_m::asm::dsb();
    }

    #[inline]
    fn isb(&self) {
        cortex_m::asm::isb();
    }

    #[inline]
    fn wfi(&self) {
        cortex_m::asm::wfi();
    }

    #[inline]
    fn clean_dcache(&self) {
        // Only reached from the standby procedures, with interrupts disabled.
        let mut cp = unsafe { cortex_m::Peripherals::steal() };
        cp.SCB.clean_dcache(&mut cp.CPUID);
    }
}

#[cfg(test)]
mod tests;
