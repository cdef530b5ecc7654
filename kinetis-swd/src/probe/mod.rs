//! The register access layer consumed by the Kinetis operations.
//!
//! A debug probe driver provides these traits. The Kinetis code never talks to the
//! wire directly; it only issues access port register transactions, memory bus
//! loads and stores of a given width, and the polling built on top of them.

mod poll;

#[cfg(any(test, feature = "test"))]
pub mod mock;

pub use poll::{Expected, Poll, PollCondition, Polled};

use std::time::Duration;

/// Access port address.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct ApAddress(pub u8);

/// Registers of a MEM-AP, used by the default [`DirectAccess`] implementation.
pub mod mem_ap {
    use super::ApAddress;

    /// The AHB-AP which gives access to the system bus.
    pub const AHB_AP: ApAddress = ApAddress(0);

    /// Control/Status Word register.
    pub const CSW: u8 = 0x00;
    /// Transfer Address Register.
    pub const TAR: u8 = 0x04;
    /// Data Read/Write register.
    pub const DRW: u8 = 0x0C;

    /// CSW value for 32-bit transfers with address auto-increment disabled.
    pub const CSW_32BIT: u32 = 0x2300_0002;
}

/// Errors reported by the access layer.
#[derive(Debug, thiserror::Error, docsplay::Display, PartialEq, Eq)]
pub enum ArmError {
    /// Timeout occurred during operation.
    Timeout,

    /// Memory access to address {address:#010x} was not aligned to {alignment} bytes.
    MemoryNotAligned {
        /// The address of the access.
        address: u32,
        /// The required alignment in bytes.
        alignment: usize,
    },

    /// The register {register:#04x} does not exist on access port {ap}.
    UnknownRegister {
        /// The access port number.
        ap: u8,
        /// The register offset.
        register: u8,
    },

    /// The target did not acknowledge the transfer.
    NoAcknowledge,

    /// {0}
    Other(String),
}

/// Verbosity threshold of the access layer's own diagnostics.
///
/// Levels are ordered, a level includes every level below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LogLevel {
    /// Nothing is reported.
    None,
    /// Only failed transfers are reported.
    Error,
    /// Regular progress messages.
    #[default]
    Normal,
    /// Everything, including the I2C register traffic.
    I2c,
}

/// Low-level access port register access.
pub trait DapAccess {
    /// Read a register of the access port `ap`.
    fn read_raw_ap_register(&mut self, ap: ApAddress, register: u8) -> Result<u32, ArmError>;

    /// Write a register of the access port `ap`.
    fn write_raw_ap_register(
        &mut self,
        ap: ApAddress,
        register: u8,
        value: u32,
    ) -> Result<(), ArmError>;
}

/// An interface to be implemented for drivers that allow target memory access.
///
/// Every width has its own strongly typed operation. Implementations are expected to
/// route all of them through one bus transaction primitive, so that a byte store
/// followed by a word load observes little-endian byte lanes.
pub trait MemoryInterface {
    /// Read a 32bit word at `address`.
    ///
    /// The address has to be a multiple of 4.
    fn read_word_32(&mut self, address: u32) -> Result<u32, ArmError>;

    /// Read a 16bit halfword at `address`.
    ///
    /// The address has to be a multiple of 2.
    fn read_word_16(&mut self, address: u32) -> Result<u16, ArmError>;

    /// Read an 8bit byte at `address`.
    fn read_word_8(&mut self, address: u32) -> Result<u8, ArmError>;

    /// Write a 32bit word at `address`.
    ///
    /// The address has to be a multiple of 4.
    fn write_word_32(&mut self, address: u32, data: u32) -> Result<(), ArmError>;

    /// Write a 16bit halfword at `address`.
    ///
    /// The address has to be a multiple of 2.
    fn write_word_16(&mut self, address: u32, data: u16) -> Result<(), ArmError>;

    /// Write an 8bit byte at `address`.
    fn write_word_8(&mut self, address: u32, data: u8) -> Result<(), ArmError>;

    /// Read a block of 32bit words starting at `address`.
    ///
    /// The number of words read is `data.len()`.
    fn read_32(&mut self, address: u32, data: &mut [u32]) -> Result<(), ArmError> {
        for (offset, word) in (0u32..).step_by(4).zip(data.iter_mut()) {
            *word = self.read_word_32(address + offset)?;
        }
        Ok(())
    }

    /// Write a block of 32bit words starting at `address`.
    fn write_32(&mut self, address: u32, data: &[u32]) -> Result<(), ArmError> {
        for (offset, word) in (0u32..).step_by(4).zip(data.iter()) {
            self.write_word_32(address + offset, *word)?;
        }
        Ok(())
    }
}

/// Single register access which bypasses per-call address setup.
///
/// [`DirectAccess::select_direct`] points the AHB-AP at one 32-bit register, after
/// which every [`DirectAccess::write_direct`] and [`DirectAccess::read_direct`] is a
/// single DRW transfer. This is for time-critical loops only, such as racing the
/// watchdog while requesting a debug halt. Everything else should go through
/// [`MemoryInterface`].
pub trait DirectAccess: DapAccess {
    /// Select the register that subsequent direct accesses go to.
    fn select_direct(&mut self, address: u32) -> Result<(), ArmError> {
        self.write_raw_ap_register(mem_ap::AHB_AP, mem_ap::CSW, mem_ap::CSW_32BIT)?;
        self.write_raw_ap_register(mem_ap::AHB_AP, mem_ap::TAR, address)
    }

    /// Write the selected register.
    fn write_direct(&mut self, value: u32) -> Result<(), ArmError> {
        self.write_raw_ap_register(mem_ap::AHB_AP, mem_ap::DRW, value)
    }

    /// Read the selected register.
    fn read_direct(&mut self) -> Result<u32, ArmError> {
        self.read_raw_ap_register(mem_ap::AHB_AP, mem_ap::DRW)
    }
}

/// Control over the access layer's diagnostic output.
pub trait LogControl {
    /// The current threshold.
    fn log_level(&self) -> LogLevel;

    /// Change the threshold.
    fn set_log_level(&mut self, level: LogLevel);
}

/// Blocking delays between polls.
pub trait Delay {
    /// Block for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(ms.into()));
    }
}

/// Everything the Kinetis operations need from a probe.
pub trait ArmProbe: DapAccess + MemoryInterface + DirectAccess + LogControl + Delay {}

impl<T> ArmProbe for T where T: DapAccess + MemoryInterface + DirectAccess + LogControl + Delay {}
