#![allow(missing_docs)] // Don't require docs for test code
//! A register level simulation of a Kinetis K20 part.
//!
//! [`MockKinetis`] implements every access layer trait and models the parts of the
//! chip the bring-up, flash and I/O code touch: the MDM-AP reset and mass erase
//! handshake, DHCSR halting, the MCG status bits, the FTFL longword program command,
//! bit-band aliasing and an I2C0 master talking to a scripted slave. Every transfer is
//! recorded in an [`Operation`] log so tests can check ordering.

use std::collections::{HashMap, VecDeque};

use super::{
    mem_ap, ApAddress, ArmError, DapAccess, Delay, DirectAccess, LogControl, LogLevel,
    MemoryInterface,
};
use crate::kinetis::registers::*;
use crate::MemoryMappedRegister;

/// A single transfer seen by the mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ApRead { ap: u8, register: u8, value: u32 },
    ApWrite { ap: u8, register: u8, value: u32 },
    Read { address: u32, size: u8, value: u32 },
    Write { address: u32, size: u8, value: u32 },
    Delay(u32),
    SetLogLevel(LogLevel),
}

#[derive(Debug, Clone, Copy)]
struct PendingReset {
    asserted: bool,
    reads_left: u32,
}

#[derive(Debug, Default)]
struct MockI2c {
    c1: u8,
    busy: bool,
    iicif: bool,
    current: u8,
    rx: VecDeque<u8>,
    written: Vec<u8>,
    acks: Vec<bool>,
    starts: u32,
    stops: u32,
    repeated_starts: u32,
}

impl MockI2c {
    fn reset_registers(&mut self) {
        self.c1 = 0;
        self.busy = false;
        self.iicif = false;
    }

    fn control(&self) -> I2cC1 {
        I2cC1(self.c1)
    }
}

/// Simulated Kinetis target.
///
/// The public fields are knobs which change how the part behaves. They can be changed
/// at any time between operations.
#[derive(Debug)]
pub struct MockKinetis {
    /// Value of the MDM-AP IDR.
    pub idr: u32,
    /// The part reports SYS_SECURITY until it is mass erased.
    pub secured: bool,
    pub flash_ready: bool,
    pub mass_erase_enabled: bool,
    /// FLASH_ERASE_ACK as currently reported.
    pub erase_acknowledged: bool,
    /// Status reads before a reset request or release becomes visible.
    pub reset_latency: u32,
    /// The system never leaves reset once it entered it.
    pub stuck_in_reset: bool,
    /// Halt requests needed before the core halts. `None` never halts.
    pub halt_after: Option<u32>,
    /// The next `drw_faults` DRW transfers fail without an acknowledge.
    pub drw_faults: u32,
    /// CONTROL reads until a mass erase completes.
    pub erase_latency: u32,
    /// The crystal oscillator never starts.
    pub osc_dead: bool,
    /// The flash controller never reports CCIF.
    pub flash_busy: bool,
    /// Flash programming fails with FPVIOL.
    pub write_protected: bool,
    /// MGSTAT0 is reported after every command.
    pub mgstat0: bool,
    /// Byte stores to RAM are dropped.
    pub byte_writes_ignored: bool,
    /// The I2C transfer complete flag never rises.
    pub i2c_stalled: bool,
    /// The I2C bus stays busy after a stop.
    pub i2c_bus_stuck: bool,

    operations: Vec<Operation>,
    log_level: LogLevel,

    memory: HashMap<u32, u8>,
    flash: Vec<u8>,

    csw: u32,
    tar: u32,

    mdm_control: u32,
    in_reset: bool,
    pending_reset: Option<PendingReset>,
    resets: u32,
    erase_reads_left: Option<u32>,
    mass_erases: u32,

    dhcsr: u32,
    halted: bool,
    halt_requests: u32,

    fstat_errors: u8,
    flash_commands: u32,

    i2c: MockI2c,
}

impl Default for MockKinetis {
    fn default() -> Self {
        Self::new()
    }
}

impl MockKinetis {
    /// Flash size of the simulated part.
    pub const FLASH_SIZE: usize = 128 * 1024;

    /// A healthy, unsecured part with erased flash.
    pub fn new() -> Self {
        let mut mock = Self {
            idr: MDM_IDR_K_SERIES,
            secured: false,
            flash_ready: true,
            mass_erase_enabled: true,
            erase_acknowledged: false,
            reset_latency: 3,
            stuck_in_reset: false,
            halt_after: Some(3),
            drw_faults: 0,
            erase_latency: 5,
            osc_dead: false,
            flash_busy: false,
            write_protected: false,
            mgstat0: false,
            byte_writes_ignored: false,
            i2c_stalled: false,
            i2c_bus_stuck: false,
            operations: Vec::new(),
            log_level: LogLevel::default(),
            memory: HashMap::new(),
            flash: vec![0xff; Self::FLASH_SIZE],
            csw: 0,
            tar: 0,
            mdm_control: 0,
            in_reset: false,
            pending_reset: None,
            resets: 0,
            erase_reads_left: None,
            mass_erases: 0,
            dhcsr: 0,
            halted: false,
            halt_requests: 0,
            fstat_errors: 0,
            flash_commands: 0,
            i2c: MockI2c::default(),
        };
        mock.reset_peripherals();
        mock
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn clear_operations(&mut self) {
        self.operations.clear();
    }

    /// Values of all memory writes to `address`, in order.
    pub fn writes_to(&self, address: u32) -> Vec<u32> {
        self.operations
            .iter()
            .filter_map(|op| match op {
                Operation::Write {
                    address: a, value, ..
                } if *a == address => Some(*value),
                _ => None,
            })
            .collect()
    }

    /// Number of memory writes to any of `addresses`.
    pub fn write_count(&self, addresses: &[u32]) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, Operation::Write { address, .. } if addresses.contains(address)))
            .count()
    }

    /// Values written to an access port register, in order.
    pub fn ap_writes(&self, ap: ApAddress, register: u8) -> Vec<u32> {
        self.operations
            .iter()
            .filter_map(|op| match op {
                Operation::ApWrite {
                    ap: a,
                    register: r,
                    value,
                } if *a == ap.0 && *r == register => Some(*value),
                _ => None,
            })
            .collect()
    }

    /// Reads a word from flash or RAM without side effects and without logging.
    pub fn peek_32(&self, address: u32) -> u32 {
        (0..4).fold(0, |word, i| {
            word | u32::from(self.peek_8(address + i)) << (8 * i)
        })
    }

    pub fn peek_8(&self, address: u32) -> u8 {
        match self.flash.get(address as usize) {
            Some(byte) => *byte,
            None => self.memory.get(&address).copied().unwrap_or(0),
        }
    }

    /// Stores a word in flash or RAM without side effects and without logging.
    pub fn poke_32(&mut self, address: u32, value: u32) {
        for (i, byte) in (0u32..).zip(value.to_le_bytes()) {
            match self.flash.get_mut((address + i) as usize) {
                Some(cell) => *cell = byte,
                None => {
                    self.memory.insert(address + i, byte);
                }
            }
        }
    }

    pub fn fill_flash(&mut self, value: u8) {
        self.flash.fill(value);
    }

    pub fn in_reset(&self) -> bool {
        self.in_reset
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn halt_requests(&self) -> u32 {
        self.halt_requests
    }

    /// How often the system entered reset.
    pub fn resets(&self) -> u32 {
        self.resets
    }

    pub fn mass_erases(&self) -> u32 {
        self.mass_erases
    }

    /// Flash commands that were executed, successful or not.
    pub fn flash_commands(&self) -> u32 {
        self.flash_commands
    }

    /// Bytes the slave will send, in order.
    pub fn i2c_queue_rx(&mut self, bytes: &[u8]) {
        self.i2c.rx.extend(bytes);
    }

    /// Bytes the master transmitted, including address bytes.
    pub fn i2c_written(&self) -> &[u8] {
        &self.i2c.written
    }

    /// For every byte clocked in by the master, whether it was acknowledged.
    pub fn i2c_acks(&self) -> &[bool] {
        &self.i2c.acks
    }

    pub fn i2c_starts(&self) -> u32 {
        self.i2c.starts
    }

    pub fn i2c_stops(&self) -> u32 {
        self.i2c.stops
    }

    pub fn i2c_repeated_starts(&self) -> u32 {
        self.i2c.repeated_starts
    }

    /// Peripheral state after a system reset.
    fn reset_peripherals(&mut self) {
        self.memory.retain(|address, _| *address < BITBAND_REGION_BASE);
        self.memory.insert(MCG_C1, MCG_C1_IREFS);
        self.fstat_errors = 0;
        self.i2c.reset_registers();
    }

    fn mdm_status(&mut self) -> u32 {
        if let Some(pending) = self.pending_reset.as_mut() {
            if pending.reads_left == 0 {
                let asserted = pending.asserted;
                self.pending_reset = None;
                self.apply_reset(asserted);
            } else {
                pending.reads_left -= 1;
            }
        }

        let mut status = 0;
        if self.erase_acknowledged {
            status |= MDM_STATUS_FLASH_ERASE_ACK;
        }
        if self.flash_ready {
            status |= MDM_STATUS_FLASH_READY;
        }
        if self.secured {
            status |= MDM_STATUS_SYS_SECURITY;
        }
        if !self.in_reset {
            status |= MDM_STATUS_SYS_NRESET;
        }
        if self.mass_erase_enabled {
            status |= MDM_STATUS_MASS_ERASE_ENABLE;
        }
        status
    }

    fn apply_reset(&mut self, asserted: bool) {
        if asserted == self.in_reset || (!asserted && self.stuck_in_reset) {
            return;
        }

        tracing::trace!("mock: system reset {}", if asserted { "asserted" } else { "released" });
        self.in_reset = asserted;
        if asserted {
            self.resets += 1;
            self.halted = false;
            self.halt_requests = 0;
            self.dhcsr = 0;
            self.reset_peripherals();
        }
    }

    fn mdm_control(&mut self) -> u32 {
        if let Some(reads_left) = self.erase_reads_left {
            if reads_left == 0 {
                tracing::trace!("mock: mass erase complete");
                self.erase_reads_left = None;
                self.mdm_control &= !MDM_CONTROL_MASS_ERASE;
                self.erase_acknowledged = false;
                self.secured = false;
                self.flash.fill(0xff);
            } else {
                self.erase_reads_left = Some(reads_left - 1);
            }
        }
        self.mdm_control
    }

    fn write_mdm_control(&mut self, value: u32) {
        self.mdm_control = value;

        let asserted = value & MDM_CONTROL_SYS_RESET_REQ != 0;
        self.pending_reset = (asserted != self.in_reset).then_some(PendingReset {
            asserted,
            reads_left: self.reset_latency,
        });

        if value & MDM_CONTROL_MASS_ERASE != 0
            && self.mass_erase_enabled
            && self.erase_reads_left.is_none()
        {
            self.mass_erases += 1;
            self.erase_acknowledged = true;
            self.erase_reads_left = Some(self.erase_latency);
        }
    }

    fn read_dhcsr(&self) -> u32 {
        let mut dhcsr = Dhcsr(self.dhcsr & 0xffff);
        dhcsr.0 |= 1 << 16;
        if self.halted {
            dhcsr.0 |= 1 << 17;
        }
        dhcsr.into()
    }

    fn write_dhcsr(&mut self, value: u32) {
        if value >> 16 != 0xa05f {
            return;
        }
        let dhcsr = Dhcsr(value);
        self.dhcsr = value & 0xffff;

        if dhcsr.c_halt() && dhcsr.c_debugen() {
            self.halt_requests += 1;
            if self.halt_after.is_some_and(|n| self.halt_requests >= n) {
                self.halted = true;
            }
        }
    }

    fn mcg_status(&self) -> u8 {
        let c1 = self.peek_8(MCG_C1);
        let c2 = self.peek_8(MCG_C2);
        let c6 = self.peek_8(MCG_C6);
        let pll = c6 & MCG_C6_PLLS != 0;

        let mut status = 0;
        if c2 & MCG_C2_EREFS != 0 && !self.osc_dead {
            status |= MCG_S_OSCINIT0;
        }
        if c1 & MCG_C1_IREFS != 0 {
            status |= MCG_S_IREFST;
        }
        status |= match c1 >> 6 {
            0 if pll => mcg_s_clkst(3),
            0 => mcg_s_clkst(0),
            clks => mcg_s_clkst(clks),
        };
        if pll {
            status |= MCG_S_PLLST | MCG_S_LOCK0;
        }
        status
    }

    fn fstat(&self) -> u8 {
        let mut fstat = self.fstat_errors;
        if !self.flash_busy {
            fstat |= FTFL_FSTAT_CCIF;
        }
        if self.mgstat0 {
            fstat |= 1;
        }
        fstat
    }

    fn write_fstat(&mut self, value: u8) {
        self.fstat_errors &= !value;
        if value & FTFL_FSTAT_CCIF != 0 && !self.flash_busy {
            self.execute_flash_command();
        }
    }

    fn execute_flash_command(&mut self) {
        let fccob = FTFL_FCCOB.map(|address| self.memory.get(&address).copied().unwrap_or(0));
        self.flash_commands += 1;

        if fccob[0] != FTFL_CMD_PROGRAM_LONGWORD {
            tracing::trace!("mock: unsupported flash command {:#04x}", fccob[0]);
            self.fstat_errors |= FTFL_FSTAT_ACCERR;
            return;
        }

        let address = u32::from_be_bytes([0, fccob[1], fccob[2], fccob[3]]) as usize;
        let data = u32::from_be_bytes([fccob[4], fccob[5], fccob[6], fccob[7]]);

        if address % 4 != 0 || address + 4 > self.flash.len() {
            self.fstat_errors |= FTFL_FSTAT_ACCERR;
        } else if self.write_protected {
            self.fstat_errors |= FTFL_FSTAT_FPVIOL;
        } else {
            tracing::trace!("mock: program {:#010x} = {:#010x}", address, data);
            for (cell, byte) in self.flash[address..address + 4]
                .iter_mut()
                .zip(data.to_le_bytes())
            {
                *cell &= byte;
            }
        }
    }

    fn write_i2c_control(&mut self, value: u8) {
        let old = self.i2c.control();
        let mut new = I2cC1(value);

        if !old.mst() && new.mst() {
            self.i2c.starts += 1;
            self.i2c.busy = true;
        } else if old.mst() && !new.mst() {
            self.i2c.stops += 1;
            self.i2c.busy = self.i2c_bus_stuck;
        }
        if new.rsta() {
            self.i2c.repeated_starts += 1;
            new.set_rsta(false);
        }
        self.i2c.c1 = new.into();
    }

    fn i2c_status(&self) -> u8 {
        let mut status = 0;
        if !self.i2c_stalled {
            status |= 1 << 7;
        }
        if self.i2c.busy {
            status |= 1 << 5;
        }
        let mut status = I2cS(status);
        status.set_iicif(self.i2c.iicif);
        status.into()
    }

    fn write_i2c_data(&mut self, value: u8) {
        let c1 = self.i2c.control();
        if c1.mst() && c1.tx() {
            self.i2c.written.push(value);
            self.i2c.iicif = !self.i2c_stalled;
        }
    }

    fn read_i2c_data(&mut self) -> u8 {
        let c1 = self.i2c.control();
        let value = self.i2c.current;
        if c1.mst() && !c1.tx() {
            self.i2c.acks.push(!c1.txak());
            self.i2c.current = self.i2c.rx.pop_front().unwrap_or(0xff);
            self.i2c.iicif = !self.i2c_stalled;
        }
        value
    }

    fn read_byte(&mut self, address: u32) -> u8 {
        match address {
            MCG_S => self.mcg_status(),
            Fstat::ADDRESS => self.fstat(),
            I2cC1::ADDRESS => self.i2c.c1,
            I2cS::ADDRESS => self.i2c_status(),
            I2C0_D => self.read_i2c_data(),
            _ => self.peek_8(address),
        }
    }

    fn write_byte(&mut self, address: u32, value: u8) {
        match address {
            a if (a as usize) < self.flash.len() => {
                tracing::trace!("mock: ignoring bus write to flash at {:#010x}", a)
            }
            USB0_USBTRC0 => {
                self.memory
                    .insert(address, value & !USB_USBTRC_USBRESET);
            }
            Fstat::ADDRESS => self.write_fstat(value),
            I2cC1::ADDRESS => self.write_i2c_control(value),
            I2cS::ADDRESS => {
                if I2cS(value).iicif() {
                    self.i2c.iicif = false;
                }
            }
            I2C0_D => self.write_i2c_data(value),
            _ => {
                self.memory.insert(address, value);
            }
        }
    }

    fn bitband_target(address: u32) -> Option<(u32, u32)> {
        let offset = address.checked_sub(BITBAND_ALIAS_BASE)?;
        (offset < 0x0200_0000).then(|| (BITBAND_REGION_BASE + offset / 32, (offset % 32) / 4))
    }

    /// The single bus transaction primitive all accesses go through.
    fn bus_read(&mut self, address: u32, size: u8) -> u32 {
        if address == Dhcsr::ADDRESS {
            return self.read_dhcsr();
        }
        if let Some((byte_address, bit)) = Self::bitband_target(address) {
            return u32::from(self.read_byte(byte_address) >> bit & 1);
        }
        (0..u32::from(size)).fold(0, |value, i| {
            value | u32::from(self.read_byte(address + i)) << (8 * i)
        })
    }

    fn bus_write(&mut self, address: u32, size: u8, value: u32) {
        if address == Dhcsr::ADDRESS {
            return self.write_dhcsr(value);
        }
        if let Some((byte_address, bit)) = Self::bitband_target(address) {
            let byte = self.peek_8(byte_address) & !(1 << bit) | ((value & 1) as u8) << bit;
            return self.write_byte(byte_address, byte);
        }
        if size == 1 && address < BITBAND_REGION_BASE && self.byte_writes_ignored {
            return;
        }
        for (i, byte) in (0..u32::from(size)).zip(value.to_le_bytes()) {
            self.write_byte(address + i, byte);
        }
    }

    fn logged_read(&mut self, address: u32, size: u8) -> Result<u32, ArmError> {
        if address % u32::from(size) != 0 {
            return Err(ArmError::MemoryNotAligned {
                address,
                alignment: size.into(),
            });
        }
        let value = self.bus_read(address, size);
        tracing::trace!("mock: read{} {:#010x} = {:#x}", 8 * size, address, value);
        self.operations.push(Operation::Read {
            address,
            size,
            value,
        });
        Ok(value)
    }

    fn logged_write(&mut self, address: u32, size: u8, value: u32) -> Result<(), ArmError> {
        if address % u32::from(size) != 0 {
            return Err(ArmError::MemoryNotAligned {
                address,
                alignment: size.into(),
            });
        }
        tracing::trace!("mock: write{} {:#010x} = {:#x}", 8 * size, address, value);
        self.operations.push(Operation::Write {
            address,
            size,
            value,
        });
        self.bus_write(address, size, value);
        Ok(())
    }

    fn drw_fault(&mut self) -> Result<(), ArmError> {
        if self.drw_faults > 0 {
            self.drw_faults -= 1;
            return Err(ArmError::NoAcknowledge);
        }
        Ok(())
    }
}

impl DapAccess for MockKinetis {
    fn read_raw_ap_register(&mut self, ap: ApAddress, register: u8) -> Result<u32, ArmError> {
        let value = match (ap, register) {
            (mem_ap::AHB_AP, mem_ap::CSW) => self.csw,
            (mem_ap::AHB_AP, mem_ap::TAR) => self.tar,
            (mem_ap::AHB_AP, mem_ap::DRW) => {
                self.drw_fault()?;
                self.bus_read(self.tar, 4)
            }
            (MDM_AP, MDM_STATUS) => self.mdm_status(),
            (MDM_AP, MDM_CONTROL) => self.mdm_control(),
            (MDM_AP, MDM_IDR) => self.idr,
            _ => return Err(ArmError::UnknownRegister { ap: ap.0, register }),
        };

        self.operations.push(Operation::ApRead {
            ap: ap.0,
            register,
            value,
        });
        Ok(value)
    }

    fn write_raw_ap_register(
        &mut self,
        ap: ApAddress,
        register: u8,
        value: u32,
    ) -> Result<(), ArmError> {
        match (ap, register) {
            (mem_ap::AHB_AP, mem_ap::CSW) => self.csw = value,
            (mem_ap::AHB_AP, mem_ap::TAR) => self.tar = value,
            (mem_ap::AHB_AP, mem_ap::DRW) => {
                self.drw_fault()?;
                self.bus_write(self.tar, 4, value);
            }
            (MDM_AP, MDM_CONTROL) => self.write_mdm_control(value),
            _ => return Err(ArmError::UnknownRegister { ap: ap.0, register }),
        }

        self.operations.push(Operation::ApWrite {
            ap: ap.0,
            register,
            value,
        });
        Ok(())
    }
}

impl MemoryInterface for MockKinetis {
    fn read_word_32(&mut self, address: u32) -> Result<u32, ArmError> {
        self.logged_read(address, 4)
    }

    fn read_word_16(&mut self, address: u32) -> Result<u16, ArmError> {
        self.logged_read(address, 2).map(|value| value as u16)
    }

    fn read_word_8(&mut self, address: u32) -> Result<u8, ArmError> {
        self.logged_read(address, 1).map(|value| value as u8)
    }

    fn write_word_32(&mut self, address: u32, data: u32) -> Result<(), ArmError> {
        self.logged_write(address, 4, data)
    }

    fn write_word_16(&mut self, address: u32, data: u16) -> Result<(), ArmError> {
        self.logged_write(address, 2, data.into())
    }

    fn write_word_8(&mut self, address: u32, data: u8) -> Result<(), ArmError> {
        self.logged_write(address, 1, data.into())
    }
}

impl DirectAccess for MockKinetis {}

impl LogControl for MockKinetis {
    fn log_level(&self) -> LogLevel {
        self.log_level
    }

    fn set_log_level(&mut self, level: LogLevel) {
        self.operations.push(Operation::SetLogLevel(level));
        self.log_level = level;
    }
}

impl Delay for MockKinetis {
    fn delay_ms(&mut self, ms: u32) {
        self.operations.push(Operation::Delay(ms));
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn byte_lanes_are_little_endian() {
        let mut mock = MockKinetis::new();

        mock.write_word_32(0x2000_0000, 0x7654_3210).unwrap();
        mock.write_word_8(0x2000_0001, 0x55).unwrap();

        assert_eq!(mock.read_word_32(0x2000_0000).unwrap(), 0x7654_5510);
        assert_eq!(mock.read_word_16(0x2000_0002).unwrap(), 0x7654);
    }

    #[test]
    fn unaligned_word_access_is_rejected() {
        let mut mock = MockKinetis::new();

        assert_eq!(
            mock.read_word_32(0x2000_0002),
            Err(ArmError::MemoryNotAligned {
                address: 0x2000_0002,
                alignment: 4
            })
        );
    }

    #[test]
    fn bitband_alias_modifies_single_bit() {
        let mut mock = MockKinetis::new();
        mock.write_word_32(GPIOA_PDOR + 0x40, 0x0000_0100).unwrap();

        // PTB17
        let alias = (GPIOA_PDOR + 0x40 - BITBAND_REGION_BASE) * 32 + 17 * 4 + BITBAND_ALIAS_BASE;
        mock.write_word_32(alias, 1).unwrap();

        assert_eq!(mock.peek_32(GPIOA_PDOR + 0x40), 0x0002_0100);
        assert_eq!(mock.read_word_32(alias).unwrap(), 1);
    }

    #[test]
    fn reset_request_takes_effect_after_latency() {
        let mut mock = MockKinetis::new();
        mock.reset_latency = 2;

        mock.write_raw_ap_register(MDM_AP, MDM_CONTROL, MDM_CONTROL_SYS_RESET_REQ)
            .unwrap();

        let in_reset: Vec<bool> = (0..4)
            .map(|_| {
                mock.read_raw_ap_register(MDM_AP, MDM_STATUS).unwrap() & MDM_STATUS_SYS_NRESET
                    == 0
            })
            .collect();

        assert_eq!(in_reset, [false, false, true, true]);
        assert_eq!(mock.resets(), 1);
    }

    #[test]
    fn program_longword_clears_bits_only() {
        let mut mock = MockKinetis::new();
        mock.poke_32(0x400, 0xffff_00ff);

        for (address, byte) in FTFL_FCCOB.iter().zip([0x06, 0x00, 0x04, 0x00, 0x12, 0x34, 0x56, 0x78]) {
            mock.write_word_8(*address, byte).unwrap();
        }
        mock.write_word_8(Fstat::ADDRESS, FTFL_FSTAT_CCIF).unwrap();

        assert_eq!(mock.peek_32(0x400), 0x1234_0078);
        assert_eq!(mock.flash_commands(), 1);
    }
}
