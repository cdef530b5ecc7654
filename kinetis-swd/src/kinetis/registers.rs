//! Register map of the Kinetis K20 parts, limited to what bring-up, flashing, GPIO and
//! I2C0 need. Addresses and bit positions follow the K20 Sub-Family Reference Manual.
#![allow(missing_docs)]

use crate::memory_mapped_registers::memory_mapped_bitfield_register;
use crate::probe::ApAddress;

// MDM-AP, the Freescale specific Mass Debug Module access port.

/// The MDM-AP sits next to the AHB-AP.
pub const MDM_AP: ApAddress = ApAddress(1);

/// MDM-AP status register.
pub const MDM_STATUS: u8 = 0x00;
/// MDM-AP control register.
pub const MDM_CONTROL: u8 = 0x04;
/// MDM-AP identification register.
pub const MDM_IDR: u8 = 0xFC;

/// IDR value of the K-series MDM-AP.
pub const MDM_IDR_K_SERIES: u32 = 0x001C_0000;

pub const MDM_STATUS_FLASH_ERASE_ACK: u32 = 1 << 0;
pub const MDM_STATUS_FLASH_READY: u32 = 1 << 1;
pub const MDM_STATUS_SYS_SECURITY: u32 = 1 << 2;
/// Reads 0 while the system is held in reset.
pub const MDM_STATUS_SYS_NRESET: u32 = 1 << 3;
pub const MDM_STATUS_MASS_ERASE_ENABLE: u32 = 1 << 5;

pub const MDM_CONTROL_MASS_ERASE: u32 = 1 << 0;
pub const MDM_CONTROL_SYS_RESET_REQ: u32 = 1 << 3;
pub const MDM_CONTROL_CORE_HOLD_RESET: u32 = 1 << 4;

bitfield::bitfield! {
    /// MDM-AP status register, as read through the access port.
    #[derive(Copy, Clone)]
    pub struct MdmStatus(u32);
    impl Debug;
    pub flash_erase_ack, _: 0;
    pub flash_ready, _: 1;
    pub sys_security, _: 2;
    pub sys_nreset, _: 3;
    pub mass_erase_enable, _: 5;
}

// Cortex-M4 debug registers.

memory_mapped_bitfield_register! {
    /// Debug Halting Control and Status Register.
    ///
    /// Writes are only accepted with the debug key, see [`Dhcsr::enable_write`].
    pub struct Dhcsr(u32);
    0xE000_EDF0, "DHCSR",
    impl From;
    pub s_halt, _: 17;
    pub s_regrdy, _: 16;
    pub c_maskints, set_c_maskints: 3;
    pub c_step, set_c_step: 2;
    pub c_halt, set_c_halt: 1;
    pub c_debugen, set_c_debugen: 0;
}

impl Dhcsr {
    /// Set the debug key so the write is accepted.
    pub fn enable_write(&mut self) {
        self.0 &= !(0xffff << 16);
        self.0 |= 0xa05f << 16;
    }

    /// The value written repeatedly while racing the watchdog: debug enabled, halt requested.
    pub fn halt_request() -> Self {
        let mut dhcsr = Dhcsr(0);
        dhcsr.enable_write();
        dhcsr.set_c_halt(true);
        dhcsr.set_c_debugen(true);
        dhcsr
    }
}

// SIM, system integration module.

pub const SIM_SOPT2: u32 = 0x4004_8004;
pub const SIM_SCGC4: u32 = 0x4004_8034;
pub const SIM_SCGC5: u32 = 0x4004_8038;
pub const SIM_SCGC6: u32 = 0x4004_803C;
pub const SIM_CLKDIV1: u32 = 0x4004_8044;
pub const SIM_CLKDIV2: u32 = 0x4004_8048;

pub const SIM_SOPT2_USBSRC: u32 = 1 << 18;
pub const SIM_SOPT2_PLLFLLSEL: u32 = 1 << 16;
pub const SIM_SOPT2_TRACECLKSEL: u32 = 1 << 12;
pub const fn sim_sopt2_clkoutsel(n: u32) -> u32 {
    (n & 7) << 5
}

pub const SIM_SCGC4_USBOTG: u32 = 1 << 18;
pub const SIM_SCGC4_I2C0: u32 = 1 << 6;

/// Clock gates of PORTA..PORTE plus the always-on bits.
pub const SIM_SCGC5_ALL_PORTS: u32 = 0x0004_3F82;

pub const SIM_SCGC6_RTC: u32 = 1 << 29;
pub const SIM_SCGC6_ADC0: u32 = 1 << 27;
pub const SIM_SCGC6_FTM1: u32 = 1 << 25;
pub const SIM_SCGC6_FTM0: u32 = 1 << 24;
pub const SIM_SCGC6_FTFL: u32 = 1 << 0;

pub const fn sim_clkdiv1_outdiv1(n: u32) -> u32 {
    (n & 0xf) << 28
}
pub const fn sim_clkdiv1_outdiv2(n: u32) -> u32 {
    (n & 0xf) << 24
}
pub const fn sim_clkdiv1_outdiv4(n: u32) -> u32 {
    (n & 0xf) << 16
}
pub const fn sim_clkdiv2_usbdiv(n: u32) -> u32 {
    (n & 7) << 1
}

// OSC and MCG, the clock generator.

pub const OSC0_CR: u32 = 0x4006_5000;
pub const OSC_SC8P: u8 = 1 << 1;
pub const OSC_SC2P: u8 = 1 << 3;

pub const MCG_C1: u32 = 0x4006_4000;
pub const MCG_C2: u32 = 0x4006_4001;
pub const MCG_C5: u32 = 0x4006_4004;
pub const MCG_C6: u32 = 0x4006_4005;
pub const MCG_S: u32 = 0x4006_4006;

pub const fn mcg_c1_clks(n: u8) -> u8 {
    (n & 3) << 6
}
pub const fn mcg_c1_frdiv(n: u8) -> u8 {
    (n & 7) << 3
}
pub const MCG_C1_IREFS: u8 = 1 << 2;

pub const fn mcg_c2_range0(n: u8) -> u8 {
    (n & 3) << 4
}
pub const MCG_C2_EREFS: u8 = 1 << 2;

pub const fn mcg_c5_prdiv0(n: u8) -> u8 {
    n & 0x1f
}

pub const MCG_C6_PLLS: u8 = 1 << 6;
pub const fn mcg_c6_vdiv0(n: u8) -> u8 {
    n & 0x1f
}

pub const MCG_S_OSCINIT0: u8 = 1 << 1;
pub const MCG_S_CLKST_MASK: u8 = 3 << 2;
pub const fn mcg_s_clkst(n: u8) -> u8 {
    (n & 3) << 2
}
pub const MCG_S_IREFST: u8 = 1 << 4;
pub const MCG_S_PLLST: u8 = 1 << 5;
pub const MCG_S_LOCK0: u8 = 1 << 6;

// USB0

pub const USB0_CTL: u32 = 0x4007_2094;
pub const USB0_USBCTRL: u32 = 0x4007_2100;
pub const USB0_CONTROL: u32 = 0x4007_2108;
pub const USB0_USBTRC0: u32 = 0x4007_210C;

pub const USB_CTL_USBENSOFEN: u8 = 1 << 0;
pub const USB_CONTROL_DPPULLUPNONOTG: u8 = 1 << 4;
pub const USB_USBTRC_USBRESET: u8 = 1 << 7;

// FTFL, the flash memory controller.

memory_mapped_bitfield_register! {
    /// Flash Status Register.
    ///
    /// The error flags and CCIF are write-one-to-clear. Clearing CCIF launches the
    /// command staged in the FCCOB registers.
    pub struct Fstat(u8);
    0x4002_0000, "FTFL_FSTAT",
    impl From;
    /// Command complete.
    pub ccif, set_ccif: 7;
    /// Read collision during a command.
    pub rdcolerr, set_rdcolerr: 6;
    /// Access error, illegal command or parameters.
    pub accerr, set_accerr: 5;
    /// Protection violation.
    pub fpviol, set_fpviol: 4;
    /// Command specific completion status.
    pub mgstat0, _: 0;
}

pub const FTFL_FSTAT_CCIF: u8 = 1 << 7;
pub const FTFL_FSTAT_RDCOLERR: u8 = 1 << 6;
pub const FTFL_FSTAT_ACCERR: u8 = 1 << 5;
pub const FTFL_FSTAT_FPVIOL: u8 = 1 << 4;

/// FCCOB0..FCCOB7. The command object is stored big endian within each word.
pub const FTFL_FCCOB: [u32; 8] = [
    0x4002_0007,
    0x4002_0006,
    0x4002_0005,
    0x4002_0004,
    0x4002_000B,
    0x4002_000A,
    0x4002_0009,
    0x4002_0008,
];

/// FTFL command: program one longword.
pub const FTFL_CMD_PROGRAM_LONGWORD: u8 = 0x06;

// PORT and GPIO

pub const PORTA_PCR0: u32 = 0x4004_9000;
pub const PORTB_PCR0: u32 = 0x4004_A000;
pub const PORTB_PCR1: u32 = 0x4004_A004;

pub const fn port_pcr_mux(n: u32) -> u32 {
    (n & 7) << 8
}
pub const PORT_PCR_DSE: u32 = 1 << 6;
pub const PORT_PCR_SRE: u32 = 1 << 2;
pub const PORT_PCR_PE: u32 = 1 << 1;
pub const PORT_PCR_PS: u32 = 1 << 0;

pub const GPIOA_PDOR: u32 = 0x400F_F000;
pub const GPIOA_PDIR: u32 = 0x400F_F010;
pub const GPIOA_PDDR: u32 = 0x400F_F014;
/// Distance between the register blocks of two GPIO ports.
pub const GPIO_PORT_STRIDE: u32 = 0x40;

/// Start of the peripheral bit-band region.
pub const BITBAND_REGION_BASE: u32 = 0x4000_0000;
/// Start of the peripheral bit-band alias region.
pub const BITBAND_ALIAS_BASE: u32 = 0x4200_0000;

// I2C0

pub const I2C0_F: u32 = 0x4006_6001;
pub const I2C0_D: u32 = 0x4006_6004;

memory_mapped_bitfield_register! {
    /// I2C Control Register 1.
    pub struct I2cC1(u8);
    0x4006_6002, "I2C0_C1",
    impl From;
    /// Module enable.
    pub iicen, set_iicen: 7;
    pub iicie, set_iicie: 6;
    /// Master mode. A 0 to 1 transition generates a start, 1 to 0 a stop.
    pub mst, set_mst: 5;
    /// Transmit (1) or receive (0).
    pub tx, set_tx: 4;
    /// Do not acknowledge the next received byte.
    pub txak, set_txak: 3;
    /// Repeated start.
    pub rsta, set_rsta: 2;
}

memory_mapped_bitfield_register! {
    /// I2C Status Register. IICIF is write-one-to-clear.
    pub struct I2cS(u8);
    0x4006_6003, "I2C0_S",
    impl From;
    pub tcf, _: 7;
    pub iaas, _: 6;
    pub busy, _: 5;
    pub arbl, _: 4;
    pub iicif, set_iicif: 1;
    pub rxak, _: 0;
}

/// Bus clock divider value for roughly 100 kHz.
pub const I2C_F_100KHZ: u8 = 0x1B;
