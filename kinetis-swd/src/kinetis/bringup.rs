//! Reset, debug halt and clock setup.

use super::registers::*;
use super::Kinetis;
use crate::probe::{ArmProbe, Expected, LogLevel, PollCondition, Polled};
use crate::{Error, MemoryMappedRegister, ProtocolMismatch, WaitPhase};

/// Operating modes of the multipurpose clock generator (MCG).
///
/// [`Kinetis::peripheral_init`] walks the part from the reset mode to the PLL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, docsplay::Display)]
pub enum McgMode {
    /// FLL engaged internal
    Fei,
    /// FLL bypassed external
    Fbe,
    /// PLL bypassed external
    Pbe,
    /// PLL engaged external
    Pee,
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Store32 { address: u32, value: u32 },
    Store8 { address: u32, value: u8 },
    Wait8 { address: u32, mask: u8, expected: Expected },
}

#[derive(Debug, Clone, Copy)]
struct InitStep {
    name: &'static str,
    action: Action,
    /// The clock mode the part is in once this step succeeded.
    reaches: Option<McgMode>,
}

const fn store32(name: &'static str, address: u32, value: u32) -> InitStep {
    InitStep {
        name,
        action: Action::Store32 { address, value },
        reaches: None,
    }
}

const fn store8(name: &'static str, address: u32, value: u8) -> InitStep {
    InitStep {
        name,
        action: Action::Store8 { address, value },
        reaches: None,
    }
}

const fn wait8(name: &'static str, address: u32, mask: u8, expected: Expected) -> InitStep {
    InitStep {
        name,
        action: Action::Wait8 {
            address,
            mask,
            expected,
        },
        reaches: None,
    }
}

const fn entering(mode: McgMode, step: InitStep) -> InitStep {
    InitStep {
        reaches: Some(mode),
        ..step
    }
}

/// The peripheral setup FC-Boot style firmware expects: 16 MHz crystal, 96 MHz PLL,
/// 48 MHz core and bus clock, USB clocked from the PLL.
const INIT_SEQUENCE: &[InitStep] = &[
    store32("enable port clocks", SIM_SCGC5, SIM_SCGC5_ALL_PORTS),
    store32(
        "enable peripheral clocks",
        SIM_SCGC6,
        SIM_SCGC6_RTC | SIM_SCGC6_FTM0 | SIM_SCGC6_FTM1 | SIM_SCGC6_ADC0 | SIM_SCGC6_FTFL,
    ),
    store8("crystal load capacitors", OSC0_CR, OSC_SC8P | OSC_SC2P),
    store8("enable oscillator", MCG_C2, mcg_c2_range0(2) | MCG_C2_EREFS),
    store8(
        "select crystal clock",
        MCG_C1,
        mcg_c1_clks(2) | mcg_c1_frdiv(4),
    ),
    wait8("wait for oscillator", MCG_S, MCG_S_OSCINIT0, Expected::AllSet),
    wait8("wait for FLL reference", MCG_S, MCG_S_IREFST, Expected::Pattern(0)),
    entering(
        McgMode::Fbe,
        wait8(
            "wait for crystal clock",
            MCG_S,
            MCG_S_CLKST_MASK,
            Expected::Pattern(mcg_s_clkst(2) as u32),
        ),
    ),
    store8("PLL input divider", MCG_C5, mcg_c5_prdiv0(3)),
    store8("enable PLL", MCG_C6, MCG_C6_PLLS | mcg_c6_vdiv0(0)),
    wait8("wait for PLL source", MCG_S, MCG_S_PLLST, Expected::AllSet),
    entering(
        McgMode::Pbe,
        wait8("wait for PLL lock", MCG_S, MCG_S_LOCK0, Expected::AllSet),
    ),
    store32(
        "system clock dividers",
        SIM_CLKDIV1,
        sim_clkdiv1_outdiv1(1) | sim_clkdiv1_outdiv2(1) | sim_clkdiv1_outdiv4(3),
    ),
    store8("select PLL clock", MCG_C1, mcg_c1_clks(0) | mcg_c1_frdiv(4)),
    entering(
        McgMode::Pee,
        wait8(
            "wait for PLL clock",
            MCG_S,
            MCG_S_CLKST_MASK,
            Expected::Pattern(mcg_s_clkst(3) as u32),
        ),
    ),
    store32("USB clock divider", SIM_CLKDIV2, sim_clkdiv2_usbdiv(1)),
    store32(
        "clock sources",
        SIM_SOPT2,
        SIM_SOPT2_USBSRC | SIM_SOPT2_PLLFLLSEL | SIM_SOPT2_TRACECLKSEL | sim_sopt2_clkoutsel(6),
    ),
    store32("enable USB and I2C0 clocks", SIM_SCGC4, SIM_SCGC4_USBOTG | SIM_SCGC4_I2C0),
    store8("reset USB", USB0_USBTRC0, USB_USBTRC_USBRESET),
    wait8(
        "wait for USB reset",
        USB0_USBTRC0,
        USB_USBTRC_USBRESET,
        Expected::Pattern(0),
    ),
    store8("enable USB", USB0_CTL, USB_CTL_USBENSOFEN),
    store8("USB control", USB0_USBCTRL, 0),
    store8("USB pull-up off", USB0_CONTROL, 0),
];

impl<P: ArmProbe> Kinetis<P> {
    /// Reset, halt, identify and initialize the target.
    pub fn startup(&mut self) -> Result<(), Error> {
        self.reset()?;
        self.debug_halt()?;
        self.detect()?;
        self.peripheral_init()
    }

    /// Check that the MDM-AP is the one found on K-series parts.
    pub fn detect(&mut self) -> Result<(), Error> {
        let idr = self.probe.read_raw_ap_register(MDM_AP, MDM_IDR)?;

        if idr != MDM_IDR_K_SERIES {
            tracing::error!("Didn't find a supported MDM-AP peripheral (IDR: {:#010x})", idr);
            return Err(ProtocolMismatch::UnsupportedMdmAp { idr }.into());
        }

        Ok(())
    }

    /// Perform a system reset through the MDM-AP.
    ///
    /// Returns once the system is out of reset, the flash controller is ready and the
    /// security check finished.
    pub fn reset(&mut self) -> Result<(), Error> {
        let reset_retries = self.config.reset_retries;
        let default_retries = self.config.default_retries;

        // Known state, and no reset in progress.
        self.probe
            .write_raw_ap_register(MDM_AP, MDM_CONTROL, MDM_CONTROL_CORE_HOLD_RESET)?;
        self.wait_ap(
            MDM_AP,
            MDM_STATUS,
            PollCondition::all_set(MDM_STATUS_SYS_NRESET, reset_retries),
            WaitPhase::ResetIdle,
        )?;

        self.probe
            .write_raw_ap_register(MDM_AP, MDM_CONTROL, MDM_CONTROL_SYS_RESET_REQ)?;
        self.reset_generation = self.reset_generation.wrapping_add(1);
        self.wait_ap(
            MDM_AP,
            MDM_STATUS,
            PollCondition::all_clear(MDM_STATUS_SYS_NRESET, default_retries),
            WaitPhase::ResetRequest,
        )?;
        self.clock_mode = McgMode::Fei;

        self.probe.write_raw_ap_register(MDM_AP, MDM_CONTROL, 0)?;

        // While SYS_SECURITY is set the AHB-AP is unusable.
        self.wait_ap(
            MDM_AP,
            MDM_STATUS,
            PollCondition::pattern(
                MDM_STATUS_SYS_NRESET | MDM_STATUS_FLASH_READY | MDM_STATUS_SYS_SECURITY,
                MDM_STATUS_SYS_NRESET | MDM_STATUS_FLASH_READY,
                reset_retries,
            ),
            WaitPhase::ResetRelease,
        )?;

        tracing::debug!("System reset complete");
        Ok(())
    }

    /// Enable debugging and halt the core.
    ///
    /// The halt request races the watchdog, so it is repeated through the direct
    /// access path until the core reports S_HALT. Failed transfers during the race
    /// are expected and the probe's diagnostics are muted until it is over.
    pub fn debug_halt(&mut self) -> Result<(), Error> {
        self.probe.select_direct(Dhcsr::ADDRESS)?;

        let saved_level = self.probe.log_level();
        self.probe.set_log_level(LogLevel::None);
        let polled = self.race_halt();
        self.probe.set_log_level(saved_level);

        if !polled.matched {
            tracing::error!(
                "Failed to put CPU in debug halt state (DHCSR: {:#010x})",
                polled.value
            );
            return Err(Error::Timeout(WaitPhase::DebugHalt {
                dhcsr: polled.value,
            }));
        }

        tracing::debug!("Core halted after {} attempts", polled.attempts);
        Ok(())
    }

    fn race_halt(&mut self) -> Polled {
        let request = u32::from(Dhcsr::halt_request());
        let mut polled = Polled {
            value: 0,
            matched: false,
            attempts: 0,
        };

        while polled.attempts < self.config.halt_retries {
            polled.attempts += 1;

            if self.probe.write_direct(request).is_err() {
                continue;
            }
            let Ok(value) = self.probe.read_direct() else {
                continue;
            };

            polled.value = value;
            if Dhcsr(value).s_halt() {
                polled.matched = true;
                break;
            }
        }

        polled
    }

    /// Bring up clocks, USB and I2C0 clock gates, then check memory access.
    ///
    /// Every step is run in order and the first failure aborts the sequence. A wait
    /// that runs out of retries is reported as
    /// [`WaitPhase::PeripheralInit`] with the name of the step.
    pub fn peripheral_init(&mut self) -> Result<(), Error> {
        self.clock_mode = McgMode::Fei;

        INIT_SEQUENCE
            .iter()
            .try_for_each(|step| self.run_init_step(step))?;

        self.test_memory_access()
    }

    fn run_init_step(&mut self, step: &InitStep) -> Result<(), Error> {
        tracing::trace!("Peripheral init: {}", step.name);

        let result = match step.action {
            Action::Store32 { address, value } => self
                .probe
                .write_word_32(address, value)
                .map_err(Error::from),
            Action::Store8 { address, value } => self
                .probe
                .write_word_8(address, value)
                .map_err(Error::from),
            Action::Wait8 {
                address,
                mask,
                expected,
            } => {
                let condition = PollCondition {
                    mask: mask.into(),
                    expected,
                    retries: self.config.default_retries,
                };
                self.wait_word_8(address, condition, WaitPhase::PeripheralInit { step: step.name })
                    .map(|_| ())
            }
        };

        if let Err(error) = &result {
            tracing::error!("Peripheral init step '{}' failed: {}", step.name, error);
        } else if let Some(mode) = step.reaches {
            tracing::debug!("Clock generator in {:?} mode", mode);
            self.clock_mode = mode;
        }

        result
    }

    /// Check that word, halfword and byte accesses to RAM behave.
    ///
    /// Probes with broken sub-word accesses are common enough to be worth a check
    /// before anything is flashed.
    pub fn test_memory_access(&mut self) -> Result<(), Error> {
        let base = self.config.test_ram_address;

        self.store_and_verify(base, 0x3141_5927)?;
        self.store_and_verify(base, 0x7654_3210)?;

        self.probe.write_word_8(base + 1, 0x55)?;
        self.probe.write_word_8(base + 2, 0x9f)?;
        let word = self.probe.read_word_32(base)?;
        expect_readback("Byte-wide write", 0x769f_5510, word)?;

        let byte = self.probe.read_word_8(base + 3)?;
        expect_readback("Byte-wide read", 0x76, byte.into())?;

        self.probe.write_word_16(base, 0x5abc)?;
        self.probe.write_word_16(base + 2, 0xdef0)?;
        let word = self.probe.read_word_32(base)?;
        expect_readback("Halfword-wide write", 0xdef0_5abc, word)?;

        let half = self.probe.read_word_16(base + 2)?;
        expect_readback("Halfword-wide read", 0xdef0, half.into())
    }

    /// Write a word and read it back.
    pub fn store_and_verify(&mut self, address: u32, value: u32) -> Result<(), Error> {
        self.probe.write_word_32(address, value)?;
        let actual = self.probe.read_word_32(address)?;
        expect_readback("Word-wide", value, actual)
    }

    /// Enable or disable the USB D+ pull-up, which makes the target visible to the host.
    pub fn usb_set_pullup(&mut self, enable: bool) -> Result<(), Error> {
        let value = if enable {
            USB_CONTROL_DPPULLUPNONOTG
        } else {
            0
        };
        self.probe.write_word_8(USB0_CONTROL, value)?;
        Ok(())
    }

    /// Reset into a halted and clocked state again, without the identity check.
    pub(crate) fn reinitialize(&mut self) -> Result<(), Error> {
        self.reset()?;
        self.debug_halt()?;
        self.peripheral_init()
    }
}

fn expect_readback(access: &'static str, expected: u32, actual: u32) -> Result<(), Error> {
    if expected == actual {
        return Ok(());
    }

    tracing::error!(
        "{} access seems broken! (expected {:#010x}, read {:#010x})",
        access,
        expected,
        actual
    );
    Err(ProtocolMismatch::BrokenAccess {
        access,
        expected,
        actual,
    }
    .into())
}

#[cfg(test)]
mod test {
    use super::McgMode;
    use crate::kinetis::registers::*;
    use crate::kinetis::Kinetis;
    use crate::probe::mock::{MockKinetis, Operation};
    use crate::probe::{LogControl, LogLevel};
    use crate::{Error, KinetisConfig, ProtocolMismatch, WaitPhase};
    use pretty_assertions::assert_eq;

    #[test]
    fn startup_halts_and_clocks_the_part() {
        let mut target = Kinetis::new(MockKinetis::new());

        target.startup().unwrap();

        assert!(target.probe().is_halted());
        assert_eq!(target.clock_mode(), McgMode::Pee);
        assert_eq!(target.probe().writes_to(MCG_C1), [0xa0, 0x20]);
        assert_eq!(target.probe().peek_32(0x2000_0000), 0xdef0_5abc);
    }

    #[test]
    fn reset_writes_control_in_order() {
        let mut mock = MockKinetis::new();
        mock.reset_latency = 5;
        let mut target = Kinetis::new(mock);

        target.reset().unwrap();

        assert_eq!(
            target.probe().ap_writes(MDM_AP, MDM_CONTROL),
            [MDM_CONTROL_CORE_HOLD_RESET, MDM_CONTROL_SYS_RESET_REQ, 0]
        );
        assert_eq!(target.probe().resets(), 1);
        assert!(!target.probe().in_reset());
    }

    #[test]
    fn reset_waits_for_each_phase() {
        let mut mock = MockKinetis::new();
        mock.reset_latency = 5;
        let mut target = Kinetis::new(mock);

        target.reset().unwrap();

        // Each CONTROL write, with the STATUS value read last before it.
        let mut last_status = None;
        let mut control_writes = Vec::new();
        for operation in target.probe().operations() {
            match *operation {
                Operation::ApRead {
                    ap,
                    register,
                    value,
                } if ap == MDM_AP.0 && register == MDM_STATUS => last_status = Some(value),
                Operation::ApWrite {
                    ap,
                    register,
                    value,
                } if ap == MDM_AP.0 && register == MDM_CONTROL => {
                    control_writes.push((value, last_status))
                }
                _ => {}
            }
        }

        let out_of_reset =
            |status: Option<u32>| status.map(|value| value & MDM_STATUS_SYS_NRESET != 0);
        assert_eq!(control_writes.len(), 3);
        assert_eq!(control_writes[1].0, MDM_CONTROL_SYS_RESET_REQ);
        assert_eq!(out_of_reset(control_writes[1].1), Some(true));
        assert_eq!(control_writes[2].0, 0);
        assert_eq!(out_of_reset(control_writes[2].1), Some(false));
        assert_eq!(out_of_reset(last_status), Some(true));
    }

    #[test]
    fn stuck_reset_stops_startup() {
        let mut mock = MockKinetis::new();
        mock.stuck_in_reset = true;
        let mut target = Kinetis::new(mock);

        let result = target.startup();

        assert!(matches!(
            result,
            Err(Error::Timeout(WaitPhase::ResetRelease))
        ));
        assert!(target.probe().writes_to(SIM_SCGC5).is_empty());
        assert_eq!(target.probe().halt_requests(), 0);
    }

    #[test]
    fn secured_part_never_leaves_reset() {
        let mut mock = MockKinetis::new();
        mock.secured = true;
        let mut target = Kinetis::new(mock);

        assert!(matches!(
            target.reset(),
            Err(Error::Timeout(WaitPhase::ResetRelease))
        ));
    }

    #[test]
    fn slow_reset_request_times_out() {
        let mut mock = MockKinetis::new();
        mock.reset_latency = 60;
        let mut target = Kinetis::new(mock);

        assert!(matches!(
            target.reset(),
            Err(Error::Timeout(WaitPhase::ResetRequest))
        ));
    }

    #[test]
    fn debug_halt_mutes_and_restores_logging() {
        let mut mock = MockKinetis::new();
        mock.halt_after = Some(5);
        let mut target = Kinetis::new(mock);

        target.debug_halt().unwrap();

        let levels: Vec<_> = target
            .probe()
            .operations()
            .iter()
            .filter_map(|op| match op {
                Operation::SetLogLevel(level) => Some(*level),
                _ => None,
            })
            .collect();
        assert_eq!(levels, [LogLevel::None, LogLevel::Normal]);
        assert_eq!(target.probe().halt_requests(), 5);
        assert_eq!(
            target.probe().ap_writes(crate::probe::mem_ap::AHB_AP, crate::probe::mem_ap::DRW),
            [0xa05f_0003; 5]
        );
    }

    #[test]
    fn debug_halt_survives_failed_transfers() {
        let mut mock = MockKinetis::new();
        mock.drw_faults = 7;
        let mut target = Kinetis::new(mock);

        target.debug_halt().unwrap();

        assert!(target.probe().is_halted());
    }

    #[test]
    fn debug_halt_gives_up_with_last_status() {
        let mut mock = MockKinetis::new();
        mock.halt_after = None;
        let config = KinetisConfig {
            halt_retries: 20,
            ..Default::default()
        };
        let mut target = Kinetis::with_config(mock, config);

        let result = target.debug_halt();

        assert!(matches!(
            result,
            Err(Error::Timeout(WaitPhase::DebugHalt { dhcsr: 0x0001_0003 }))
        ));
        assert_eq!(target.probe().halt_requests(), 20);
        assert_eq!(target.probe().log_level(), LogLevel::Normal);
    }

    #[test]
    fn detect_rejects_unknown_mdm_ap() {
        let mut mock = MockKinetis::new();
        mock.idr = 0x0012_3456;
        let mut target = Kinetis::new(mock);

        let result = target.detect();

        assert!(matches!(
            result,
            Err(Error::ProtocolMismatch(ProtocolMismatch::UnsupportedMdmAp {
                idr: 0x0012_3456
            }))
        ));
    }

    #[test]
    fn dead_oscillator_names_the_step() {
        let mut mock = MockKinetis::new();
        mock.osc_dead = true;
        let mut target = Kinetis::new(mock);

        let result = target.peripheral_init();

        assert!(matches!(
            result,
            Err(Error::Timeout(WaitPhase::PeripheralInit {
                step: "wait for oscillator"
            }))
        ));
        assert_eq!(target.clock_mode(), McgMode::Fei);
        assert!(target.probe().writes_to(MCG_C5).is_empty());
    }

    #[test]
    fn broken_byte_writes_are_detected() {
        let mut mock = MockKinetis::new();
        mock.byte_writes_ignored = true;
        let mut target = Kinetis::new(mock);

        let result = target.test_memory_access();

        assert!(matches!(
            result,
            Err(Error::ProtocolMismatch(ProtocolMismatch::BrokenAccess {
                access: "Byte-wide write",
                expected: 0x769f_5510,
                actual: 0x7654_3210,
            }))
        ));
    }

    #[test]
    fn memory_test_uses_every_width() {
        let mut target = Kinetis::new(MockKinetis::new());

        target.test_memory_access().unwrap();

        let sizes: Vec<u8> = target
            .probe()
            .operations()
            .iter()
            .filter_map(|op| match op {
                Operation::Write { size, .. } => Some(*size),
                _ => None,
            })
            .collect();
        assert_eq!(sizes, [4, 4, 1, 1, 2, 2]);
    }

    #[test]
    fn usb_pullup() {
        let mut target = Kinetis::new(MockKinetis::new());

        target.usb_set_pullup(true).unwrap();
        target.usb_set_pullup(false).unwrap();

        assert_eq!(
            target.probe().writes_to(USB0_CONTROL),
            [u32::from(USB_CONTROL_DPPULLUPNONOTG), 0]
        );
    }
}
