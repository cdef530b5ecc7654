//! Mass erase and longword programming through the FTFL flash controller.

use static_assertions::const_assert;

use super::registers::*;
use super::Kinetis;
use crate::probe::{ArmProbe, PollCondition};
use crate::{Error, MemoryMappedRegister, WaitPhase};

/// Size of one flash sector in bytes.
pub const FLASH_SECTOR_SIZE: u32 = 1024;

const_assert!(FLASH_SECTOR_SIZE.is_power_of_two());
const_assert!(FLASH_SECTOR_SIZE % 4 == 0);

/// Longwords per flash sector.
pub(crate) const SECTOR_LONGWORDS: usize = (FLASH_SECTOR_SIZE / 4) as usize;

/// Errors reported by the flash controller and the programming campaign.
#[derive(Debug, thiserror::Error, docsplay::Display, PartialEq, Eq)]
pub enum FlashError {
    /// The image holds {words} words, but {sectors} sectors need exactly {expected}.
    ImageSize {
        /// Number of words in the image.
        words: usize,
        /// Number of sectors requested.
        sectors: u32,
        /// Number of words those sectors hold.
        expected: usize,
    },

    /// The flash controller is not ready for a mass erase.
    NotReady,

    /// A mass erase is already in progress.
    EraseInProgress,

    /// Mass erase is disabled on this part.
    MassEraseDisabled,

    /// The flash controller is not ready after the mass erase.
    NotReadyAfterErase,

    /// Flash protection violation. (FSTAT: {fstat:#04x})
    ProtectionViolation {
        /// Raw status register value.
        fstat: u8,
    },

    /// Flash address access error. (FSTAT: {fstat:#04x})
    AccessError {
        /// Raw status register value.
        fstat: u8,
    },

    /// Flash bus collision. (FSTAT: {fstat:#04x})
    BusCollision {
        /// Raw status register value.
        fstat: u8,
    },

    /// {message} (FSTAT: {fstat:#04x})
    CommandFailed {
        /// Description of the failed command.
        message: String,
        /// Raw status register value.
        fstat: u8,
    },

    /// Sector {sector} failed verification: {mismatches} words differ, the first at {address:#010x}.
    VerifyMismatch {
        /// Index of the sector.
        sector: u32,
        /// Address of the first wrong word.
        address: u32,
        /// Number of wrong words in the sector.
        mismatches: usize,
    },

    /// The programming campaign is already complete.
    CampaignComplete,
}

/// A firmware image covering whole flash sectors, starting at address 0.
#[derive(Debug, Clone, Copy)]
pub struct FlashImage<'a> {
    words: &'a [u32],
    sectors: u32,
}

impl<'a> FlashImage<'a> {
    /// Wrap `words`, which must fill exactly `sectors` sectors.
    pub fn new(words: &'a [u32], sectors: u32) -> Result<Self, FlashError> {
        let expected = (sectors as usize).saturating_mul(SECTOR_LONGWORDS);

        if words.len() != expected {
            return Err(FlashError::ImageSize {
                words: words.len(),
                sectors,
                expected,
            });
        }

        Ok(Self { words, sectors })
    }

    /// Number of sectors covered.
    pub fn sectors(&self) -> u32 {
        self.sectors
    }

    /// All words of the image.
    pub fn words(&self) -> &'a [u32] {
        self.words
    }

    /// The words belonging to sector `index`, or `None` past the end of the image.
    pub fn sector(&self, index: u32) -> Option<&'a [u32]> {
        let start = (index as usize).checked_mul(SECTOR_LONGWORDS)?;
        self.words.get(start..start.checked_add(SECTOR_LONGWORDS)?)
    }
}

/// Last bytes written to FCCOB1..FCCOB7.
#[derive(Debug, Clone, Default)]
struct FccobShadow {
    bytes: [u8; 7],
    /// Reset generation of the target the bytes were written under. `None` forces a
    /// full rewrite.
    written_under: Option<u32>,
}

/// Issues program longword commands, skipping command bytes which are unchanged.
///
/// Consecutive longwords mostly differ in the lowest address byte and a few data
/// bytes, so caching the command object saves most of the register writes. A reset
/// of the target clears the command object, so the first command after every
/// [`Kinetis::reset`] is written out in full again.
#[derive(Debug, Clone, Default)]
pub struct FlashEngine {
    shadow: FccobShadow,
}

impl FlashEngine {
    /// A new engine. The first command is written out in full.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write all command bytes on the next [`FlashEngine::program_longword`].
    pub fn force_rewrite(&mut self) {
        self.shadow.written_under = None;
    }

    /// Stage and launch a program longword command.
    ///
    /// Completion is not awaited. Check with [`Kinetis::flash_busy_wait`] and
    /// [`Kinetis::flash_command_status`] when needed.
    pub fn program_longword<P: ArmProbe>(
        &mut self,
        target: &mut Kinetis<P>,
        address: u32,
        word: u32,
    ) -> Result<(), Error> {
        let [_, a2, a1, a0] = address.to_be_bytes();
        let [d3, d2, d1, d0] = word.to_be_bytes();
        let command = [FTFL_CMD_PROGRAM_LONGWORD, a2, a1, a0, d3, d2, d1, d0];
        let generation = target.reset_generation;

        if self.shadow.written_under != Some(generation) {
            target.flash_busy_wait()?;
            for (register, byte) in FTFL_FCCOB.iter().zip(command) {
                target.probe.write_word_8(*register, byte)?;
            }
            self.shadow.bytes.copy_from_slice(&command[1..]);
            self.shadow.written_under = Some(generation);
        } else {
            let staged = FTFL_FCCOB[1..].iter().zip(&command[1..]);
            for ((register, byte), cached) in staged.zip(self.shadow.bytes.iter_mut()) {
                if cached != byte {
                    target.probe.write_word_8(*register, *byte)?;
                    *cached = *byte;
                }
            }
        }

        target.flash_launch_command()
    }
}

impl<P: ArmProbe> Kinetis<P> {
    /// Erase the whole flash, including protected sectors, through the MDM-AP.
    ///
    /// This also clears the security state of the part.
    pub fn flash_mass_erase(&mut self) -> Result<(), Error> {
        let status = MdmStatus(self.probe.read_raw_ap_register(MDM_AP, MDM_STATUS)?);
        if !status.flash_ready() {
            tracing::error!("Flash controller not ready before mass erase");
            return Err(FlashError::NotReady.into());
        }
        if status.flash_erase_ack() {
            tracing::error!("Mass erase already in progress");
            return Err(FlashError::EraseInProgress.into());
        }
        if !status.mass_erase_enable() {
            tracing::error!("Mass erase is disabled!");
            return Err(FlashError::MassEraseDisabled.into());
        }

        tracing::info!("Beginning mass erase operation");
        self.probe.write_raw_ap_register(
            MDM_AP,
            MDM_CONTROL,
            MDM_CONTROL_CORE_HOLD_RESET | MDM_CONTROL_MASS_ERASE,
        )?;

        self.wait_ap(
            MDM_AP,
            MDM_STATUS,
            PollCondition::all_set(MDM_STATUS_FLASH_ERASE_ACK, self.config.default_retries),
            WaitPhase::MassEraseStart,
        )?;
        self.wait_ap(
            MDM_AP,
            MDM_CONTROL,
            PollCondition::all_clear(MDM_CONTROL_MASS_ERASE, self.config.erase_retries),
            WaitPhase::MassEraseComplete,
        )?;

        let status = MdmStatus(self.probe.read_raw_ap_register(MDM_AP, MDM_STATUS)?);
        if !status.flash_ready() {
            tracing::error!("Flash controller not ready after mass erase");
            return Err(FlashError::NotReadyAfterErase.into());
        }

        tracing::info!("Mass erase complete");
        Ok(())
    }

    /// Wait until the flash controller finished the current command.
    pub fn flash_busy_wait(&mut self) -> Result<(), Error> {
        let condition =
            PollCondition::all_set(FTFL_FSTAT_CCIF.into(), self.config.default_retries);
        self.wait_word_8(Fstat::ADDRESS, condition, WaitPhase::FlashCommand)?;
        Ok(())
    }

    /// Clear stale error flags, then start the staged command.
    pub fn flash_launch_command(&mut self) -> Result<(), Error> {
        let mut clear = Fstat(0);
        clear.set_accerr(true);
        clear.set_fpviol(true);
        clear.set_rdcolerr(true);
        self.probe.write_word_8(Fstat::ADDRESS, clear.into())?;

        let mut launch = Fstat(0);
        launch.set_ccif(true);
        self.probe.write_word_8(Fstat::ADDRESS, launch.into())?;
        Ok(())
    }

    /// Check the result of the last command.
    ///
    /// MGSTAT0 is command specific. It is only treated as a failure when a
    /// `command_error` message is given, which is then used for the error.
    pub fn flash_command_status(&mut self, command_error: Option<&str>) -> Result<(), Error> {
        let fstat = Fstat(self.probe.read_word_8(Fstat::ADDRESS)?);
        let raw = u8::from(fstat);

        let error = if fstat.rdcolerr() {
            tracing::error!("Flash bus collision error (FSTAT: {:#04x})", raw);
            FlashError::BusCollision { fstat: raw }
        } else if fstat.fpviol() {
            tracing::error!("Flash address access error (FSTAT: {:#04x})", raw);
            FlashError::ProtectionViolation { fstat: raw }
        } else if fstat.accerr() {
            tracing::error!("Flash address access error (FSTAT: {:#04x})", raw);
            FlashError::AccessError { fstat: raw }
        } else {
            match command_error {
                Some(message) if fstat.mgstat0() => {
                    tracing::error!("{} (FSTAT: {:#04x})", message, raw);
                    FlashError::CommandFailed {
                        message: message.to_owned(),
                        fstat: raw,
                    }
                }
                _ => return Ok(()),
            }
        };

        Err(error.into())
    }
}
