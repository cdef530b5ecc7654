use std::time::Instant;

use super::flash::{FlashEngine, FlashError, FlashImage, FLASH_SECTOR_SIZE, SECTOR_LONGWORDS};
use super::progress::FlashProgress;
use super::Kinetis;
use crate::probe::ArmProbe;
use crate::Error;

/// Erases, programs and verifies the flash in small steps.
///
/// The campaign is driven by the caller: [`FlashProgrammer::begin`] once, then
/// [`FlashProgrammer::next`] until [`FlashProgrammer::is_complete`]. Every call to
/// `next` does a bounded amount of work, so the caller can service other tasks in
/// between.
///
/// The programmer borrows the session for its whole lifetime. Use
/// [`FlashProgrammer::target`] to reach it between steps.
#[derive(Debug)]
pub struct FlashProgrammer<'t, 'i, P> {
    target: &'t mut Kinetis<P>,
    image: FlashImage<'i>,
    engine: FlashEngine,
    progress: FlashProgress,
    next_longword: u32,
    verifying: bool,
    next_sector: u32,
}

impl<'t, 'i, P: ArmProbe> FlashProgrammer<'t, 'i, P> {
    /// Create a programmer for `image`. Nothing is sent to the target yet.
    pub fn new(target: &'t mut Kinetis<P>, image: FlashImage<'i>) -> Self {
        Self {
            target,
            image,
            engine: FlashEngine::new(),
            progress: FlashProgress::empty(),
            next_longword: 0,
            verifying: false,
            next_sector: 0,
        }
    }

    /// Report progress to `progress`.
    pub fn with_progress(mut self, progress: FlashProgress) -> Self {
        self.progress = progress;
        self
    }

    /// The session, for work between two steps.
    pub fn target(&mut self) -> &mut Kinetis<P> {
        self.target
    }

    /// Number of longwords in the image.
    pub fn total_longwords(&self) -> u32 {
        self.image.sectors() * SECTOR_LONGWORDS as u32
    }

    /// Returns `true` once programming is done and the sectors are being verified.
    pub fn is_verifying(&self) -> bool {
        self.verifying
    }

    /// Returns `true` when every sector was programmed and verified.
    pub fn is_complete(&self) -> bool {
        self.verifying && self.next_sector == self.image.sectors()
    }

    /// Start the campaign: mass erase, then reset so new protection bits take effect.
    ///
    /// Can be called again to restart from scratch.
    pub fn begin(&mut self) -> Result<(), Error> {
        self.next_longword = 0;
        self.next_sector = 0;
        self.verifying = false;
        self.engine.force_rewrite();

        self.progress.started_erasing();
        let start = Instant::now();

        if let Err(error) = self.erase_and_restart() {
            self.progress.failed_erasing();
            return Err(error);
        }

        self.progress.finished_erasing(start.elapsed());
        self.progress.started_programming(self.total_longwords());
        Ok(())
    }

    fn erase_and_restart(&mut self) -> Result<(), Error> {
        self.target.flash_mass_erase()?;
        self.restart_target()
    }

    /// Reset into a halted state. The command registers are cleared by the reset.
    fn restart_target(&mut self) -> Result<(), Error> {
        self.engine.force_rewrite();
        self.target.reinitialize()
    }

    /// Do the next step of the campaign.
    ///
    /// While programming, this stages up to
    /// [`KinetisConfig::program_batch`](crate::KinetisConfig::program_batch)
    /// longwords. Once the last longword is launched, the target is reset and the
    /// campaign switches to verifying, one sector per call.
    ///
    /// Calling this after the campaign completed is a mistake in the caller and
    /// returns [`FlashError::CampaignComplete`] without touching the target.
    pub fn next(&mut self) -> Result<(), Error> {
        if self.is_complete() {
            return Err(FlashError::CampaignComplete.into());
        }

        if self.verifying {
            self.verify_next_sector()
        } else {
            self.program_batch()
        }
    }

    fn program_batch(&mut self) -> Result<(), Error> {
        let start = Instant::now();
        let total = self.total_longwords();
        let batch = self.target.config.program_batch.max(1);
        let mut count = 0;

        while count < batch && self.next_longword < total {
            if let Err(error) = self.program_next_longword() {
                self.progress.failed_programming();
                return Err(error);
            }
            count += 1;
        }

        self.progress.longwords_programmed(count, start.elapsed());

        if self.next_longword == total {
            // Another reset, to load the new protection flags.
            if let Err(error) = self.restart_target() {
                self.progress.failed_programming();
                return Err(error);
            }

            self.next_sector = 0;
            self.verifying = true;
            self.progress.finished_programming();
            self.progress.started_verifying(self.image.sectors());
        }

        Ok(())
    }

    fn program_next_longword(&mut self) -> Result<(), Error> {
        let index = self.next_longword;
        let address = index * 4;
        if address % FLASH_SECTOR_SIZE == 0 {
            tracing::info!("Programming sector at {:#010x}", address);
        }

        let word = self.image.words()[index as usize];
        self.engine.program_longword(self.target, address, word)?;
        self.next_longword += 1;

        if self.next_longword as usize % SECTOR_LONGWORDS == 0 {
            let sector_start = address + 4 - FLASH_SECTOR_SIZE;
            let message = format!("Programming sector at {sector_start:#010x} failed");
            self.target.flash_busy_wait()?;
            self.target.flash_command_status(Some(&message))?;
        }

        Ok(())
    }

    fn verify_next_sector(&mut self) -> Result<(), Error> {
        let sector = self.next_sector;
        let address = sector * FLASH_SECTOR_SIZE;
        tracing::info!("Verifying sector at {:#010x}", address);

        let Some(expected_words) = self.image.sector(sector) else {
            return Err(FlashError::CampaignComplete.into());
        };

        let mut buffer = vec![0u32; SECTOR_LONGWORDS];
        if let Err(error) = self.target.probe.read_32(address, &mut buffer) {
            self.progress.failed_verifying(sector);
            return Err(error.into());
        }

        let mut first_mismatch = None;
        let mut mismatches = 0;
        let words = (0u32..).step_by(4).zip(buffer.iter().zip(expected_words));
        for (offset, (actual, expected)) in words {
            if actual != expected {
                tracing::error!(
                    "Verify error at {:#010x}. Expected {:#010x}, actual {:#010x}",
                    address + offset,
                    expected,
                    actual
                );
                first_mismatch.get_or_insert(address + offset);
                mismatches += 1;
            }
        }

        if let Some(first) = first_mismatch {
            self.progress.failed_verifying(sector);
            return Err(FlashError::VerifyMismatch {
                sector,
                address: first,
                mismatches,
            }
            .into());
        }

        self.progress.sector_verified(sector);
        self.next_sector += 1;

        if self.next_sector == self.image.sectors() {
            tracing::info!("Programming successful!");
            self.progress.finished_verifying();
        }

        Ok(())
    }
}
