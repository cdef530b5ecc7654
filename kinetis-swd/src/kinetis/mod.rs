//! Bring-up, flash programming and I/O for Kinetis K-series parts.
//!
//! Everything starts from a [`Kinetis`] session which owns the probe. Bring-up
//! ([`Kinetis::startup`]) must succeed before the flash can be programmed with a
//! [`FlashProgrammer`]. GPIO and the [`I2c`] master only need working memory access.

mod bringup;
mod flash;
mod gpio;
mod i2c;
mod programmer;
mod progress;
pub mod registers;

pub use bringup::McgMode;
pub use flash::{FlashEngine, FlashError, FlashImage, FLASH_SECTOR_SIZE};
pub use gpio::{bitband_alias, Pin, PinMode};
pub use i2c::{I2c, I2cError, I2cState};
pub use programmer::FlashProgrammer;
pub use progress::{FlashProgress, ProgressEvent};

use crate::probe::{ApAddress, ArmProbe, Poll, PollCondition, Polled};
use crate::{Error, KinetisConfig, WaitPhase};

/// A debug session with one Kinetis target.
///
/// The session owns the access layer `P`. Apart from the configuration it only keeps
/// the clock generator mode reached by the last [`Kinetis::peripheral_init`] and the
/// state of a running I2C transaction.
#[derive(Debug)]
pub struct Kinetis<P> {
    probe: P,
    config: KinetisConfig,
    clock_mode: McgMode,
    /// Number of system resets requested so far. Peripheral state cached on the host
    /// is only valid within one generation.
    reset_generation: u32,
    i2c: i2c::I2cTransaction,
}

impl<P> Kinetis<P> {
    /// Create a session with the default retry budgets.
    pub fn new(probe: P) -> Self {
        Self::with_config(probe, KinetisConfig::default())
    }

    /// Create a session with custom retry budgets.
    pub fn with_config(probe: P, config: KinetisConfig) -> Self {
        Self {
            probe,
            config,
            clock_mode: McgMode::Fei,
            reset_generation: 0,
            i2c: i2c::I2cTransaction::default(),
        }
    }

    /// The access layer.
    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// The access layer, for transfers this crate does not cover.
    pub fn probe_mut(&mut self) -> &mut P {
        &mut self.probe
    }

    /// End the session and return the access layer.
    pub fn into_inner(self) -> P {
        self.probe
    }

    /// The retry budgets in use.
    pub fn config(&self) -> &KinetisConfig {
        &self.config
    }

    /// The clock generator mode the target was last brought to.
    ///
    /// This is [`McgMode::Fei`] after a reset and [`McgMode::Pee`] after a complete
    /// [`Kinetis::peripheral_init`].
    pub fn clock_mode(&self) -> McgMode {
        self.clock_mode
    }
}

impl<P: ArmProbe> Kinetis<P> {
    /// Poll an access port register, turning an exhausted budget into a timeout.
    pub(crate) fn wait_ap(
        &mut self,
        ap: ApAddress,
        register: u8,
        condition: PollCondition,
        phase: WaitPhase,
    ) -> Result<u32, Error> {
        let polled = self.probe.poll_ap_register(ap, register, condition)?;
        check_polled(polled, phase)
    }

    /// Poll an 8-bit memory mapped register, turning an exhausted budget into a timeout.
    pub(crate) fn wait_word_8(
        &mut self,
        address: u32,
        condition: PollCondition,
        phase: WaitPhase,
    ) -> Result<u8, Error> {
        let polled = self.probe.poll_word_8(address, condition)?;
        check_polled(polled, phase).map(|value| value as u8)
    }
}

fn check_polled(polled: Polled, phase: WaitPhase) -> Result<u32, Error> {
    if polled.matched {
        return Ok(polled.value);
    }

    tracing::error!(
        "Timed out waiting for {} after {} reads (last value: {:#010x})",
        phase,
        polled.attempts,
        polled.value
    );
    Err(Error::Timeout(phase))
}
