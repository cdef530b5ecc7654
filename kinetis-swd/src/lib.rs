//! # Bring-up and flash programming for Kinetis K-series targets
//!
//! This crate drives an NXP (formerly Freescale) Kinetis K-series microcontroller
//! through a register level debug transport. It takes the part from power-on to a
//! halted and clocked state, mass erases and reprograms its internal flash, and
//! offers GPIO and I2C0 control on top of the same register accesses.
//!
//! The transport itself is not part of this crate. Anything implementing the
//! traits in [`probe`] can be used, for example an SWD bit-bang engine or a
//! CMSIS-DAP adapter.
//!
//! # Examples
//!
//! ## Bringing up a target and programming an image
//!
//! ```no_run
//! # fn transport() -> kinetis_swd::probe::mock::MockKinetis { unimplemented!() }
//! use kinetis_swd::kinetis::{FlashImage, FlashProgrammer, Kinetis, FLASH_SECTOR_SIZE};
//!
//! let mut target = Kinetis::new(transport());
//! target.startup()?;
//!
//! let words = vec![0xffff_ffffu32; 2 * FLASH_SECTOR_SIZE as usize / 4];
//! let image = FlashImage::new(&words, 2)?;
//!
//! let mut programmer = FlashProgrammer::new(&mut target, image);
//! programmer.begin()?;
//! while !programmer.is_complete() {
//!     programmer.next()?;
//!     // Service other work here.
//! }
//! # Ok::<(), kinetis_swd::Error>(())
//! ```
//!
//! ## Talking to an I2C device
//!
//! ```no_run
//! # fn transport() -> kinetis_swd::probe::mock::MockKinetis { unimplemented!() }
//! use kinetis_swd::kinetis::Kinetis;
//!
//! let mut target = Kinetis::new(transport());
//! let mut i2c = target.i2c0();
//! i2c.begin()?;
//! i2c.begin_transmission(0x50)?;
//! i2c.write(0x00)?;
//! i2c.end_transmission(false)?;
//! i2c.request_from(0x50, 2)?;
//! while i2c.available() {
//!     let _byte = i2c.receive()?;
//! }
//! # Ok::<(), kinetis_swd::Error>(())
//! ```

pub mod config;
mod error;
#[warn(missing_docs)]
pub mod kinetis;
mod memory_mapped_registers;
#[warn(missing_docs)]
pub mod probe;

pub use crate::config::KinetisConfig;
pub use crate::error::{Error, ProtocolMismatch, WaitPhase};
pub use crate::memory_mapped_registers::MemoryMappedRegister;
pub use crate::probe::{ArmError, ArmProbe, LogLevel};
