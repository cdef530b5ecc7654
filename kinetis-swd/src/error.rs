use crate::kinetis::{FlashError, I2cError};
use crate::probe::ArmError;

/// Errors reported by the Kinetis bring-up, flash and I/O operations.
#[derive(Debug, thiserror::Error, docsplay::Display)]
pub enum Error {
    /// The target does not look like a supported Kinetis part: {0}
    ProtocolMismatch(#[from] ProtocolMismatch),

    /// Timed out waiting for {0}.
    Timeout(WaitPhase),

    /// A flash operation failed: {0}
    Flash(#[from] FlashError),

    /// An I2C transaction failed: {0}
    I2c(#[from] I2cError),

    /// An error occurred while communicating with the target.
    Arm(#[from] ArmError),
}

impl Error {
    /// Returns `true` if the error was caused by an exhausted retry budget.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }
}

/// Reasons why the connected part was rejected.
#[derive(Debug, thiserror::Error, docsplay::Display, PartialEq, Eq)]
pub enum ProtocolMismatch {
    /// No supported MDM-AP found (IDR: {idr:#010x}).
    UnsupportedMdmAp {
        /// The value read from the MDM-AP identification register.
        idr: u32,
    },

    /// {access} access to target memory seems broken (expected {expected:#010x}, read {actual:#010x}).
    BrokenAccess {
        /// Which access width and direction failed the check.
        access: &'static str,
        /// The value that should have been read back.
        expected: u32,
        /// The value that was actually read back.
        actual: u32,
    },
}

/// The bounded wait which ran out of retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, docsplay::Display)]
pub enum WaitPhase {
    /// a previous reset to finish
    ResetIdle,
    /// the system to enter reset
    ResetRequest,
    /// the system to leave reset with the flash ready and security cleared
    ResetRelease,
    /// the core to enter debug halt (DHCSR: {dhcsr:#010x})
    DebugHalt {
        /// The last DHCSR value that was read.
        dhcsr: u32,
    },
    /// peripheral init step '{step}'
    PeripheralInit {
        /// The name of the step that timed out.
        step: &'static str,
    },
    /// the mass erase to begin
    MassEraseStart,
    /// the mass erase to complete
    MassEraseComplete,
    /// the flash controller to become idle
    FlashCommand,
    /// an I2C transfer to complete
    I2cTransfer,
    /// the I2C bus to become idle
    I2cBusIdle,
}
