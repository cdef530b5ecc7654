//! Retry budgets and timing of the Kinetis operations.
//!
//! The defaults are the values the bring-up and flashing sequences are known to work
//! with on K20 parts. A [`KinetisConfig`] can also be loaded from YAML, which is handy
//! when a slow transport needs longer waits:
//!
//! ```
//! use kinetis_swd::KinetisConfig;
//!
//! let config = KinetisConfig::from_yaml_str("reset_retries: 4000\n")?;
//! assert_eq!(config.reset_retries, 4000);
//! assert_eq!(config.halt_retries, 10_000);
//! # Ok::<(), kinetis_swd::config::ConfigError>(())
//! ```

use serde::{Deserialize, Serialize};

/// Error while loading a [`KinetisConfig`].
#[derive(Debug, thiserror::Error, docsplay::Display)]
pub enum ConfigError {
    /// The configuration could not be parsed.
    Parse(#[from] serde_yaml::Error),

    /// The value of `{0}` must not be zero.
    ZeroValue(&'static str),
}

/// Retry budgets and timing constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KinetisConfig {
    /// Reads per register poll when nothing more specific applies.
    pub default_retries: u32,
    /// Reads per MDM-AP status poll while resetting. System resets are slow.
    pub reset_retries: u32,
    /// Halt request attempts before giving up on the watchdog race.
    pub halt_retries: u32,
    /// Reads of the MDM-AP control register while waiting for a mass erase to finish.
    pub erase_retries: u32,
    /// Longwords programmed per [`FlashProgrammer::next`](crate::kinetis::FlashProgrammer::next) call.
    pub program_batch: u32,
    /// How long an I2C wait may take, in milliseconds.
    pub i2c_timeout_ms: u32,
    /// Pause between two I2C status reads, in milliseconds.
    pub i2c_poll_interval_ms: u32,
    /// Value of the I2C0 frequency divider register.
    pub i2c_frequency_divider: u8,
    /// Word aligned RAM address used by the memory access self-test.
    pub test_ram_address: u32,
}

impl Default for KinetisConfig {
    fn default() -> Self {
        Self {
            default_retries: 50,
            reset_retries: 2000,
            halt_retries: 10_000,
            erase_retries: 10_000,
            program_batch: 10,
            i2c_timeout_ms: 500,
            i2c_poll_interval_ms: 10,
            i2c_frequency_divider: crate::kinetis::registers::I2C_F_100KHZ,
            test_ram_address: 0x2000_0000,
        }
    }
}

impl KinetisConfig {
    /// Parse a configuration from YAML. Missing fields keep their default.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that no budget is zero, which would make every wait fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let budgets = [
            ("default_retries", self.default_retries),
            ("reset_retries", self.reset_retries),
            ("halt_retries", self.halt_retries),
            ("erase_retries", self.erase_retries),
            ("program_batch", self.program_batch),
            ("i2c_poll_interval_ms", self.i2c_poll_interval_ms),
        ];

        match budgets.iter().find(|(_, value)| *value == 0) {
            Some((name, _)) => Err(ConfigError::ZeroValue(name)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{ConfigError, KinetisConfig};
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_document_gives_defaults() {
        let config = KinetisConfig::from_yaml_str("{}").unwrap();

        assert_eq!(config, KinetisConfig::default());
    }

    #[test]
    fn partial_override() {
        let yaml = "halt_retries: 20000\ni2c_timeout_ms: 1000\n";

        let config = KinetisConfig::from_yaml_str(yaml).unwrap();

        assert_eq!(
            config,
            KinetisConfig {
                halt_retries: 20_000,
                i2c_timeout_ms: 1000,
                ..Default::default()
            }
        );
    }

    #[test]
    fn zero_budget_is_rejected() {
        let result = KinetisConfig::from_yaml_str("program_batch: 0\n");

        assert!(matches!(result, Err(ConfigError::ZeroValue("program_batch"))));
    }

    #[test]
    fn unknown_type_is_a_parse_error() {
        let result = KinetisConfig::from_yaml_str("reset_retries: lots\n");

        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn round_trips_through_yaml() {
        let config = KinetisConfig {
            erase_retries: 1,
            ..Default::default()
        };

        let yaml = serde_yaml::to_string(&config).unwrap();

        assert_eq!(KinetisConfig::from_yaml_str(&yaml).unwrap(), config);
    }
}
