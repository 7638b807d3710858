use embassy_time::Duration;
use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::protocol::HwType;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("config blob could not be decoded")]
    Decode,
    #[error("config does not fit in the output buffer")]
    Encode,
    #[error("bus address 0x{0:02x} is outside the usable 7-bit range")]
    InvalidBusAddress(u8),
    #[error("{0} must be non-zero")]
    ZeroPeriod(&'static str),
}

/// Static per-deployment leaf settings.
///
/// Stored on the device as a postcard blob; [`LeafConfig::default`] matches
/// the reference ATtiny leaf.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafConfig {
    pub leaf_id: u8,
    pub hw_type: u8,
    /// 7-bit responder address on the I2C bus.
    pub bus_address: u8,
    pub report_interval_secs: u32,
    pub settle_delay_ms: u32,
    pub poll_period_ms: u32,
}

impl Default for LeafConfig {
    fn default() -> Self {
        Self {
            leaf_id: 20,
            hw_type: HwType::Attiny.as_u8(),
            bus_address: 0x10,
            report_interval_secs: 30,
            settle_delay_ms: 10,
            poll_period_ms: 100,
        }
    }
}

impl LeafConfig {
    /// Decode and validate a stored config blob.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = postcard::from_bytes(bytes).map_err(|e| {
            log::error!("Failed to decode leaf config: {:?}", e);
            ConfigError::Decode
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Encode into `buf`, returning the used prefix.
    pub fn to_slice<'b>(&self, buf: &'b mut [u8]) -> Result<&'b mut [u8], ConfigError> {
        postcard::to_slice(self, buf).map_err(|_| ConfigError::Encode)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // 0x00..=0x07 and 0x78..=0x7F are reserved I2C addresses.
        if !(0x08..=0x77).contains(&self.bus_address) {
            return Err(ConfigError::InvalidBusAddress(self.bus_address));
        }
        if self.report_interval_secs == 0 {
            return Err(ConfigError::ZeroPeriod("report interval"));
        }
        if self.poll_period_ms == 0 {
            return Err(ConfigError::ZeroPeriod("poll period"));
        }
        Ok(())
    }

    pub fn hw_type(&self) -> HwType {
        HwType::from_u8(self.hw_type)
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs as u64)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms as u64)
    }

    pub fn poll_period(&self) -> Duration {
        Duration::from_millis(self.poll_period_ms as u64)
    }
}
