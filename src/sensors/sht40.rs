use crate::protocol::ChannelType;
use crate::sensors::{SensorError, SensorReadings};

use super::Sensor;
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use sht4x::Sht4x;

/// Typed readings from the SHT40 sensor.
/// This provides named access to sensor values and ensures type safety.
pub struct SHT40Readings {
    pub temperature_celsius: f32,
    pub humidity_percent: f32,
}

impl SensorReadings<2> for SHT40Readings {
    fn to_array(self) -> [f32; 2] {
        [self.temperature_celsius, self.humidity_percent]
    }
}

pub struct SHT40Sensor<I, D> {
    sensor: Sht4x<I, D>,
    delay: D,
}

impl<I: I2c, D: DelayNs> SHT40Sensor<I, D> {
    pub fn new(i2c: I, delay: D) -> Self {
        Self {
            sensor: Sht4x::new(i2c),
            delay,
        }
    }
}

// Implementation for actual I2c devices
impl<I: I2c, D: DelayNs> Sensor<2> for SHT40Sensor<I, D> {
    const CHANNELS: [ChannelType; 2] = [ChannelType::Temperature, ChannelType::Humidity];
    type Readings = SHT40Readings;

    fn read(&mut self) -> Result<SHT40Readings, SensorError> {
        let measurement = self
            .sensor
            .measure(sht4x::Precision::High, &mut self.delay)
            .map_err(|e| {
                log::error!("SHT40 measurement failed: {:?}", e);
                SensorError::ReadFailed {
                    sensor: "SHT40",
                    operation: "measure temperature/humidity",
                    details: "I2C communication error or sensor not responding",
                }
            })?;

        Ok(SHT40Readings {
            temperature_celsius: measurement.temperature_celsius().to_num::<f32>(),
            humidity_percent: measurement.humidity_percent().to_num::<f32>(),
        })
    }
}
