//! On-die measurements available on every leaf MCU: the internal
//! temperature diode and VCC through the bandgap reference.

use super::{Sensor, SensorError, SensorReadings};
use crate::protocol::ChannelType;

/// Bandgap voltage (1.1 V nominal) times full-scale ADC counts, in mV.
const BANDGAP_SCALE_MV: u32 = 1_125_300;

/// Raw temperature-diode count at 0 °C, one count per degree.
const TEMPERATURE_OFFSET: i32 = 275;

/// Internal ADC inputs the leaf samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdcInput {
    /// Internal temperature diode against the 1.1 V reference.
    TemperatureDiode,
    /// 1.1 V bandgap measured against VCC.
    Bandgap,
}

/// Single-conversion access to the MCU's ADC.
pub trait Adc {
    fn convert(&mut self, input: AdcInput) -> Result<u16, SensorError>;
}

/// Typed readings from the MCU's own sensors.
pub struct McuReadings {
    pub temperature_celsius: f32,
    pub battery_mv: u16,
}

impl SensorReadings<2> for McuReadings {
    fn to_array(self) -> [f32; 2] {
        [self.temperature_celsius, self.battery_mv as f32]
    }
}

pub struct McuSensors<A> {
    adc: A,
}

impl<A: Adc> McuSensors<A> {
    pub fn new(adc: A) -> Self {
        Self { adc }
    }

    fn battery_mv(&mut self) -> Result<u16, SensorError> {
        let raw = self.adc.convert(AdcInput::Bandgap)?;
        if raw == 0 {
            return Err(SensorError::InvalidData {
                sensor: "MCU",
                details: "bandgap conversion returned zero",
            });
        }
        u16::try_from(BANDGAP_SCALE_MV / raw as u32).map_err(|_| SensorError::InvalidData {
            sensor: "MCU",
            details: "supply voltage out of range",
        })
    }
}

impl<A: Adc> Sensor<2> for McuSensors<A> {
    const CHANNELS: [ChannelType; 2] = [ChannelType::Temperature, ChannelType::BatteryMv];
    type Readings = McuReadings;

    fn read(&mut self) -> Result<McuReadings, SensorError> {
        let raw = self.adc.convert(AdcInput::TemperatureDiode)?;
        let temperature_celsius = (raw as i32 - TEMPERATURE_OFFSET) as f32;
        let battery_mv = self.battery_mv()?;

        Ok(McuReadings {
            temperature_celsius,
            battery_mv,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeAdc {
        diode: u16,
        bandgap: u16,
    }

    impl Adc for FakeAdc {
        fn convert(&mut self, input: AdcInput) -> Result<u16, SensorError> {
            Ok(match input {
                AdcInput::TemperatureDiode => self.diode,
                AdcInput::Bandgap => self.bandgap,
            })
        }
    }

    #[test]
    fn test_conversions() {
        let mut mcu = McuSensors::new(FakeAdc {
            diode: 297,
            bandgap: 341,
        });
        let readings = mcu.read().unwrap();
        assert_eq!(readings.temperature_celsius, 22.0);
        assert_eq!(readings.battery_mv, 3300);
        assert_eq!(readings.to_array(), [22.0, 3300.0]);
    }

    #[test]
    fn test_zero_bandgap_is_invalid() {
        let mut mcu = McuSensors::new(FakeAdc {
            diode: 297,
            bandgap: 0,
        });
        assert!(matches!(
            mcu.read(),
            Err(SensorError::InvalidData { sensor: "MCU", .. })
        ));
    }
}
