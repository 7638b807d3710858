mod mcu;
#[cfg(feature = "sensor-sht40")]
mod sht40;

use core::marker::PhantomData;

use log::warn;
use thiserror_no_std::Error;

use crate::protocol::{Capabilities, ChannelType, Reading, Readings};

pub use mcu::{Adc, AdcInput, McuReadings, McuSensors};
#[cfg(feature = "sensor-sht40")]
pub use sht40::{SHT40Readings, SHT40Sensor};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor}: {operation} failed ({details})")]
    ReadFailed {
        sensor: &'static str,
        operation: &'static str,
        details: &'static str,
    },
    #[error("{sensor}: implausible reading ({details})")]
    InvalidData {
        sensor: &'static str,
        details: &'static str,
    },
}

/// Trait for sensor reading data structures.
/// Provides compile-time guarantees about the number of values and their conversion to arrays.
pub trait SensorReadings<const COUNT: usize> {
    /// Convert the readings into a fixed-size array, ordered like the
    /// sensor's `CHANNELS`.
    fn to_array(self) -> [f32; COUNT];
}

/// Trait for sensors that produce typed readings.
pub trait Sensor<const COUNT: usize> {
    /// Channel tag of each value, in `to_array` order.
    const CHANNELS: [ChannelType; COUNT];

    /// The type of readings this sensor produces.
    type Readings: SensorReadings<COUNT>;

    /// Read the sensor and return typed readings.
    fn read(&mut self) -> Result<Self::Readings, SensorError>;
}

/// The set of channels a leaf samples for each report.
pub trait SensorSuite {
    /// Append the channel tags this suite reports (used for REGISTER).
    fn capabilities(&self, into: &mut Capabilities);

    /// Sample every sensor and append its readings. A failing sensor is
    /// logged and its channels are left out of the report.
    fn sample(&mut self, into: &mut Readings);
}

/// Adapts one [`Sensor`] to a [`SensorSuite`].
pub struct Probe<S, const COUNT: usize>
where
    S: Sensor<COUNT>,
{
    sensor: S,
    _marker: PhantomData<[(); COUNT]>,
}

impl<S, const COUNT: usize> From<S> for Probe<S, COUNT>
where
    S: Sensor<COUNT>,
{
    fn from(value: S) -> Self {
        Self::new(value)
    }
}

impl<S, const COUNT: usize> Probe<S, COUNT>
where
    S: Sensor<COUNT>,
{
    pub const fn new(sensor: S) -> Self {
        Self {
            sensor,
            _marker: PhantomData,
        }
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }
}

impl<S, const COUNT: usize> SensorSuite for Probe<S, COUNT>
where
    S: Sensor<COUNT>,
{
    fn capabilities(&self, into: &mut Capabilities) {
        for channel in <S as Sensor<COUNT>>::CHANNELS {
            if into.push(channel.as_u8()).is_err() {
                warn!("Capability list full, dropping {:?}", channel);
            }
        }
    }

    fn sample(&mut self, into: &mut Readings) {
        let values = match self.sensor.read() {
            Ok(readings) => readings.to_array(),
            Err(e) => {
                warn!("Omitting {} channel(s) from report: {}", COUNT, e);
                return;
            }
        };

        for (channel, value) in <S as Sensor<COUNT>>::CHANNELS.into_iter().zip(values) {
            if into.push(Reading::new(channel, value)).is_err() {
                warn!("Report full, dropping {:?} reading", channel);
            }
        }
    }
}

impl<A, B> SensorSuite for (A, B)
where
    A: SensorSuite,
    B: SensorSuite,
{
    fn capabilities(&self, into: &mut Capabilities) {
        self.0.capabilities(into);
        self.1.capabilities(into);
    }

    fn sample(&mut self, into: &mut Readings) {
        self.0.sample(into);
        self.1.sample(into);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(f32);

    struct FixedReadings(f32);

    impl SensorReadings<1> for FixedReadings {
        fn to_array(self) -> [f32; 1] {
            [self.0]
        }
    }

    impl Sensor<1> for Fixed {
        const CHANNELS: [ChannelType; 1] = [ChannelType::Humidity];
        type Readings = FixedReadings;

        fn read(&mut self) -> Result<FixedReadings, SensorError> {
            if self.0.is_nan() {
                return Err(SensorError::InvalidData {
                    sensor: "fixed",
                    details: "nan",
                });
            }
            Ok(FixedReadings(self.0))
        }
    }

    fn probe(value: f32) -> Probe<Fixed, 1> {
        Probe::new(Fixed(value))
    }

    #[test]
    fn test_probe_tags_readings() {
        let mut humidity = probe(55.0);
        let mut readings = Readings::new();
        humidity.sample(&mut readings);
        assert_eq!(
            readings.as_slice(),
            &[Reading::new(ChannelType::Humidity, 55.0)]
        );
    }

    #[test]
    fn test_failed_sensor_is_omitted() {
        let mut suite = (probe(f32::NAN), probe(40.0));
        let mut readings = Readings::new();
        suite.sample(&mut readings);
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].value, 40.0);

        let mut caps = Capabilities::new();
        suite.capabilities(&mut caps);
        assert_eq!(caps.as_slice(), &[0x02, 0x02]);
    }

    #[test]
    fn test_overfull_suite_is_clamped() {
        let mut suite = (
            (probe(1.0), probe(2.0)),
            (
                (probe(3.0), probe(4.0)),
                (probe(5.0), probe(6.0)),
            ),
        );
        let mut readings = Readings::new();
        suite.sample(&mut readings);
        assert_eq!(readings.len(), crate::protocol::MAX_CHANNELS);
        assert_eq!(readings[4].value, 5.0);
    }
}
