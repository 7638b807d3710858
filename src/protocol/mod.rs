//! SensorSwarm wire protocol
//!
//! Frame layout (5..=32 bytes on a leaf):
//!
//! | offset  | field     | notes                              |
//! |---------|-----------|------------------------------------|
//! | 0       | magic     | always [`MAGIC`]                   |
//! | 1       | version   | always [`VERSION`]                 |
//! | 2       | msg_type  | see [`MsgType`]                    |
//! | 3       | leaf_id   | static per device                  |
//! | 4..4+N  | payload   | N bytes, layout depends on type    |
//! | 4+N     | checksum  | XOR of bytes `[0, 4+N)`            |

pub mod frame;
pub mod payload;

pub use frame::*;
pub use payload::*;

use thiserror_no_std::Error;

/// Protocol marker shared by every leaf and the hub.
pub const MAGIC: u8 = 0x53;
/// The only protocol version defined so far.
pub const VERSION: u8 = 0x01;

/// magic + version + msg_type + leaf_id
pub const HEADER_SIZE: usize = 4;
pub const CHECKSUM_SIZE: usize = 1;
/// Smallest valid frame: header and checksum around an empty payload.
pub const MIN_FRAME: usize = HEADER_SIZE + CHECKSUM_SIZE;
/// Hard frame limit imposed by the leaf's RAM and the I2C transfer size.
pub const MAX_FRAME: usize = 32;
pub const MAX_PAYLOAD: usize = MAX_FRAME - MIN_FRAME;

/// Fixed-capacity buffer holding one complete frame.
pub type FrameBuf = heapless::Vec<u8, MAX_FRAME>;
/// Fixed-capacity buffer holding one frame payload.
pub type PayloadBuf = heapless::Vec<u8, MAX_PAYLOAD>;

/// Frame validation and construction failures.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame truncated: {len} bytes, need at least 5")]
    TruncatedFrame { len: usize },
    #[error("bad magic byte 0x{0:02x}")]
    BadMagic(u8),
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),
    #[error("checksum mismatch: computed 0x{computed:02x}, frame carries 0x{received:02x}")]
    BadChecksum { computed: u8, received: u8 },
    #[error("frame of {len} bytes exceeds the {capacity} byte limit")]
    FrameTooLarge { len: usize, capacity: usize },
}

/// Frame discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsgType {
    SensorReport,
    Heartbeat,
    WakeNotify,
    Register,
    Command,
    Config,
    TimeSync,
    Ack,
    Wake,
    Unknown(u8),
}

impl MsgType {
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0x01 => Self::SensorReport,
            0x02 => Self::Heartbeat,
            0x03 => Self::WakeNotify,
            0x04 => Self::Register,
            0x80 => Self::Command,
            0x81 => Self::Config,
            0x82 => Self::TimeSync,
            0xFE => Self::Ack,
            0xFF => Self::Wake,
            other => Self::Unknown(other),
        }
    }

    pub const fn as_u8(self) -> u8 {
        match self {
            Self::SensorReport => 0x01,
            Self::Heartbeat => 0x02,
            Self::WakeNotify => 0x03,
            Self::Register => 0x04,
            Self::Command => 0x80,
            Self::Config => 0x81,
            Self::TimeSync => 0x82,
            Self::Ack => 0xFE,
            Self::Wake => 0xFF,
            Self::Unknown(other) => other,
        }
    }
}

impl From<u8> for MsgType {
    fn from(value: u8) -> Self {
        Self::from_u8(value)
    }
}

impl From<MsgType> for u8 {
    fn from(value: MsgType) -> Self {
        value.as_u8()
    }
}

/// Tag of a single measurement stream inside a SENSOR_REPORT payload.
///
/// Tags outside the known table are carried as [`ChannelType::Other`] so a
/// hub can relay readings from newer leaves unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelType {
    Temperature,
    Humidity,
    Pressure,
    Co2,
    Illuminance,
    PirMotion,
    GasResistance,
    SoilMoisture,
    Ph,
    Ec,
    BatteryMv,
    Door,
    WaterLevel,
    SoundLevel,
    Other(u8),
}

impl ChannelType {
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0x01 => Self::Temperature,
            0x02 => Self::Humidity,
            0x03 => Self::Pressure,
            0x04 => Self::Co2,
            0x05 => Self::Illuminance,
            0x06 => Self::PirMotion,
            0x07 => Self::GasResistance,
            0x08 => Self::SoilMoisture,
            0x09 => Self::Ph,
            0x0A => Self::Ec,
            0x0B => Self::BatteryMv,
            0x0C => Self::Door,
            0x0D => Self::WaterLevel,
            0x0E => Self::SoundLevel,
            other => Self::Other(other),
        }
    }

    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Temperature => 0x01,
            Self::Humidity => 0x02,
            Self::Pressure => 0x03,
            Self::Co2 => 0x04,
            Self::Illuminance => 0x05,
            Self::PirMotion => 0x06,
            Self::GasResistance => 0x07,
            Self::SoilMoisture => 0x08,
            Self::Ph => 0x09,
            Self::Ec => 0x0A,
            Self::BatteryMv => 0x0B,
            Self::Door => 0x0C,
            Self::WaterLevel => 0x0D,
            Self::SoundLevel => 0x0E,
            Self::Other(other) => other,
        }
    }

    /// Stable lowercase name used by hub-side consumers.
    pub const fn name(self) -> Option<&'static str> {
        match self {
            Self::Temperature => Some("temperature"),
            Self::Humidity => Some("humidity"),
            Self::Pressure => Some("pressure"),
            Self::Co2 => Some("co2"),
            Self::Illuminance => Some("illuminance"),
            Self::PirMotion => Some("motion"),
            Self::GasResistance => Some("gas_resistance"),
            Self::SoilMoisture => Some("soil_moisture"),
            Self::Ph => Some("ph"),
            Self::Ec => Some("ec"),
            Self::BatteryMv => Some("battery_mv"),
            Self::Door => Some("door"),
            Self::WaterLevel => Some("water_level"),
            Self::SoundLevel => Some("sound_level"),
            Self::Other(_) => None,
        }
    }
}

impl From<u8> for ChannelType {
    fn from(value: u8) -> Self {
        Self::from_u8(value)
    }
}

impl From<ChannelType> for u8 {
    fn from(value: ChannelType) -> Self {
        value.as_u8()
    }
}

/// Actuator capability codes. REGISTER capabilities are a superset of the
/// channel tags: sensing capabilities reuse [`ChannelType`] values.
pub mod capability {
    pub const RELAY: u8 = 0x80;
    pub const PWM: u8 = 0x81;
    pub const NEOPIXEL: u8 = 0x82;
}

/// Leaf hardware family announced in REGISTER.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwType {
    Esp32,
    Nrf54,
    Attiny,
    Pico,
    Unknown(u8),
}

impl HwType {
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0x01 => Self::Esp32,
            0x02 => Self::Nrf54,
            0x03 => Self::Attiny,
            0x04 => Self::Pico,
            other => Self::Unknown(other),
        }
    }

    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Esp32 => 0x01,
            Self::Nrf54 => 0x02,
            Self::Attiny => 0x03,
            Self::Pico => 0x04,
            Self::Unknown(other) => other,
        }
    }
}

impl From<u8> for HwType {
    fn from(value: u8) -> Self {
        Self::from_u8(value)
    }
}

impl From<HwType> for u8 {
    fn from(value: HwType) -> Self {
        value.as_u8()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_msg_type_codes() {
        assert_eq!(MsgType::SensorReport.as_u8(), 0x01);
        assert_eq!(MsgType::Heartbeat.as_u8(), 0x02);
        assert_eq!(MsgType::Register.as_u8(), 0x04);
        assert_eq!(MsgType::Command.as_u8(), 0x80);
        assert_eq!(MsgType::Ack.as_u8(), 0xFE);
        assert_eq!(MsgType::from_u8(0x80), MsgType::Command);
    }

    #[test]
    fn test_unknown_codes_round_trip() {
        for raw in 0..=u8::MAX {
            assert_eq!(MsgType::from_u8(raw).as_u8(), raw);
            assert_eq!(ChannelType::from_u8(raw).as_u8(), raw);
            assert_eq!(HwType::from_u8(raw).as_u8(), raw);
        }
        assert_eq!(ChannelType::from_u8(0x42), ChannelType::Other(0x42));
        assert_eq!(ChannelType::Other(0x42).name(), None);
    }

    #[test]
    fn test_channel_names() {
        assert_eq!(ChannelType::Temperature.name(), Some("temperature"));
        assert_eq!(ChannelType::BatteryMv.name(), Some("battery_mv"));
        assert_eq!(ChannelType::from_u8(0x06).name(), Some("motion"));
    }

    #[test]
    fn test_frame_limits() {
        assert_eq!(MIN_FRAME, 5);
        assert_eq!(MAX_PAYLOAD, 27);
    }
}
