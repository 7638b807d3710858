//! Payload layouts carried inside frames.
//!
//! All multi-byte values are little-endian. Encoders append to a
//! fixed-capacity buffer and fail instead of writing past its end; decoders
//! check lengths before touching a byte.

use thiserror_no_std::Error;

use super::{ChannelType, HwType, MAX_PAYLOAD};

/// Encoded size of one `(channel_type, value)` pair.
pub const READING_SIZE: usize = 5;

/// Most channels a leaf reports in one frame.
pub const MAX_CHANNELS: usize = 5;

/// hw_type + capability_count leave the rest of the payload for capabilities.
pub const MAX_CAPABILITIES: usize = MAX_PAYLOAD - 2;

/// cmd_id + arg_len leave the rest of the payload for arguments.
pub const MAX_COMMAND_ARGS: usize = MAX_PAYLOAD - 2;

/// Payload bytes needed for a report of `channels` readings.
pub const fn report_payload_len(channels: usize) -> usize {
    1 + READING_SIZE * channels
}

const _: () = assert!(
    report_payload_len(MAX_CHANNELS) <= MAX_PAYLOAD,
    "a full sensor report must fit in one frame"
);

/// Readings sampled for one report.
pub type Readings = heapless::Vec<Reading, MAX_CHANNELS>;

/// Capability codes announced in REGISTER.
pub type Capabilities = heapless::Vec<u8, MAX_CAPABILITIES>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadError {
    #[error("payload truncated: need {needed} bytes, got {len}")]
    Truncated { needed: usize, len: usize },
    #[error("payload does not fit in {capacity} bytes")]
    CapacityExceeded { capacity: usize },
    #[error("{count} entries exceed the decoder capacity of {capacity}")]
    TooManyEntries { count: usize, capacity: usize },
}

fn append<const N: usize>(out: &mut heapless::Vec<u8, N>, bytes: &[u8]) -> Result<(), PayloadError> {
    out.extend_from_slice(bytes)
        .map_err(|_| PayloadError::CapacityExceeded { capacity: N })
}

fn require(payload: &[u8], needed: usize) -> Result<(), PayloadError> {
    if payload.len() < needed {
        return Err(PayloadError::Truncated {
            needed,
            len: payload.len(),
        });
    }
    Ok(())
}

fn count_byte(count: usize, capacity: usize) -> Result<u8, PayloadError> {
    u8::try_from(count).map_err(|_| PayloadError::CapacityExceeded { capacity })
}

/// One typed scalar measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub channel: ChannelType,
    pub value: f32,
}

impl Reading {
    pub const fn new(channel: ChannelType, value: f32) -> Self {
        Self { channel, value }
    }
}

/// SENSOR_REPORT payload: `[count][(channel_type, f32 LE) × count]`.
pub fn encode_readings<const N: usize>(
    readings: &[Reading],
    out: &mut heapless::Vec<u8, N>,
) -> Result<(), PayloadError> {
    let count = count_byte(readings.len(), N)?;
    out.clear();
    append(out, &[count])?;
    for reading in readings {
        append(out, &[reading.channel.as_u8()])?;
        append(out, &reading.value.to_le_bytes())?;
    }
    Ok(())
}

/// Decodes a SENSOR_REPORT payload. Bytes after the last announced reading
/// are ignored.
pub fn decode_readings<const N: usize>(
    payload: &[u8],
) -> Result<heapless::Vec<Reading, N>, PayloadError> {
    require(payload, 1)?;
    let count = payload[0] as usize;
    if count > N {
        return Err(PayloadError::TooManyEntries { count, capacity: N });
    }
    require(payload, report_payload_len(count))?;

    let mut readings = heapless::Vec::new();
    for chunk in payload[1..].chunks_exact(READING_SIZE).take(count) {
        let value = f32::from_le_bytes([chunk[1], chunk[2], chunk[3], chunk[4]]);
        readings
            .push(Reading::new(ChannelType::from_u8(chunk[0]), value))
            .map_err(|_| PayloadError::TooManyEntries { count, capacity: N })?;
    }
    Ok(readings)
}

/// Contents of a REGISTER payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterInfo {
    pub hw_type: HwType,
    pub capabilities: Capabilities,
}

/// REGISTER payload: `[hw_type][count][capability × count]`.
pub fn encode_register<const N: usize>(
    hw_type: HwType,
    capabilities: &[u8],
    out: &mut heapless::Vec<u8, N>,
) -> Result<(), PayloadError> {
    let count = count_byte(capabilities.len(), N)?;
    out.clear();
    append(out, &[hw_type.as_u8(), count])?;
    append(out, capabilities)
}

pub fn decode_register(payload: &[u8]) -> Result<RegisterInfo, PayloadError> {
    require(payload, 2)?;
    let count = payload[1] as usize;
    require(payload, 2 + count)?;
    let capabilities = heapless::Vec::from_slice(&payload[2..2 + count]).map_err(|_| {
        PayloadError::TooManyEntries {
            count,
            capacity: MAX_CAPABILITIES,
        }
    })?;

    Ok(RegisterInfo {
        hw_type: HwType::from_u8(payload[0]),
        capabilities,
    })
}

/// HEARTBEAT payload: battery (u16) and uptime (u32).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    pub battery_mv: u16,
    pub uptime_secs: u32,
}

impl Heartbeat {
    pub const SIZE: usize = 6;

    pub fn encode<const N: usize>(&self, out: &mut heapless::Vec<u8, N>) -> Result<(), PayloadError> {
        out.clear();
        append(out, &self.battery_mv.to_le_bytes())?;
        append(out, &self.uptime_secs.to_le_bytes())
    }

    pub fn decode(payload: &[u8]) -> Result<Self, PayloadError> {
        require(payload, Self::SIZE)?;
        Ok(Self {
            battery_mv: u16::from_le_bytes([payload[0], payload[1]]),
            uptime_secs: u32::from_le_bytes([payload[2], payload[3], payload[4], payload[5]]),
        })
    }
}

/// Command identifiers carried in a COMMAND payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandId {
    SetState,
    SetPwm,
    ReadNow,
    SetInterval,
    DeepSleep,
    Reset,
    Unknown(u8),
}

impl CommandId {
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0x01 => Self::SetState,
            0x02 => Self::SetPwm,
            0x03 => Self::ReadNow,
            0x04 => Self::SetInterval,
            0x05 => Self::DeepSleep,
            0x06 => Self::Reset,
            other => Self::Unknown(other),
        }
    }

    pub const fn as_u8(self) -> u8 {
        match self {
            Self::SetState => 0x01,
            Self::SetPwm => 0x02,
            Self::ReadNow => 0x03,
            Self::SetInterval => 0x04,
            Self::DeepSleep => 0x05,
            Self::Reset => 0x06,
            Self::Unknown(other) => other,
        }
    }
}

/// COMMAND payload: `[cmd_id][arg_len][args × arg_len]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub id: CommandId,
    pub args: heapless::Vec<u8, MAX_COMMAND_ARGS>,
}

impl Command {
    pub fn new(id: CommandId, args: &[u8]) -> Result<Self, PayloadError> {
        let args = heapless::Vec::from_slice(args).map_err(|_| PayloadError::CapacityExceeded {
            capacity: MAX_COMMAND_ARGS,
        })?;
        Ok(Self { id, args })
    }

    pub fn read_now() -> Self {
        Self {
            id: CommandId::ReadNow,
            args: heapless::Vec::new(),
        }
    }

    pub fn set_interval(seconds: u16) -> Self {
        let mut args = heapless::Vec::new();
        // Two bytes always fit in MAX_COMMAND_ARGS.
        let _ = args.extend_from_slice(&seconds.to_le_bytes());
        Self {
            id: CommandId::SetInterval,
            args,
        }
    }

    /// Interval argument of a SET_INTERVAL command, in seconds.
    pub fn interval_secs(&self) -> Option<u16> {
        match (self.id, self.args.as_slice()) {
            (CommandId::SetInterval, [lo, hi, ..]) => Some(u16::from_le_bytes([*lo, *hi])),
            _ => None,
        }
    }

    pub fn encode<const N: usize>(&self, out: &mut heapless::Vec<u8, N>) -> Result<(), PayloadError> {
        let arg_len = count_byte(self.args.len(), N)?;
        out.clear();
        append(out, &[self.id.as_u8(), arg_len])?;
        append(out, &self.args)
    }

    pub fn decode(payload: &[u8]) -> Result<Self, PayloadError> {
        require(payload, 2)?;
        let arg_len = payload[1] as usize;
        require(payload, 2 + arg_len)?;
        Self::new(CommandId::from_u8(payload[0]), &payload[2..2 + arg_len])
    }
}

/// TIME_SYNC payload: epoch seconds (u32).
pub fn encode_time_sync<const N: usize>(
    epoch_secs: u32,
    out: &mut heapless::Vec<u8, N>,
) -> Result<(), PayloadError> {
    out.clear();
    append(out, &epoch_secs.to_le_bytes())
}

pub fn decode_time_sync(payload: &[u8]) -> Result<u32, PayloadError> {
    require(payload, 4)?;
    Ok(u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]))
}

/// WAKE_NOTIFY payload: id of the leaf that was woken.
pub fn encode_wake_notify<const N: usize>(
    woken_leaf_id: u8,
    out: &mut heapless::Vec<u8, N>,
) -> Result<(), PayloadError> {
    out.clear();
    append(out, &[woken_leaf_id])
}

pub fn decode_wake_notify(payload: &[u8]) -> Result<u8, PayloadError> {
    require(payload, 1)?;
    Ok(payload[0])
}
