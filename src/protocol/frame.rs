//! Frame construction and validation.
//!
//! Both directions work in caller-supplied fixed buffers; nothing here
//! allocates.

use super::{FrameBuf, FrameError, HEADER_SIZE, MAGIC, MAX_FRAME, MIN_FRAME, MsgType, VERSION};

/// XOR of every byte in `bytes`.
pub fn xor_checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |cs, b| cs ^ b)
}

/// Builds a complete frame into `out`, replacing its previous contents.
///
/// On `FrameTooLarge` the buffer is left untouched, so a leaf keeps serving
/// its last good frame.
pub fn encode_frame(
    msg_type: MsgType,
    leaf_id: u8,
    payload: &[u8],
    out: &mut FrameBuf,
) -> Result<(), FrameError> {
    let len = MIN_FRAME + payload.len();
    let too_large = FrameError::FrameTooLarge {
        len,
        capacity: MAX_FRAME,
    };
    if len > MAX_FRAME {
        return Err(too_large);
    }

    out.clear();
    out.extend_from_slice(&[MAGIC, VERSION, msg_type.as_u8(), leaf_id])
        .map_err(|_| too_large)?;
    out.extend_from_slice(payload).map_err(|_| too_large)?;

    let checksum = xor_checksum(out.as_slice());
    out.push(checksum).map_err(|_| too_large)
}

/// A validated frame borrowed from a receive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub msg_type: MsgType,
    pub leaf_id: u8,
    pub payload: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Validates `bytes` as one complete frame.
    ///
    /// The checksum is verified before the header fields, so any corruption
    /// of a previously valid frame surfaces as `BadChecksum`.
    pub fn decode(bytes: &'a [u8]) -> Result<Self, FrameError> {
        let Some((&received, body)) = bytes.split_last() else {
            return Err(FrameError::TruncatedFrame { len: 0 });
        };
        if bytes.len() < MIN_FRAME {
            return Err(FrameError::TruncatedFrame { len: bytes.len() });
        }

        let computed = xor_checksum(body);
        if computed != received {
            return Err(FrameError::BadChecksum { computed, received });
        }
        if body[0] != MAGIC {
            return Err(FrameError::BadMagic(body[0]));
        }
        // No compatibility table exists yet: anything but VERSION is rejected.
        if body[1] != VERSION {
            return Err(FrameError::UnsupportedVersion(body[1]));
        }

        Ok(Self {
            msg_type: MsgType::from_u8(body[2]),
            leaf_id: body[3],
            payload: &body[HEADER_SIZE..],
        })
    }

    /// Re-encodes this frame into `out`.
    pub fn encode_into(&self, out: &mut FrameBuf) -> Result<(), FrameError> {
        encode_frame(self.msg_type, self.leaf_id, self.payload, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MAX_PAYLOAD;

    fn encoded(msg_type: MsgType, leaf_id: u8, payload: &[u8]) -> FrameBuf {
        let mut out = FrameBuf::new();
        encode_frame(msg_type, leaf_id, payload, &mut out).unwrap();
        out
    }

    #[test]
    fn test_empty_ack_layout() {
        let frame = encoded(MsgType::Ack, 20, &[]);
        let cs = MAGIC ^ VERSION ^ 0xFE ^ 20;
        assert_eq!(frame.as_slice(), &[0x53, 0x01, 0xFE, 20, cs]);
    }

    #[test]
    fn test_decode_recovers_fields() {
        let payload = [0x03, 0x02, 0x01, 0x0B];
        let frame = encoded(MsgType::Register, 20, &payload);
        let decoded = Frame::decode(&frame).unwrap();

        assert_eq!(decoded.msg_type, MsgType::Register);
        assert_eq!(decoded.leaf_id, 20);
        assert_eq!(decoded.payload, &payload);
    }

    #[test]
    fn test_reencode_matches_original() {
        let frame = encoded(MsgType::Heartbeat, 7, &[0xE4, 0x0C, 0x10, 0, 0, 0]);
        let decoded = Frame::decode(&frame).unwrap();

        let mut again = FrameBuf::new();
        decoded.encode_into(&mut again).unwrap();
        assert_eq!(again, frame);
    }

    #[test]
    fn test_payload_lengths_up_to_capacity() {
        let payload = [0xA5u8; MAX_PAYLOAD];
        for len in [0, 1, 11, MAX_PAYLOAD] {
            let frame = encoded(MsgType::Unknown(0x7A), 255, &payload[..len]);
            assert_eq!(frame.len(), MIN_FRAME + len);
            let decoded = Frame::decode(&frame).unwrap();
            assert_eq!(decoded.msg_type, MsgType::Unknown(0x7A));
            assert_eq!(decoded.payload, &payload[..len]);
        }
    }

    #[test]
    fn test_too_large_keeps_previous_frame() {
        let mut out = encoded(MsgType::Ack, 1, &[]);
        let before = out.clone();
        let payload = [0u8; MAX_PAYLOAD + 1];

        let err = encode_frame(MsgType::SensorReport, 1, &payload, &mut out).unwrap_err();
        assert_eq!(
            err,
            FrameError::FrameTooLarge {
                len: 33,
                capacity: 32
            }
        );
        assert_eq!(out, before);
    }

    #[test]
    fn test_single_bit_flip_is_bad_checksum() {
        let frame = encoded(MsgType::SensorReport, 7, &[1, 2, 3, 4, 5, 6]);
        for byte in 0..frame.len() {
            for bit in 0..8 {
                let mut corrupt = frame.clone();
                corrupt[byte] ^= 1 << bit;
                assert!(
                    matches!(Frame::decode(&corrupt), Err(FrameError::BadChecksum { .. })),
                    "flip of byte {} bit {} was not caught",
                    byte,
                    bit
                );
            }
        }
    }

    #[test]
    fn test_short_input_is_truncated() {
        let bytes = [MAGIC, VERSION, 0x01, 0x02, 0x00];
        for len in 0..MIN_FRAME {
            assert!(matches!(
                Frame::decode(&bytes[..len]),
                Err(FrameError::TruncatedFrame { .. })
            ));
        }
    }

    #[test]
    fn test_bad_magic_with_valid_checksum() {
        let body = [0x54, VERSION, 0x80, 3];
        let mut bytes = [0u8; 5];
        bytes[..4].copy_from_slice(&body);
        bytes[4] = xor_checksum(&body);
        assert_eq!(Frame::decode(&bytes), Err(FrameError::BadMagic(0x54)));
    }

    #[test]
    fn test_other_version_rejected() {
        let body = [MAGIC, 0x02, 0x80, 3];
        let mut bytes = [0u8; 5];
        bytes[..4].copy_from_slice(&body);
        bytes[4] = xor_checksum(&body);
        assert_eq!(
            Frame::decode(&bytes),
            Err(FrameError::UnsupportedVersion(2))
        );
    }
}
