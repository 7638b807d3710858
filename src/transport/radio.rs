use super::{Responder, ResponderTx};
use crate::leaf_state::FrameExchange;

/// Short-range radio adapter (BLE on nRF54 leaves).
///
/// The outgoing frame is published as advertising payload and the hub
/// writes commands to a characteristic. The hand-off contract is the same
/// as [`super::I2cResponder`]: serve the current frame verbatim, capture at
/// most one frame per write, decode later in the control loop.
pub struct RadioResponder<'a> {
    exchange: &'a FrameExchange,
}

impl<'a> RadioResponder<'a> {
    pub const fn new(exchange: &'a FrameExchange) -> Self {
        Self { exchange }
    }

    /// The radio stack asks for fresh advertising data.
    pub fn on_advertise<T: ResponderTx>(&self, tx: &mut T) {
        self.serve(tx);
    }

    /// The hub wrote to the command characteristic.
    pub fn on_command_write(&self, bytes: &[u8]) {
        self.accept(bytes.iter().copied());
    }
}

impl Responder for RadioResponder<'_> {
    fn exchange(&self) -> &FrameExchange {
        self.exchange
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Frame, FrameBuf, MsgType, encode_frame};

    #[test]
    fn test_radio_matches_bus_contract() {
        let exchange = FrameExchange::new();
        let radio = RadioResponder::new(&exchange);
        exchange
            .update_outgoing(|out| encode_frame(MsgType::Heartbeat, 30, &[0; 6], out))
            .unwrap();

        let mut adv = FrameBuf::new();
        radio.on_advertise(&mut adv);
        assert_eq!(Frame::decode(&adv).unwrap().leaf_id, 30);

        radio.on_command_write(&[0x53, 0x01]);
        radio.on_command_write(&[0x53, 0x01, 0x80]);
        let received = exchange.take_incoming().unwrap();
        assert_eq!(received.bytes.as_slice(), &[0x53, 0x01, 0x80]);
        assert!(exchange.take_incoming().is_none());
    }
}
