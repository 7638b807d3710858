use super::{Responder, ResponderTx};
use crate::leaf_state::FrameExchange;

/// I2C target-role adapter.
///
/// Wire the two callbacks to the peripheral driver's "master read" and
/// "master write" events:
///
/// ```rust,ignore
/// static EXCHANGE: FrameExchange = FrameExchange::new();
/// static RESPONDER: I2cResponder<'static> = I2cResponder::new(&EXCHANGE, 0x10);
///
/// fn on_read_request(tx: &mut impl ResponderTx) {
///     RESPONDER.on_request(tx);
/// }
///
/// fn on_write(rx: impl Iterator<Item = u8>) {
///     RESPONDER.on_receive(rx);
/// }
/// ```
pub struct I2cResponder<'a> {
    exchange: &'a FrameExchange,
    address: u8,
}

impl<'a> I2cResponder<'a> {
    /// Create a responder answering on the 7-bit `address`.
    #[inline]
    pub const fn new(exchange: &'a FrameExchange, address: u8) -> Self {
        Self { exchange, address }
    }

    pub const fn address(&self) -> u8 {
        self.address
    }

    /// Hub read from this address.
    #[inline]
    pub fn on_request<T: ResponderTx>(&self, tx: &mut T) {
        self.serve(tx);
    }

    /// Hub write to this address.
    #[inline]
    pub fn on_receive<I: IntoIterator<Item = u8>>(&self, bytes: I) {
        self.accept(bytes);
    }
}

impl Responder for I2cResponder<'_> {
    fn exchange(&self) -> &FrameExchange {
        self.exchange
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{FrameBuf, MAX_FRAME};

    #[test]
    fn test_read_serves_exact_frame() {
        let exchange = FrameExchange::new();
        exchange.update_outgoing(|out| out.extend_from_slice(&[0x53, 1, 0xFE, 20, 0xB8]).unwrap());
        let responder = I2cResponder::new(&exchange, 0x10);

        let mut rx = FrameBuf::new();
        responder.on_request(&mut rx);
        assert_eq!(rx.as_slice(), &[0x53, 1, 0xFE, 20, 0xB8]);
        // Reads do not consume the frame.
        responder.on_request(&mut rx);
        assert_eq!(rx.len(), 5);
        assert_eq!(responder.address(), 0x10);
    }

    #[test]
    fn test_write_sets_ready_flag() {
        let exchange = FrameExchange::new();
        let responder = I2cResponder::new(&exchange, 0x10);

        responder.on_receive([1u8, 2, 3]);
        assert!(exchange.has_incoming());
        let received = exchange.take_incoming().unwrap();
        assert_eq!(received.bytes.as_slice(), &[1, 2, 3]);
        assert!(!received.overflowed);
    }

    #[test]
    fn test_write_overflow_is_discarded() {
        let exchange = FrameExchange::new();
        let responder = I2cResponder::new(&exchange, 0x10);

        responder.on_receive(0..(MAX_FRAME as u8 + 8));
        let received = exchange.take_incoming().unwrap();
        assert!(received.overflowed);
        assert_eq!(received.bytes.len(), MAX_FRAME);
        assert_eq!(received.bytes[MAX_FRAME - 1], MAX_FRAME as u8 - 1);
    }
}
