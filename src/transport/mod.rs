//! Bus responder adapters.
//!
//! A responder answers transfers the hub initiates. Both callbacks run in
//! interrupt (or driver-callback) context: they only copy bytes to or from
//! the shared [`FrameExchange`] and never decode, block or log.

mod i2c;
mod radio;

pub use i2c::I2cResponder;
pub use radio::RadioResponder;

use crate::leaf_state::{FrameExchange, Received};
use crate::protocol::FrameBuf;

/// Sink for the bytes a responder transmits on a hub read.
pub trait ResponderTx {
    fn write(&mut self, bytes: &[u8]);
}

/// Collects a hub read into a fixed buffer, truncating at its capacity.
impl<const N: usize> ResponderTx for heapless::Vec<u8, N> {
    fn write(&mut self, bytes: &[u8]) {
        self.clear();
        let take = bytes.len().min(N);
        let _ = self.extend_from_slice(&bytes[..take]);
    }
}

/// Shared callback logic of every transport.
pub trait Responder {
    fn exchange(&self) -> &FrameExchange;

    /// Hub read: transmit exactly the current outgoing frame.
    fn serve<T: ResponderTx>(&self, tx: &mut T) {
        self.exchange().with_outgoing(|frame| tx.write(frame));
    }

    /// Hub write: drain every byte the bus offers, keep at most one frame's
    /// worth, then raise the ready flag.
    fn accept<I: IntoIterator<Item = u8>>(&self, bytes: I) {
        let mut buf = FrameBuf::new();
        let mut overflowed = false;
        for byte in bytes {
            if buf.push(byte).is_err() {
                overflowed = true;
            }
        }
        self.exchange().deliver(Received {
            bytes: buf,
            overflowed,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_buffer_truncates() {
        let mut small = heapless::Vec::<u8, 2>::new();
        small.write(&[1, 2, 3]);
        assert_eq!(small.as_slice(), &[1, 2]);

        small.write(&[7]);
        assert_eq!(small.as_slice(), &[7]);
    }
}
