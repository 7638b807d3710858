//! Hand-off between the bus callbacks and the control loop.
//!
//! The outgoing frame lives behind a critical-section mutex and is only ever
//! replaced whole by the control loop; the read callback copies it out. The
//! incoming side is a single-slot signal: a newer hub write replaces an
//! unread one, and `try_take` is the atomic check-and-clear of the ready flag.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

use crate::protocol::FrameBuf;

/// Bytes captured by one hub write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    pub bytes: FrameBuf,
    /// The hub sent more than a frame's worth; the excess was discarded.
    pub overflowed: bool,
}

/// The outgoing/incoming frame pair shared by a leaf's control loop and its
/// transport adapter.
///
/// Usually placed in a `static` so interrupt handlers can reach it:
///
/// ```rust
/// use swarm_leaf::leaf_state::FrameExchange;
///
/// static EXCHANGE: FrameExchange = FrameExchange::new();
/// ```
pub struct FrameExchange {
    outgoing: Mutex<CriticalSectionRawMutex, RefCell<FrameBuf>>,
    incoming: Signal<CriticalSectionRawMutex, Received>,
}

impl Default for FrameExchange {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameExchange {
    pub const fn new() -> Self {
        Self {
            outgoing: Mutex::new(RefCell::new(FrameBuf::new())),
            incoming: Signal::new(),
        }
    }

    /// Rebuild the outgoing frame in place. Runs inside a critical section,
    /// so a hub read never observes a half-written frame.
    pub fn update_outgoing<R>(&self, f: impl FnOnce(&mut FrameBuf) -> R) -> R {
        self.outgoing.lock(|cell| f(&mut cell.borrow_mut()))
    }

    /// Run `f` over the exact bytes of the current outgoing frame.
    pub fn with_outgoing<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        self.outgoing.lock(|cell| f(cell.borrow().as_slice()))
    }

    /// Copy of the current outgoing frame.
    pub fn outgoing(&self) -> FrameBuf {
        self.outgoing.lock(|cell| cell.borrow().clone())
    }

    /// Publish a hub write, replacing any unread one.
    pub fn deliver(&self, received: Received) {
        self.incoming.signal(received);
    }

    /// Take the pending hub write, clearing the ready flag.
    pub fn take_incoming(&self) -> Option<Received> {
        self.incoming.try_take()
    }

    pub fn has_incoming(&self) -> bool {
        self.incoming.signaled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn received(bytes: &[u8]) -> Received {
        Received {
            bytes: FrameBuf::from_slice(bytes).unwrap(),
            overflowed: false,
        }
    }

    #[test]
    fn test_single_slot_latest_wins() {
        let exchange = FrameExchange::new();
        assert!(!exchange.has_incoming());

        exchange.deliver(received(&[1, 2, 3]));
        exchange.deliver(received(&[4, 5, 6]));
        assert!(exchange.has_incoming());

        assert_eq!(exchange.take_incoming(), Some(received(&[4, 5, 6])));
        assert_eq!(exchange.take_incoming(), None);
        assert!(!exchange.has_incoming());
    }

    #[test]
    fn test_outgoing_replaced_whole() {
        let exchange = FrameExchange::new();
        assert!(exchange.outgoing().is_empty());

        exchange.update_outgoing(|out| {
            out.clear();
            out.extend_from_slice(&[9, 9, 9]).unwrap();
        });
        let len = exchange.with_outgoing(|frame| frame.len());
        assert_eq!(len, 3);
        assert_eq!(exchange.outgoing().as_slice(), &[9, 9, 9]);
    }
}
