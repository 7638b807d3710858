//! Hardware-independent core for SensorSwarm leaf devices
//!
//! A leaf is a small battery-powered sensor that answers a hub over a
//! constrained link (I2C today, short-range radio planned). This crate holds
//! everything that does not touch a specific MCU: the binary frame protocol,
//! the hand-off between bus callbacks and the main loop, the leaf's protocol
//! state machine and the sensor abstractions.
//!
//! It is `#![no_std]` and never allocates, so it compiles for leaf targets
//! with a couple of KB of RAM as well as for desktop hosts (for the
//! simulator and tests).

#![no_std]

pub mod config;
pub mod control;
pub mod leaf_state;
pub mod protocol;
pub mod sensors;
pub mod transport;
