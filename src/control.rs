//! Main-context control loop.
//!
//! Each poll drains at most one received frame, then decides whether the
//! outgoing frame needs refreshing: after a COMMAND the ACK is served until
//! the settle delay has passed, otherwise a report is built whenever the
//! reporting interval has elapsed (or the leaf is still unregistered).

use core::cmp::min;

use embassy_time::{Duration, Instant};
use embedded_hal::delay::DelayNs;
use log::{debug, warn};

use crate::config::LeafConfig;
use crate::leaf_state::{FrameExchange, LeafState};
use crate::protocol::{Capabilities, Command, Frame, MsgType, Readings};
use crate::sensors::SensorSuite;

/// Monotonic time source supplied by the platform.
pub trait Clock {
    fn now(&self) -> Instant;
}

pub struct ControlLoop<'a, S> {
    state: LeafState<'a>,
    sensors: S,
}

impl<'a, S: SensorSuite> ControlLoop<'a, S> {
    /// Boot the leaf: capabilities come from the sensor suite and a REGISTER
    /// frame is armed before the first poll.
    pub fn new(config: LeafConfig, exchange: &'a FrameExchange, sensors: S) -> Self {
        let mut capabilities = Capabilities::new();
        sensors.capabilities(&mut capabilities);

        Self {
            state: LeafState::new(config, capabilities, exchange),
            sensors,
        }
    }

    pub fn state(&self) -> &LeafState<'a> {
        &self.state
    }

    pub fn sensors_mut(&mut self) -> &mut S {
        &mut self.sensors
    }

    /// One iteration of the loop at time `now`. Never blocks.
    pub fn poll(&mut self, now: Instant) {
        self.drain_incoming(now);

        let refresh = self.state.refresh_pending();
        if refresh.is_some_and(|at| now < at) {
            // Still inside the settle window: keep serving the ACK.
            return;
        }

        let tick = self.state.tick_due(now);
        if refresh.is_some() || tick {
            self.refresh_report();
        }
        if tick {
            self.state.mark_reported(now);
        }
    }

    /// How long the caller may sleep before the next poll.
    pub fn next_wake(&self, now: Instant) -> Duration {
        let period = self.state.config().poll_period();
        match self.state.refresh_pending() {
            Some(at) => min(
                period,
                at.checked_duration_since(now).unwrap_or(Duration::from_ticks(0)),
            ),
            None => period,
        }
    }

    /// Poll once, then sleep until the next poll is due.
    pub fn step<C: Clock, D: DelayNs>(&mut self, clock: &C, delay: &mut D) {
        let now = clock.now();
        self.poll(now);
        let wait = self.next_wake(now);
        delay.delay_us(u32::try_from(wait.as_micros()).unwrap_or(u32::MAX));
    }

    /// Run forever. There is no shutdown path; the leaf stops on reset or
    /// power loss.
    pub fn run<C: Clock, D: DelayNs>(mut self, clock: C, mut delay: D) -> ! {
        loop {
            self.step(&clock, &mut delay);
        }
    }

    fn drain_incoming(&mut self, now: Instant) {
        let Some(received) = self.state.exchange().take_incoming() else {
            return;
        };
        if received.overflowed {
            warn!(
                "Hub write exceeded {} bytes; excess discarded",
                received.bytes.len()
            );
        }

        match Frame::decode(&received.bytes) {
            Ok(frame) => self.handle_frame(frame, now),
            Err(e) => warn!("Dropping received frame: {}", e),
        }
    }

    fn handle_frame(&mut self, frame: Frame<'_>, now: Instant) {
        match frame.msg_type {
            MsgType::Command => {
                self.state.arm_ack(now);
                match Command::decode(frame.payload) {
                    Ok(command) => self.state.apply_command(command),
                    Err(e) => warn!("COMMAND payload not understood: {}", e),
                }
            }
            other => debug!("Ignoring {:?} frame from hub", other),
        }
    }

    fn refresh_report(&mut self) {
        let mut readings = Readings::new();
        self.sensors.sample(&mut readings);
        self.state.arm_report(&readings);
    }
}
