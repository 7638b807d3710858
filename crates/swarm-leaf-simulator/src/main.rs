//! Desktop simulator for a SensorSwarm leaf.
//!
//! Runs the leaf control loop on its own thread, standing in for the MCU's
//! main loop, while the main thread plays the hub: it reads the leaf's
//! outgoing frame once a second through the I2C responder callbacks and
//! occasionally writes commands, including one corrupted frame that the
//! leaf must drop.
//!
//! Set `RUST_LOG=debug` to see the leaf's side of every exchange.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use swarm_leaf::config::LeafConfig;
use swarm_leaf::control::{Clock, ControlLoop};
use swarm_leaf::leaf_state::FrameExchange;
use swarm_leaf::protocol::{
    Command, Frame, FrameBuf, MsgType, PayloadBuf, Readings, decode_readings, decode_register,
    encode_frame,
};
use swarm_leaf::sensors::{Adc, AdcInput, McuSensors, Probe, SensorError};
use swarm_leaf::transport::I2cResponder;

// ---------------------------------------------------------------------------
// Simulation constants
// ---------------------------------------------------------------------------

/// Interval between hub reads.
const HUB_READ_INTERVAL: Duration = Duration::from_secs(1);

/// Hub reads before the simulator exits.
const HUB_ROUNDS: u32 = 15;

/// How long the hub waits after a corrupted command before its next read.
const HUB_COMMAND_FOLLOWUP: Duration = Duration::from_millis(50);

/// Read period while waiting for a command's ACK. Must be well under the
/// leaf's settle delay so the short-lived ACK is observed.
const HUB_FAST_READ_INTERVAL: Duration = Duration::from_millis(2);

/// Upper bound on waiting for the ACK and the refreshed report.
const HUB_REFRESH_TIMEOUT: Duration = Duration::from_secs(1);

/// Report interval for the simulated leaf, shortened so ticks are visible.
const SIM_REPORT_INTERVAL_SECS: u32 = 3;

/// Identifier the hub puts in frames it sends.
const HUB_LEAF_ID: u8 = 0;

static EXCHANGE: FrameExchange = FrameExchange::new();
static RUNNING: AtomicBool = AtomicBool::new(true);

// ---------------------------------------------------------------------------
// Host stand-ins for MCU peripherals
// ---------------------------------------------------------------------------

struct HostClock {
    boot: Instant,
}

impl Clock for HostClock {
    fn now(&self) -> embassy_time::Instant {
        embassy_time::Instant::from_micros(self.boot.elapsed().as_micros() as u64)
    }
}

struct HostDelay;

impl DelayNs for HostDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(ns as u64));
    }
}

/// Synthetic ADC: temperature drifts around 22 °C, the battery drains
/// slowly from 3.3 V.
struct MockAdc {
    boot: Instant,
}

impl Adc for MockAdc {
    fn convert(&mut self, input: AdcInput) -> Result<u16, SensorError> {
        let t = self.boot.elapsed().as_secs_f64();
        let raw = match input {
            AdcInput::TemperatureDiode => 297.0 + 3.0 * (t / 20.0).sin(),
            AdcInput::Bandgap => {
                let vcc_mv = 3300.0 - 2.0 * t;
                1_125_300.0 / vcc_mv
            }
        };
        Ok(raw.round() as u16)
    }
}

// ---------------------------------------------------------------------------
// Leaf side
// ---------------------------------------------------------------------------

type SimLeaf = ControlLoop<'static, Probe<McuSensors<MockAdc>, 2>>;

fn build_leaf(config: LeafConfig, exchange: &'static FrameExchange, boot: Instant) -> SimLeaf {
    let sensors: Probe<_, 2> = Probe::new(McuSensors::new(MockAdc { boot }));
    ControlLoop::new(config, exchange, sensors)
}

/// Runs the leaf's main loop on its own thread until `running` is cleared.
fn spawn_leaf(
    mut leaf: SimLeaf,
    boot: Instant,
    running: &'static AtomicBool,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let clock = HostClock { boot };
        let mut delay = HostDelay;
        while running.load(Ordering::Relaxed) {
            leaf.step(&clock, &mut delay);
        }
        info!(
            "Leaf stopped ({:?}, interval {:?})",
            leaf.state().registration(),
            leaf.state().report_interval()
        );
    })
}

// ---------------------------------------------------------------------------
// Hub side
// ---------------------------------------------------------------------------

fn hub_fetch(responder: &I2cResponder<'_>) -> FrameBuf {
    let mut rx = FrameBuf::new();
    responder.on_request(&mut rx);
    rx
}

fn hub_read(responder: &I2cResponder<'_>) {
    log_frame(&hub_fetch(responder));
}

/// Decodes and logs one frame read from the leaf, returning its type.
fn log_frame(rx: &FrameBuf) -> Option<MsgType> {
    let frame = match Frame::decode(rx) {
        Ok(frame) => frame,
        Err(e) => {
            warn!("Hub: unreadable frame from leaf: {}", e);
            return None;
        }
    };

    match frame.msg_type {
        MsgType::Register => match decode_register(frame.payload) {
            Ok(reg) => info!(
                "Hub: leaf {} REGISTER {:?} capabilities {:02x?}",
                frame.leaf_id,
                reg.hw_type,
                reg.capabilities.as_slice()
            ),
            Err(e) => warn!("Hub: bad REGISTER payload: {}", e),
        },
        MsgType::SensorReport => match decode_readings::<{ swarm_leaf::protocol::MAX_CHANNELS }>(
            frame.payload,
        ) {
            Ok(readings) => log_report(frame.leaf_id, &readings),
            Err(e) => warn!("Hub: bad SENSOR_REPORT payload: {}", e),
        },
        other => info!("Hub: leaf {} sent {:?}", frame.leaf_id, other),
    }
    Some(frame.msg_type)
}

fn log_report(leaf_id: u8, readings: &Readings) {
    for reading in readings {
        let name = reading.channel.name().unwrap_or("unknown");
        info!("Hub: leaf {} {} = {:.2}", leaf_id, name, reading.value);
    }
}

fn hub_command(responder: &I2cResponder<'_>, command: &Command) -> bool {
    let mut payload = PayloadBuf::new();
    let mut frame = FrameBuf::new();
    let built = command
        .encode(&mut payload)
        .map_err(|e| warn!("Hub: cannot encode command: {}", e))
        .and_then(|_| {
            encode_frame(MsgType::Command, HUB_LEAF_ID, &payload, &mut frame)
                .map_err(|e| warn!("Hub: cannot frame command: {}", e))
        });
    if built.is_ok() {
        info!("Hub: sending {:?}", command.id);
        responder.on_receive(frame);
    }
    built.is_ok()
}

/// After a command, reads the leaf rapidly until it has served the ACK and
/// then the refreshed report. Returns false if either never shows up.
fn hub_await_refresh(responder: &I2cResponder<'_>) -> bool {
    let deadline = Instant::now() + HUB_REFRESH_TIMEOUT;
    let mut acked = false;
    let mut last = None;

    while Instant::now() < deadline {
        let rx = hub_fetch(responder);
        // Only log when the leaf swaps frames.
        if last.as_ref() != Some(&rx) {
            let msg_type = match Frame::decode(&rx) {
                Ok(frame) => Some(frame.msg_type),
                Err(_) => None,
            };
            match msg_type {
                Some(MsgType::Ack) if !acked => {
                    log_frame(&rx);
                    acked = true;
                }
                Some(MsgType::SensorReport) if acked => {
                    log_frame(&rx);
                    return true;
                }
                _ => {}
            }
            last = Some(rx);
        }
        thread::sleep(HUB_FAST_READ_INTERVAL);
    }

    warn!(
        "Hub: {} not seen within {:?}",
        if acked { "refreshed report" } else { "ACK" },
        HUB_REFRESH_TIMEOUT
    );
    false
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("Starting swarm leaf simulator");

    let config = LeafConfig {
        report_interval_secs: SIM_REPORT_INTERVAL_SECS,
        ..LeafConfig::default()
    };
    let boot = Instant::now();
    let responder = I2cResponder::new(&EXCHANGE, config.bus_address);
    let leaf = build_leaf(config, &EXCHANGE, boot);

    // Before the leaf's first poll the hub sees the REGISTER frame.
    hub_read(&responder);

    let leaf_thread = spawn_leaf(leaf, boot, &RUNNING);

    for round in 1..=HUB_ROUNDS {
        thread::sleep(HUB_READ_INTERVAL);

        match round {
            5 => {
                if hub_command(&responder, &Command::read_now()) {
                    hub_await_refresh(&responder);
                }
            }
            8 => {
                if hub_command(&responder, &Command::set_interval(1)) {
                    hub_await_refresh(&responder);
                }
            }
            11 => {
                let mut frame = FrameBuf::new();
                if encode_frame(MsgType::Command, HUB_LEAF_ID, &[0x03, 0x00], &mut frame).is_ok() {
                    let last = frame.len() - 1;
                    frame[last] ^= 0xFF;
                    info!("Hub: sending corrupted COMMAND");
                    responder.on_receive(frame);
                    thread::sleep(HUB_COMMAND_FOLLOWUP);
                }
            }
            _ => {}
        }

        hub_read(&responder);
    }

    RUNNING.store(false, Ordering::Relaxed);
    if leaf_thread.join().is_err() {
        warn!("Leaf thread panicked");
    }
    info!("Simulator exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    static TEST_EXCHANGE: FrameExchange = FrameExchange::new();
    static TEST_RUNNING: AtomicBool = AtomicBool::new(true);

    #[test]
    fn test_hub_sees_ack_then_report() {
        let config = LeafConfig::default();
        let boot = Instant::now();
        let responder = I2cResponder::new(&TEST_EXCHANGE, config.bus_address);
        let leaf = spawn_leaf(build_leaf(config, &TEST_EXCHANGE, boot), boot, &TEST_RUNNING);

        // Let the first poll replace REGISTER with a report.
        thread::sleep(Duration::from_millis(20));

        assert!(hub_command(&responder, &Command::read_now()));
        let seen = hub_await_refresh(&responder);

        TEST_RUNNING.store(false, Ordering::Relaxed);
        leaf.join().unwrap();
        assert!(seen);
    }
}
