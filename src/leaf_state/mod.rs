//! Protocol state of a leaf and the frames it serves

mod exchange;

pub use exchange::*;

use embassy_time::{Duration, Instant};
use log::{debug, error, info, warn};

use crate::config::LeafConfig;
use crate::protocol::{
    Capabilities, Command, CommandId, MsgType, PayloadBuf, Reading, encode_frame, encode_readings,
    encode_register,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// Booted; the outgoing frame is REGISTER.
    Unregistered,
    /// At least one report cycle has passed. Stays here until reset.
    Registered,
}

/// Everything the leaf knows about its place in the swarm.
///
/// Created once at boot and owned by the control loop. The frame buffers
/// themselves live in the shared [`FrameExchange`], which the transport
/// adapter reaches through its own reference.
pub struct LeafState<'a> {
    config: LeafConfig,
    capabilities: Capabilities,
    registration: Registration,
    report_interval: Duration,
    last_report: Option<Instant>,
    /// When set, an ACK is being served and a fresh report replaces it at
    /// this instant.
    refresh_at: Option<Instant>,
    last_command: Option<Command>,
    exchange: &'a FrameExchange,
}

impl<'a> LeafState<'a> {
    /// Boot state: unregistered, with a REGISTER frame armed.
    pub fn new(config: LeafConfig, capabilities: Capabilities, exchange: &'a FrameExchange) -> Self {
        let state = Self {
            report_interval: config.report_interval(),
            config,
            capabilities,
            registration: Registration::Unregistered,
            last_report: None,
            refresh_at: None,
            last_command: None,
            exchange,
        };
        state.arm_register();
        state
    }

    pub fn config(&self) -> &LeafConfig {
        &self.config
    }

    pub fn exchange(&self) -> &'a FrameExchange {
        self.exchange
    }

    pub fn registration(&self) -> Registration {
        self.registration
    }

    pub fn is_registered(&self) -> bool {
        self.registration == Registration::Registered
    }

    pub fn capabilities(&self) -> &[u8] {
        &self.capabilities
    }

    pub fn report_interval(&self) -> Duration {
        self.report_interval
    }

    pub fn last_report(&self) -> Option<Instant> {
        self.last_report
    }

    /// Most recent COMMAND payload the hub sent, if it parsed.
    pub fn last_command(&self) -> Option<&Command> {
        self.last_command.as_ref()
    }

    pub fn refresh_pending(&self) -> Option<Instant> {
        self.refresh_at
    }

    /// A periodic report is owed: never reported yet, or the interval has
    /// elapsed since the last one.
    pub fn tick_due(&self, now: Instant) -> bool {
        match (self.registration, self.last_report) {
            (Registration::Unregistered, _) | (_, None) => true,
            (Registration::Registered, Some(last)) => now
                .checked_duration_since(last)
                .is_some_and(|elapsed| elapsed >= self.report_interval),
        }
    }

    /// Record a periodic report. The first one registers the leaf: there is
    /// no registration ACK in the protocol, so one report cycle is taken as
    /// success whether or not the hub read the REGISTER frame.
    pub fn mark_reported(&mut self, now: Instant) {
        self.last_report = Some(now);
        if self.registration == Registration::Unregistered {
            self.registration = Registration::Registered;
            info!(
                "Leaf {} registered (fire-and-forget, no hub acknowledgment)",
                self.config.leaf_id
            );
        }
    }

    pub fn arm_register(&self) {
        let mut payload = PayloadBuf::new();
        if let Err(e) = encode_register(self.config.hw_type(), &self.capabilities, &mut payload) {
            error!("Failed to build REGISTER payload: {}", e);
            return;
        }
        if self.install(MsgType::Register, &payload) {
            info!(
                "Leaf {} armed REGISTER ({:?}, {} capabilities)",
                self.config.leaf_id,
                self.config.hw_type(),
                self.capabilities.len()
            );
        }
    }

    /// Serve an empty ACK now and schedule the post-command report.
    pub fn arm_ack(&mut self, now: Instant) {
        if self.install(MsgType::Ack, &[]) {
            self.refresh_at = Some(now + self.config.settle_delay());
            debug!("ACK armed, report refresh at {:?}", self.refresh_at);
        }
    }

    /// Serve a SENSOR_REPORT built from `readings`. Clears any pending
    /// post-command refresh.
    pub fn arm_report(&mut self, readings: &[Reading]) {
        self.refresh_at = None;
        let mut payload = PayloadBuf::new();
        if let Err(e) = encode_readings(readings, &mut payload) {
            error!("Failed to build SENSOR_REPORT payload: {}", e);
            return;
        }
        if self.install(MsgType::SensorReport, &payload) {
            debug!("SENSOR_REPORT armed with {} readings", readings.len());
        }
    }

    /// Act on a parsed COMMAND payload. The ACK is sent regardless.
    pub fn apply_command(&mut self, command: Command) {
        match command.id {
            CommandId::SetInterval => match command.interval_secs() {
                Some(0) | None => warn!("Ignoring SET_INTERVAL without a usable interval"),
                Some(secs) => {
                    self.report_interval = Duration::from_secs(secs as u64);
                    info!("Report interval set to {}s", secs);
                }
            },
            CommandId::ReadNow => debug!("READ_NOW: fresh report follows the ACK"),
            other => info!("Command {:?} has no actuator on this leaf", other),
        }
        self.last_command = Some(command);
    }

    fn install(&self, msg_type: MsgType, payload: &[u8]) -> bool {
        let leaf_id = self.config.leaf_id;
        let result = self
            .exchange
            .update_outgoing(|out| encode_frame(msg_type, leaf_id, payload, out));

        match result {
            Ok(()) => true,
            Err(e) => {
                // Unreachable with in-range payloads; the previous frame stays armed.
                error!("Failed to arm {:?} frame: {}", msg_type, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ChannelType, Frame, HwType, decode_register};

    fn caps() -> Capabilities {
        Capabilities::from_slice(&[0x01, 0x0B]).unwrap()
    }

    #[test]
    fn test_boot_arms_register() {
        let exchange = FrameExchange::new();
        let state = LeafState::new(LeafConfig::default(), caps(), &exchange);
        assert_eq!(state.registration(), Registration::Unregistered);

        let out = exchange.outgoing();
        let frame = Frame::decode(&out).unwrap();
        assert_eq!(frame.msg_type, MsgType::Register);
        assert_eq!(frame.leaf_id, 20);

        let info = decode_register(frame.payload).unwrap();
        assert_eq!(info.hw_type, HwType::Attiny);
        assert_eq!(info.capabilities.as_slice(), &[0x01, 0x0B]);
    }

    #[test]
    fn test_tick_schedule() {
        let exchange = FrameExchange::new();
        let mut state = LeafState::new(LeafConfig::default(), caps(), &exchange);
        let t0 = Instant::from_secs(100);

        assert!(state.tick_due(t0));
        state.mark_reported(t0);
        assert!(state.is_registered());
        assert!(!state.tick_due(t0 + Duration::from_secs(29)));
        assert!(state.tick_due(t0 + Duration::from_secs(30)));
        // A clock that steps backwards is not a tick.
        assert!(!state.tick_due(Instant::from_secs(50)));
    }

    #[test]
    fn test_ack_then_report() {
        let exchange = FrameExchange::new();
        let mut state = LeafState::new(LeafConfig::default(), caps(), &exchange);
        let t0 = Instant::from_millis(1_000);

        state.arm_ack(t0);
        assert_eq!(state.refresh_pending(), Some(Instant::from_millis(1_010)));
        let out = exchange.outgoing();
        let frame = Frame::decode(&out).unwrap();
        assert_eq!(frame.msg_type, MsgType::Ack);
        assert!(frame.payload.is_empty());

        state.arm_report(&[Reading::new(ChannelType::Temperature, 20.0)]);
        assert_eq!(state.refresh_pending(), None);
        let out = exchange.outgoing();
        assert_eq!(Frame::decode(&out).unwrap().msg_type, MsgType::SensorReport);
    }

    #[test]
    fn test_set_interval_command() {
        let exchange = FrameExchange::new();
        let mut state = LeafState::new(LeafConfig::default(), caps(), &exchange);

        state.apply_command(Command::set_interval(5));
        assert_eq!(state.report_interval(), Duration::from_secs(5));

        state.apply_command(Command::set_interval(0));
        assert_eq!(state.report_interval(), Duration::from_secs(5));
        assert_eq!(state.last_command(), Some(&Command::set_interval(0)));
    }
}
