use crate::core::session::reply::Reply;
use crate::core::session::state::{ActivityType, SessionState, SessionStatus};
use crate::core::transport::{Delay, ThreadDelay, Transport};
use crate::domain::config::{CommandTable, DeviceConfig, TimingConfig};
use crate::domain::error::{PicoCtlError, PicoCtlResult};
use std::io;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// One open connection to a device, driven one command at a time.
///
/// The session owns its transport exclusively. It is either active or,
/// after [`close`](Self::close) or a transport failure, gone: a failed
/// session refuses further commands.
pub struct CommandSession<T: Transport, D: Delay = ThreadDelay> {
    transport: T,
    delay: D,
    table: CommandTable,
    timing: TimingConfig,
    state: SessionState,
}

impl<T: Transport, D: Delay> CommandSession<T, D> {
    /// Wrap an opened transport and wait out the board's boot settle delay.
    pub fn open(transport: T, device: &DeviceConfig, mut delay: D) -> Self {
        let state = SessionState::new(
            device.name.clone(),
            transport.describe(),
            transport.transport_type().to_string(),
        );

        let settle = Duration::from_millis(device.timing.boot_settle_ms);
        info!("Connected to {}; settling for {:?}", state.endpoint, settle);
        delay.delay(settle);

        Self {
            transport,
            delay,
            table: device.commands.clone(),
            timing: device.timing.clone(),
            state,
        }
    }

    /// Write `text` verbatim and return at most one reply line.
    pub fn send_command(&mut self, text: &str) -> PicoCtlResult<Reply> {
        if let SessionStatus::Error(message) = &self.state.status {
            return Err(PicoCtlError::Transport(io::Error::new(
                io::ErrorKind::NotConnected,
                format!("session already failed: {}", message),
            )));
        }

        self.state.last_command = Some(text.to_string());
        let payload = text.as_bytes();
        let started = Instant::now();

        if let Err(e) = self.transport.write_all(payload) {
            return Err(self.fail(e));
        }
        self.state
            .record_activity(ActivityType::CommandSent { bytes: payload.len() });
        debug!("Sent command {:?} ({} bytes)", text, payload.len());

        let processing = self.table.delay_for(text);
        if !processing.is_zero() {
            debug!("Waiting {:?} for the device to process {:?}", processing, text);
            self.delay.delay(processing);
        }

        let available = match self.wait_for_reply() {
            Ok(available) => available,
            Err(e) => return Err(self.fail(e)),
        };

        if available == 0 {
            debug!("No reply to {:?}", text);
            self.state.record_activity(ActivityType::NoResponse);
            return Ok(Reply::NoResponse {
                command: text.to_string(),
            });
        }

        let raw = match self.transport.read_line() {
            Ok(raw) => raw,
            Err(e) => return Err(self.fail(e)),
        };
        let line = String::from_utf8_lossy(&raw).trim().to_string();

        self.state.record_activity(ActivityType::ReplyReceived {
            bytes: raw.len(),
            elapsed: started.elapsed(),
        });
        debug!("Reply to {:?}: {:?}", text, line);

        Ok(Reply::Line {
            command: text.to_string(),
            text: line,
        })
    }

    /// Release the transport and return the final state.
    pub fn close(mut self) -> PicoCtlResult<SessionState> {
        self.transport.close()?;
        self.state.update_status(SessionStatus::Closed);
        info!(
            "Session on {} closed after {} command(s)",
            self.state.endpoint, self.state.statistics.commands_sent
        );
        Ok(self.state)
    }

    /// Give up the session without an explicit close, e.g. after a failure.
    pub fn into_state(self) -> SessionState {
        self.state
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn table(&self) -> &CommandTable {
        &self.table
    }

    pub fn endpoint(&self) -> &str {
        &self.state.endpoint
    }

    /// Check once, then keep polling for the configured reply window.
    fn wait_for_reply(&mut self) -> io::Result<usize> {
        let mut available = self.transport.bytes_available()?;

        let window = Duration::from_millis(self.timing.reply_window_ms);
        let step = Duration::from_millis(self.timing.poll_interval_ms.max(1));
        let mut waited = Duration::ZERO;

        while available == 0 && waited < window {
            let pause = step.min(window - waited);
            self.delay.delay(pause);
            waited += pause;
            available = self.transport.bytes_available()?;
        }

        if available == 0 && !window.is_zero() {
            warn!("Device stayed silent for the whole {:?} reply window", window);
        }

        Ok(available)
    }

    fn fail(&mut self, e: io::Error) -> PicoCtlError {
        error!("Transport failure on {}: {}", self.state.endpoint, e);
        self.state.update_status(SessionStatus::Error(e.to_string()));
        PicoCtlError::Transport(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::{SimEvent, SimulatedDelay, SimulatedDevice};

    fn open(device: &SimulatedDevice) -> CommandSession<SimulatedDevice, SimulatedDelay> {
        CommandSession::open(device.clone(), &DeviceConfig::telemetry(), device.delay())
    }

    #[test]
    fn test_open_waits_boot_settle() {
        let device = SimulatedDevice::pico();
        let session = open(&device);

        assert_eq!(device.events(), vec![SimEvent::Delay(Duration::from_millis(2000))]);
        assert!(session.state().is_active());
        assert_eq!(session.endpoint(), "simulated:pico");
    }

    #[test]
    fn test_command_bytes_are_written_unmodified() {
        let device = SimulatedDevice::new();
        let mut session = open(&device);

        for text in ["1", "status report", "ünïcode ✓", ""] {
            session.send_command(text).unwrap();
        }

        assert_eq!(
            device.writes(),
            vec![
                b"1".to_vec(),
                b"status report".to_vec(),
                "ünïcode ✓".as_bytes().to_vec(),
                Vec::new(),
            ]
        );
    }

    #[test]
    fn test_temperature_waits_before_checking() {
        let device = SimulatedDevice::new().reply_after("t", "23.0", Duration::from_millis(80));
        let mut session = open(&device);

        let reply = session.send_command("t").unwrap();

        assert_eq!(reply.text(), Some("23.0"));
        let events = device.events();
        assert_eq!(events[1], SimEvent::Write(b"t".to_vec()));
        assert_eq!(events[2], SimEvent::Delay(Duration::from_millis(100)));
        assert!(matches!(events[3], SimEvent::Poll(n) if n > 0));
    }

    #[test]
    fn test_other_commands_check_immediately() {
        let device = SimulatedDevice::new().reply("1", "OK");
        let mut session = open(&device);

        session.send_command("1").unwrap();

        let events = device.events();
        assert_eq!(events[1], SimEvent::Write(b"1".to_vec()));
        assert_eq!(events[2], SimEvent::Poll(4));
    }

    #[test]
    fn test_silence_is_no_response() {
        let device = SimulatedDevice::new();
        let mut session = open(&device);

        let reply = session.send_command("7").unwrap();

        assert!(reply.is_no_response());
        assert_eq!(session.state().statistics.silent, 1);
        assert!(session.state().is_active());
    }

    #[test]
    fn test_slow_reply_is_missed_without_window() {
        let device = SimulatedDevice::new().reply_after("1", "late", Duration::from_millis(30));
        let mut session = open(&device);

        assert!(session.send_command("1").unwrap().is_no_response());
    }

    #[test]
    fn test_reply_window_catches_slow_device() {
        let device = SimulatedDevice::new().reply_after("1", "late", Duration::from_millis(30));
        let mut profile = DeviceConfig::telemetry();
        profile.timing.reply_window_ms = 100;
        let mut session = CommandSession::open(device.clone(), &profile, device.delay());

        let reply = session.send_command("1").unwrap();

        assert_eq!(reply.text(), Some("late"));
        let polls = device
            .events()
            .iter()
            .filter(|event| matches!(event, SimEvent::Poll(_)))
            .count();
        assert_eq!(polls, 4);
    }

    #[test]
    fn test_reply_is_trimmed() {
        let device = SimulatedDevice::new().reply("1", "  OK \t");
        let mut session = open(&device);

        assert_eq!(session.send_command("1").unwrap().text(), Some("OK"));
    }

    #[test]
    fn test_only_one_line_is_consumed() {
        let device = SimulatedDevice::new().reply("1", "first");
        let mut session = open(&device);

        session.send_command("1").unwrap();
        device.push_output(b"second\n");
        let reply = session.send_command("x").unwrap();

        assert_eq!(reply.text(), Some("second"));
    }

    #[test]
    fn test_disconnect_is_fatal() {
        let device = SimulatedDevice::pico().disconnect_after(1);
        let mut session = open(&device);

        assert!(session.send_command("1").is_ok());
        let error = session.send_command("0").unwrap_err();
        assert!(matches!(error, PicoCtlError::Transport(_)));
        assert!(session.state().get_error_message().is_some());

        let again = session.send_command("1").unwrap_err();
        assert!(matches!(again, PicoCtlError::Transport(_)));
        assert_eq!(device.writes().len(), 1);
    }

    #[test]
    fn test_close_releases_transport() {
        let device = SimulatedDevice::pico();
        let mut session = open(&device);
        session.send_command("1").unwrap();

        let state = session.close().unwrap();

        assert!(device.is_closed());
        assert!(state.is_closed());
        assert_eq!(state.last_command.as_deref(), Some("1"));
        assert_eq!(state.statistics.replies, 1);
    }
}
