use super::{Delay, Transport, TransportType};
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

/// Something observable that happened on a simulated device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimEvent {
    Write(Vec<u8>),
    Delay(Duration),
    Poll(usize),
    Read(Vec<u8>),
    Close,
}

#[derive(Debug, Clone)]
struct ReplyRule {
    command: Vec<u8>,
    reply: Vec<u8>,
    latency: Duration,
}

#[derive(Debug, Default)]
struct DeviceState {
    rules: Vec<ReplyRule>,
    rx: VecDeque<u8>,
    pending: Vec<(Duration, Vec<u8>)>,
    clock: Duration,
    events: Vec<SimEvent>,
    writes_until_disconnect: Option<usize>,
    disconnected: bool,
    closed: bool,
}

impl DeviceState {
    fn promote_pending(&mut self) {
        let clock = self.clock;
        let mut still_pending = Vec::new();
        for (ready_at, bytes) in self.pending.drain(..) {
            if ready_at <= clock {
                self.rx.extend(bytes);
            } else {
                still_pending.push((ready_at, bytes));
            }
        }
        self.pending = still_pending;
    }

    fn check_link(&self) -> io::Result<()> {
        if self.closed {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "simulated device is closed"));
        }
        if self.disconnected {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "simulated device disconnected"));
        }
        Ok(())
    }
}

/// Scripted in-memory stand-in for a Pico.
///
/// Clones share the same device, so a test can hand one clone to a session
/// and inspect the other afterwards. Replies become readable once the
/// virtual clock, advanced only by [`SimulatedDelay`], passes their latency.
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    name: String,
    state: Arc<Mutex<DeviceState>>,
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedDevice {
    pub fn new() -> Self {
        Self {
            name: "pico".to_string(),
            state: Arc::new(Mutex::new(DeviceState::default())),
        }
    }

    /// A device answering the stock LED and temperature commands.
    pub fn pico() -> Self {
        Self::new()
            .reply("1", "LED ON")
            .reply("0", "LED OFF")
            .reply_after("t", "23.4", Duration::from_millis(50))
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Answer `command` with `reply` immediately.
    pub fn reply(self, command: &str, reply: &str) -> Self {
        self.reply_after(command, reply, Duration::ZERO)
    }

    /// Answer `command` with `reply` once `latency` of virtual time has passed.
    pub fn reply_after(self, command: &str, reply: &str, latency: Duration) -> Self {
        self.lock().rules.push(ReplyRule {
            command: command.as_bytes().to_vec(),
            reply: format!("{}\r\n", reply).into_bytes(),
            latency,
        });
        self
    }

    /// Queue unsolicited output, e.g. a boot banner.
    pub fn push_output(&self, bytes: &[u8]) {
        self.lock().rx.extend(bytes.iter().copied());
    }

    /// Drop the link now; every later operation fails.
    pub fn disconnect(&self) {
        self.lock().disconnected = true;
    }

    /// Drop the link after `writes` more successful writes.
    pub fn disconnect_after(self, writes: usize) -> Self {
        self.lock().writes_until_disconnect = Some(writes);
        self
    }

    /// Delay source that advances this device's virtual clock.
    pub fn delay(&self) -> SimulatedDelay {
        SimulatedDelay {
            state: Arc::clone(&self.state),
        }
    }

    pub fn events(&self) -> Vec<SimEvent> {
        self.lock().events.clone()
    }

    /// Every payload written so far, in order
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.lock()
            .events
            .iter()
            .filter_map(|event| match event {
                SimEvent::Write(bytes) => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Virtual time elapsed through [`SimulatedDelay`]
    pub fn elapsed(&self) -> Duration {
        self.lock().clock
    }

    fn lock(&self) -> MutexGuard<'_, DeviceState> {
        // A poisoned lock only means a test panicked mid-call; the state is still usable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Transport for SimulatedDevice {
    fn transport_type(&self) -> TransportType {
        TransportType::Simulated
    }

    fn describe(&self) -> String {
        format!("simulated:{}", self.name)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        let mut state = self.lock();
        state.check_link()?;

        if let Some(remaining) = state.writes_until_disconnect {
            if remaining == 0 {
                state.disconnected = true;
                return state.check_link();
            }
            state.writes_until_disconnect = Some(remaining - 1);
        }

        state.events.push(SimEvent::Write(data.to_vec()));
        let clock = state.clock;
        let replies: Vec<(Duration, Vec<u8>)> = state
            .rules
            .iter()
            .filter(|rule| rule.command == data)
            .map(|rule| (clock + rule.latency, rule.reply.clone()))
            .collect();
        debug!("Simulated device matched {} reply rule(s)", replies.len());
        state.pending.extend(replies);
        state.promote_pending();
        Ok(())
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        let mut state = self.lock();
        state.check_link()?;
        state.promote_pending();
        let available = state.rx.len();
        state.events.push(SimEvent::Poll(available));
        Ok(available)
    }

    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        let mut state = self.lock();
        state.check_link()?;
        state.promote_pending();

        let end = state
            .rx
            .iter()
            .position(|&byte| byte == b'\n')
            .map(|index| index + 1)
            .unwrap_or(state.rx.len());
        let line: Vec<u8> = state.rx.drain(..end).collect();
        state.events.push(SimEvent::Read(line.clone()));
        Ok(line)
    }

    fn close(&mut self) -> io::Result<()> {
        let mut state = self.lock();
        state.closed = true;
        state.events.push(SimEvent::Close);
        Ok(())
    }
}

/// [`Delay`] that advances a [`SimulatedDevice`]'s virtual clock instead of sleeping.
#[derive(Debug, Clone)]
pub struct SimulatedDelay {
    state: Arc<Mutex<DeviceState>>,
}

impl Delay for SimulatedDelay {
    fn delay(&mut self, duration: Duration) {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.clock += duration;
        state.events.push(SimEvent::Delay(duration));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_is_immediate_without_latency() {
        let mut device = SimulatedDevice::new().reply("1", "OK");

        device.write_all(b"1").unwrap();
        assert_eq!(device.bytes_available().unwrap(), 4);
        assert_eq!(device.read_line().unwrap(), b"OK\r\n".to_vec());
        assert_eq!(device.bytes_available().unwrap(), 0);
    }

    #[test]
    fn test_latency_waits_for_virtual_clock() {
        let mut device = SimulatedDevice::new().reply_after("t", "21.0", Duration::from_millis(100));
        let mut delay = device.delay();

        device.write_all(b"t").unwrap();
        assert_eq!(device.bytes_available().unwrap(), 0);

        delay.delay(Duration::from_millis(60));
        assert_eq!(device.bytes_available().unwrap(), 0);

        delay.delay(Duration::from_millis(40));
        assert_eq!(device.bytes_available().unwrap(), 6);
        assert_eq!(device.elapsed(), Duration::from_millis(100));
    }

    #[test]
    fn test_unknown_command_is_silent() {
        let mut device = SimulatedDevice::pico();

        device.write_all(b"x").unwrap();
        assert_eq!(device.bytes_available().unwrap(), 0);
        assert_eq!(device.writes(), vec![b"x".to_vec()]);
    }

    #[test]
    fn test_read_line_stops_at_newline() {
        let mut device = SimulatedDevice::new();
        device.push_output(b"first\nsecond");

        assert_eq!(device.read_line().unwrap(), b"first\n".to_vec());
        assert_eq!(device.read_line().unwrap(), b"second".to_vec());
        assert!(device.read_line().unwrap().is_empty());
    }

    #[test]
    fn test_disconnect_after_writes() {
        let mut device = SimulatedDevice::new().disconnect_after(1);

        assert!(device.write_all(b"1").is_ok());
        let error = device.write_all(b"0").unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::BrokenPipe);
        assert!(device.bytes_available().is_err());
        assert_eq!(device.writes().len(), 1);
    }

    #[test]
    fn test_close_is_recorded() {
        let mut device = SimulatedDevice::new();
        let observer = device.clone();

        device.close().unwrap();
        assert!(observer.is_closed());
        assert_eq!(observer.events(), vec![SimEvent::Close]);
        assert!(device.write_all(b"1").is_err());
    }
}
