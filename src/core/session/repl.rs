use crate::core::session::session::CommandSession;
use crate::core::session::state::SessionState;
use crate::core::transport::{Delay, Transport};
use crate::domain::error::{PicoCtlError, PicoCtlResult};
use std::io::{self, BufRead, Write};
use tracing::{debug, info};

/// Prompt printed before each command
pub const PROMPT: &str = "Command: ";

/// How an interactive run ended
#[derive(Debug)]
pub enum LoopOutcome {
    /// The user typed the quit token or input ended; the session was closed.
    Quit(SessionState),
    /// The device went away mid-session.
    Disconnected {
        state: SessionState,
        error: PicoCtlError,
    },
}

impl LoopOutcome {
    pub fn state(&self) -> &SessionState {
        match self {
            LoopOutcome::Quit(state) | LoopOutcome::Disconnected { state, .. } => state,
        }
    }
}

fn terminal(e: io::Error) -> PicoCtlError {
    PicoCtlError::Output(format!("terminal I/O failed: {}", e))
}

/// Read commands from `input` until quit, end of input, or device loss.
///
/// The quit token is never sent to the device. End of input counts as quit.
pub fn run_interactive<T, D, R, W>(
    mut session: CommandSession<T, D>,
    mut input: R,
    mut output: W,
) -> PicoCtlResult<LoopOutcome>
where
    T: Transport,
    D: Delay,
    R: BufRead,
    W: Write,
{
    writeln!(output, "Connected to {}", session.endpoint()).map_err(terminal)?;
    writeln!(output, "Commands: {}", session.table().banner()).map_err(terminal)?;

    let mut raw = Vec::new();
    loop {
        write!(output, "\n{}", PROMPT).map_err(terminal)?;
        output.flush().map_err(terminal)?;

        raw.clear();
        let read = input.read_until(b'\n', &mut raw).map_err(terminal)?;
        if read == 0 {
            debug!("End of input; closing session");
            writeln!(output).map_err(terminal)?;
            break;
        }

        let line = String::from_utf8_lossy(&raw);
        let command = line.strip_suffix('\n').unwrap_or(&line);
        let command = command.strip_suffix('\r').unwrap_or(command);

        if session.table().is_quit(command) {
            break;
        }

        match session.send_command(command) {
            Ok(reply) => {
                writeln!(output, "{}", reply.render(session.table())).map_err(terminal)?;
            }
            Err(error @ PicoCtlError::Transport(_)) => {
                info!("Interactive session ended by transport failure");
                return Ok(LoopOutcome::Disconnected {
                    state: session.into_state(),
                    error,
                });
            }
            Err(other) => return Err(other),
        }
    }

    writeln!(output, "Closing connection.").map_err(terminal)?;
    let state = session.close()?;
    Ok(LoopOutcome::Quit(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::{SimEvent, SimulatedDevice};
    use crate::domain::config::DeviceConfig;
    use std::io::Cursor;

    fn run(device: &SimulatedDevice, script: &str) -> (LoopOutcome, String) {
        let session = CommandSession::open(device.clone(), &DeviceConfig::telemetry(), device.delay());
        let mut output = Vec::new();
        let outcome = run_interactive(session, Cursor::new(script.as_bytes()), &mut output).unwrap();
        (outcome, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_scripted_scenario() {
        let device = SimulatedDevice::new().reply("1", "OK").reply("t", "23.0");

        let (outcome, output) = run(&device, "1\nt\nq\n");

        let ok = output.find("Pico Says: OK").unwrap();
        let temp = output.find("Pico Temp: 23.0 °C").unwrap();
        assert!(ok < temp);
        assert!(output.trim_end().ends_with("Closing connection."));

        assert!(matches!(outcome, LoopOutcome::Quit(ref state) if state.is_closed()));
        assert_eq!(device.writes(), vec![b"1".to_vec(), b"t".to_vec()]);
        assert_eq!(device.events().last(), Some(&SimEvent::Close));
    }

    #[test]
    fn test_quit_never_writes() {
        let device = SimulatedDevice::pico();

        let (outcome, _) = run(&device, "q\n1\n");

        assert!(device.writes().is_empty());
        assert!(device.is_closed());
        assert_eq!(outcome.state().statistics.commands_sent, 0);
    }

    #[test]
    fn test_end_of_input_closes() {
        let device = SimulatedDevice::pico();

        let (outcome, output) = run(&device, "1\n");

        assert!(matches!(outcome, LoopOutcome::Quit(_)));
        assert!(output.contains("Pico Says: LED ON"));
        assert!(device.is_closed());
    }

    #[test]
    fn test_crlf_input_is_stripped() {
        let device = SimulatedDevice::pico();

        run(&device, "0\r\nq\r\n");

        assert_eq!(device.writes(), vec![b"0".to_vec()]);
    }

    #[test]
    fn test_invalid_utf8_input_is_sent_lossily() {
        let device = SimulatedDevice::pico();
        let session = CommandSession::open(device.clone(), &DeviceConfig::telemetry(), device.delay());
        let mut output = Vec::new();

        let outcome = run_interactive(session, Cursor::new(b"\xff1\nq\n".to_vec()), &mut output).unwrap();

        assert!(matches!(outcome, LoopOutcome::Quit(_)));
        assert!(device.is_closed());
        assert_eq!(device.writes(), vec!["\u{FFFD}1".as_bytes().to_vec()]);
    }

    #[test]
    fn test_silence_is_shown() {
        let device = SimulatedDevice::pico();

        let (_, output) = run(&device, "hello\nq\n");

        assert!(output.contains(crate::core::session::NO_RESPONSE));
    }

    #[test]
    fn test_disconnect_ends_loop() {
        let device = SimulatedDevice::pico().disconnect_after(1);

        let (outcome, output) = run(&device, "1\n0\n1\nq\n");

        match outcome {
            LoopOutcome::Disconnected { state, error } => {
                assert!(matches!(error, PicoCtlError::Transport(_)));
                assert!(state.get_error_message().is_some());
            }
            other => panic!("expected disconnect, got {:?}", other),
        }
        assert_eq!(device.writes(), vec![b"1".to_vec()]);
        assert!(!output.contains("Closing connection."));
    }

    #[test]
    fn test_banner_lists_commands() {
        let device = SimulatedDevice::pico();

        let (_, output) = run(&device, "q\n");

        assert!(output.starts_with("Connected to simulated:pico\n"));
        assert!(output.contains("'t' (Temp)"));
        assert!(output.contains(PROMPT));
    }
}
