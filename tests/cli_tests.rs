use std::io::Write;
use std::process::{Command, Output, Stdio};
use std::str;
use tempfile::TempDir;

/// Run the binary with an isolated home and working directory.
fn picoctl(home: &TempDir, args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_picoctl"))
        .args(args)
        .env("HOME", home.path())
        .env_remove("RUST_LOG")
        .current_dir(home.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute command");

    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(stdin.as_bytes())
        .expect("Failed to write stdin");

    child.wait_with_output().expect("Failed to wait for command")
}

/// CLI interface tests
#[cfg(test)]
mod cli_tests {
    use super::*;

    #[test]
    fn test_cli_help() {
        let home = TempDir::new().unwrap();
        let output = picoctl(&home, &["--help"], "");

        let stdout = str::from_utf8(&output.stdout).expect("Invalid UTF-8");

        assert!(output.status.success());
        assert!(stdout.contains("Usage:"));
        assert!(stdout.contains("Commands:"));
        for command in ["connect", "send", "ports", "frame", "decode", "config", "version"] {
            assert!(stdout.contains(command), "help is missing {}", command);
        }
    }

    #[test]
    fn test_cli_version() {
        let home = TempDir::new().unwrap();
        let output = picoctl(&home, &["-q", "version"], "");

        let stdout = str::from_utf8(&output.stdout).expect("Invalid UTF-8");
        assert!(output.status.success());
        assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
        assert!(stdout.contains("v0.2"));
    }

    #[test]
    fn test_cli_invalid_command() {
        let home = TempDir::new().unwrap();
        let output = picoctl(&home, &["invalid-command"], "");

        assert!(!output.status.success());
    }

    #[test]
    fn test_simulated_console_session() {
        let home = TempDir::new().unwrap();
        let output = picoctl(&home, &["-q", "connect", "-d", "telemetry", "--simulate"], "1\nt\nx\nq\n");

        let stdout = str::from_utf8(&output.stdout).expect("Invalid UTF-8");
        assert!(output.status.success());
        assert!(stdout.contains("Connected to simulated:telemetry"));
        assert!(stdout.contains("Pico Says: LED ON"));
        assert!(stdout.contains("Pico Temp: 23.4 °C"));
        assert!(stdout.contains("(no response)"));
        assert!(stdout.contains("Closing connection."));
    }

    #[test]
    fn test_default_profile_reads_temperature() {
        let home = TempDir::new().unwrap();
        let output = picoctl(&home, &["-q", "connect", "--simulate"], "t\nq\n");

        let stdout = str::from_utf8(&output.stdout).expect("Invalid UTF-8");
        assert!(output.status.success());
        assert!(stdout.contains("Connected to simulated:pico"));
        assert!(stdout.contains("Pico Temp: 23.4 °C"));
    }

    #[test]
    fn test_console_end_of_input_exits_cleanly() {
        let home = TempDir::new().unwrap();
        let output = picoctl(&home, &["-q", "connect", "--simulate"], "");

        let stdout = str::from_utf8(&output.stdout).expect("Invalid UTF-8");
        assert!(output.status.success());
        assert!(stdout.contains("Closing connection."));
    }

    #[test]
    fn test_missing_device_fails_with_hints() {
        let home = TempDir::new().unwrap();
        let output = picoctl(
            &home,
            &["-q", "connect", "-p", "/dev/picoctl-test-no-such-device"],
            "1\nq\n",
        );

        let stderr = str::from_utf8(&output.stderr).expect("Invalid UTF-8");
        let stdout = str::from_utf8(&output.stdout).expect("Invalid UTF-8");
        assert_eq!(output.status.code(), Some(1));
        assert!(stderr.contains("/dev/picoctl-test-no-such-device"));
        assert!(stderr.contains("replug"));
        assert!(!stdout.contains("Command: "));
    }

    #[test]
    fn test_one_shot_send_as_json() {
        let home = TempDir::new().unwrap();
        let output = picoctl(&home, &["-q", "-o", "json", "send", "--simulate", "-d", "telemetry", "t"], "");

        let stdout = str::from_utf8(&output.stdout).expect("Invalid UTF-8");
        assert!(output.status.success());
        let value: serde_json::Value = serde_json::from_str(stdout).expect("Invalid JSON");
        assert_eq!(value["command"], "t");
        assert_eq!(value["response"], "23.4");
        assert_eq!(value["label"], "Pico Temp");
    }

    #[test]
    fn test_send_rejects_quit_token() {
        let home = TempDir::new().unwrap();
        let output = picoctl(&home, &["-q", "send", "--simulate", "q"], "");

        assert_eq!(output.status.code(), Some(1));
    }

    #[test]
    fn test_frame_then_decode() {
        let home = TempDir::new().unwrap();
        let frame = picoctl(&home, &["-q", "frame", "-t", "s2b-ack", "--seq", "7", "--payload", "0100"], "");
        assert!(frame.status.success());
        let hex = str::from_utf8(&frame.stdout).expect("Invalid UTF-8").trim().to_string();
        assert!(hex.starts_with("32530002"));

        let stream = format!("ffff{}", hex);
        let decode = picoctl(&home, &["-q", "-o", "json", "decode", &stream], "");
        assert!(decode.status.success());
        let value: serde_json::Value =
            serde_json::from_str(str::from_utf8(&decode.stdout).expect("Invalid UTF-8")).expect("Invalid JSON");
        assert_eq!(value["stats"]["packets_valid"], 1);
        assert_eq!(value["stats"]["sync_losses"], 2);
        assert_eq!(value["frames"][0]["msg_name"], "s2b-ack");
    }

    #[test]
    fn test_config_init_and_devices() {
        let home = TempDir::new().unwrap();
        let init = picoctl(&home, &["-q", "config", "init"], "");
        assert!(init.status.success());
        assert!(home.path().join(".picoctl").join("config.toml").exists());

        let devices = picoctl(&home, &["-q", "-o", "csv", "config", "devices"], "");
        let stdout = str::from_utf8(&devices.stdout).expect("Invalid UTF-8");
        assert!(devices.status.success());
        assert!(stdout.contains("control,"));
        assert!(stdout.contains("bench,"));
    }
}
