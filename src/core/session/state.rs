use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

/// Session state information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    /// Device profile name
    pub device_name: String,
    /// Transport endpoint, e.g. `/dev/ttyACM0 @ 115200`
    pub endpoint: String,
    /// Transport type
    pub transport_type: String,
    /// Current status
    pub status: SessionStatus,
    /// Creation timestamp
    pub created_at: SystemTime,
    /// Last activity timestamp
    pub last_activity: SystemTime,
    /// Most recent command text
    pub last_command: Option<String>,
    /// Session statistics
    pub statistics: SessionStatistics,
}

/// Session status enumeration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum SessionStatus {
    /// Connected and accepting commands
    Active,
    /// Closed on request
    Closed,
    /// Transport failed; the session is unusable
    Error(String),
}

/// Session statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionStatistics {
    /// Commands written to the device
    pub commands_sent: u64,
    /// Total bytes sent
    pub bytes_sent: u64,
    /// Total bytes received
    pub bytes_received: u64,
    /// Commands that produced a reply line
    pub replies: u64,
    /// Commands that produced nothing
    pub silent: u64,
    /// Average time from write to reply, in milliseconds
    pub avg_response_time_ms: f64,
    /// Last reply time in milliseconds
    pub last_response_time_ms: Option<u64>,
}

/// Session activity information
#[derive(Debug, Clone, PartialEq)]
pub enum ActivityType {
    /// Command was written
    CommandSent { bytes: usize },
    /// A reply line was read
    ReplyReceived { bytes: usize, elapsed: Duration },
    /// Nothing came back
    NoResponse,
}

impl SessionState {
    /// Create a new session state
    pub fn new(device_name: String, endpoint: String, transport_type: String) -> Self {
        let now = SystemTime::now();

        Self {
            device_name,
            endpoint,
            transport_type,
            status: SessionStatus::Active,
            created_at: now,
            last_activity: now,
            last_command: None,
            statistics: SessionStatistics::default(),
        }
    }

    /// Update session status
    pub fn update_status(&mut self, status: SessionStatus) {
        self.status = status;
        self.last_activity = SystemTime::now();
    }

    /// Record activity
    pub fn record_activity(&mut self, activity: ActivityType) {
        self.last_activity = SystemTime::now();

        match activity {
            ActivityType::CommandSent { bytes } => {
                self.statistics.commands_sent += 1;
                self.statistics.bytes_sent += bytes as u64;
            }
            ActivityType::ReplyReceived { bytes, elapsed } => {
                self.statistics.replies += 1;
                self.statistics.bytes_received += bytes as u64;

                let duration_ms = elapsed.as_millis() as u64;
                self.statistics.last_response_time_ms = Some(duration_ms);

                let total = self.statistics.replies;
                if total > 1 {
                    self.statistics.avg_response_time_ms =
                        (self.statistics.avg_response_time_ms * (total - 1) as f64 + duration_ms as f64)
                            / total as f64;
                } else {
                    self.statistics.avg_response_time_ms = duration_ms as f64;
                }
            }
            ActivityType::NoResponse => {
                self.statistics.silent += 1;
            }
        }
    }

    /// Get session uptime
    pub fn get_uptime(&self) -> Duration {
        SystemTime::now()
            .duration_since(self.created_at)
            .unwrap_or_default()
    }

    /// Check if session is active
    pub fn is_active(&self) -> bool {
        matches!(self.status, SessionStatus::Active)
    }

    /// Check if session is closed
    pub fn is_closed(&self) -> bool {
        matches!(self.status, SessionStatus::Closed)
    }

    /// Get error message if any
    pub fn get_error_message(&self) -> Option<&str> {
        match &self.status {
            SessionStatus::Error(msg) => Some(msg),
            _ => None,
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Active => write!(f, "Active"),
            SessionStatus::Closed => write!(f, "Closed"),
            SessionStatus::Error(msg) => write!(f, "Error: {}", msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> SessionState {
        SessionState::new(
            "telemetry".to_string(),
            "/dev/ttyACM1 @ 115200".to_string(),
            "serial".to_string(),
        )
    }

    #[test]
    fn test_new_state_is_active() {
        let state = state();

        assert!(state.is_active());
        assert!(!state.is_closed());
        assert!(state.get_error_message().is_none());
        assert_eq!(state.statistics.commands_sent, 0);
    }

    #[test]
    fn test_activity_updates_statistics() {
        let mut state = state();

        state.record_activity(ActivityType::CommandSent { bytes: 1 });
        state.record_activity(ActivityType::ReplyReceived {
            bytes: 6,
            elapsed: Duration::from_millis(100),
        });
        state.record_activity(ActivityType::CommandSent { bytes: 1 });
        state.record_activity(ActivityType::ReplyReceived {
            bytes: 4,
            elapsed: Duration::from_millis(20),
        });
        state.record_activity(ActivityType::CommandSent { bytes: 3 });
        state.record_activity(ActivityType::NoResponse);

        let stats = &state.statistics;
        assert_eq!(stats.commands_sent, 3);
        assert_eq!(stats.bytes_sent, 5);
        assert_eq!(stats.bytes_received, 10);
        assert_eq!(stats.replies, 2);
        assert_eq!(stats.silent, 1);
        assert_eq!(stats.last_response_time_ms, Some(20));
        assert!((stats.avg_response_time_ms - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(SessionStatus::Active.to_string(), "Active");
        assert_eq!(SessionStatus::Closed.to_string(), "Closed");
        assert_eq!(
            SessionStatus::Error("gone".to_string()).to_string(),
            "Error: gone"
        );
    }
}
