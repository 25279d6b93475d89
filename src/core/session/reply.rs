use crate::domain::config::CommandTable;
use serde::Serialize;

/// Text shown when a command produced no reply
pub const NO_RESPONSE: &str = "(no response)";

/// Outcome of one command. Silence is a normal result, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reply {
    /// One decoded, trimmed line from the device
    Line { command: String, text: String },
    /// Nothing was waiting when the session checked
    NoResponse { command: String },
}

impl Reply {
    pub fn command(&self) -> &str {
        match self {
            Reply::Line { command, .. } | Reply::NoResponse { command } => command,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Reply::Line { text, .. } => Some(text),
            Reply::NoResponse { .. } => None,
        }
    }

    pub fn is_no_response(&self) -> bool {
        matches!(self, Reply::NoResponse { .. })
    }

    /// Label for this reply: the command's own, else the table default
    pub fn label<'a>(&self, table: &'a CommandTable) -> &'a str {
        table
            .entry(self.command())
            .and_then(|entry| entry.label.as_deref())
            .unwrap_or(&table.default_label)
    }

    /// Render for a terminal, e.g. `Pico Temp: 23.0 °C`
    pub fn render(&self, table: &CommandTable) -> String {
        match self {
            Reply::Line { text, .. } => {
                let unit = table
                    .entry(self.command())
                    .and_then(|entry| entry.unit.as_deref());
                match unit {
                    Some(unit) => format!("{}: {} {}", self.label(table), text, unit),
                    None => format!("{}: {}", self.label(table), text),
                }
            }
            Reply::NoResponse { .. } => NO_RESPONSE.to_string(),
        }
    }
}

/// Flattened reply for structured output
#[derive(Debug, Clone, Serialize)]
pub struct ReplyRecord {
    pub command: String,
    pub response: Option<String>,
    pub label: String,
    pub unit: Option<String>,
}

impl ReplyRecord {
    pub fn new(reply: &Reply, table: &CommandTable) -> Self {
        Self {
            command: reply.command().to_string(),
            response: reply.text().map(str::to_string),
            label: reply.label(table).to_string(),
            unit: table
                .entry(reply.command())
                .and_then(|entry| entry.unit.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(command: &str, text: &str) -> Reply {
        Reply::Line {
            command: command.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_temperature_reply_is_labeled() {
        let table = CommandTable::default();
        let rendered = line("t", "42.5").render(&table);

        assert_eq!(rendered, "Pico Temp: 42.5 °C");
    }

    #[test]
    fn test_plain_reply_uses_default_label() {
        let table = CommandTable::default();

        assert_eq!(line("1", "OK").render(&table), "Pico Says: OK");
        assert_eq!(line("hello", "?").render(&table), "Pico Says: ?");
    }

    #[test]
    fn test_no_response_sentinel() {
        let table = CommandTable::default();
        let reply = Reply::NoResponse {
            command: "x".to_string(),
        };

        assert!(reply.is_no_response());
        assert_eq!(reply.text(), None);
        assert_eq!(reply.render(&table), NO_RESPONSE);
    }

    #[test]
    fn test_record_serializes_label_and_unit() {
        let table = CommandTable::default();
        let record = ReplyRecord::new(&line("t", "23.0"), &table);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["response"], "23.0");
        assert_eq!(json["label"], "Pico Temp");
        assert_eq!(json["unit"], "°C");
    }
}
