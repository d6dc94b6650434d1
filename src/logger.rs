use std::fs::{File, OpenOptions};
use std::io::Write;

use chrono::Utc;
use serde_json::{Value, json};
use tracing::warn;

use crate::diff::diff_json;

/// How refresh payloads are written to the wire log.
pub enum MessageLogMode {
    /// Every full-data body verbatim.
    Full,
    /// First body verbatim, then only the paths that changed per poll.
    Diffed,
}

pub(crate) struct MessageLogger {
    mode: MessageLogMode,
    file: File,
    previous_state: Option<Value>,
}

impl MessageLogger {
    pub fn new(mode: MessageLogMode, path: &str) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            mode,
            file,
            previous_state: None,
        })
    }

    pub fn log_command(&mut self, action: &str, commands: &Value) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "cmd",
            "action": action,
            "commands": commands,
        });
        self.write_line(&entry);
    }

    pub fn log_refresh(&mut self, body: &Value) {
        match self.mode {
            MessageLogMode::Full => {
                let entry = json!({
                    "ts": Utc::now().to_rfc3339(),
                    "dir": "refresh",
                    "body": body,
                });
                self.write_line(&entry);
            }
            MessageLogMode::Diffed => {
                if let Some(prev) = self.previous_state.take() {
                    let mut changes = Vec::new();
                    diff_json(&prev, body, "", &mut changes);

                    let change_entries: Vec<Value> = changes
                        .iter()
                        .map(|(path, old, new)| json!({ "path": path, "old": old, "new": new }))
                        .collect();

                    let entry = json!({
                        "ts": Utc::now().to_rfc3339(),
                        "dir": "refresh",
                        "changes": change_entries,
                    });
                    self.write_line(&entry);
                } else {
                    let entry = json!({
                        "ts": Utc::now().to_rfc3339(),
                        "dir": "refresh",
                        "full": true,
                        "body": body,
                    });
                    self.write_line(&entry);
                }
                self.previous_state = Some(body.clone());
            }
        }
    }

    fn write_line(&mut self, entry: &Value) {
        if let Ok(line) = serde_json::to_string(entry)
            && let Err(e) = writeln!(self.file, "{line}")
        {
            warn!("failed to write log entry: {e}");
        }
    }
}
