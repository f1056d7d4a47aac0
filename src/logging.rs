//! Structured JSON-lines logging shared by the binaries.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::engine::now_ms;
use crate::types::RuntimeEvent;

#[derive(Clone, Debug, Serialize)]
pub struct StructuredLogLine {
    #[serde(rename = "timestampMs")]
    pub timestamp_ms: u64,
    pub level: String,
    pub event: String,
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(rename = "levelNo", skip_serializing_if = "Option::is_none")]
    pub level_no: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn: Option<u64>,
    pub details: Value,
}

enum LogSink {
    Stderr,
    File(File),
    Disabled,
}

pub struct EventLog {
    sink: LogSink,
    session_id: String,
}

impl EventLog {
    pub fn stderr(session_id: impl Into<String>) -> Self {
        Self {
            sink: LogSink::Stderr,
            session_id: session_id.into(),
        }
    }

    /// Appends to `path`, creating it if needed.
    pub fn to_file(path: &Path, session_id: impl Into<String>) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            sink: LogSink::File(file),
            session_id: session_id.into(),
        })
    }

    pub fn disabled() -> Self {
        Self {
            sink: LogSink::Disabled,
            session_id: String::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn emit(
        &mut self,
        level: &str,
        event: &str,
        level_no: Option<u32>,
        turn: Option<u64>,
        details: Value,
    ) {
        if matches!(self.sink, LogSink::Disabled) {
            return;
        }
        let log_line = StructuredLogLine {
            timestamp_ms: now_ms(),
            level: level.to_string(),
            event: event.to_string(),
            session_id: self.session_id.clone(),
            level_no,
            turn,
            details,
        };
        let Ok(text) = serde_json::to_string(&log_line) else {
            return;
        };
        match &mut self.sink {
            LogSink::Stderr => eprintln!("{text}"),
            LogSink::File(file) => {
                if let Err(error) = writeln!(file, "{text}") {
                    eprintln!("[event-log] failed to append log line: {error}");
                    self.sink = LogSink::Disabled;
                }
            }
            LogSink::Disabled => {}
        }
    }

    /// Logs drained engine events, one line each, named after the event's tag.
    pub fn record_events(&mut self, events: &[RuntimeEvent], level_no: u32, turn: u64) {
        for event in events {
            let (name, details) = describe_event(event);
            self.emit(
                event_severity(event),
                &name,
                Some(level_no),
                Some(turn),
                details,
            );
        }
    }
}

pub fn describe_event(event: &RuntimeEvent) -> (String, Value) {
    let mut details = serde_json::to_value(event).unwrap_or(Value::Null);
    let name = details
        .as_object_mut()
        .and_then(|fields| fields.remove("type"))
        .and_then(|tag| tag.as_str().map(str::to_string))
        .unwrap_or_else(|| "runtime_event".to_string());
    (name, details)
}

fn event_severity(event: &RuntimeEvent) -> &'static str {
    match event {
        RuntimeEvent::GameOver { .. } => "warn",
        _ => "info",
    }
}
