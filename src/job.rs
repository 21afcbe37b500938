//! Job bookkeeping and lifecycle event interfaces
//!

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};

use camino::Utf8Path;
use chrono::{DateTime, Utc};
use log::{error, info};
use serde::Serialize;
use simple_error::{SimpleResult, try_with};

/// Receives the start/success/error markers and progress messages of one job
pub trait JobSink {
    fn mark_start(&mut self);
    fn mark_success(&mut self);
    fn mark_error(&mut self, msg: &str);
    fn add_log_entry(&mut self, msg: &str);
}

/// Job sink forwarding all entries to the process logger
pub struct LogJobSink {
    job_name: String,
}

impl LogJobSink {
    pub fn new(job_name: &str) -> Self {
        Self {
            job_name: job_name.to_string(),
        }
    }
}

impl JobSink for LogJobSink {
    fn mark_start(&mut self) {
        info!("Starting job: {}", self.job_name);
    }

    fn mark_success(&mut self) {
        info!("Job completed: {}", self.job_name);
    }

    fn mark_error(&mut self, msg: &str) {
        error!("Job failed: {}: {msg}", self.job_name);
    }

    fn add_log_entry(&mut self, msg: &str) {
        info!("{msg}");
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, strum::Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum LifecycleEventKind {
    Init,
    Ok,
    Failed,
}

#[derive(Clone, Debug, Serialize)]
pub struct LifecycleEvent {
    pub kind: LifecycleEventKind,
    pub job_name: String,
    pub time: DateTime<Utc>,

    /// Error message for failed jobs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LifecycleEvent {
    pub fn new(kind: LifecycleEventKind, job_name: &str, message: Option<&str>) -> Self {
        Self {
            kind,
            job_name: job_name.to_string(),
            time: Utc::now(),
            message: message.map(|x| x.to_string()),
        }
    }
}

/// Optional external monitoring of job lifecycle events
pub trait LifecycleMonitor {
    fn emit(&mut self, event: LifecycleEvent);
}

/// Appends one JSON object per lifecycle event to a file
///
pub struct JsonLinesMonitor {
    writer: BufWriter<File>,
}

impl JsonLinesMonitor {
    pub fn new(filename: &Utf8Path) -> SimpleResult<Self> {
        let file = try_with!(
            OpenOptions::new().create(true).append(true).open(filename),
            "Unable to open lifecycle event file: '{}'",
            filename
        );
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl LifecycleMonitor for JsonLinesMonitor {
    /// Monitoring is best-effort, so write failures are logged but don't fail the job
    fn emit(&mut self, event: LifecycleEvent) {
        let result = serde_json::to_writer(&mut self.writer, &event)
            .map_err(std::io::Error::from)
            .and_then(|_| writeln!(self.writer))
            .and_then(|_| self.writer.flush());
        if let Err(e) = result {
            error!("Unable to write lifecycle event {}: {e}", event.kind);
        }
    }
}

/// Emit a lifecycle event if a monitor is present
pub fn emit_event(
    monitor: &mut Option<&mut dyn LifecycleMonitor>,
    kind: LifecycleEventKind,
    job_name: &str,
    message: Option<&str>,
) {
    if let Some(monitor) = monitor {
        monitor.emit(LifecycleEvent::new(kind, job_name, message));
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// Records everything sent to the job sink and monitor
    #[derive(Default)]
    pub struct RecordingJob {
        pub started: bool,
        pub succeeded: bool,
        pub errors: Vec<String>,
        pub log_entries: Vec<String>,
        pub events: Vec<LifecycleEventKind>,
    }

    impl JobSink for RecordingJob {
        fn mark_start(&mut self) {
            self.started = true;
        }

        fn mark_success(&mut self) {
            self.succeeded = true;
        }

        fn mark_error(&mut self, msg: &str) {
            self.errors.push(msg.to_string());
        }

        fn add_log_entry(&mut self, msg: &str) {
            self.log_entries.push(msg.to_string());
        }
    }

    impl LifecycleMonitor for RecordingJob {
        fn emit(&mut self, event: LifecycleEvent) {
            self.events.push(event.kind);
        }
    }

    #[test]
    fn test_json_lines_monitor() {
        let dir = tempfile::tempdir().unwrap();
        let filename = Utf8Path::from_path(dir.path()).unwrap().join("events.jsonl");

        {
            let mut monitor = JsonLinesMonitor::new(&filename).unwrap();
            let mut monitor_ref: Option<&mut dyn LifecycleMonitor> = Some(&mut monitor);
            emit_event(&mut monitor_ref, LifecycleEventKind::Init, "build", None);
            emit_event(
                &mut monitor_ref,
                LifecycleEventKind::Failed,
                "build",
                Some("disk full"),
            );
        }

        let content = std::fs::read_to_string(&filename).unwrap();
        let lines = content.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);

        let event: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(event["kind"], "FAILED");
        assert_eq!(event["job_name"], "build");
        assert_eq!(event["message"], "disk full");

        let event: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(event["kind"], "INIT");
        assert!(event.get("message").is_none());
    }
}
