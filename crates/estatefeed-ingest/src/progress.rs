//! Progress reporting
//!
//! The pipeline reports stage boundaries as [`ImportEvent`]s over an
//! unbounded channel. Front ends drain the receiver however they like; the
//! CLI feeds a spinner.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportEvent {
    /// Human-readable stage message
    Progress(String),
    /// Always the last event of a run
    Finished { success: bool, message: String },
}

/// Sending half of the progress channel
///
/// Sends never fail: with no receiver, or a dropped one, events are discarded.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    sender: Option<UnboundedSender<ImportEvent>>,
}

impl EventSink {
    pub fn channel() -> (Self, UnboundedReceiver<ImportEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender: Some(sender) }, receiver)
    }

    /// A sink that drops everything
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn progress(&self, message: impl Into<String>) {
        self.send(ImportEvent::Progress(message.into()));
    }

    pub fn finished(&self, success: bool, message: impl Into<String>) {
        self.send(ImportEvent::Finished {
            success,
            message: message.into(),
        });
    }

    fn send(&self, event: ImportEvent) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }
}

/// Spinner for the CLI while a run is in flight
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Format bytes into a human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}
