//! Progress reporting for long-running generation.
//!
//! The pipeline never talks to a UI directly. It reports through a
//! [`Progress`] handle passed in by the caller: a stage label
//! ([`Progress::set_type`]), a human-readable status line
//! ([`Progress::set_message`]) and a completion percentage
//! ([`Progress::set_progress`]). The CLI uses [`ChannelProgress`], which turns
//! every call into a [`ProgressEvent`] on an `mpsc` channel drained by a
//! printer thread; library users without a UI pass [`NoProgress`].
//!
//! [`ProgressCounter`] tracks processed/total cards. Incrementing and
//! reporting happen under one lock, so the reported percentage never goes
//! backwards even when several pages are composited at once.

use std::sync::Mutex;
use std::sync::mpsc::Sender;
use tracing::debug;

/// Sink for progress updates. Must be shareable across worker threads.
pub trait Progress: Sync {
    /// Name of the stage currently running (e.g. "Image generation").
    fn set_type(&self, value: &str);
    /// Human-readable status line.
    fn set_message(&self, value: &str);
    /// Completion in percent, `0.0..=100.0`.
    fn set_progress(&self, value: f32);
}

/// A single progress update, as sent by [`ChannelProgress`].
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Type(String),
    Message(String),
    Progress(f32),
}

/// Forwards updates to a channel. Send errors (receiver gone) are ignored.
#[derive(Debug)]
pub struct ChannelProgress {
    tx: Sender<ProgressEvent>,
}

impl ChannelProgress {
    pub fn new(tx: Sender<ProgressEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: ProgressEvent) {
        debug!(?event, "progress");
        self.tx.send(event).ok();
    }
}

impl Progress for ChannelProgress {
    fn set_type(&self, value: &str) {
        self.send(ProgressEvent::Type(value.to_string()));
    }

    fn set_message(&self, value: &str) {
        self.send(ProgressEvent::Message(value.to_string()));
    }

    fn set_progress(&self, value: f32) {
        self.send(ProgressEvent::Progress(value));
    }
}

/// Discards all updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn set_type(&self, _value: &str) {}
    fn set_message(&self, _value: &str) {}
    fn set_progress(&self, _value: f32) {}
}

/// Processed/total card counter shared by the compositing workers.
#[derive(Debug)]
pub struct ProgressCounter {
    total: usize,
    processed: Mutex<usize>,
}

impl ProgressCounter {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            processed: Mutex::new(0),
        }
    }

    /// Count one more processed card and report the new percentage.
    pub fn advance(&self, progress: &dyn Progress) {
        let mut processed = self
            .processed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *processed += 1;
        progress.set_progress(percent(*processed, self.total));
    }

    pub fn processed(&self) -> usize {
        *self
            .processed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// `processed / total` in percent, clamped to `0.0..=100.0`.
pub fn percent(processed: usize, total: usize) -> f32 {
    if total == 0 {
        return 100.0;
    }
    (processed as f32 / total as f32 * 100.0).clamp(0.0, 100.0)
}
