//! Progress reporting and cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::Serialize;

/// Share of the progress range spent on page layout.
const LAYOUT_SHARE: f32 = 90.0;

/// Percentage reported just before packaging.
pub const PACKAGING_PERCENT: u8 = 95;

/// Pipeline phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Layout,
    Packaging,
    Done,
}

/// A progress update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    /// 0..=100
    pub percent: u8,
    pub phase: Phase,
    /// Page being laid out, if any
    pub page: Option<u32>,
    /// Pages selected for conversion
    pub total_pages: u32,
}

impl Progress {
    /// Update sent when the `position`-th of `total` pages starts (1-based).
    pub fn layout(position: u32, total: u32, page: u32) -> Self {
        Self {
            percent: layout_percent(position, total),
            phase: Phase::Layout,
            page: Some(page),
            total_pages: total,
        }
    }

    pub fn packaging(total: u32) -> Self {
        Self {
            percent: PACKAGING_PERCENT,
            phase: Phase::Packaging,
            page: None,
            total_pages: total,
        }
    }

    pub fn done(total: u32) -> Self {
        Self {
            percent: 100,
            phase: Phase::Done,
            page: None,
            total_pages: total,
        }
    }
}

/// `round(position / total × 90)`.
pub fn layout_percent(position: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let ratio = position.min(total) as f32 / total as f32;
    (ratio * LAYOUT_SHARE).round() as u8
}

/// Sending half of a progress channel.
///
/// Sends never block and are dropped silently once the receiver is gone.
/// The default sender discards everything.
#[derive(Debug, Clone, Default)]
pub struct ProgressSender {
    inner: Option<Sender<Progress>>,
}

impl ProgressSender {
    /// A sender that reports nowhere.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn send(&self, progress: Progress) {
        if let Some(tx) = &self.inner {
            let _ = tx.try_send(progress);
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }
}

/// Create an unbounded progress channel.
pub fn progress_channel() -> (ProgressSender, Receiver<Progress>) {
    let (tx, rx) = unbounded();
    (ProgressSender { inner: Some(tx) }, rx)
}

/// Cooperative cancellation flag, checked once per page.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
