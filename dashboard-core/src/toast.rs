use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

/// A transient notification. At most one is live at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub id: u64,
    pub message: String,
    pub kind: ToastKind,
    pub duration: Option<Duration>,
    shown_at: Instant,
}

impl Toast {
    pub(crate) fn new(id: u64, message: String, kind: ToastKind, duration: Option<Duration>) -> Self {
        Self { id, message, kind, duration, shown_at: Instant::now() }
    }

    pub fn lifetime(&self) -> Duration {
        self.duration.unwrap_or(DEFAULT_TOAST_DURATION)
    }

    pub fn expires_at(&self) -> Instant {
        self.shown_at + self.lifetime()
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at()
    }
}
