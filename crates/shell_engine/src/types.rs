use std::fmt;

use shell_core::{AttemptId, AttemptRecord, LoadOutcome, LoaderViewModel, Origin, SessionId};
use thiserror::Error;

/// Asynchronous report from a content viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerSignal {
    Ready {
        attempt: AttemptId,
        content_len: Option<u64>,
    },
    Failed {
        attempt: AttemptId,
        details: String,
    },
    Progress {
        attempt: AttemptId,
        percent: u8,
    },
    /// Retry action pressed on the static error page.
    RetryRequested,
}

impl ViewerSignal {
    pub fn attempt(&self) -> Option<AttemptId> {
        match self {
            ViewerSignal::Ready { attempt, .. }
            | ViewerSignal::Failed { attempt, .. }
            | ViewerSignal::Progress { attempt, .. } => Some(*attempt),
            ViewerSignal::RetryRequested => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Loader state changed; carries the fresh view.
    StateChanged(LoaderViewModel),
    /// Session reached a terminal state.
    Finished {
        session: SessionId,
        outcome: LoadOutcome,
        /// Every attempt of the session, including the one that succeeded.
        attempts: Vec<AttemptRecord>,
    },
}

/// Whatever the viewer is currently showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    /// `None` for the synthesized error page.
    pub origin: Option<Origin>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RenderedDocument {
    pub fn is_static(&self) -> bool {
        self.origin.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ViewerError {
    pub kind: FailureKind,
    pub message: String,
}

impl ViewerError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidOrigin,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    UnsupportedContentType { content_type: String },
    Io,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidOrigin => write!(f, "invalid origin"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::UnsupportedContentType { content_type } => {
                write!(f, "unsupported content type {content_type}")
            }
            FailureKind::Io => write!(f, "io error"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}
