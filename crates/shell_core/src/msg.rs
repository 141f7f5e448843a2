use std::time::Instant;

use crate::AttemptId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Shell launched; begin loading from the preferred origin.
    StartSession { at: Instant },
    /// User asked for a reload from the toolbar or menu.
    ReloadRequested { at: Instant },
    /// Retry action pressed on the synthesized error page.
    RetryRequested { at: Instant },
    /// Viewer finished rendering the content of an attempt.
    ViewerReady {
        attempt: AttemptId,
        /// Size of the rendered body when the viewer can tell.
        content_len: Option<u64>,
        at: Instant,
    },
    /// Viewer reported an explicit load failure.
    ViewerFailed {
        attempt: AttemptId,
        details: String,
        at: Instant,
    },
    /// Viewer load progress, 0..=100.
    ViewerProgress { attempt: AttemptId, percent: u8 },
    /// Per-attempt timer fired.
    AttemptTimedOut { attempt: AttemptId, at: Instant },
    /// Fallback for placeholder wiring.
    NoOp,
}
