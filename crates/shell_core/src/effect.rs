use std::time::Duration;

use crate::{AttemptId, LoadOutcome, Origin, SessionId};

/// Instructions for the host, in the order they must be carried out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Best-effort abandon of a superseded load.
    CancelLoad { attempt: AttemptId },
    DisarmTimer { attempt: AttemptId },
    LoadOrigin { attempt: AttemptId, origin: Origin },
    ArmTimer { attempt: AttemptId, after: Duration },
    /// Show a self-contained document; only used for the error page.
    RenderStatic { html: String },
    /// Session has run past its advisory budget. Emitted once per session.
    BudgetExceeded {
        session: SessionId,
        elapsed: Duration,
        budget: Duration,
    },
    SessionFinished {
        session: SessionId,
        outcome: LoadOutcome,
    },
}
