use std::time::Duration;

use crate::{AttemptRecord, Phase, SessionId};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoaderViewModel {
    pub phase: Phase,
    pub session: SessionId,
    pub current_index: usize,
    /// `None` before the first session and after exhaustion.
    pub current_origin: Option<String>,
    pub progress: u8,
    pub attempts: Vec<AttemptRecord>,
    /// Session start to the most recent transition.
    pub elapsed: Option<Duration>,
    pub budget_exceeded: bool,
    pub dirty: bool,
}
