use std::fmt;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::view_model::LoaderViewModel;
use crate::{LoaderConfig, Origin};

/// Token issued per load session. Strictly increasing, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SessionId(u64);

impl SessionId {
    pub fn get(self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Tag carried by every viewer instruction and timer.
///
/// Only the attempt matching the live `AttemptId` may change loader state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttemptId {
    pub session: SessionId,
    pub index: usize,
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/#{}", self.session, self.index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Attempting {
        index: usize,
    },
    Succeeded {
        index: usize,
    },
    ExhaustedShowingError,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Succeeded { .. } | Phase::ExhaustedShowingError)
    }
}

/// Why a single attempt gave up. Every variant is retryable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    Timeout,
    Error { details: String },
    /// Viewer reported ready but rendered nothing.
    EmptyContent,
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptFailure::Timeout => write!(f, "timed out"),
            AttemptFailure::Error { details } => write!(f, "load error: {details}"),
            AttemptFailure::EmptyContent => write!(f, "page rendered no content"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptResult {
    Ready,
    Failed(AttemptFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub index: usize,
    pub origin: Origin,
    pub started_at: Instant,
    pub finished_at: Option<Instant>,
    pub result: Option<AttemptResult>,
}

impl AttemptRecord {
    pub fn duration(&self) -> Option<Duration> {
        self.finished_at
            .map(|end| end.saturating_duration_since(self.started_at))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("all origins exhausted after {} attempts", .attempts.len())]
    AllOriginsExhausted { attempts: Vec<AttemptRecord> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { index: usize, origin: Origin },
    Failed(LoadError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderState {
    config: LoaderConfig,
    phase: Phase,
    /// Last issued session; `SessionId(0)` until the first start.
    session: SessionId,
    /// Equals `origins.len()` once the list is exhausted.
    current_index: usize,
    started_at: Option<Instant>,
    last_event_at: Option<Instant>,
    attempts: Vec<AttemptRecord>,
    progress: u8,
    budget_reported: bool,
    dirty: bool,
}

impl LoaderState {
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            phase: Phase::Idle,
            session: SessionId::default(),
            current_index: 0,
            started_at: None,
            last_event_at: None,
            attempts: Vec::new(),
            progress: 0,
            budget_reported: false,
            dirty: false,
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn attempts(&self) -> &[AttemptRecord] {
        &self.attempts
    }

    /// The attempt signals are currently accepted for, if any.
    pub fn live_attempt(&self) -> Option<AttemptId> {
        match self.phase {
            Phase::Attempting { index } => Some(AttemptId {
                session: self.session,
                index,
            }),
            _ => None,
        }
    }

    pub fn is_live(&self, attempt: AttemptId) -> bool {
        self.live_attempt() == Some(attempt)
    }

    pub fn elapsed(&self) -> Option<Duration> {
        match (self.started_at, self.last_event_at) {
            (Some(start), Some(last)) => Some(last.saturating_duration_since(start)),
            _ => None,
        }
    }

    pub fn view(&self) -> LoaderViewModel {
        LoaderViewModel {
            phase: self.phase,
            session: self.session,
            current_index: self.current_index,
            current_origin: match self.phase {
                Phase::Idle => None,
                _ => self
                    .config
                    .origins
                    .get(self.current_index)
                    .map(|origin| origin.locator().to_string()),
            },
            progress: self.progress,
            attempts: self.attempts.clone(),
            elapsed: self.elapsed(),
            budget_exceeded: self.budget_reported,
            dirty: self.dirty,
        }
    }

    /// Returns whether anything changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Invalidates any live session and begins a new one at index 0.
    pub(crate) fn start_session(&mut self, at: Instant) -> AttemptId {
        self.session = self.session.next();
        self.started_at = Some(at);
        self.attempts.clear();
        self.budget_reported = false;
        self.begin_attempt(0, at)
    }

    pub(crate) fn advance(&mut self, at: Instant) -> AttemptId {
        let next = self.current_index + 1;
        self.begin_attempt(next, at)
    }

    fn begin_attempt(&mut self, index: usize, at: Instant) -> AttemptId {
        self.current_index = index;
        self.phase = Phase::Attempting { index };
        self.progress = 0;
        self.last_event_at = Some(at);
        if let Some(origin) = self.config.origins.get(index) {
            self.attempts.push(AttemptRecord {
                index,
                origin: origin.clone(),
                started_at: at,
                finished_at: None,
                result: None,
            });
        }
        self.dirty = true;
        AttemptId {
            session: self.session,
            index,
        }
    }

    pub(crate) fn finish_attempt(&mut self, result: AttemptResult, at: Instant) {
        if let Some(record) = self.attempts.last_mut() {
            record.finished_at = Some(at);
            record.result = Some(result);
        }
        self.last_event_at = Some(at);
        self.dirty = true;
    }

    pub(crate) fn mark_succeeded(&mut self, index: usize) {
        self.phase = Phase::Succeeded { index };
        self.progress = 100;
        self.dirty = true;
    }

    pub(crate) fn mark_exhausted(&mut self) {
        self.phase = Phase::ExhaustedShowingError;
        self.current_index = self.config.origins.len();
        self.dirty = true;
    }

    pub(crate) fn set_progress(&mut self, percent: u8) {
        let percent = percent.min(100);
        if percent != self.progress {
            self.progress = percent;
            self.dirty = true;
        }
    }

    /// Elapsed session time when it is past the advisory budget and this is
    /// the first time it is noticed.
    pub(crate) fn take_budget_overrun(&mut self, at: Instant) -> Option<Duration> {
        if self.budget_reported {
            return None;
        }
        let elapsed = at.saturating_duration_since(self.started_at?);
        if elapsed > self.config.total_budget {
            self.budget_reported = true;
            self.dirty = true;
            Some(elapsed)
        } else {
            None
        }
    }
}
