use std::time::Instant;

use crate::{
    error_page, AttemptFailure, AttemptId, AttemptResult, Effect, LoadError, LoadOutcome,
    LoaderState, Msg,
};

/// Pure update function: applies a message to state and returns any effects.
///
/// Signals for anything other than the live attempt are dropped without
/// touching state, which is what makes late timers and viewer callbacks from
/// superseded sessions harmless.
pub fn update(mut state: LoaderState, msg: Msg) -> (LoaderState, Vec<Effect>) {
    let effects = match msg {
        Msg::StartSession { at } | Msg::ReloadRequested { at } | Msg::RetryRequested { at } => {
            begin_session(&mut state, at)
        }
        Msg::ViewerReady {
            attempt,
            content_len,
            at,
        } => {
            if !state.is_live(attempt) {
                return (state, Vec::new());
            }
            if content_len == Some(0) {
                fail_attempt(&mut state, attempt, AttemptFailure::EmptyContent, at)
            } else {
                succeed_attempt(&mut state, attempt, at)
            }
        }
        Msg::ViewerFailed {
            attempt,
            details,
            at,
        } => {
            if !state.is_live(attempt) {
                return (state, Vec::new());
            }
            fail_attempt(&mut state, attempt, AttemptFailure::Error { details }, at)
        }
        Msg::AttemptTimedOut { attempt, at } => {
            if !state.is_live(attempt) {
                return (state, Vec::new());
            }
            fail_attempt(&mut state, attempt, AttemptFailure::Timeout, at)
        }
        Msg::ViewerProgress { attempt, percent } => {
            if state.is_live(attempt) {
                state.set_progress(percent);
            }
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn begin_session(state: &mut LoaderState, at: Instant) -> Vec<Effect> {
    let mut effects = Vec::with_capacity(4);
    // The old session id must be dead before the new load goes out.
    if let Some(previous) = state.live_attempt() {
        effects.push(Effect::CancelLoad { attempt: previous });
        effects.push(Effect::DisarmTimer { attempt: previous });
    }
    let attempt = state.start_session(at);
    push_attempt_effects(state, attempt, &mut effects);
    effects
}

fn succeed_attempt(state: &mut LoaderState, attempt: AttemptId, at: Instant) -> Vec<Effect> {
    state.finish_attempt(AttemptResult::Ready, at);
    state.mark_succeeded(attempt.index);

    let mut effects = vec![Effect::DisarmTimer { attempt }];
    push_budget_check(state, at, &mut effects);
    if let Some(origin) = state.config().origins.get(attempt.index) {
        effects.push(Effect::SessionFinished {
            session: attempt.session,
            outcome: LoadOutcome::Loaded {
                index: attempt.index,
                origin: origin.clone(),
            },
        });
    }
    effects
}

fn fail_attempt(
    state: &mut LoaderState,
    attempt: AttemptId,
    failure: AttemptFailure,
    at: Instant,
) -> Vec<Effect> {
    let mut effects = Vec::with_capacity(4);
    if failure == AttemptFailure::Timeout {
        // Timer already fired; the load may still be hanging.
        effects.push(Effect::CancelLoad { attempt });
    } else {
        effects.push(Effect::DisarmTimer { attempt });
    }
    state.finish_attempt(AttemptResult::Failed(failure), at);

    if state.config().origins.is_last(attempt.index) {
        state.mark_exhausted();
        let attempts = state.attempts().to_vec();
        effects.push(Effect::RenderStatic {
            html: error_page::render(&attempts),
        });
        push_budget_check(state, at, &mut effects);
        effects.push(Effect::SessionFinished {
            session: attempt.session,
            outcome: LoadOutcome::Failed(LoadError::AllOriginsExhausted { attempts }),
        });
    } else {
        let next = state.advance(at);
        push_attempt_effects(state, next, &mut effects);
        push_budget_check(state, at, &mut effects);
    }
    effects
}

fn push_attempt_effects(state: &LoaderState, attempt: AttemptId, effects: &mut Vec<Effect>) {
    if let Some(origin) = state.config().origins.get(attempt.index) {
        effects.push(Effect::LoadOrigin {
            attempt,
            origin: origin.clone(),
        });
        effects.push(Effect::ArmTimer {
            attempt,
            after: state.config().attempt_timeout,
        });
    }
}

fn push_budget_check(state: &mut LoaderState, at: Instant, effects: &mut Vec<Effect>) {
    if let Some(elapsed) = state.take_budget_overrun(at) {
        effects.push(Effect::BudgetExceeded {
            session: state.session(),
            elapsed,
            budget: state.config().total_budget,
        });
    }
}
