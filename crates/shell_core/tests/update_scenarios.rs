use std::sync::Once;
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use shell_core::{
    update, AttemptFailure, AttemptId, AttemptResult, Effect, LoadError, LoadOutcome,
    LoaderConfig, LoaderState, Msg, OriginList, Phase, RETRY_ACTION_URL,
};

const PRIMARY: &str = "https://primary.example.com/";
const BACKUP: &str = "https://backup.example.com/";
const LOCAL: &str = "file:///android_asset/web/index.html";

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(shell_logging::initialize_for_tests);
}

fn new_state() -> LoaderState {
    let origins = OriginList::new([PRIMARY, BACKUP, LOCAL]).unwrap();
    LoaderState::new(LoaderConfig::new(origins))
}

fn secs(base: Instant, s: f64) -> Instant {
    base + Duration::from_secs_f64(s)
}

fn live(state: &LoaderState) -> AttemptId {
    state.live_attempt().expect("live attempt")
}

fn finished_outcome(effects: &[Effect]) -> Option<&LoadOutcome> {
    effects.iter().find_map(|effect| match effect {
        Effect::SessionFinished { outcome, .. } => Some(outcome),
        _ => None,
    })
}

#[test]
fn start_loads_primary_and_arms_timer() {
    init_logging();
    let t0 = Instant::now();
    let (state, effects) = update(new_state(), Msg::StartSession { at: t0 });

    let attempt = live(&state);
    assert_eq!(attempt.index, 0);
    assert_eq!(state.phase(), Phase::Attempting { index: 0 });
    assert_eq!(
        effects,
        vec![
            Effect::LoadOrigin {
                attempt,
                origin: state.config().origins.get(0).unwrap().clone(),
            },
            Effect::ArmTimer {
                attempt,
                after: Duration::from_secs(15),
            },
        ]
    );
}

#[test]
fn primary_timeout_then_backup_error_then_local_ready() {
    init_logging();
    let t0 = Instant::now();
    let (state, _) = update(new_state(), Msg::StartSession { at: t0 });
    let first = live(&state);

    let (state, effects) = update(
        state,
        Msg::AttemptTimedOut {
            attempt: first,
            at: secs(t0, 15.0),
        },
    );
    let second = live(&state);
    assert_eq!(second.index, 1);
    assert_eq!(second.session, first.session);
    assert_eq!(effects[0], Effect::CancelLoad { attempt: first });
    assert!(matches!(
        &effects[1],
        Effect::LoadOrigin { origin, .. } if origin.locator() == BACKUP
    ));

    let (state, effects) = update(
        state,
        Msg::ViewerFailed {
            attempt: second,
            details: "connection refused".to_string(),
            at: secs(t0, 17.0),
        },
    );
    let third = live(&state);
    assert_eq!(third.index, 2);
    assert_eq!(effects[0], Effect::DisarmTimer { attempt: second });

    let (mut state, effects) = update(
        state,
        Msg::ViewerReady {
            attempt: third,
            content_len: Some(2048),
            at: secs(t0, 18.0),
        },
    );

    assert_eq!(state.phase(), Phase::Succeeded { index: 2 });
    assert_eq!(effects[0], Effect::DisarmTimer { attempt: third });
    assert!(matches!(
        finished_outcome(&effects),
        Some(LoadOutcome::Loaded { index: 2, origin }) if origin.locator() == LOCAL
    ));

    let view = state.view();
    assert_eq!(view.elapsed, Some(Duration::from_secs(18)));
    assert_eq!(view.progress, 100);
    assert!(!view.budget_exceeded);
    let results: Vec<_> = view.attempts.iter().map(|a| a.result.clone()).collect();
    assert_eq!(
        results,
        vec![
            Some(AttemptResult::Failed(AttemptFailure::Timeout)),
            Some(AttemptResult::Failed(AttemptFailure::Error {
                details: "connection refused".to_string()
            })),
            Some(AttemptResult::Ready),
        ]
    );
    assert!(state.consume_dirty());
    assert!(!state.consume_dirty());
}

#[test]
fn all_origins_failing_renders_error_page() {
    init_logging();
    let t0 = Instant::now();
    let (state, _) = update(new_state(), Msg::StartSession { at: t0 });
    let (state, _) = update(
        state.clone(),
        Msg::AttemptTimedOut {
            attempt: live(&state),
            at: secs(t0, 15.0),
        },
    );
    let (state, _) = update(
        state.clone(),
        Msg::ViewerFailed {
            attempt: live(&state),
            details: "HTTP 503".to_string(),
            at: secs(t0, 16.0),
        },
    );
    let last = live(&state);
    let (state, effects) = update(
        state,
        Msg::ViewerFailed {
            attempt: last,
            details: "asset missing".to_string(),
            at: secs(t0, 16.5),
        },
    );

    assert_eq!(state.phase(), Phase::ExhaustedShowingError);
    assert_eq!(state.current_index(), 3);
    assert_eq!(state.live_attempt(), None);
    assert_eq!(state.view().current_origin, None);

    let html = effects
        .iter()
        .find_map(|effect| match effect {
            Effect::RenderStatic { html } => Some(html.clone()),
            _ => None,
        })
        .expect("error page rendered");
    assert!(html.contains(RETRY_ACTION_URL));
    assert!(html.contains("asset missing"));

    match finished_outcome(&effects) {
        Some(LoadOutcome::Failed(LoadError::AllOriginsExhausted { attempts })) => {
            assert_eq!(attempts.len(), 3);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(!effects
        .iter()
        .any(|effect| matches!(effect, Effect::LoadOrigin { .. })));
}

#[test]
fn primary_ready_finishes_immediately() {
    init_logging();
    let t0 = Instant::now();
    let (state, _) = update(new_state(), Msg::StartSession { at: t0 });
    let first = live(&state);

    let (state, effects) = update(
        state,
        Msg::ViewerReady {
            attempt: first,
            content_len: None,
            at: secs(t0, 0.5),
        },
    );

    assert_eq!(state.phase(), Phase::Succeeded { index: 0 });
    assert_eq!(state.attempts().len(), 1);
    assert!(!effects
        .iter()
        .any(|effect| matches!(effect, Effect::LoadOrigin { .. })));

    // The timer that was disarmed may still be delivered by a slow host.
    let (state, effects) = update(
        state,
        Msg::AttemptTimedOut {
            attempt: first,
            at: secs(t0, 15.0),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.phase(), Phase::Succeeded { index: 0 });
}

#[test]
fn reload_mid_session_invalidates_old_attempt() {
    init_logging();
    let t0 = Instant::now();
    let (state, _) = update(new_state(), Msg::StartSession { at: t0 });
    let (state, _) = update(
        state.clone(),
        Msg::ViewerFailed {
            attempt: live(&state),
            details: "dns".to_string(),
            at: secs(t0, 1.0),
        },
    );
    let stale = live(&state);
    assert_eq!(stale.index, 1);

    let (state, effects) = update(state, Msg::ReloadRequested { at: secs(t0, 3.0) });
    let fresh = live(&state);
    assert_eq!(fresh.index, 0);
    assert!(fresh.session > stale.session);
    assert_eq!(effects[0], Effect::CancelLoad { attempt: stale });
    assert_eq!(effects[1], Effect::DisarmTimer { attempt: stale });
    assert!(matches!(
        &effects[2],
        Effect::LoadOrigin { attempt, origin } if *attempt == fresh && origin.locator() == PRIMARY
    ));

    let mut state = state;
    state.consume_dirty();
    let before = state.clone();
    let (mut next, effects) = update(
        state,
        Msg::AttemptTimedOut {
            attempt: stale,
            at: secs(t0, 16.0),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(next, before);
    assert!(!next.consume_dirty());
}

#[test]
fn stale_timer_from_same_session_cannot_double_advance() {
    init_logging();
    let t0 = Instant::now();
    let (state, _) = update(new_state(), Msg::StartSession { at: t0 });
    let first = live(&state);
    let (state, _) = update(
        state,
        Msg::ViewerFailed {
            attempt: first,
            details: "reset".to_string(),
            at: secs(t0, 2.0),
        },
    );

    // Timer for attempt 0 raced with its disarm.
    let (state, effects) = update(
        state,
        Msg::AttemptTimedOut {
            attempt: first,
            at: secs(t0, 15.0),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.phase(), Phase::Attempting { index: 1 });
}

#[test]
fn late_signals_after_terminal_state_are_ignored() {
    init_logging();
    let t0 = Instant::now();
    let (state, _) = update(new_state(), Msg::StartSession { at: t0 });
    let first = live(&state);
    let (terminal, _) = update(
        state,
        Msg::ViewerReady {
            attempt: first,
            content_len: Some(10),
            at: secs(t0, 1.0),
        },
    );

    for msg in [
        Msg::ViewerFailed {
            attempt: first,
            details: "late".to_string(),
            at: secs(t0, 2.0),
        },
        Msg::ViewerReady {
            attempt: first,
            content_len: Some(10),
            at: secs(t0, 2.0),
        },
        Msg::ViewerProgress {
            attempt: first,
            percent: 40,
        },
        Msg::AttemptTimedOut {
            attempt: first,
            at: secs(t0, 15.0),
        },
    ] {
        let (next, effects) = update(terminal.clone(), msg);
        assert!(effects.is_empty());
        assert_eq!(next, terminal);
    }
}

#[test]
fn empty_content_counts_as_failure() {
    init_logging();
    let t0 = Instant::now();
    let (state, _) = update(new_state(), Msg::StartSession { at: t0 });
    let first = live(&state);

    let (state, effects) = update(
        state,
        Msg::ViewerReady {
            attempt: first,
            content_len: Some(0),
            at: secs(t0, 1.0),
        },
    );

    assert_eq!(state.phase(), Phase::Attempting { index: 1 });
    assert_eq!(effects[0], Effect::DisarmTimer { attempt: first });
    assert_eq!(
        state.attempts()[0].result,
        Some(AttemptResult::Failed(AttemptFailure::EmptyContent))
    );
}

#[test]
fn retry_from_error_page_restarts_at_primary() {
    init_logging();
    let origins = OriginList::new([LOCAL]).unwrap();
    let state = LoaderState::new(LoaderConfig::new(origins));
    let t0 = Instant::now();

    let (state, _) = update(state, Msg::StartSession { at: t0 });
    let only = live(&state);
    let (state, _) = update(
        state,
        Msg::AttemptTimedOut {
            attempt: only,
            at: secs(t0, 15.0),
        },
    );
    assert_eq!(state.phase(), Phase::ExhaustedShowingError);

    let (state, effects) = update(state, Msg::RetryRequested { at: secs(t0, 20.0) });
    let retry = live(&state);
    assert_eq!(retry.index, 0);
    assert_ne!(retry.session, only.session);
    assert_eq!(state.attempts().len(), 1);
    // Nothing to cancel: the exhausted session has no live attempt.
    assert!(matches!(effects[0], Effect::LoadOrigin { .. }));
    assert_eq!(effects.len(), 2);
}

#[test]
fn current_index_never_decreases_within_a_session() {
    init_logging();
    let t0 = Instant::now();
    let (mut state, _) = update(new_state(), Msg::StartSession { at: t0 });
    let session = state.session();
    let mut seen = vec![state.current_index()];

    for step in 1..=3u32 {
        let attempt = match state.live_attempt() {
            Some(attempt) => attempt,
            None => break,
        };
        let (next, _) = update(
            state,
            Msg::AttemptTimedOut {
                attempt,
                at: secs(t0, 15.0 * f64::from(step)),
            },
        );
        state = next;
        assert_eq!(state.session(), session);
        seen.push(state.current_index());
    }

    assert_eq!(seen, vec![0, 1, 2, 3]);
    assert!(seen.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[test]
fn progress_updates_only_for_live_attempt() {
    init_logging();
    let t0 = Instant::now();
    let (mut state, _) = update(new_state(), Msg::StartSession { at: t0 });
    state.consume_dirty();
    let first = live(&state);

    let (mut state, effects) = update(
        state,
        Msg::ViewerProgress {
            attempt: first,
            percent: 250,
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.view().progress, 100);
    assert!(state.consume_dirty());

    let stale = AttemptId {
        session: first.session,
        index: 2,
    };
    let (mut state, _) = update(
        state,
        Msg::ViewerProgress {
            attempt: stale,
            percent: 10,
        },
    );
    assert_eq!(state.view().progress, 100);
    assert!(!state.consume_dirty());
}

#[test]
fn budget_overrun_is_reported_once_without_aborting() {
    init_logging();
    let origins = OriginList::new([PRIMARY, BACKUP, LOCAL]).unwrap();
    let mut config = LoaderConfig::new(origins);
    config.total_budget = Duration::from_secs(20);
    let t0 = Instant::now();

    let (state, _) = update(LoaderState::new(config), Msg::StartSession { at: t0 });
    let (state, effects) = update(
        state.clone(),
        Msg::AttemptTimedOut {
            attempt: live(&state),
            at: secs(t0, 15.0),
        },
    );
    assert!(!effects
        .iter()
        .any(|effect| matches!(effect, Effect::BudgetExceeded { .. })));

    let (state, effects) = update(
        state.clone(),
        Msg::AttemptTimedOut {
            attempt: live(&state),
            at: secs(t0, 30.0),
        },
    );
    assert!(effects.contains(&Effect::BudgetExceeded {
        session: state.session(),
        elapsed: Duration::from_secs(30),
        budget: Duration::from_secs(20),
    }));
    // Overrun is advisory: the local origin is still attempted.
    assert_eq!(state.phase(), Phase::Attempting { index: 2 });
    assert!(state.view().budget_exceeded);

    let (state, effects) = update(
        state.clone(),
        Msg::ViewerReady {
            attempt: live(&state),
            content_len: Some(1),
            at: secs(t0, 31.0),
        },
    );
    assert_eq!(state.phase(), Phase::Succeeded { index: 2 });
    assert!(!effects
        .iter()
        .any(|effect| matches!(effect, Effect::BudgetExceeded { .. })));
}

#[test]
fn worst_case_is_bounded_by_attempt_timeouts() {
    let origins = OriginList::new([PRIMARY, BACKUP, LOCAL]).unwrap();
    let config = LoaderConfig::new(origins);
    assert_eq!(config.worst_case(), Duration::from_secs(45));
}
