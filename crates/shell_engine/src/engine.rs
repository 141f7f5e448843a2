use std::sync::Arc;
use std::time::{Duration, Instant};

use shell_core::{update, AttemptId, Effect, LoaderConfig, LoaderState, Msg};
use shell_logging::{shell_debug, shell_error, shell_info, shell_warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::viewer::{ChannelSignalSink, ContentViewer, SignalSink};
use crate::{EngineEvent, ViewerSignal};

enum EngineCommand {
    Start,
    Reload,
    Retry,
    TimerFired(AttemptId),
    Shutdown,
}

/// Owns a running loader. Dropping the handle stops the loader task.
pub struct EngineHandle {
    cmd_tx: mpsc::UnboundedSender<EngineCommand>,
    event_rx: mpsc::UnboundedReceiver<EngineEvent>,
}

impl EngineHandle {
    /// Spawns the loader on the current tokio runtime. Nothing is loaded until [`start`](Self::start).
    pub fn spawn(config: LoaderConfig, viewer: Arc<dyn ContentViewer>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();

        let driver = Driver {
            state: Some(LoaderState::new(config)),
            viewer,
            sink: Arc::new(ChannelSignalSink::new(signal_tx)),
            timer: None,
            cmd_tx: cmd_tx.clone(),
            event_tx,
        };
        tokio::spawn(driver.run(cmd_rx, signal_rx));

        Self { cmd_tx, event_rx }
    }

    pub fn start(&self) {
        let _ = self.cmd_tx.send(EngineCommand::Start);
    }

    pub fn reload(&self) {
        let _ = self.cmd_tx.send(EngineCommand::Reload);
    }

    pub fn retry(&self) {
        let _ = self.cmd_tx.send(EngineCommand::Retry);
    }

    /// Waits for the next event. `None` once the loader task has stopped.
    pub async fn next_event(&mut self) -> Option<EngineEvent> {
        self.event_rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(EngineCommand::Shutdown);
    }
}

struct Driver {
    /// Only `None` for the duration of an `update` call.
    state: Option<LoaderState>,
    viewer: Arc<dyn ContentViewer>,
    sink: Arc<dyn SignalSink>,
    timer: Option<(AttemptId, JoinHandle<()>)>,
    cmd_tx: mpsc::UnboundedSender<EngineCommand>,
    event_tx: mpsc::UnboundedSender<EngineEvent>,
}

impl Driver {
    async fn run(
        mut self,
        mut cmd_rx: mpsc::UnboundedReceiver<EngineCommand>,
        mut signal_rx: mpsc::UnboundedReceiver<ViewerSignal>,
    ) {
        loop {
            tokio::select! {
                Some(command) = cmd_rx.recv() => {
                    if !self.handle_command(command) {
                        break;
                    }
                }
                Some(signal) = signal_rx.recv() => self.handle_signal(signal),
                else => break,
            }
        }
        self.teardown();
    }

    fn handle_command(&mut self, command: EngineCommand) -> bool {
        let at = now();
        let msg = match command {
            EngineCommand::Start => Msg::StartSession { at },
            EngineCommand::Reload => {
                shell_info!("Reload requested");
                Msg::ReloadRequested { at }
            }
            EngineCommand::Retry => {
                shell_info!("Retry requested");
                Msg::RetryRequested { at }
            }
            EngineCommand::TimerFired(attempt) => {
                if self.is_live(attempt) {
                    shell_warn!("Attempt {} timed out", attempt);
                } else {
                    shell_debug!("Ignoring stale timer for {}", attempt);
                }
                Msg::AttemptTimedOut { attempt, at }
            }
            EngineCommand::Shutdown => return false,
        };
        self.dispatch(msg);
        true
    }

    fn handle_signal(&mut self, signal: ViewerSignal) {
        if let Some(attempt) = signal.attempt() {
            if !self.is_live(attempt) {
                shell_debug!("Ignoring stale viewer signal for {}", attempt);
                return;
            }
        }

        let at = now();
        let msg = match signal {
            ViewerSignal::Ready {
                attempt,
                content_len,
            } => Msg::ViewerReady {
                attempt,
                content_len,
                at,
            },
            ViewerSignal::Failed { attempt, details } => {
                shell_warn!("Attempt {} failed: {}", attempt, details);
                Msg::ViewerFailed {
                    attempt,
                    details,
                    at,
                }
            }
            ViewerSignal::Progress { attempt, percent } => Msg::ViewerProgress { attempt, percent },
            ViewerSignal::RetryRequested => {
                shell_info!("Retry requested from error page");
                Msg::RetryRequested { at }
            }
        };
        self.dispatch(msg);
    }

    fn is_live(&self, attempt: AttemptId) -> bool {
        self.state
            .as_ref()
            .is_some_and(|state| state.is_live(attempt))
    }

    fn dispatch(&mut self, msg: Msg) {
        let Some(state) = self.state.take() else {
            return;
        };
        let (mut state, effects) = update(state, msg);
        let view = state.consume_dirty().then(|| state.view());
        self.state = Some(state);

        for effect in effects {
            self.run_effect(effect);
        }
        if let Some(view) = view {
            let _ = self.event_tx.send(EngineEvent::StateChanged(view));
        }
    }

    fn run_effect(&mut self, effect: Effect) {
        match effect {
            Effect::CancelLoad { attempt } => {
                shell_debug!("Cancelling load {}", attempt);
                self.viewer.cancel(attempt);
            }
            Effect::DisarmTimer { attempt } => {
                if matches!(&self.timer, Some((armed, _)) if *armed == attempt) {
                    if let Some((_, task)) = self.timer.take() {
                        task.abort();
                    }
                }
            }
            Effect::LoadOrigin { attempt, origin } => {
                shell_info!(
                    "Trying origin {} ({:?}) for {}",
                    origin,
                    origin.kind(),
                    attempt
                );
                self.viewer.load(attempt, &origin, self.sink.clone());
            }
            Effect::ArmTimer { attempt, after } => self.arm_timer(attempt, after),
            Effect::RenderStatic { html } => {
                shell_error!("All origins failed - showing error page");
                self.viewer.render_static(&html, self.sink.clone());
            }
            Effect::BudgetExceeded {
                session,
                elapsed,
                budget,
            } => {
                shell_warn!(
                    "Session {} has run {:?}, past its {:?} budget",
                    session,
                    elapsed,
                    budget
                );
            }
            Effect::SessionFinished { session, outcome } => {
                shell_info!("Session {} finished: {:?}", session, outcome);
                let attempts = self
                    .state
                    .as_ref()
                    .map(|state| state.attempts().to_vec())
                    .unwrap_or_default();
                let _ = self.event_tx.send(EngineEvent::Finished {
                    session,
                    outcome,
                    attempts,
                });
            }
        }
    }

    fn arm_timer(&mut self, attempt: AttemptId, after: Duration) {
        if let Some((_, previous)) = self.timer.take() {
            previous.abort();
        }
        let cmd_tx = self.cmd_tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = cmd_tx.send(EngineCommand::TimerFired(attempt));
        });
        self.timer = Some((attempt, task));
    }

    fn teardown(&mut self) {
        if let Some((_, task)) = self.timer.take() {
            task.abort();
        }
        if let Some(attempt) = self.state.as_ref().and_then(LoaderState::live_attempt) {
            self.viewer.cancel(attempt);
        }
    }
}

/// Follows tokio's clock so paused-time tests see virtual instants.
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}
