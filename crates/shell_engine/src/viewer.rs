use std::sync::Arc;

use shell_core::{AttemptId, Origin};
use tokio::sync::mpsc;

use crate::ViewerSignal;

pub trait SignalSink: Send + Sync {
    fn emit(&self, signal: ViewerSignal);
}

/// Forwards signals into a tokio channel. Sends after the receiver is gone are dropped.
#[derive(Debug, Clone)]
pub struct ChannelSignalSink {
    tx: mpsc::UnboundedSender<ViewerSignal>,
}

impl ChannelSignalSink {
    pub fn new(tx: mpsc::UnboundedSender<ViewerSignal>) -> Self {
        Self { tx }
    }
}

impl SignalSink for ChannelSignalSink {
    fn emit(&self, signal: ViewerSignal) {
        let _ = self.tx.send(signal);
    }
}

/// Surface that fetches and displays content on the loader's behalf.
///
/// Every call must return promptly; results are reported through the sink.
/// A load may end in `Ready`, `Failed`, or silence. `cancel` is best effort,
/// so a signal for a cancelled attempt may still arrive.
pub trait ContentViewer: Send + Sync {
    fn load(&self, attempt: AttemptId, origin: &Origin, sink: Arc<dyn SignalSink>);

    fn cancel(&self, attempt: AttemptId);

    /// Shows a self-contained document. The sink receives `RetryRequested`
    /// when the user presses the page's retry action.
    fn render_static(&self, html: &str, sink: Arc<dyn SignalSink>);
}
