//! Content shell engine: runs the loader state machine against a content viewer.
mod engine;
mod fetch;
mod persist;
mod types;
mod viewer;

pub use engine::EngineHandle;
pub use fetch::{FetchSettings, FetchViewer};
pub use persist::{DocumentStore, PersistError, HTML_FILENAME, SUMMARY_FILENAME, XHTML_FILENAME};
pub use types::{EngineEvent, FailureKind, RenderedDocument, ViewerError, ViewerSignal};
pub use viewer::{ChannelSignalSink, ContentViewer, SignalSink};
