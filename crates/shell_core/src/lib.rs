//! Content shell core: pure origin fallback state machine and view-model helpers.
mod config;
mod effect;
pub mod error_page;
mod msg;
mod origin;
mod state;
mod update;
mod view_model;

pub use config::{LoaderConfig, DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_TOTAL_BUDGET};
pub use effect::Effect;
pub use error_page::RETRY_ACTION_URL;
pub use msg::Msg;
pub use origin::{Origin, OriginError, OriginKind, OriginList, OriginListError};
pub use state::{
    AttemptFailure, AttemptId, AttemptRecord, AttemptResult, LoadError, LoadOutcome, LoaderState,
    Phase, SessionId,
};
pub use update::update;
pub use view_model::LoaderViewModel;
