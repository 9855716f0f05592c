// Library surface for headless/integration tests and the binary.
pub mod app_dirs;
pub mod config;
pub mod error;
pub mod keystroke;
pub mod logging;
pub mod metrics;
pub mod result;
pub mod runtime;
pub mod session;
pub mod snippet;
pub mod store;
pub mod timer;
pub mod typed_log;

pub use error::{Error, Result};
pub use session::{KeyOutcome, LiveMetrics, Phase, Session, SessionConfig, TickOutcome};
