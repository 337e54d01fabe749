//! readaloud - read-aloud session control over a text-to-speech engine
//!
//! Wraps an injected speech engine with play/pause/resume/stop semantics and
//! voice/rate/pitch/volume configuration, and exposes the session state for
//! the read-aloud toggle and voice configuration view-models to render.

pub mod error;
pub mod speech;
pub mod state;
pub mod widgets;

pub use error::{ReadAloudError, Result};
pub use speech::{SpeechController, SpeechEngine};
pub use state::SessionState;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "readaloud";
