//! Speech session system

pub mod backends;
pub mod controller;
pub mod engine;
pub mod event;
pub mod options;
pub mod utterance;
pub mod voice;

pub use controller::SpeechController;
pub use engine::{create_engine, share, SharedEngine, SpeechEngine, SubscriptionId};
pub use event::{
    event_channel, EngineEvent, EventSink, SpeechError, SpeechErrorKind, UtteranceEvent,
    UtteranceId,
};
pub use options::{OptionsUpdate, SpeechCallbacks, SpeechOptions};
pub use utterance::{Utterance, UtteranceUpdate};
pub use voice::Voice;
