//! Notifications emitted by the speech engine

use std::fmt;
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};

/// Engine-assigned identifier of a submitted utterance
///
/// Unique across every session sharing the same engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtteranceId(pub u64);

impl fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle notification for a single utterance
///
/// For one utterance the engine emits these in the order
/// `Start (Pause Resume)* (End | Error)`.
#[derive(Debug, Clone, PartialEq)]
pub enum UtteranceEvent {
    Start,
    Pause,
    Resume,
    End,
    Error(SpeechError),
}

/// Everything the engine can tell a subscriber
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Lifecycle change of one utterance
    Utterance { id: UtteranceId, event: UtteranceEvent },

    /// The list returned by `voices()` may have changed
    VoicesChanged,
}

impl EngineEvent {
    pub fn utterance(id: UtteranceId, event: UtteranceEvent) -> Self {
        EngineEvent::Utterance { id, event }
    }
}

/// Category of a synthesis failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechErrorKind {
    /// Pre-empted by a cancel or by another utterance
    Interrupted,
    /// Removed from the queue before it started
    Canceled,
    SynthesisFailed,
    SynthesisUnavailable,
    LanguageUnavailable,
    VoiceUnavailable,
    InvalidArgument,
    AudioBusy,
    AudioHardware,
    Network,
    NotAllowed,
    Other,
}

impl SpeechErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpeechErrorKind::Interrupted => "interrupted",
            SpeechErrorKind::Canceled => "canceled",
            SpeechErrorKind::SynthesisFailed => "synthesis-failed",
            SpeechErrorKind::SynthesisUnavailable => "synthesis-unavailable",
            SpeechErrorKind::LanguageUnavailable => "language-unavailable",
            SpeechErrorKind::VoiceUnavailable => "voice-unavailable",
            SpeechErrorKind::InvalidArgument => "invalid-argument",
            SpeechErrorKind::AudioBusy => "audio-busy",
            SpeechErrorKind::AudioHardware => "audio-hardware",
            SpeechErrorKind::Network => "network",
            SpeechErrorKind::NotAllowed => "not-allowed",
            SpeechErrorKind::Other => "other",
        }
    }
}

/// Error delivered to the session's error callback, verbatim from the engine
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechError {
    pub kind: SpeechErrorKind,
    pub message: String,
}

impl SpeechError {
    pub fn new(kind: SpeechErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for SpeechError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind.as_str())
        } else {
            write!(f, "{}: {}", self.kind.as_str(), self.message)
        }
    }
}

/// Where an engine delivers its notifications
///
/// Engines may call this from their own threads; the host is responsible
/// for bringing each event back to its loop and handing it to
/// `SpeechController::handle_engine_event`.
pub type EventSink = Arc<dyn Fn(EngineEvent) + Send + Sync>;

/// Create a sink backed by an mpsc channel
///
/// The usual wiring for a host loop: give the sink to the controller and
/// drain the receiver from the loop.
pub fn event_channel() -> (EventSink, Receiver<EngineEvent>) {
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    let sink: EventSink = Arc::new(move |event| {
        if let Ok(tx) = tx.lock() {
            // Receiver gone means the host loop has exited
            let _ = tx.send(event);
        }
    });
    (sink, rx)
}
