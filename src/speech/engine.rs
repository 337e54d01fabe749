//! Speech engine abstraction
//!
//! The engine is the external collaborator that actually produces audio.
//! The session controller only ever talks to it through `SpeechEngine`,
//! so tests and headless hosts can inject a stub while production code
//! binds to the platform engine.
//!
//! An engine is a single speech channel. Every session that shares one
//! engine shares that channel: a `speak` from any session cancels whatever
//! another session had active.

use super::event::{EngineEvent, EventSink, UtteranceId};
use super::utterance::{Utterance, UtteranceUpdate};
use super::voice::Voice;
use crate::{ReadAloudError, Result};
use log::info;
use std::sync::{Arc, Mutex};

/// Handle returned by `SpeechEngine::subscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Speech engine trait
///
/// All backends implement this. `pause`, `resume` and `cancel` act on the
/// whole channel, not on one utterance. Lifecycle changes are reported
/// asynchronously through the subscribed sinks.
pub trait SpeechEngine: Send {
    /// Whether speech synthesis is usable at all
    fn is_available(&self) -> bool;

    /// Queue an utterance and return its engine-wide id
    fn speak(&mut self, utterance: &Utterance) -> Result<UtteranceId>;

    /// Request a pause; confirmed by an `UtteranceEvent::Pause`
    fn pause(&mut self) -> Result<()>;

    /// Request a resume; confirmed by an `UtteranceEvent::Resume`
    fn resume(&mut self) -> Result<()>;

    /// Cancel whatever is speaking or queued
    fn cancel(&mut self) -> Result<()>;

    /// Voices currently offered
    fn voices(&self) -> Result<Vec<Voice>>;

    /// Change properties of an already submitted utterance, best-effort
    fn update_utterance(&mut self, id: UtteranceId, update: &UtteranceUpdate) -> Result<()>;

    /// Start delivering events to `sink`
    fn subscribe(&mut self, sink: EventSink) -> Result<SubscriptionId>;

    /// Stop delivering events to a previously subscribed sink
    fn unsubscribe(&mut self, id: SubscriptionId) -> Result<()>;
}

impl<E: SpeechEngine + ?Sized> SpeechEngine for Box<E> {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn speak(&mut self, utterance: &Utterance) -> Result<UtteranceId> {
        (**self).speak(utterance)
    }

    fn pause(&mut self) -> Result<()> {
        (**self).pause()
    }

    fn resume(&mut self) -> Result<()> {
        (**self).resume()
    }

    fn cancel(&mut self) -> Result<()> {
        (**self).cancel()
    }

    fn voices(&self) -> Result<Vec<Voice>> {
        (**self).voices()
    }

    fn update_utterance(&mut self, id: UtteranceId, update: &UtteranceUpdate) -> Result<()> {
        (**self).update_utterance(id, update)
    }

    fn subscribe(&mut self, sink: EventSink) -> Result<SubscriptionId> {
        (**self).subscribe(sink)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> Result<()> {
        (**self).unsubscribe(id)
    }
}

/// A process-wide engine shared by several sessions
pub type SharedEngine = Arc<Mutex<Box<dyn SpeechEngine>>>;

/// Wrap an engine so it can be handed to several controllers
pub fn share(engine: Box<dyn SpeechEngine>) -> SharedEngine {
    Arc::new(Mutex::new(engine))
}

fn poisoned() -> ReadAloudError {
    ReadAloudError::Speech("Speech engine lock poisoned".to_string())
}

impl<E: SpeechEngine + ?Sized> SpeechEngine for Arc<Mutex<E>> {
    fn is_available(&self) -> bool {
        self.lock().map(|engine| engine.is_available()).unwrap_or(false)
    }

    fn speak(&mut self, utterance: &Utterance) -> Result<UtteranceId> {
        self.lock().map_err(|_| poisoned())?.speak(utterance)
    }

    fn pause(&mut self) -> Result<()> {
        self.lock().map_err(|_| poisoned())?.pause()
    }

    fn resume(&mut self) -> Result<()> {
        self.lock().map_err(|_| poisoned())?.resume()
    }

    fn cancel(&mut self) -> Result<()> {
        self.lock().map_err(|_| poisoned())?.cancel()
    }

    fn voices(&self) -> Result<Vec<Voice>> {
        self.lock().map_err(|_| poisoned())?.voices()
    }

    fn update_utterance(&mut self, id: UtteranceId, update: &UtteranceUpdate) -> Result<()> {
        self.lock()
            .map_err(|_| poisoned())?
            .update_utterance(id, update)
    }

    fn subscribe(&mut self, sink: EventSink) -> Result<SubscriptionId> {
        self.lock().map_err(|_| poisoned())?.subscribe(sink)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> Result<()> {
        self.lock().map_err(|_| poisoned())?.unsubscribe(id)
    }
}

/// Subscriber bookkeeping shared by the backends
#[derive(Default)]
pub struct Subscribers {
    next_id: u64,
    sinks: Vec<(SubscriptionId, EventSink)>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, sink: EventSink) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.sinks.push((id, sink));
        id
    }

    /// Remove a sink, returning whether it was registered
    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.sinks.len();
        self.sinks.retain(|(sub, _)| *sub != id);
        self.sinks.len() != before
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Snapshot of the current sinks
    ///
    /// Callers emit through the snapshot after releasing their own locks,
    /// since a sink may call straight back into the engine.
    pub fn sinks(&self) -> Vec<EventSink> {
        self.sinks.iter().map(|(_, sink)| Arc::clone(sink)).collect()
    }
}

/// Deliver `event` to every sink in `sinks`
pub fn emit(sinks: &[EventSink], event: &EngineEvent) {
    for sink in sinks {
        sink(event.clone());
    }
}

/// Create the platform speech engine
///
/// Uses the `tts` crate, which binds to Speech Dispatcher on Linux,
/// AVFoundation on macOS and WinRT/SAPI on Windows.
pub fn create_engine() -> Result<Box<dyn SpeechEngine>> {
    let platform = std::env::consts::OS;
    info!("Creating native speech engine for platform: {}", platform);

    use super::backends::native::NativeEngine;

    match NativeEngine::new() {
        Ok(engine) => {
            info!("✓ Successfully initialized native TTS backend");
            Ok(Box::new(engine))
        }
        Err(e) => {
            let hint = if platform == "linux" {
                "\nTo install: sudo apt install speech-dispatcher"
            } else {
                ""
            };
            Err(ReadAloudError::Speech(format!(
                "Failed to initialize speech backend for platform '{}': {}{}",
                platform, e, hint
            )))
        }
    }
}
