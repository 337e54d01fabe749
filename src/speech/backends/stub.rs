//! Scriptable in-process speech engine
//!
//! Produces no audio. Every call is recorded, and the owner drives the
//! utterance lifecycle by firing events, which makes the session state
//! machine reproducible without a real engine. Clones share one engine,
//! so a test keeps a handle while the controller owns another.

use crate::speech::engine::{emit, SpeechEngine, SubscriptionId, Subscribers};
use crate::speech::event::{
    EngineEvent, EventSink, SpeechError, SpeechErrorKind, UtteranceEvent, UtteranceId,
};
use crate::speech::utterance::{Utterance, UtteranceUpdate};
use crate::speech::voice::Voice;
use crate::{ReadAloudError, Result};
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// A call made on the engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Speak(UtteranceId, Utterance),
    Pause,
    Resume,
    Cancel,
    Update(UtteranceId, UtteranceUpdate),
    Subscribe(SubscriptionId),
    Unsubscribe(SubscriptionId),
}

#[derive(Default)]
struct StubState {
    available: bool,
    voices: Vec<Voice>,
    next_id: u64,
    current: Option<UtteranceId>,
    utterances: HashMap<UtteranceId, Utterance>,
    calls: Vec<EngineCall>,
    subscribers: Subscribers,
    fail_next_speak: Option<String>,
}

/// Call-recording speech engine
#[derive(Clone)]
pub struct StubEngine {
    inner: Arc<Mutex<StubState>>,
}

impl Default for StubEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StubEngine {
    /// An available engine with no voices
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(StubState {
                available: true,
                ..Default::default()
            })),
        }
    }

    /// An engine that reports no speech capability
    pub fn unavailable() -> Self {
        let engine = Self::new();
        engine.state().available = false;
        engine
    }

    /// An available engine offering `voices` from the start
    pub fn with_voices(voices: Vec<Voice>) -> Self {
        let engine = Self::new();
        engine.state().voices = voices;
        engine
    }

    fn state(&self) -> MutexGuard<'_, StubState> {
        // A panicking test thread must not hide the engine from the others
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the voice list and notify subscribers
    pub fn set_voices(&self, voices: Vec<Voice>) {
        let sinks = {
            let mut state = self.state();
            state.voices = voices;
            state.subscribers.sinks()
        };
        emit(&sinks, &EngineEvent::VoicesChanged);
    }

    /// Deliver a lifecycle event for `id` to every subscriber
    pub fn fire(&self, id: UtteranceId, event: UtteranceEvent) {
        let sinks = {
            let mut state = self.state();
            if matches!(event, UtteranceEvent::End | UtteranceEvent::Error(_))
                && state.current == Some(id)
            {
                state.current = None;
            }
            state.subscribers.sinks()
        };
        emit(&sinks, &EngineEvent::utterance(id, event));
    }

    /// Make the next `speak` fail with `message`
    pub fn fail_next_speak(&self, message: impl Into<String>) {
        self.state().fail_next_speak = Some(message.into());
    }

    /// The utterance the engine is speaking, if any
    pub fn current(&self) -> Option<UtteranceId> {
        self.state().current
    }

    /// An utterance as the engine sees it, live updates included
    pub fn utterance(&self, id: UtteranceId) -> Option<Utterance> {
        self.state().utterances.get(&id).cloned()
    }

    /// Every call made so far, oldest first
    pub fn calls(&self) -> Vec<EngineCall> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.state().subscribers.len()
    }
}

impl SpeechEngine for StubEngine {
    fn is_available(&self) -> bool {
        self.state().available
    }

    fn speak(&mut self, utterance: &Utterance) -> Result<UtteranceId> {
        let mut state = self.state();
        if let Some(message) = state.fail_next_speak.take() {
            return Err(ReadAloudError::Speech(message));
        }

        state.next_id += 1;
        let id = UtteranceId(state.next_id);
        debug!("Stub speaking {}: {}", id, utterance.text);

        state.current = Some(id);
        state.utterances.insert(id, utterance.clone());
        state.calls.push(EngineCall::Speak(id, utterance.clone()));
        Ok(id)
    }

    fn pause(&mut self) -> Result<()> {
        self.state().calls.push(EngineCall::Pause);
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        self.state().calls.push(EngineCall::Resume);
        Ok(())
    }

    /// Cancels the current utterance and reports it as interrupted
    fn cancel(&mut self) -> Result<()> {
        let (interrupted, sinks) = {
            let mut state = self.state();
            state.calls.push(EngineCall::Cancel);
            (state.current.take(), state.subscribers.sinks())
        };

        if let Some(id) = interrupted {
            let error = SpeechError::new(SpeechErrorKind::Interrupted, "canceled");
            emit(&sinks, &EngineEvent::utterance(id, UtteranceEvent::Error(error)));
        }
        Ok(())
    }

    fn voices(&self) -> Result<Vec<Voice>> {
        Ok(self.state().voices.clone())
    }

    fn update_utterance(&mut self, id: UtteranceId, update: &UtteranceUpdate) -> Result<()> {
        let mut state = self.state();
        state.calls.push(EngineCall::Update(id, update.clone()));
        if let Some(utterance) = state.utterances.get_mut(&id) {
            update.apply_to(utterance);
        }
        Ok(())
    }

    fn subscribe(&mut self, sink: EventSink) -> Result<SubscriptionId> {
        let mut state = self.state();
        let id = state.subscribers.add(sink);
        state.calls.push(EngineCall::Subscribe(id));
        Ok(id)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> Result<()> {
        let mut state = self.state();
        state.subscribers.remove(id);
        state.calls.push(EngineCall::Unsubscribe(id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::event::event_channel;
    use crate::speech::options::SpeechOptions;

    fn utterance(text: &str) -> Utterance {
        Utterance::from_options(text, &SpeechOptions::default(), None)
    }

    #[test]
    fn test_speak_assigns_increasing_ids() {
        let mut engine = StubEngine::new();
        let a = engine.speak(&utterance("a")).unwrap();
        let b = engine.speak(&utterance("b")).unwrap();
        assert!(b > a);
        assert_eq!(engine.current(), Some(b));
    }

    #[test]
    fn test_cancel_interrupts_current() {
        let mut engine = StubEngine::new();
        let (sink, rx) = event_channel();
        engine.subscribe(sink).unwrap();

        let id = engine.speak(&utterance("hello")).unwrap();
        engine.cancel().unwrap();

        match rx.try_recv().unwrap() {
            EngineEvent::Utterance {
                id: got,
                event: UtteranceEvent::Error(e),
            } => {
                assert_eq!(got, id);
                assert_eq!(e.kind, SpeechErrorKind::Interrupted);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(engine.current().is_none());
    }

    #[test]
    fn test_fail_next_speak() {
        let mut engine = StubEngine::new();
        engine.fail_next_speak("boom");
        assert!(engine.speak(&utterance("a")).is_err());
        assert!(engine.speak(&utterance("a")).is_ok());
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let mut engine = StubEngine::new();
        let (sink, rx) = event_channel();
        let sub = engine.subscribe(sink).unwrap();
        engine.unsubscribe(sub).unwrap();

        engine.set_voices(vec![Voice::new("v", "V", "en-US")]);
        assert!(rx.try_recv().is_err());
        assert_eq!(engine.subscriber_count(), 0);
    }
}
