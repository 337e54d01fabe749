//! Speech session controller
//!
//! Bridges the event-driven speech engine to a synchronous control surface
//! plus an observable `SessionState`. The state machine is
//!
//! ```text
//! Idle -> Speaking -> { Paused <-> Speaking } -> Idle
//! ```
//!
//! Every transition is driven by an engine event handed to
//! `handle_engine_event`, except `stop`, which returns to Idle immediately
//! without waiting for the engine to confirm the cancel. `pause` and
//! `resume` are only requests; the state follows the engine's
//! confirmation.
//!
//! The engine is one speech channel shared by every session that uses it.
//! `speak` in one session cancels whatever another session had active;
//! that session finds out through the terminal event the engine emits for
//! its utterance.
//!
//! Nothing here returns an error or panics on a bad call. Missing speech
//! capability turns every operation into a no-op, calls that make no sense
//! in the current state are ignored, and engine failures reach the error
//! callback and reset the session to Idle.

use super::engine::{SpeechEngine, SubscriptionId};
use super::event::{
    event_channel, EngineEvent, EventSink, SpeechError, SpeechErrorKind, UtteranceEvent,
    UtteranceId,
};
use super::options::{Callback, OptionsUpdate, SpeechOptions};
use super::utterance::Utterance;
use super::voice::{select_default_voice, Voice};
use crate::state::{Phase, SessionState};
use log::{debug, info, warn};
use std::sync::mpsc::Receiver;
use std::sync::Arc;

/// Observer for session state changes
type StateListener = Box<dyn FnMut(&SessionState) + Send>;

/// Read-aloud session over a speech engine
pub struct SpeechController {
    engine: Box<dyn SpeechEngine>,

    /// Current options, replaced wholesale on every update
    options: Arc<SpeechOptions>,

    phase: Phase,

    /// The one utterance this session owns
    active: Option<UtteranceId>,

    voices: Vec<Voice>,

    /// Last selected voice, explicit or auto-selected
    current_voice: Option<Voice>,

    /// Engine notification hook, released on drop
    subscription: Option<SubscriptionId>,

    listeners: Vec<StateListener>,
}

impl SpeechController {
    /// Create a session on `engine`, delivering engine events to `sink`
    ///
    /// The host must pass every event arriving at `sink` to
    /// `handle_engine_event`. Voices are read once right away.
    pub fn new(engine: Box<dyn SpeechEngine>, options: OptionsUpdate, sink: EventSink) -> Self {
        let options = SpeechOptions::with(options);
        let current_voice = options.voice.clone();

        let mut controller = Self {
            engine,
            options: Arc::new(options),
            phase: Phase::Idle,
            active: None,
            voices: Vec::new(),
            current_voice,
            subscription: None,
            listeners: Vec::new(),
        };

        if controller.engine.is_available() {
            match controller.engine.subscribe(sink) {
                Ok(id) => controller.subscription = Some(id),
                Err(e) => warn!("Failed to subscribe to speech engine: {}", e),
            }
            controller.refresh_voices();
        } else {
            info!("Speech synthesis unavailable; session will stay idle");
        }

        controller
    }

    /// Create a session whose events arrive on the returned channel
    pub fn with_channel(
        engine: Box<dyn SpeechEngine>,
        options: OptionsUpdate,
    ) -> (Self, Receiver<EngineEvent>) {
        let (sink, rx) = event_channel();
        (Self::new(engine, options, sink), rx)
    }

    /// Handle every event already waiting on `rx`, returning how many
    pub fn pump(&mut self, rx: &Receiver<EngineEvent>) -> usize {
        let mut handled = 0;
        while let Ok(event) = rx.try_recv() {
            self.handle_engine_event(event);
            handled += 1;
        }
        handled
    }

    /// Whether the engine can speak at all
    pub fn is_available(&self) -> bool {
        self.engine.is_available()
    }

    /// Snapshot of the session
    pub fn state(&self) -> SessionState {
        SessionState::new(self.phase, self.voices.clone(), self.current_voice.clone())
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_speaking(&self) -> bool {
        self.phase.is_speaking()
    }

    pub fn is_paused(&self) -> bool {
        self.phase.is_paused()
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn current_voice(&self) -> Option<&Voice> {
        self.current_voice.as_ref()
    }

    /// Current options
    pub fn options(&self) -> Arc<SpeechOptions> {
        Arc::clone(&self.options)
    }

    /// Id of the utterance this session owns, if any
    pub fn active_utterance(&self) -> Option<UtteranceId> {
        self.active
    }

    /// Call `listener` with a fresh snapshot after every state change
    pub fn on_state_change(&mut self, listener: impl FnMut(&SessionState) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Start reading `text`, replacing anything this or another session
    /// is reading on the same engine
    pub fn speak(&mut self, text: &str) {
        if text.is_empty() || !self.engine.is_available() {
            debug!("Ignoring speak: empty text or no speech capability");
            return;
        }

        if let Err(e) = self.engine.cancel() {
            warn!("Failed to cancel previous speech: {}", e);
        }
        self.active = None;
        self.set_phase(Phase::Idle);

        let utterance = Utterance::from_options(text, &self.options, self.current_voice.as_ref());
        match self.engine.speak(&utterance) {
            Ok(id) => {
                debug!("Submitted utterance {}", id);
                self.active = Some(id);
            }
            Err(e) => {
                warn!("Speech engine rejected utterance: {}", e);
                self.fail(SpeechError::new(SpeechErrorKind::SynthesisFailed, e.to_string()));
            }
        }
    }

    /// Ask the engine to pause; the session pauses once the engine confirms
    pub fn pause(&mut self) {
        if self.phase != Phase::Speaking || !self.engine.is_available() {
            debug!("Ignoring pause in {:?}", self.phase);
            return;
        }
        if let Err(e) = self.engine.pause() {
            warn!("Pause request failed: {}", e);
        }
    }

    /// Ask the engine to resume; the session resumes once the engine confirms
    pub fn resume(&mut self) {
        if self.phase != Phase::Paused || !self.engine.is_available() {
            debug!("Ignoring resume in {:?}", self.phase);
            return;
        }
        if let Err(e) = self.engine.resume() {
            warn!("Resume request failed: {}", e);
        }
    }

    /// Cancel speech and return to Idle at once, without waiting for the
    /// engine to confirm
    pub fn stop(&mut self) {
        if !self.phase.is_speaking() || !self.engine.is_available() {
            debug!("Ignoring stop in {:?}", self.phase);
            return;
        }
        if let Err(e) = self.engine.cancel() {
            warn!("Cancel request failed: {}", e);
        }
        self.active = None;
        self.set_phase(Phase::Idle);
        let on_stop = self.options.callbacks.on_stop.clone();
        invoke(on_stop);
    }

    /// Merge `update` into the options
    ///
    /// Rate, pitch, volume, language and voice are also pushed to the
    /// active utterance. Engines may ignore that once audio has started.
    pub fn set_options(&mut self, update: OptionsUpdate) {
        let next = self.options.merged(&update);

        if let Some(id) = self.active {
            let live = next.live_update(&update);
            if !live.is_empty() {
                if let Err(e) = self.engine.update_utterance(id, &live) {
                    warn!("Failed to update utterance {}: {}", id, e);
                }
            }
        }

        self.options = Arc::new(next);
    }

    /// Select `voice` for this and future utterances
    pub fn set_voice(&mut self, voice: Voice) {
        debug!("Selecting voice {} ({})", voice.name, voice.lang);
        self.current_voice = Some(voice.clone());
        self.set_options(OptionsUpdate::new().voice(voice));
        self.notify();
    }

    /// Re-read the engine's voices
    ///
    /// The first time any voices exist and none has been chosen, picks one
    /// matching the configured language, else the first.
    pub fn refresh_voices(&mut self) {
        if !self.engine.is_available() {
            return;
        }

        self.voices = match self.engine.voices() {
            Ok(voices) => voices,
            Err(e) => {
                warn!("Failed to read voices: {}", e);
                return;
            }
        };
        debug!("Engine offers {} voices", self.voices.len());

        if self.current_voice.is_none() {
            if let Some(voice) = select_default_voice(&self.voices, &self.options.lang).cloned() {
                info!("Auto-selected voice {} ({})", voice.name, voice.lang);
                self.current_voice = Some(voice.clone());
                self.set_options(OptionsUpdate::new().voice(voice));
            }
        }

        self.notify();
    }

    /// Apply one engine notification
    ///
    /// Events for utterances this session does not own are dropped, so a
    /// replaced or stopped utterance can never touch the state again.
    pub fn handle_engine_event(&mut self, event: EngineEvent) {
        let (id, event) = match event {
            EngineEvent::VoicesChanged => {
                self.refresh_voices();
                return;
            }
            EngineEvent::Utterance { id, event } => (id, event),
        };

        if self.active != Some(id) {
            debug!("Ignoring {:?} for utterance {} not owned by this session", event, id);
            return;
        }

        let callbacks = &self.options.callbacks;
        match event {
            UtteranceEvent::Start => {
                let cb = callbacks.on_start.clone();
                self.set_phase(Phase::Speaking);
                invoke(cb);
            }
            UtteranceEvent::Pause => {
                let cb = callbacks.on_pause.clone();
                self.set_phase(Phase::Paused);
                invoke(cb);
            }
            UtteranceEvent::Resume => {
                let cb = callbacks.on_resume.clone();
                self.set_phase(Phase::Speaking);
                invoke(cb);
            }
            UtteranceEvent::End => {
                let cb = callbacks.on_end.clone();
                self.active = None;
                self.set_phase(Phase::Idle);
                invoke(cb);
            }
            UtteranceEvent::Error(error) => {
                debug!("Utterance {} failed: {}", id, error);
                self.fail(error);
            }
        }
    }

    /// Reset to Idle and report `error`
    fn fail(&mut self, error: SpeechError) {
        let on_error = self.options.callbacks.on_error.clone();
        self.active = None;
        self.set_phase(Phase::Idle);
        if let Some(cb) = on_error {
            cb(&error);
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase == phase {
            return;
        }
        debug!("Session {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
        self.notify();
    }

    fn notify(&mut self) {
        if self.listeners.is_empty() {
            return;
        }
        let state = self.state();
        for listener in self.listeners.iter_mut() {
            listener(&state);
        }
    }
}

fn invoke(callback: Option<Callback>) {
    if let Some(cb) = callback {
        cb();
    }
}

impl Drop for SpeechController {
    fn drop(&mut self) {
        if self.phase.is_speaking() {
            if let Err(e) = self.engine.cancel() {
                warn!("Failed to cancel speech on teardown: {}", e);
            }
        }
        if let Some(id) = self.subscription.take() {
            if let Err(e) = self.engine.unsubscribe(id) {
                warn!("Failed to unsubscribe from speech engine: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::backends::stub::{EngineCall, StubEngine};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn session(engine: &StubEngine) -> (SpeechController, Receiver<EngineEvent>) {
        SpeechController::with_channel(Box::new(engine.clone()), OptionsUpdate::new())
    }

    #[test]
    fn test_speak_waits_for_start_event() {
        let engine = StubEngine::new();
        let (mut controller, rx) = session(&engine);

        controller.speak("hello");
        assert!(!controller.is_speaking());
        let id = controller.active_utterance().unwrap();

        engine.fire(id, UtteranceEvent::Start);
        controller.pump(&rx);
        assert!(controller.is_speaking());
    }

    #[test]
    fn test_pause_is_only_a_request() {
        let engine = StubEngine::new();
        let (mut controller, rx) = session(&engine);
        controller.speak("hello");
        let id = controller.active_utterance().unwrap();
        engine.fire(id, UtteranceEvent::Start);
        controller.pump(&rx);

        controller.pause();
        assert!(!controller.is_paused());
        assert!(engine.calls().contains(&EngineCall::Pause));

        engine.fire(id, UtteranceEvent::Pause);
        controller.pump(&rx);
        assert!(controller.is_paused());
        assert!(controller.is_speaking());
    }

    #[test]
    fn test_speak_failure_reports_error() {
        let engine = StubEngine::new();
        let errors = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&errors);
        let (mut controller, _rx) = SpeechController::with_channel(
            Box::new(engine.clone()),
            OptionsUpdate::new().on_error(move |e| {
                assert_eq!(e.kind, SpeechErrorKind::SynthesisFailed);
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        engine.fail_next_speak("no audio device");
        controller.speak("hello");

        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert!(controller.active_utterance().is_none());
        assert_eq!(controller.phase(), Phase::Idle);
    }

    #[test]
    fn test_explicit_voice_option_is_not_overridden() {
        let chosen = Voice::new("en", "English", "en-US");
        let engine = StubEngine::with_voices(vec![
            Voice::new("pt", "Portuguese", "pt-BR"),
            chosen.clone(),
        ]);
        let (controller, _rx) = SpeechController::with_channel(
            Box::new(engine),
            OptionsUpdate::new().voice(chosen.clone()),
        );
        assert_eq!(controller.current_voice(), Some(&chosen));
    }

    #[test]
    fn test_state_listener_sees_transitions() {
        let engine = StubEngine::new();
        let (mut controller, rx) = session(&engine);
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        controller.on_state_change(move |state| {
            sink.lock().unwrap().push((state.speaking, state.paused));
        });

        controller.speak("hello");
        let id = controller.active_utterance().unwrap();
        engine.fire(id, UtteranceEvent::Start);
        engine.fire(id, UtteranceEvent::End);
        controller.pump(&rx);

        assert_eq!(*seen.lock().unwrap(), vec![(true, false), (false, false)]);
    }
}
