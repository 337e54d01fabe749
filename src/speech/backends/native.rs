//! Native Rust TTS backend using the tts crate
//!
//! This backend uses the `tts` crate which provides a unified interface to:
//! - Speech Dispatcher on Linux (via native bindings)
//! - AVFoundation on macOS/iOS (via native bindings)
//! - WinRT / SAPI on Windows
//!
//! The tts crate has no pause/resume and no voice-list notification, so
//! pause and resume requests fail and `VoicesChanged` is never emitted.
//! Rate, pitch, volume and voice are engine-global in the tts crate; a live
//! utterance update sets them for whatever the backend speaks next.

use crate::speech::engine::{emit, SpeechEngine, SubscriptionId, Subscribers};
use crate::speech::event::{
    EngineEvent, EventSink, SpeechError, SpeechErrorKind, UtteranceEvent, UtteranceId,
};
use crate::speech::utterance::{Utterance, UtteranceUpdate};
use crate::speech::voice::Voice;
use crate::{ReadAloudError, Result};
use log::{debug, error, warn};
use std::sync::{Arc, Mutex};
use tts::{Features, Tts as TtsCrate, UtteranceId as TtsUtteranceId};

/// Utterance currently owned by the backend, keyed by the platform's id
/// once known. `None` as the key marks a submission whose begin callback
/// has not been matched yet.
type InFlight<K> = Option<(Option<K>, UtteranceId)>;

/// Native TTS backend using the tts crate
pub struct NativeEngine {
    /// The tts crate's TTS instance
    tts: TtsCrate,

    /// Features reported by the platform backend
    features: Features,

    /// Event sinks, shared with the tts callbacks
    subscribers: Arc<Mutex<Subscribers>>,

    /// Mapping for the utterance being spoken
    in_flight: Arc<Mutex<InFlight<TtsUtteranceId>>>,

    /// Last id handed out
    next_id: u64,
}

impl NativeEngine {
    /// Create a new native TTS engine
    ///
    /// Initializes the platform-appropriate TTS backend and wires its
    /// utterance callbacks to the subscribed sinks.
    pub fn new() -> Result<Self> {
        debug!("Creating native TTS backend");

        let tts = TtsCrate::default()
            .map_err(|e| ReadAloudError::Speech(format!("Failed to initialize TTS: {}", e)))?;
        let features = tts.supported_features();

        let engine = Self {
            tts,
            features,
            subscribers: Arc::new(Mutex::new(Subscribers::new())),
            in_flight: Arc::new(Mutex::new(None)),
            next_id: 0,
        };

        if engine.features.utterance_callbacks {
            engine.install_callbacks()?;
        } else {
            warn!("Utterance callbacks not supported; sessions will not see end events");
        }

        debug!("Native TTS backend created successfully");
        Ok(engine)
    }

    fn install_callbacks(&self) -> Result<()> {
        let register_failed = |what: &str, e: tts::Error| {
            ReadAloudError::Speech(format!("Failed to register {} callback: {}", what, e))
        };

        self.tts
            .on_utterance_begin(Some(self.callback(|| UtteranceEvent::Start, false)))
            .map_err(|e| register_failed("begin", e))?;
        self.tts
            .on_utterance_end(Some(self.callback(|| UtteranceEvent::End, true)))
            .map_err(|e| register_failed("end", e))?;
        self.tts
            .on_utterance_stop(Some(self.callback(
                || UtteranceEvent::Error(SpeechError::new(SpeechErrorKind::Interrupted, "")),
                true,
            )))
            .map_err(|e| register_failed("stop", e))?;

        Ok(())
    }

    /// Build a tts callback that forwards `event` for the in-flight utterance
    fn callback(
        &self,
        event: fn() -> UtteranceEvent,
        finishes: bool,
    ) -> Box<dyn FnMut(TtsUtteranceId)> {
        let subscribers = Arc::clone(&self.subscribers);
        let in_flight = Arc::clone(&self.in_flight);
        Box::new(move |tts_id: TtsUtteranceId| {
            let Some(id) = resolve(&in_flight, &tts_id, finishes) else {
                return;
            };
            let sinks = match subscribers.lock() {
                Ok(subs) => subs.sinks(),
                Err(_) => return,
            };
            emit(&sinks, &EngineEvent::utterance(id, event()));
        })
    }

    /// Convert a rate multiplier (1 = normal) to the platform's rate scale
    fn convert_rate(&self, rate: f32) -> f32 {
        (self.tts.normal_rate() * rate).clamp(self.tts.min_rate(), self.tts.max_rate())
    }

    /// Convert a pitch multiplier (1 = normal) to the platform's pitch scale
    fn convert_pitch(&self, pitch: f32) -> f32 {
        (self.tts.normal_pitch() * pitch).clamp(self.tts.min_pitch(), self.tts.max_pitch())
    }

    /// Convert volume (0.0-1.0) to the platform's volume scale
    fn convert_volume(&self, volume: f32) -> f32 {
        let (min, max) = (self.tts.min_volume(), self.tts.max_volume());
        min + (max - min) * volume.clamp(0.0, 1.0)
    }

    fn set_rate(&mut self, rate: f32) -> Result<()> {
        if !self.features.rate {
            warn!("Rate control not supported on this platform");
            return Ok(());
        }
        let converted = self.convert_rate(rate);
        debug!("Setting rate to {} ({})", rate, converted);
        self.tts
            .set_rate(converted)
            .map_err(|e| ReadAloudError::Speech(format!("Failed to set rate: {}", e)))?;
        Ok(())
    }

    fn set_pitch(&mut self, pitch: f32) -> Result<()> {
        if !self.features.pitch {
            warn!("Pitch control not supported on this platform");
            return Ok(());
        }
        let converted = self.convert_pitch(pitch);
        debug!("Setting pitch to {} ({})", pitch, converted);
        self.tts
            .set_pitch(converted)
            .map_err(|e| ReadAloudError::Speech(format!("Failed to set pitch: {}", e)))?;
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) -> Result<()> {
        if !self.features.volume {
            warn!("Volume control not supported on this platform");
            return Ok(());
        }
        let converted = self.convert_volume(volume);
        debug!("Setting volume to {} ({})", volume, converted);
        self.tts
            .set_volume(converted)
            .map_err(|e| ReadAloudError::Speech(format!("Failed to set volume: {}", e)))?;
        Ok(())
    }

    fn set_voice(&mut self, voice: &Voice) -> Result<()> {
        if !self.features.voice {
            warn!("Voice selection not supported on this platform");
            return Ok(());
        }

        let voices = self
            .tts
            .voices()
            .map_err(|e| ReadAloudError::Speech(format!("Failed to get voices: {}", e)))?;

        match voices.iter().find(|v| v.id() == voice.id) {
            Some(native) => {
                debug!("Selecting voice: {}", voice.name);
                self.tts
                    .set_voice(native)
                    .map_err(|e| ReadAloudError::Speech(format!("Failed to set voice: {}", e)))?;
            }
            None => warn!("Voice {} ({}) not offered by the engine", voice.name, voice.id),
        }

        Ok(())
    }
}

/// Map a platform callback id to ours, clearing the mapping on terminal
/// events
///
/// A submission whose platform id is still unknown only accepts a begin
/// callback, which pins the id. Terminal callbacks for any other id belong
/// to a canceled utterance and are dropped.
fn resolve<K: PartialEq + Clone>(
    in_flight: &Mutex<InFlight<K>>,
    key: &K,
    finishes: bool,
) -> Option<UtteranceId> {
    let mut guard = in_flight.lock().ok()?;
    let (known, id) = guard.as_mut()?;
    let id = *id;
    match known.as_ref() {
        Some(known) if known != key => {
            debug!("Ignoring callback for a superseded utterance");
            return None;
        }
        Some(_) => {}
        None if finishes => {
            debug!("Ignoring terminal callback before {} began", id);
            return None;
        }
        None => *known = Some(key.clone()),
    }
    if finishes {
        *guard = None;
    }
    Some(id)
}

/// Record the platform id returned by a submission, unless a begin
/// callback already did
fn settle<K>(in_flight: &Mutex<InFlight<K>>, id: UtteranceId, key: Option<K>) {
    if let Ok(mut guard) = in_flight.lock() {
        if let Some((known, owner)) = guard.as_mut() {
            if *owner == id && known.is_none() {
                *known = key;
            }
        }
    }
}

impl SpeechEngine for NativeEngine {
    fn is_available(&self) -> bool {
        true
    }

    fn speak(&mut self, utterance: &Utterance) -> Result<UtteranceId> {
        self.set_rate(utterance.rate)?;
        self.set_pitch(utterance.pitch)?;
        self.set_volume(utterance.volume)?;
        if let Some(voice) = &utterance.voice {
            self.set_voice(voice)?;
        }

        self.next_id += 1;
        let id = UtteranceId(self.next_id);

        // Callbacks may run on the platform's thread before speak returns
        if let Ok(mut guard) = self.in_flight.lock() {
            *guard = Some((None, id));
        }

        debug!("Speaking {}: {}", id, utterance.text);
        match self.tts.speak(utterance.text.as_str(), true) {
            Ok(tts_id) => {
                settle(&self.in_flight, id, tts_id);
                Ok(id)
            }
            Err(e) => {
                error!("Failed to speak: {}", e);
                if let Ok(mut guard) = self.in_flight.lock() {
                    *guard = None;
                }
                Err(ReadAloudError::Speech(format!("Speak failed: {}", e)))
            }
        }
    }

    fn pause(&mut self) -> Result<()> {
        Err(ReadAloudError::Speech(
            "Pause not supported by the native backend".to_string(),
        ))
    }

    fn resume(&mut self) -> Result<()> {
        Err(ReadAloudError::Speech(
            "Resume not supported by the native backend".to_string(),
        ))
    }

    fn cancel(&mut self) -> Result<()> {
        if !self.features.stop {
            warn!("Stopping speech not supported on this platform");
            return Ok(());
        }

        debug!("Canceling speech");
        self.tts.stop().map_err(|e| {
            error!("Failed to cancel speech: {}", e);
            ReadAloudError::Speech(format!("Cancel failed: {}", e))
        })?;

        Ok(())
    }

    fn voices(&self) -> Result<Vec<Voice>> {
        let current = if self.features.get_voice {
            self.tts.voice().ok().flatten().map(|v| v.id())
        } else {
            None
        };

        let voices = self
            .tts
            .voices()
            .map_err(|e| ReadAloudError::Speech(format!("Failed to get voices: {}", e)))?;

        Ok(voices
            .iter()
            .map(|v| {
                let id = v.id();
                let default = current.as_deref() == Some(id.as_str());
                Voice::new(id, v.name(), v.language().to_string()).with_default(default)
            })
            .collect())
    }

    fn update_utterance(&mut self, id: UtteranceId, update: &UtteranceUpdate) -> Result<()> {
        debug!("Live update for {}: {:?}", id, update);
        if let Some(rate) = update.rate {
            self.set_rate(rate)?;
        }
        if let Some(pitch) = update.pitch {
            self.set_pitch(pitch)?;
        }
        if let Some(volume) = update.volume {
            self.set_volume(volume)?;
        }
        if let Some(voice) = &update.voice {
            self.set_voice(voice)?;
        }
        if update.lang.is_some() {
            debug!("Language is chosen through the voice on this backend");
        }
        Ok(())
    }

    fn subscribe(&mut self, sink: EventSink) -> Result<SubscriptionId> {
        let mut subs = self
            .subscribers
            .lock()
            .map_err(|_| ReadAloudError::Speech("Subscriber lock poisoned".to_string()))?;
        Ok(subs.add(sink))
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> Result<()> {
        let mut subs = self
            .subscribers
            .lock()
            .map_err(|_| ReadAloudError::Speech("Subscriber lock poisoned".to_string()))?;
        if !subs.remove(id) {
            debug!("Subscription {:?} was not registered", id);
        }
        Ok(())
    }
}
