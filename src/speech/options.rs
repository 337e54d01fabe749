//! Speech options
//!
//! `SpeechOptions` is an immutable value. Updates go through
//! `OptionsUpdate`, which produces a new value; the controller swaps the
//! `Arc` it holds, so a callback never sees a half-applied update.

use super::event::SpeechError;
use super::utterance::UtteranceUpdate;
use super::voice::Voice;
use log::debug;
use std::fmt;
use std::sync::Arc;

/// Default language for new sessions
pub const DEFAULT_LANG: &str = "pt-BR";

/// Rate multiplier range (1 is the engine's normal rate)
pub const RATE_RANGE: (f32, f32) = (0.1, 10.0);

/// Volume range
pub const VOLUME_RANGE: (f32, f32) = (0.0, 1.0);

/// Pitch range (engines typically honour 0-2)
pub const PITCH_RANGE: (f32, f32) = (-10.0, 10.0);

/// Lifecycle callback
pub type Callback = Arc<dyn Fn() + Send + Sync>;

/// Error callback, receives the engine's error verbatim
pub type ErrorCallback = Arc<dyn Fn(&SpeechError) + Send + Sync>;

/// Callbacks invoked on session lifecycle transitions
#[derive(Clone, Default)]
pub struct SpeechCallbacks {
    pub on_start: Option<Callback>,
    pub on_pause: Option<Callback>,
    pub on_resume: Option<Callback>,
    pub on_stop: Option<Callback>,
    pub on_end: Option<Callback>,
    pub on_error: Option<ErrorCallback>,
}

impl fmt::Debug for SpeechCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechCallbacks")
            .field("on_start", &self.on_start.is_some())
            .field("on_pause", &self.on_pause.is_some())
            .field("on_resume", &self.on_resume.is_some())
            .field("on_stop", &self.on_stop.is_some())
            .field("on_end", &self.on_end.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Configuration read by every new utterance
#[derive(Debug, Clone)]
pub struct SpeechOptions {
    pub lang: String,
    pub rate: f32,
    pub volume: f32,
    pub pitch: f32,
    pub voice: Option<Voice>,
    pub callbacks: SpeechCallbacks,
}

impl Default for SpeechOptions {
    fn default() -> Self {
        Self {
            lang: DEFAULT_LANG.to_string(),
            rate: 1.0,
            volume: 1.0,
            pitch: 1.0,
            voice: None,
            callbacks: SpeechCallbacks::default(),
        }
    }
}

impl SpeechOptions {
    /// Defaults with `update` merged on top
    pub fn with(update: OptionsUpdate) -> Self {
        Self::default().merged(&update)
    }

    /// Return a copy of these options with every field set in `update` replaced
    ///
    /// Numeric values are clamped into their recognised ranges.
    pub fn merged(&self, update: &OptionsUpdate) -> Self {
        let mut next = self.clone();

        if let Some(lang) = &update.lang {
            next.lang = lang.clone();
        }
        if let Some(rate) = update.rate {
            next.rate = clamp("rate", rate, RATE_RANGE);
        }
        if let Some(volume) = update.volume {
            next.volume = clamp("volume", volume, VOLUME_RANGE);
        }
        if let Some(pitch) = update.pitch {
            next.pitch = clamp("pitch", pitch, PITCH_RANGE);
        }
        if let Some(voice) = &update.voice {
            next.voice = Some(voice.clone());
        }

        let cb = &update.callbacks;
        if cb.on_start.is_some() {
            next.callbacks.on_start = cb.on_start.clone();
        }
        if cb.on_pause.is_some() {
            next.callbacks.on_pause = cb.on_pause.clone();
        }
        if cb.on_resume.is_some() {
            next.callbacks.on_resume = cb.on_resume.clone();
        }
        if cb.on_stop.is_some() {
            next.callbacks.on_stop = cb.on_stop.clone();
        }
        if cb.on_end.is_some() {
            next.callbacks.on_end = cb.on_end.clone();
        }
        if cb.on_error.is_some() {
            next.callbacks.on_error = cb.on_error.clone();
        }

        next
    }

    /// The part of `update` that can be pushed to an in-flight utterance,
    /// using the already-clamped values from `self`
    pub fn live_update(&self, update: &OptionsUpdate) -> UtteranceUpdate {
        UtteranceUpdate {
            lang: update.lang.as_ref().map(|_| self.lang.clone()),
            rate: update.rate.map(|_| self.rate),
            volume: update.volume.map(|_| self.volume),
            pitch: update.pitch.map(|_| self.pitch),
            voice: update.voice.as_ref().and(self.voice.clone()),
        }
    }
}

fn clamp(name: &str, value: f32, (min, max): (f32, f32)) -> f32 {
    if value.is_nan() {
        debug!("Ignoring NaN {}", name);
        return 1.0_f32.clamp(min, max);
    }
    let clamped = value.clamp(min, max);
    if clamped != value {
        debug!("Clamped {} {} to {}", name, value, clamped);
    }
    clamped
}

/// Partial options, merged into the held `SpeechOptions`
#[derive(Debug, Clone, Default)]
pub struct OptionsUpdate {
    pub lang: Option<String>,
    pub rate: Option<f32>,
    pub volume: Option<f32>,
    pub pitch: Option<f32>,
    pub voice: Option<Voice>,
    pub callbacks: SpeechCallbacks,
}

impl OptionsUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    pub fn rate(mut self, rate: f32) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn volume(mut self, volume: f32) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn pitch(mut self, pitch: f32) -> Self {
        self.pitch = Some(pitch);
        self
    }

    pub fn voice(mut self, voice: Voice) -> Self {
        self.voice = Some(voice);
        self
    }

    pub fn on_start(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.callbacks.on_start = Some(Arc::new(f));
        self
    }

    pub fn on_pause(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.callbacks.on_pause = Some(Arc::new(f));
        self
    }

    pub fn on_resume(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.callbacks.on_resume = Some(Arc::new(f));
        self
    }

    pub fn on_stop(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.callbacks.on_stop = Some(Arc::new(f));
        self
    }

    pub fn on_end(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.callbacks.on_end = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&SpeechError) + Send + Sync + 'static) -> Self {
        self.callbacks.on_error = Some(Arc::new(f));
        self
    }

    /// Apply `other` on top of this update
    pub fn and(mut self, other: OptionsUpdate) -> Self {
        self.lang = other.lang.or(self.lang);
        self.rate = other.rate.or(self.rate);
        self.volume = other.volume.or(self.volume);
        self.pitch = other.pitch.or(self.pitch);
        self.voice = other.voice.or(self.voice);

        let cb = other.callbacks;
        self.callbacks.on_start = cb.on_start.or(self.callbacks.on_start);
        self.callbacks.on_pause = cb.on_pause.or(self.callbacks.on_pause);
        self.callbacks.on_resume = cb.on_resume.or(self.callbacks.on_resume);
        self.callbacks.on_stop = cb.on_stop.or(self.callbacks.on_stop);
        self.callbacks.on_end = cb.on_end.or(self.callbacks.on_end);
        self.callbacks.on_error = cb.on_error.or(self.callbacks.on_error);
        self
    }
}
