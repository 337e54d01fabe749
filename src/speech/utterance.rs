//! Utterances submitted to the engine

use super::options::SpeechOptions;
use super::voice::Voice;

/// A single request to speak one string
///
/// Built fresh for every `speak` call and never reused.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub lang: String,
    pub rate: f32,
    pub volume: f32,
    pub pitch: f32,
    pub voice: Option<Voice>,
}

impl Utterance {
    /// Build an utterance from the current options
    ///
    /// `fallback_voice` is used when the options carry no voice, which is
    /// the case until one has been selected or auto-selected.
    pub fn from_options(
        text: &str,
        options: &SpeechOptions,
        fallback_voice: Option<&Voice>,
    ) -> Self {
        Self {
            text: text.to_string(),
            lang: options.lang.clone(),
            rate: options.rate,
            volume: options.volume,
            pitch: options.pitch,
            voice: options.voice.clone().or_else(|| fallback_voice.cloned()),
        }
    }
}

/// Properties that may be changed on an utterance after submission
///
/// Engines apply these best-effort; most ignore them once audio has started.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UtteranceUpdate {
    pub lang: Option<String>,
    pub rate: Option<f32>,
    pub volume: Option<f32>,
    pub pitch: Option<f32>,
    pub voice: Option<Voice>,
}

impl UtteranceUpdate {
    pub fn is_empty(&self) -> bool {
        self.lang.is_none()
            && self.rate.is_none()
            && self.volume.is_none()
            && self.pitch.is_none()
            && self.voice.is_none()
    }

    /// Apply to a locally held copy of an utterance
    pub fn apply_to(&self, utterance: &mut Utterance) {
        if let Some(lang) = &self.lang {
            utterance.lang = lang.clone();
        }
        if let Some(rate) = self.rate {
            utterance.rate = rate;
        }
        if let Some(volume) = self.volume {
            utterance.volume = volume;
        }
        if let Some(pitch) = self.pitch {
            utterance.pitch = pitch;
        }
        if let Some(voice) = &self.voice {
            utterance.voice = Some(voice.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::options::OptionsUpdate;

    #[test]
    fn test_from_options_prefers_option_voice() {
        let chosen = Voice::new("a", "A", "pt-BR");
        let fallback = Voice::new("b", "B", "en-US");
        let options = SpeechOptions::with(OptionsUpdate::new().voice(chosen.clone()));

        let utterance = Utterance::from_options("olá", &options, Some(&fallback));
        assert_eq!(utterance.voice, Some(chosen));
        assert_eq!(utterance.lang, "pt-BR");
    }

    #[test]
    fn test_from_options_uses_fallback_voice() {
        let fallback = Voice::new("b", "B", "en-US");
        let utterance = Utterance::from_options("hi", &SpeechOptions::default(), Some(&fallback));
        assert_eq!(utterance.voice, Some(fallback));
    }

    #[test]
    fn test_apply_update() {
        let mut utterance = Utterance::from_options("hi", &SpeechOptions::default(), None);
        let update = UtteranceUpdate {
            rate: Some(1.5),
            ..Default::default()
        };
        update.apply_to(&mut utterance);
        assert_eq!(utterance.rate, 1.5);
        assert_eq!(utterance.pitch, 1.0);
        assert_eq!(utterance.text, "hi");
    }
}
