//! Voice configuration panel
//!
//! Collapsible settings panel: language, then voice within that language,
//! then rate, volume and pitch sliders. Every change goes to the session
//! controller and, as a `VoiceSettings` snapshot, to the host's change
//! listener so it can persist the settings.

use crate::speech::voice::group_by_language;
use crate::speech::{OptionsUpdate, SpeechController, SpeechOptions, Voice};
use crate::state::SessionState;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Slider bounds (min, max, step)
pub const RATE_SLIDER: (f32, f32, f32) = (0.5, 2.0, 0.1);
pub const VOLUME_SLIDER: (f32, f32, f32) = (0.0, 1.0, 0.1);
pub const PITCH_SLIDER: (f32, f32, f32) = (0.5, 2.0, 0.1);

/// Settings snapshot emitted on every panel change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    pub lang: String,
    pub voice: Option<Voice>,
    pub rate: f32,
    pub volume: f32,
    pub pitch: f32,
}

type ChangeListener = Box<dyn FnMut(&VoiceSettings) + Send>;

/// Which sections the panel shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelSections {
    pub language: bool,
    pub voice: bool,
    pub rate: bool,
    pub volume: bool,
    pub pitch: bool,
}

impl Default for PanelSections {
    fn default() -> Self {
        Self {
            language: true,
            voice: true,
            rate: true,
            volume: true,
            pitch: true,
        }
    }
}

/// Rendered panel
#[derive(Debug, Clone, PartialEq)]
pub struct PanelView {
    pub title: String,
    pub expanded: bool,
    /// Sorted languages, empty when the selector is hidden or nothing is offered
    pub languages: Vec<String>,
    pub selected_lang: String,
    /// Voices for the selected language, empty when hidden
    pub voices: Vec<Voice>,
    /// `(id, label)` per entry of `voices`, marking the engine default
    pub voice_labels: Vec<(String, String)>,
    pub selected_voice: Option<String>,
    pub rate_label: Option<String>,
    pub volume_label: Option<String>,
    pub pitch_label: Option<String>,
}

/// Settings panel view-model
pub struct VoiceConfigPanel {
    title: String,
    expanded: bool,
    sections: PanelSections,
    selected_lang: String,
    /// Set once the user picks a language, stops following the session
    lang_chosen: bool,
    rate: f32,
    volume: f32,
    pitch: f32,
    on_change: Option<ChangeListener>,
}

impl VoiceConfigPanel {
    /// Panel starting from `initial` options
    pub fn new(initial: &SpeechOptions) -> Self {
        let selected_lang = initial
            .voice
            .as_ref()
            .map(|voice| voice.lang.clone())
            .unwrap_or_else(|| initial.lang.clone());

        Self {
            title: "Configurações de voz".to_string(),
            expanded: false,
            sections: PanelSections::default(),
            selected_lang,
            lang_chosen: false,
            rate: initial.rate,
            volume: initial.volume,
            pitch: initial.pitch,
            on_change: None,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn initially_expanded(mut self, expanded: bool) -> Self {
        self.expanded = expanded;
        self
    }

    pub fn sections(mut self, sections: PanelSections) -> Self {
        self.sections = sections;
        self
    }

    /// Listener for settings changes, e.g. to persist them
    pub fn on_change(mut self, listener: impl FnMut(&VoiceSettings) + Send + 'static) -> Self {
        self.on_change = Some(Box::new(listener));
        self
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn toggle_expanded(&mut self) -> bool {
        self.expanded = !self.expanded;
        self.expanded
    }

    pub fn selected_lang(&self) -> &str {
        &self.selected_lang
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Follow the session's voice language until the user picks one
    pub fn sync_from(&mut self, state: &SessionState) {
        if self.lang_chosen {
            return;
        }
        if let Some(voice) = &state.current_voice {
            self.selected_lang = voice.lang.clone();
        }
    }

    pub fn voices_by_language(&self, state: &SessionState) -> BTreeMap<String, Vec<Voice>> {
        group_by_language(&state.voices)
    }

    pub fn languages(&self, state: &SessionState) -> Vec<String> {
        self.voices_by_language(state).into_keys().collect()
    }

    /// Voices offered for the selected language
    pub fn available_voices(&self, state: &SessionState) -> Vec<Voice> {
        self.voices_by_language(state)
            .remove(&self.selected_lang)
            .unwrap_or_default()
    }

    /// Switch language and select its first voice
    pub fn select_language(&mut self, controller: &mut SpeechController, lang: &str) {
        debug!("Panel language: {}", lang);
        self.selected_lang = lang.to_string();
        self.lang_chosen = true;

        let first = self
            .voices_by_language(&controller.state())
            .remove(lang)
            .and_then(|voices| voices.into_iter().next());

        if let Some(voice) = first {
            controller.set_voice(voice);
            self.emit(controller);
        }
    }

    /// Select a voice by engine id; unknown ids are ignored
    pub fn select_voice(&mut self, controller: &mut SpeechController, id: &str) {
        let Some(voice) = controller.voices().iter().find(|v| v.id == id).cloned() else {
            debug!("Panel ignoring unknown voice {}", id);
            return;
        };
        self.selected_lang = voice.lang.clone();
        self.lang_chosen = true;
        controller.set_voice(voice);
        self.emit(controller);
    }

    pub fn set_rate(&mut self, controller: &mut SpeechController, rate: f32) {
        self.rate = slider(rate, RATE_SLIDER);
        controller.set_options(OptionsUpdate::new().rate(self.rate));
        self.emit(controller);
    }

    pub fn set_volume(&mut self, controller: &mut SpeechController, volume: f32) {
        self.volume = slider(volume, VOLUME_SLIDER);
        controller.set_options(OptionsUpdate::new().volume(self.volume));
        self.emit(controller);
    }

    pub fn set_pitch(&mut self, controller: &mut SpeechController, pitch: f32) {
        self.pitch = slider(pitch, PITCH_SLIDER);
        controller.set_options(OptionsUpdate::new().pitch(self.pitch));
        self.emit(controller);
    }

    /// Current panel settings
    pub fn settings(&self, controller: &SpeechController) -> VoiceSettings {
        VoiceSettings {
            lang: self.selected_lang.clone(),
            voice: controller.current_voice().cloned(),
            rate: self.rate,
            volume: self.volume,
            pitch: self.pitch,
        }
    }

    fn emit(&mut self, controller: &SpeechController) {
        let settings = self.settings(controller);
        if let Some(listener) = self.on_change.as_mut() {
            listener(&settings);
        }
    }

    pub fn render(&self, state: &SessionState) -> PanelView {
        let languages = if self.sections.language {
            self.languages(state)
        } else {
            Vec::new()
        };
        let voices = if self.sections.voice {
            self.available_voices(state)
        } else {
            Vec::new()
        };

        let voice_labels = voices
            .iter()
            .map(|v| (v.id.clone(), voice_label(v)))
            .collect();

        PanelView {
            title: self.title.clone(),
            expanded: self.expanded,
            languages,
            selected_lang: self.selected_lang.clone(),
            voices,
            voice_labels,
            selected_voice: state.current_voice.as_ref().map(|v| v.id.clone()),
            rate_label: self
                .sections
                .rate
                .then(|| format!("Velocidade: {}x", self.rate)),
            volume_label: self
                .sections
                .volume
                .then(|| format!("Volume: {}%", (self.volume * 100.0).round())),
            pitch_label: self.sections.pitch.then(|| format!("Tom: {}", self.pitch)),
        }
    }
}

/// Option text for `voice` in the voice selector
pub fn voice_label(voice: &Voice) -> String {
    if voice.default {
        format!("{} (Padrão)", voice.name)
    } else {
        voice.name.clone()
    }
}

/// Clamp to the slider range and snap to its step
fn slider(value: f32, (min, max, step): (f32, f32, f32)) -> f32 {
    if value.is_nan() {
        return min;
    }
    let snapped = (value / step).round() * step;
    // keep one decimal so 0.1 steps do not drift
    ((snapped * 10.0).round() / 10.0).clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slider_snaps_and_clamps() {
        assert_eq!(slider(1.26, RATE_SLIDER), 1.3);
        assert_eq!(slider(5.0, RATE_SLIDER), 2.0);
        assert_eq!(slider(-1.0, VOLUME_SLIDER), 0.0);
        assert_eq!(slider(f32::NAN, PITCH_SLIDER), 0.5);
    }

    #[test]
    fn test_initial_language_from_options() {
        let panel = VoiceConfigPanel::new(&SpeechOptions::default());
        assert_eq!(panel.selected_lang(), "pt-BR");
        assert!(!panel.is_expanded());
    }

    #[test]
    fn test_render_labels() {
        let panel = VoiceConfigPanel::new(&SpeechOptions::default()).initially_expanded(true);
        let view = panel.render(&SessionState::default());
        assert!(view.expanded);
        assert_eq!(view.title, "Configurações de voz");
        assert_eq!(view.rate_label.as_deref(), Some("Velocidade: 1x"));
        assert_eq!(view.volume_label.as_deref(), Some("Volume: 100%"));
        assert_eq!(view.pitch_label.as_deref(), Some("Tom: 1"));
    }

    #[test]
    fn test_voice_label_marks_default() {
        let voice = Voice::new("br-1", "Luciana", "pt-BR");
        assert_eq!(voice_label(&voice), "Luciana");
        assert_eq!(voice_label(&voice.with_default(true)), "Luciana (Padrão)");
    }

    #[test]
    fn test_hidden_sections() {
        let panel = VoiceConfigPanel::new(&SpeechOptions::default()).sections(PanelSections {
            rate: false,
            language: false,
            ..Default::default()
        });
        let state = SessionState {
            voices: vec![Voice::new("a", "A", "en-US")],
            ..Default::default()
        };
        let view = panel.render(&state);
        assert!(view.rate_label.is_none());
        assert!(view.languages.is_empty());
        assert!(view.volume_label.is_some());
    }
}
