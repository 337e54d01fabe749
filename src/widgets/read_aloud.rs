//! Read-aloud toggle
//!
//! One button that starts, pauses and resumes reading a fixed text, plus a
//! stop affordance while audio is playing. Holds no session state of its
//! own; everything it shows is derived from `SessionState`.

use crate::speech::SpeechController;
use crate::state::SessionState;

/// What the toggle should display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonView {
    pub label: String,
    pub icon: String,
    pub aria_label: &'static str,
    /// The separate stop button, shown only while audio is playing
    pub stop: Option<StopView>,
}

impl ButtonView {
    pub fn show_stop(&self) -> bool {
        self.stop.is_some()
    }
}

/// What the stop button displays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopView {
    pub icon: &'static str,
    pub aria_label: &'static str,
}

/// Accessible label of the stop button
pub const STOP_ARIA_LABEL: &str = "Interromper leitura";

/// Icon of the stop button
pub const STOP_ICON: &str = "⏹️";

/// Toggle button view-model
#[derive(Debug, Clone)]
pub struct ReadAloudButton {
    text: String,
    idle_text: String,
    speaking_text: String,
    paused_text: String,
    icon: String,
    speaking_icon: String,
    paused_icon: String,
}

impl ReadAloudButton {
    /// A toggle that reads `text`, with the default labels and icons
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            idle_text: "Ouvir texto".to_string(),
            speaking_text: "Parar leitura".to_string(),
            paused_text: "Continuar leitura".to_string(),
            icon: "🔊".to_string(),
            speaking_icon: "⏹️".to_string(),
            paused_icon: "▶️".to_string(),
        }
    }

    /// Label shown while idle
    pub fn idle_text(mut self, label: impl Into<String>) -> Self {
        self.idle_text = label.into();
        self
    }

    pub fn speaking_text(mut self, label: impl Into<String>) -> Self {
        self.speaking_text = label.into();
        self
    }

    pub fn paused_text(mut self, label: impl Into<String>) -> Self {
        self.paused_text = label.into();
        self
    }

    pub fn icons(
        mut self,
        idle: impl Into<String>,
        speaking: impl Into<String>,
        paused: impl Into<String>,
    ) -> Self {
        self.icon = idle.into();
        self.speaking_icon = speaking.into();
        self.paused_icon = paused.into();
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Primary button pressed
    pub fn click(&self, controller: &mut SpeechController) {
        if controller.is_speaking() {
            if controller.is_paused() {
                controller.resume();
            } else {
                controller.pause();
            }
        } else {
            controller.speak(&self.text);
        }
    }

    /// Stop button pressed
    pub fn click_stop(&self, controller: &mut SpeechController) {
        controller.stop();
    }

    pub fn render(&self, state: &SessionState) -> ButtonView {
        let (label, icon, aria_label) = match (state.speaking, state.paused) {
            (true, true) => (&self.paused_text, &self.paused_icon, "Continuar leitura"),
            (true, false) => (&self.speaking_text, &self.speaking_icon, "Pausar leitura"),
            _ => (&self.idle_text, &self.icon, "Ouvir texto"),
        };

        ButtonView {
            label: label.clone(),
            icon: icon.clone(),
            aria_label,
            stop: (state.speaking && !state.paused).then_some(StopView {
                icon: STOP_ICON,
                aria_label: STOP_ARIA_LABEL,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(speaking: bool, paused: bool) -> SessionState {
        SessionState {
            speaking,
            paused,
            ..Default::default()
        }
    }

    #[test]
    fn test_render_idle() {
        let view = ReadAloudButton::new("hi").render(&state(false, false));
        assert_eq!(view.label, "Ouvir texto");
        assert_eq!(view.icon, "🔊");
        assert!(!view.show_stop());
    }

    #[test]
    fn test_render_speaking_and_paused() {
        let button = ReadAloudButton::new("hi");

        let speaking = button.render(&state(true, false));
        assert_eq!(speaking.label, "Parar leitura");
        assert_eq!(speaking.aria_label, "Pausar leitura");
        let stop = speaking.stop.expect("stop button while speaking");
        assert_eq!(stop.icon, STOP_ICON);
        assert_eq!(stop.aria_label, "Interromper leitura");

        let paused = button.render(&state(true, true));
        assert_eq!(paused.label, "Continuar leitura");
        assert_eq!(paused.icon, "▶️");
        assert!(paused.stop.is_none());
    }

    #[test]
    fn test_custom_labels() {
        let button = ReadAloudButton::new("hi")
            .idle_text("Listen")
            .icons("A", "B", "C");
        let view = button.render(&state(false, false));
        assert_eq!(view.label, "Listen");
        assert_eq!(view.icon, "A");
    }
}
