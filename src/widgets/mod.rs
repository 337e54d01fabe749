//! View-models consuming the session controller

pub mod config_panel;
pub mod read_aloud;

pub use config_panel::{PanelSections, PanelView, VoiceConfigPanel, VoiceSettings};
pub use read_aloud::{ButtonView, ReadAloudButton, StopView};
