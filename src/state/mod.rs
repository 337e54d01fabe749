//! Session state
//!
//! What a read-aloud session exposes to its consumers: whether it is
//! speaking, whether it is paused, which voices exist and which one is
//! selected.

pub mod config;

use crate::speech::Voice;

/// Where a session is in its lifecycle
///
/// Paused is a sub-state of speaking, so a paused-but-silent session
/// cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Speaking,
    Paused,
}

impl Phase {
    pub fn is_speaking(self) -> bool {
        matches!(self, Phase::Speaking | Phase::Paused)
    }

    pub fn is_paused(self) -> bool {
        self == Phase::Paused
    }
}

/// Snapshot of a session, as rendered by the widgets
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionState {
    pub speaking: bool,
    pub paused: bool,
    pub voices: Vec<Voice>,
    pub current_voice: Option<Voice>,
}

impl SessionState {
    pub fn new(phase: Phase, voices: Vec<Voice>, current_voice: Option<Voice>) -> Self {
        Self {
            speaking: phase.is_speaking(),
            paused: phase.is_paused(),
            voices,
            current_voice,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paused_implies_speaking() {
        for phase in [Phase::Idle, Phase::Speaking, Phase::Paused] {
            let state = SessionState::new(phase, Vec::new(), None);
            assert!(!state.paused || state.speaking, "{:?}", phase);
        }
    }

    #[test]
    fn test_default_is_idle() {
        let state = SessionState::default();
        assert!(!state.speaking);
        assert!(!state.paused);
        assert!(state.current_voice.is_none());
    }
}
