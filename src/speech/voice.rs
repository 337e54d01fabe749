//! Voices advertised by the speech engine

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A voice offered by the engine
///
/// Voices are only ever read from the engine; the session never creates
/// or destroys them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    /// Engine-specific identifier, stable for the lifetime of the engine
    pub id: String,

    /// Human readable name
    pub name: String,

    /// BCP 47 language tag, e.g. "pt-BR"
    pub lang: String,

    /// Whether the engine marks this as its default voice
    #[serde(default)]
    pub default: bool,
}

impl Voice {
    pub fn new(id: impl Into<String>, name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            lang: lang.into(),
            default: false,
        }
    }

    /// Mark this voice as the engine default
    pub fn with_default(mut self, default: bool) -> Self {
        self.default = default;
        self
    }
}

/// Pick the voice to use when none has been chosen yet
///
/// Returns the first voice whose language equals `lang`, falling back to
/// the first voice in the list.
pub fn select_default_voice<'a>(voices: &'a [Voice], lang: &str) -> Option<&'a Voice> {
    voices
        .iter()
        .find(|voice| voice.lang == lang)
        .or_else(|| voices.first())
}

/// Group voices by language tag, languages sorted, engine order kept within a group
pub fn group_by_language(voices: &[Voice]) -> BTreeMap<String, Vec<Voice>> {
    let mut groups: BTreeMap<String, Vec<Voice>> = BTreeMap::new();
    for voice in voices {
        groups.entry(voice.lang.clone()).or_default().push(voice.clone());
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voices() -> Vec<Voice> {
        vec![
            Voice::new("en-1", "Samantha", "en-US"),
            Voice::new("pt-1", "Luciana", "pt-BR"),
            Voice::new("en-2", "Alex", "en-US"),
        ]
    }

    #[test]
    fn test_select_matching_language() {
        let voices = voices();
        let voice = select_default_voice(&voices, "pt-BR").unwrap();
        assert_eq!(voice.id, "pt-1");
    }

    #[test]
    fn test_select_falls_back_to_first() {
        let voices = voices();
        let voice = select_default_voice(&voices, "fr-FR").unwrap();
        assert_eq!(voice.id, "en-1");
    }

    #[test]
    fn test_select_empty() {
        assert!(select_default_voice(&[], "pt-BR").is_none());
    }

    #[test]
    fn test_group_by_language() {
        let groups = group_by_language(&voices());
        let langs: Vec<_> = groups.keys().cloned().collect();
        assert_eq!(langs, vec!["en-US", "pt-BR"]);

        let english: Vec<_> = groups["en-US"].iter().map(|v| v.id.as_str()).collect();
        assert_eq!(english, vec!["en-1", "en-2"]);
    }
}
