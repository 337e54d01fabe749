//! View-model tests
//!
//! The toggle and the settings panel driven against a stub-backed session

use readaloud::speech::backends::stub::{EngineCall, StubEngine};
use readaloud::speech::{EngineEvent, OptionsUpdate, SpeechController, UtteranceEvent, Voice};
use readaloud::widgets::{ReadAloudButton, VoiceConfigPanel, VoiceSettings};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};

fn voices() -> Vec<Voice> {
    vec![
        Voice::new("us-1", "Samantha", "en-US"),
        Voice::new("br-1", "Luciana", "pt-BR"),
        Voice::new("br-2", "Felipe", "pt-BR"),
    ]
}

fn session(engine: &StubEngine) -> (SpeechController, Receiver<EngineEvent>) {
    SpeechController::with_channel(Box::new(engine.clone()), OptionsUpdate::new())
}

#[test]
fn test_toggle_cycle() {
    let engine = StubEngine::new();
    let (mut controller, rx) = session(&engine);
    let button = ReadAloudButton::new("Olá mundo");

    button.click(&mut controller);
    let id = controller.active_utterance().unwrap();
    assert_eq!(engine.utterance(id).unwrap().text, "Olá mundo");

    engine.fire(id, UtteranceEvent::Start);
    controller.pump(&rx);
    assert_eq!(button.render(&controller.state()).label, "Parar leitura");

    engine.clear_calls();
    button.click(&mut controller);
    assert_eq!(engine.calls(), vec![EngineCall::Pause]);
    engine.fire(id, UtteranceEvent::Pause);
    controller.pump(&rx);
    let view = button.render(&controller.state());
    assert_eq!(view.label, "Continuar leitura");
    assert!(!view.show_stop());

    engine.clear_calls();
    button.click(&mut controller);
    assert_eq!(engine.calls(), vec![EngineCall::Resume]);
    engine.fire(id, UtteranceEvent::Resume);
    controller.pump(&rx);
    assert!(button.render(&controller.state()).show_stop());

    button.click_stop(&mut controller);
    assert_eq!(button.render(&controller.state()).label, "Ouvir texto");
}

#[test]
fn test_panel_groups_voices() {
    let engine = StubEngine::with_voices(voices());
    let (controller, _rx) = session(&engine);
    let panel = VoiceConfigPanel::new(&controller.options());
    let state = controller.state();

    assert_eq!(panel.languages(&state), vec!["en-US", "pt-BR"]);
    let ids: Vec<_> = panel
        .available_voices(&state)
        .into_iter()
        .map(|v| v.id)
        .collect();
    assert_eq!(ids, vec!["br-1", "br-2"]);
}

#[test]
fn test_panel_language_change_selects_first_voice() {
    let engine = StubEngine::with_voices(voices());
    let (mut controller, _rx) = session(&engine);
    let changes: Arc<Mutex<Vec<VoiceSettings>>> = Arc::default();
    let sink = Arc::clone(&changes);
    let mut panel = VoiceConfigPanel::new(&controller.options())
        .on_change(move |settings| sink.lock().unwrap().push(settings.clone()));

    panel.select_language(&mut controller, "en-US");

    assert_eq!(controller.current_voice().unwrap().id, "us-1");
    assert_eq!(controller.options().voice.as_ref().unwrap().id, "us-1");
    let changes = changes.lock().unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].lang, "en-US");
    assert_eq!(changes[0].voice.as_ref().unwrap().id, "us-1");
}

#[test]
fn test_panel_voice_and_sliders_forward_changes() {
    let engine = StubEngine::with_voices(voices());
    let (mut controller, _rx) = session(&engine);
    let changes: Arc<Mutex<Vec<VoiceSettings>>> = Arc::default();
    let sink = Arc::clone(&changes);
    let mut panel = VoiceConfigPanel::new(&controller.options())
        .on_change(move |settings| sink.lock().unwrap().push(settings.clone()));

    panel.select_voice(&mut controller, "br-2");
    panel.set_rate(&mut controller, 1.5);
    panel.set_volume(&mut controller, 0.5);
    panel.set_pitch(&mut controller, 9.0);
    panel.select_voice(&mut controller, "missing");

    let options = controller.options();
    assert_eq!(options.voice.as_ref().unwrap().id, "br-2");
    assert_eq!(options.rate, 1.5);
    assert_eq!(options.volume, 0.5);
    assert_eq!(options.pitch, 2.0);

    let changes = changes.lock().unwrap();
    assert_eq!(changes.len(), 4);
    let last = changes.last().unwrap();
    assert_eq!(last.rate, 1.5);
    assert_eq!(last.pitch, 2.0);
    assert_eq!(last.voice.as_ref().unwrap().id, "br-2");
}

#[test]
fn test_panel_follows_auto_selected_voice() {
    let engine = StubEngine::new();
    let (mut controller, rx) = session(&engine);
    let mut panel = VoiceConfigPanel::new(&controller.options());

    engine.set_voices(vec![Voice::new("de", "Anna", "de-DE")]);
    controller.pump(&rx);
    panel.sync_from(&controller.state());
    assert_eq!(panel.selected_lang(), "de-DE");

    let view = panel.render(&controller.state());
    assert_eq!(view.selected_voice.as_deref(), Some("de"));
    assert_eq!(view.voices.len(), 1);
}

#[test]
fn test_panel_marks_default_voice() {
    let engine = StubEngine::with_voices(vec![
        Voice::new("br-1", "Luciana", "pt-BR"),
        Voice::new("br-2", "Felipe", "pt-BR").with_default(true),
    ]);
    let (controller, _rx) = session(&engine);
    let panel = VoiceConfigPanel::new(&controller.options());

    let view = panel.render(&controller.state());
    assert_eq!(
        view.voice_labels,
        vec![
            ("br-1".to_string(), "Luciana".to_string()),
            ("br-2".to_string(), "Felipe (Padrão)".to_string()),
        ]
    );
}

#[test]
fn test_panel_toggle_expanded() {
    let engine = StubEngine::new();
    let (controller, _rx) = session(&engine);
    let mut panel = VoiceConfigPanel::new(&controller.options()).title("Voice");

    assert!(panel.toggle_expanded());
    let view = panel.render(&controller.state());
    assert!(view.expanded);
    assert_eq!(view.title, "Voice");
    assert!(!panel.toggle_expanded());
}
