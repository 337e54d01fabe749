//! Speech engine backends

// Native TTS backend using the tts crate (cross-platform)
pub mod native;

// Scriptable in-process engine for tests and headless hosts
pub mod stub;
