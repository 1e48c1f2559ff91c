//! Microphone capture, WAV packaging, and speech synthesis for the voice
//! console.
//!
//! Capture uses the default input device at 16 kHz mono s16 — the rate the
//! backend's speech recognizer prefers. Synthesis shells out to the system
//! TTS engine rather than bundling a model; the assistant's configured voice
//! is rendered server-side, this client only needs to read replies aloud.

pub mod capture;
pub mod error;
pub mod speech;

pub use capture::{encode_wav, ActiveRecording, Recorder};
pub use error::AudioError;
pub use speech::{detect_language, language_from_locale, Speaker};
