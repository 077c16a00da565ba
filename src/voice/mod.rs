//! Voice I/O for the CLI client
//!
//! Microphone capture to WAV, and spoken replies via TTS and playback.

mod capture;
mod playback;
mod tts;

pub use capture::{AudioCapture, SAMPLE_RATE, rms, samples_to_wav};
pub use playback::AudioPlayback;
pub use tts::TextToSpeech;
