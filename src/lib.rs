//! Murmur Gateway - voice chat over a generative speech model
//!
//! A client uploads one recorded utterance; the server asks the model to
//! transcribe it and reply in a single structured call, falling back to two
//! plain-text calls when the structured output cannot be parsed, and returns
//! `{transcription, response}`.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                   Client                      │
//! │  AudioCapture → Uploader    Presenter → TTS   │
//! └───────────────────┬───────────────▲───────────┘
//!                     │ multipart     │ JSON
//! ┌───────────────────▼───────────────┴───────────┐
//! │                 /api/chat                      │
//! │  AudioPayload → TranscribeAndRespond           │
//! │                 (combined → fallback)          │
//! └───────────────────┬───────────────────────────┘
//!                     │
//! ┌───────────────────▼───────────────────────────┐
//! │           GenerativeModel (Gemini)             │
//! └───────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod audio;
pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod voice;

pub use audio::AudioPayload;
pub use client::{ChatLog, ChatMessage, ResponsePresenter, Speaker, Uploader};
pub use config::Config;
pub use error::{Error, Result};
pub use model::{GeminiModel, GenerativeModel, ModelPrompt, Part};
pub use pipeline::{ChatResult, PipelineError, TranscribeAndRespond};
