//! Client for the text-to-speech inference service.
//!
//! The service hosts the speech models; this crate loads a model once per
//! device through [`ModelCache`] and asks the service to synthesize speech,
//! optionally in the voice of a reference recording.

pub mod client;
pub mod config;
pub mod error;
pub mod model_cache;
pub mod types;

pub use client::SpeechClient;
pub use config::{Device, SpeechConfig};
pub use error::{SpeechError, SpeechResult};
pub use model_cache::{ModelCache, ModelHandle};
pub use types::{ModelType, SynthesisRequest};
