//! Input intake: channel detection and normalization.
//!
//! Raw input flows through:
//! 1. `classifier::resolve_channel()`: content detection plus caller hint override
//! 2. `InputNormalizer::normalize()`: channel-specific conversion to plain text

pub mod classifier;
pub mod email;
pub mod normalizer;
pub mod voice;

pub use classifier::{Channel, classify, resolve_channel};
pub use normalizer::{InputNormalizer, NormalizedInput};
pub use voice::{
    GeminiAudioTranscriber, MockTranscriber, VoiceTranscriber, WhisperTranscriber,
    create_transcriber,
};
