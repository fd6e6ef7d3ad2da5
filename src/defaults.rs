//! Default configuration constants for talkback.
//!
//! Shared constants used across the pipeline components to ensure
//! consistency and eliminate duplication.

/// Sample rate required by the transcription model, in Hz.
///
/// 16kHz is the standard for speech recognition and is the rate every
/// input buffer is normalized to before decoding.
pub const SAMPLE_RATE: u32 = 16000;

/// Default language code for transcription.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Default persona used for the system message of every generation request.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful voice assistant. Keep responses concise and conversational.";

/// Default cap on generated reply length, in tokens.
pub const DEFAULT_MAX_TOKENS: usize = 256;

/// Default sampling temperature for reply generation.
///
/// At 0.7 two identical requests may legitimately produce different text.
/// Determinism is only guaranteed at temperature 0.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Context window for the generation model, in tokens.
pub const LLM_CONTEXT_SIZE: usize = 2048;

/// Report the GPU backend compiled into this build.
///
/// Returns a human-readable name based on the compile-time feature flags.
/// Only one GPU backend can be active at a time; if none is enabled, returns "CPU".
pub fn gpu_backend() -> &'static str {
    if cfg!(feature = "cuda") {
        "CUDA"
    } else if cfg!(feature = "vulkan") {
        "Vulkan"
    } else if cfg!(feature = "hipblas") {
        "HipBLAS (AMD)"
    } else {
        "CPU"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpu_backend_matches_compiled_feature() {
        let expected = if cfg!(feature = "cuda") {
            "CUDA"
        } else if cfg!(feature = "vulkan") {
            "Vulkan"
        } else if cfg!(feature = "hipblas") {
            "HipBLAS (AMD)"
        } else {
            "CPU"
        };
        assert_eq!(gpu_backend(), expected);
    }

    #[test]
    fn sample_rate_is_whisper_native() {
        assert_eq!(SAMPLE_RATE, 16000);
    }
}
