//! Piper voice synthesis.
//!
//! Wraps a Piper ONNX voice behind the [`Voice`] trait. The voice's native
//! sample rate is read from its config JSON, the same file piper itself
//! loads.
//!
//! # Feature Gate
//!
//! Requires the `piper` feature:
//!
//! ```bash
//! cargo build --features piper
//! ```

use crate::error::{Result, TalkbackError};
use crate::tts::synthesizer::{ChunkStream, Voice};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[cfg(feature = "piper")]
use piper_rs::synth::PiperSpeechSynthesizer;

/// Configuration for a Piper voice.
#[derive(Debug, Clone)]
pub struct PiperConfig {
    /// Path to the voice config JSON (the `.onnx.json` next to the model)
    pub voice_config_path: PathBuf,
}

impl Default for PiperConfig {
    fn default() -> Self {
        Self {
            voice_config_path: PathBuf::from("models/piper/en_US-lessac-medium.onnx.json"),
        }
    }
}

/// The subset of the piper voice config we read ourselves.
#[derive(Debug, Deserialize)]
struct VoiceConfigFile {
    audio: VoiceAudioSection,
}

#[derive(Debug, Deserialize)]
struct VoiceAudioSection {
    sample_rate: u32,
}

/// Piper voice implementation.
#[cfg(feature = "piper")]
pub struct PiperVoice {
    synth: PiperSpeechSynthesizer,
    sample_rate: u32,
    voice_name: String,
}

/// Piper voice placeholder (without piper feature).
///
/// Validates the voice config at construction like the real implementation
/// but returns errors when used.
#[cfg(not(feature = "piper"))]
#[derive(Debug)]
pub struct PiperVoice {
    sample_rate: u32,
    voice_name: String,
}

/// Read the native sample rate and derive a voice name from the config path.
fn read_voice_metadata(path: &Path) -> Result<(u32, String)> {
    if !path.exists() {
        return Err(TalkbackError::ModelNotFound {
            role: "synthesis",
            path: path.to_string_lossy().to_string(),
        });
    }

    let bytes = std::fs::read(path).map_err(TalkbackError::Io)?;
    let config: VoiceConfigFile =
        serde_json::from_slice(&bytes).map_err(|e| TalkbackError::SynthesisFailed {
            message: format!("Parse voice config {}: {e}", path.display()),
        })?;

    let voice_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.trim_end_matches(".onnx.json").to_string())
        .unwrap_or_else(|| "unknown".to_string());

    Ok((config.audio.sample_rate, voice_name))
}

#[cfg(feature = "piper")]
impl PiperVoice {
    /// Load a Piper voice from its config JSON.
    ///
    /// # Errors
    /// `ModelNotFound` if the config is missing (fatal, never deferred to
    /// synthesis time), `SynthesisFailed` if the voice fails to load.
    pub fn load(config: PiperConfig) -> Result<Self> {
        let (sample_rate, voice_name) = read_voice_metadata(&config.voice_config_path)?;

        let model = piper_rs::from_config_path(&config.voice_config_path).map_err(|e| {
            TalkbackError::SynthesisFailed {
                message: format!(
                    "Load piper voice {}: {e}",
                    config.voice_config_path.display()
                ),
            }
        })?;
        let synth =
            PiperSpeechSynthesizer::new(model).map_err(|e| TalkbackError::SynthesisFailed {
                message: format!("Init piper synthesizer: {e}"),
            })?;

        tracing::info!(voice = %voice_name, sample_rate, "piper voice loaded");

        Ok(Self {
            synth,
            sample_rate,
            voice_name,
        })
    }
}

#[cfg(not(feature = "piper"))]
impl PiperVoice {
    /// Load a Piper voice (stub implementation).
    ///
    /// Still validates the voice config so construction-time error
    /// semantics match the real implementation.
    pub fn load(config: PiperConfig) -> Result<Self> {
        let (sample_rate, voice_name) = read_voice_metadata(&config.voice_config_path)?;
        Ok(Self {
            sample_rate,
            voice_name,
        })
    }
}

#[cfg(feature = "piper")]
fn scale_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

#[cfg(feature = "piper")]
impl Voice for PiperVoice {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn speak(&self, text: &str) -> Result<ChunkStream> {
        let stream = self
            .synth
            .synthesize_lazy(text.to_string(), None)
            .map_err(|e| TalkbackError::SynthesisFailed {
                message: format!("Piper synthesis failed: {e}"),
            })?;

        Ok(Box::new(stream.map(|result| {
            result
                .map(|audio| audio.into_vec().into_iter().map(scale_to_i16).collect())
                .map_err(|e| TalkbackError::SynthesisFailed {
                    message: format!("Piper voice error mid-stream: {e}"),
                })
        })))
    }

    fn voice_name(&self) -> &str {
        &self.voice_name
    }
}

#[cfg(not(feature = "piper"))]
impl Voice for PiperVoice {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn speak(&self, _text: &str) -> Result<ChunkStream> {
        Err(TalkbackError::SynthesisFailed {
            message: "piper feature not enabled. Rebuild with: cargo build --features piper"
                .to_string(),
        })
    }

    fn voice_name(&self) -> &str {
        &self.voice_name
    }
}
