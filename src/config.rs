use crate::defaults;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub stt: SttConfig,
    pub llm: LlmConfig,
    pub tts: TtsConfig,
}

/// Speech-to-text configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SttConfig {
    /// Path to the transcription model file
    pub model_path: PathBuf,
    /// Language code (e.g., "en", "de")
    pub language: String,
    /// Number of decoding threads (None = auto-detect)
    pub threads: Option<usize>,
}

/// Response generation configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    /// Path to the GGUF model file
    pub model_path: PathBuf,
    /// Path to the tokenizer definition
    pub tokenizer_path: PathBuf,
    /// System message sent with every request
    pub system_prompt: String,
    /// Hard cap on generated reply length
    pub max_tokens: usize,
    /// Sampling temperature; 0 selects greedy decoding
    pub temperature: f64,
}

/// Speech synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TtsConfig {
    /// Path to the voice config JSON (the `.onnx.json` next to the model)
    pub voice_config_path: PathBuf,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/ggml-base.en.bin"),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            threads: None,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/Llama-3.2-1B-Instruct-Q4_K_M.gguf"),
            tokenizer_path: PathBuf::from("models/tokenizer.json"),
            system_prompt: defaults::DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tokens: defaults::DEFAULT_MAX_TOKENS,
            temperature: defaults::DEFAULT_TEMPERATURE,
        }
    }
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            voice_config_path: PathBuf::from("models/piper/en_US-lessac-medium.onnx.json"),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Ok(Self::default())
                } else {
                    Err(e)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.stt.language, "en");
        assert_eq!(config.llm.max_tokens, 256);
        assert!((config.llm.temperature - 0.7).abs() < f64::EPSILON);
        assert_eq!(
            config.llm.system_prompt,
            defaults::DEFAULT_SYSTEM_PROMPT
        );
    }

    #[test]
    fn load_parses_partial_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[llm]\nmax_tokens = 64\ntemperature = 0.0\n\n[stt]\nlanguage = \"de\""
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.llm.max_tokens, 64);
        assert_eq!(config.llm.temperature, 0.0);
        assert_eq!(config.stt.language, "de");
        // Unspecified sections fall back to defaults
        assert_eq!(config.tts, TtsConfig::default());
        assert_eq!(config.llm.system_prompt, defaults::DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn load_rejects_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "this is not = valid [ toml").unwrap();

        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn load_or_default_returns_defaults_for_missing_file() {
        let config = Config::load_or_default(Path::new("/nonexistent/talkback.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn load_or_default_propagates_parse_errors() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[[[broken").unwrap();

        assert!(Config::load_or_default(file.path()).is_err());
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed, config);
    }
}
