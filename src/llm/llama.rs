//! Quantized Llama chat model via candle.
//!
//! Loads a GGUF model and runs one single-turn completion per request with
//! an incremental KV cache.
//!
//! # Feature Gate
//!
//! Requires the `llm` feature:
//!
//! ```bash
//! cargo build --features llm
//! ```

#[cfg(feature = "llm")]
use crate::defaults;
use crate::error::{Result, TalkbackError};
use crate::llm::generator::{ChatModel, ConversationTurn};
use std::path::PathBuf;

#[cfg(feature = "llm")]
use crate::capability::{select_profile, CapabilityProfile};
#[cfg(feature = "llm")]
use candle_core::quantized::gguf_file;
#[cfg(feature = "llm")]
use candle_core::{Device, Tensor};
#[cfg(feature = "llm")]
use candle_transformers::generation::LogitsProcessor;
#[cfg(feature = "llm")]
use candle_transformers::models::quantized_llama::ModelWeights;
#[cfg(feature = "llm")]
use std::sync::Mutex;
#[cfg(feature = "llm")]
use tokenizers::Tokenizer;

/// Fixed sampling seed; reproducibility at temperature 0 does not depend
/// on it, and at temperature > 0 varying output is expected anyway.
#[cfg(feature = "llm")]
const SAMPLING_SEED: u64 = 299792458;

/// Configuration for the Llama chat model.
#[derive(Debug, Clone)]
pub struct LlamaConfig {
    /// Path to the GGUF model file
    pub model_path: PathBuf,
    /// Path to the tokenizer definition
    pub tokenizer_path: PathBuf,
}

impl Default for LlamaConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/Llama-3.2-1B-Instruct-Q4_K_M.gguf"),
            tokenizer_path: PathBuf::from("models/tokenizer.json"),
        }
    }
}

/// Llama chat model implementation.
///
/// The weights are a heavyweight, non-thread-safe resource loaded once;
/// the Mutex serializes completion requests against the shared KV cache.
#[cfg(feature = "llm")]
pub struct LlamaChatModel {
    model: Mutex<ModelWeights>,
    tokenizer: Tokenizer,
    device: Device,
    eos_tokens: Vec<u32>,
    model_name: String,
}

/// Llama chat model placeholder (without llm feature).
///
/// Validates artifact paths at construction like the real implementation
/// but returns errors when used.
#[cfg(not(feature = "llm"))]
#[derive(Debug)]
pub struct LlamaChatModel {
    model_name: String,
}

fn validate_paths(config: &LlamaConfig) -> Result<String> {
    if !config.model_path.exists() {
        return Err(TalkbackError::ModelNotFound {
            role: "generation",
            path: config.model_path.to_string_lossy().to_string(),
        });
    }
    if !config.tokenizer_path.exists() {
        return Err(TalkbackError::ModelNotFound {
            role: "generation",
            path: config.tokenizer_path.to_string_lossy().to_string(),
        });
    }
    Ok(config
        .model_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string())
}

/// Build the Llama 3 instruct prompt for a single turn: system message,
/// user message, then the assistant header the model completes from.
fn render_prompt(turn: &ConversationTurn) -> String {
    format!(
        "<|begin_of_text|><|start_header_id|>system<|end_header_id|>\n\n{}<|eot_id|>\
         <|start_header_id|>user<|end_header_id|>\n\n{}<|eot_id|>\
         <|start_header_id|>assistant<|end_header_id|>\n\n",
        turn.system_prompt, turn.user_message
    )
}

#[cfg(feature = "llm")]
impl LlamaChatModel {
    /// Load the GGUF weights and tokenizer.
    ///
    /// # Errors
    /// `ModelNotFound` if either artifact is missing (fatal, never deferred
    /// to inference time), `GenerationFailed` if loading fails.
    pub fn load(config: LlamaConfig) -> Result<Self> {
        let model_name = validate_paths(&config)?;

        let profile = select_profile();
        let device = Self::pick_device(&profile)?;

        let mut file =
            std::fs::File::open(&config.model_path).map_err(TalkbackError::Io)?;
        let content =
            gguf_file::Content::read(&mut file).map_err(|e| TalkbackError::GenerationFailed {
                message: format!("Read GGUF {}: {e}", config.model_path.display()),
            })?;
        let model = ModelWeights::from_gguf(content, &mut file, &device).map_err(|e| {
            TalkbackError::GenerationFailed {
                message: format!("Load GGUF model {}: {e}", config.model_path.display()),
            }
        })?;

        let tokenizer = Tokenizer::from_file(&config.tokenizer_path).map_err(|e| {
            TalkbackError::GenerationFailed {
                message: format!("Load tokenizer {}: {e}", config.tokenizer_path.display()),
            }
        })?;

        let eos_tokens: Vec<u32> = ["<|eot_id|>", "<|end_of_text|>", "</s>"]
            .iter()
            .filter_map(|t| tokenizer.token_to_id(t))
            .collect();

        tracing::info!(
            model = %model_name,
            profile = profile.label(),
            "llama model loaded"
        );

        Ok(Self {
            model: Mutex::new(model),
            tokenizer,
            device,
            eos_tokens,
            model_name,
        })
    }

    #[cfg(feature = "cuda")]
    fn pick_device(profile: &CapabilityProfile) -> Result<Device> {
        match profile.device {
            crate::capability::Device::Gpu => {
                Device::new_cuda(0).map_err(|e| TalkbackError::GenerationFailed {
                    message: format!("CUDA device init: {e}"),
                })
            }
            crate::capability::Device::Cpu => Ok(Device::Cpu),
        }
    }

    #[cfg(not(feature = "cuda"))]
    fn pick_device(_profile: &CapabilityProfile) -> Result<Device> {
        Ok(Device::Cpu)
    }
}

#[cfg(not(feature = "llm"))]
impl LlamaChatModel {
    /// Load the Llama chat model (stub implementation).
    ///
    /// Still validates the artifact paths so construction-time error
    /// semantics match the real implementation.
    pub fn load(config: LlamaConfig) -> Result<Self> {
        let model_name = validate_paths(&config)?;
        Ok(Self { model_name })
    }
}

#[cfg(feature = "llm")]
impl ChatModel for LlamaChatModel {
    fn complete(
        &self,
        turn: &ConversationTurn,
        max_tokens: usize,
        temperature: f64,
    ) -> Result<String> {
        let prompt = render_prompt(turn);
        let encoding = self
            .tokenizer
            .encode(prompt.as_str(), false)
            .map_err(|e| TalkbackError::GenerationFailed {
                message: format!("Tokenize: {e}"),
            })?;
        let prompt_tokens: Vec<u32> = encoding.get_ids().to_vec();

        if prompt_tokens.len() + max_tokens > defaults::LLM_CONTEXT_SIZE {
            return Err(TalkbackError::GenerationFailed {
                message: format!(
                    "prompt of {} tokens exceeds the {}-token context window",
                    prompt_tokens.len(),
                    defaults::LLM_CONTEXT_SIZE
                ),
            });
        }

        let mut model = self
            .model
            .lock()
            .map_err(|e| TalkbackError::GenerationFailed {
                message: format!("Failed to acquire model lock: {e}"),
            })?;

        // Temperature 0 selects plain argmax decoding
        let sampling_temperature = if temperature > 0.0 {
            Some(temperature)
        } else {
            None
        };
        let mut sampler = LogitsProcessor::new(SAMPLING_SEED, sampling_temperature, None);

        let gen_err =
            |e: candle_core::Error| TalkbackError::GenerationFailed { message: e.to_string() };

        // Feed the whole prompt at position 0, then one token at a time.
        // index_pos 0 resets the model's KV cache, so nothing carries over
        // from earlier requests.
        let input = Tensor::new(prompt_tokens.as_slice(), &self.device)
            .map_err(gen_err)?
            .unsqueeze(0)
            .map_err(gen_err)?;
        let logits = model.forward(&input, 0).map_err(gen_err)?;
        let logits = logits.squeeze(0).map_err(gen_err)?;
        let mut next_token = sampler.sample(&logits).map_err(gen_err)?;

        let mut generated: Vec<u32> = Vec::new();
        while !self.eos_tokens.contains(&next_token) && generated.len() < max_tokens {
            generated.push(next_token);

            let input = Tensor::new(&[next_token], &self.device)
                .map_err(gen_err)?
                .unsqueeze(0)
                .map_err(gen_err)?;
            let position = prompt_tokens.len() + generated.len() - 1;
            let logits = model.forward(&input, position).map_err(gen_err)?;
            let logits = logits.squeeze(0).map_err(gen_err)?;
            next_token = sampler.sample(&logits).map_err(gen_err)?;
        }

        tracing::debug!(tokens = generated.len(), "completion finished");

        self.tokenizer
            .decode(&generated, true)
            .map_err(|e| TalkbackError::GenerationFailed {
                message: format!("Detokenize: {e}"),
            })
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(not(feature = "llm"))]
impl ChatModel for LlamaChatModel {
    fn complete(
        &self,
        _turn: &ConversationTurn,
        _max_tokens: usize,
        _temperature: f64,
    ) -> Result<String> {
        Err(TalkbackError::GenerationFailed {
            message: "llm feature not enabled. Rebuild with: cargo build --features llm"
                .to_string(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
