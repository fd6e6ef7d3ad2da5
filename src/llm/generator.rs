use crate::defaults;
use crate::error::{Result, TalkbackError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// One single-turn request: a system message and a user message.
///
/// Built fresh per call and dropped when the call returns. No turn is ever
/// retained — statelessness is a deliberate invariant, so no history can
/// leak between requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub system_prompt: String,
    pub user_message: String,
}

impl ConversationTurn {
    pub fn new(system_prompt: &str, user_message: &str) -> Self {
        Self {
            system_prompt: system_prompt.to_string(),
            user_message: user_message.to_string(),
        }
    }
}

/// Trait for conversational completion models.
///
/// This trait allows swapping implementations (real Llama vs mock).
pub trait ChatModel: Send + Sync {
    /// Run one completion for the turn, capped at `max_tokens` generated
    /// tokens. A temperature of 0 selects greedy decoding.
    fn complete(&self, turn: &ConversationTurn, max_tokens: usize, temperature: f64)
        -> Result<String>;

    /// Get the name of the loaded model
    fn model_name(&self) -> &str;
}

/// Implement ChatModel for Arc<T> to allow sharing across requests.
impl<T: ChatModel> ChatModel for Arc<T> {
    fn complete(
        &self,
        turn: &ConversationTurn,
        max_tokens: usize,
        temperature: f64,
    ) -> Result<String> {
        (**self).complete(turn, max_tokens, temperature)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

/// Generates a reply to a transcript with one single-turn model request.
///
/// Exactly two messages go to the model — system, then user. No prior
/// turns are injected. Two calls with identical arguments may produce
/// different text when temperature > 0; determinism is only guaranteed
/// at temperature 0.
pub struct ResponseGenerator<M: ChatModel> {
    model: M,
    system_prompt: String,
    max_tokens: usize,
    temperature: f64,
}

impl<M: ChatModel> ResponseGenerator<M> {
    /// Create a generator with the default persona and sampling settings.
    pub fn new(model: M) -> Self {
        Self {
            model,
            system_prompt: defaults::DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tokens: defaults::DEFAULT_MAX_TOKENS,
            temperature: defaults::DEFAULT_TEMPERATURE,
        }
    }

    /// Override the system persona.
    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = prompt.to_string();
        self
    }

    /// Override the generated-length cap.
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Override the sampling temperature (0 = greedy).
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Generate a reply to a user message with the configured persona and
    /// token cap.
    ///
    /// The first returned choice's text is taken verbatim.
    ///
    /// # Errors
    /// `GenerationFailed` on model errors or an empty completion.
    pub fn chat(&self, user_message: &str) -> Result<String> {
        self.chat_with(user_message, &self.system_prompt, self.max_tokens)
    }

    /// Generate a reply with a per-call persona and token cap.
    ///
    /// The overrides apply to this call only; the configured defaults are
    /// untouched.
    pub fn chat_with(
        &self,
        user_message: &str,
        system_prompt: &str,
        max_tokens: usize,
    ) -> Result<String> {
        let turn = ConversationTurn::new(system_prompt, user_message);
        tracing::debug!(
            model = self.model.model_name(),
            max_tokens,
            temperature = self.temperature,
            "generating reply"
        );

        let reply = self.model.complete(&turn, max_tokens, self.temperature)?;
        if reply.trim().is_empty() {
            return Err(TalkbackError::GenerationFailed {
                message: "model returned an empty completion".to_string(),
            });
        }
        Ok(reply)
    }
}

/// Mock chat model for testing
#[derive(Debug)]
pub struct MockChatModel {
    model_name: String,
    response: String,
    should_fail: bool,
    calls: AtomicUsize,
}

impl MockChatModel {
    /// Create a new mock chat model with default settings
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            response: "mock reply".to_string(),
            should_fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Configure the mock to return a specific response
    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    /// Configure the mock to fail on complete
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Number of complete invocations so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ChatModel for MockChatModel {
    fn complete(
        &self,
        _turn: &ConversationTurn,
        _max_tokens: usize,
        _temperature: f64,
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            Err(TalkbackError::GenerationFailed {
                message: "mock generation failure".to_string(),
            })
        } else {
            Ok(self.response.clone())
        }
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
