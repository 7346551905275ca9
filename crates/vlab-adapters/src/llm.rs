//! Backend respaldado por un modelo de lenguaje.
//!
//! `TextGenerator` abstrae la generación de texto; `OpenAiCompatibleGenerator`
//! la implementa contra cualquier endpoint `/chat/completions`.
//! `LlmReasoningBackend` compone prompt → generación → parser.
use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Client;
use serde_json::json;
use std::env;

use vlab_core::{BackendError, CandidateOutcome, ReasoningBackend, SimulationContext};

use crate::parser::parse_candidates;
use crate::prompt::build_prompt;

static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenvy::dotenv();
});

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434/v1";
pub const DEFAULT_MODEL: &str = "llama3";

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, BackendError>;
}

/// Configuración del cliente LLM (`VLAB_LLM_BASE_URL`, `VLAB_LLM_API_KEY`,
/// `VLAB_LLM_MODEL`).
#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_BASE_URL.to_string(),
               api_key: None,
               model: DEFAULT_MODEL.to_string(),
               temperature: 0.2 }
    }
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Lazy::force(&DOTENV_LOADED);
        let defaults = Self::default();
        Self { base_url: env::var("VLAB_LLM_BASE_URL").unwrap_or(defaults.base_url),
               api_key: env::var("VLAB_LLM_API_KEY").ok().filter(|k| !k.trim().is_empty()),
               model: env::var("VLAB_LLM_MODEL").unwrap_or(defaults.model),
               temperature: defaults.temperature }
    }
}

pub struct OpenAiCompatibleGenerator {
    client: Client,
    config: LlmConfig,
}

impl OpenAiCompatibleGenerator {
    pub fn new(config: LlmConfig) -> Self {
        Self { client: Client::new(),
               config }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl TextGenerator for OpenAiCompatibleGenerator {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, BackendError> {
        let body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": prompt },
            ],
            "temperature": self.config.temperature,
        });

        let mut request = self.client.post(self.endpoint()).json(&body);
        if let Some(ref key) = self.config.api_key {
            request = request.bearer_auth(key);
        }

        let res = request.send().await.map_err(|e| BackendError::Unreachable(e.to_string()))?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(BackendError::Http { status: status.as_u16(),
                                            body });
        }
        let json: serde_json::Value = res.json().await.map_err(|e| BackendError::Malformed(e.to_string()))?;
        json["choices"][0]["message"]["content"].as_str()
                                                .map(str::to_string)
                                                .ok_or_else(|| {
                                                    BackendError::Malformed("missing choices[0].message.content".into())
                                                })
    }
}

/// Backend que pregunta a un `TextGenerator` y lee su respuesta.
pub struct LlmReasoningBackend<G: TextGenerator> {
    generator: G,
}

impl<G: TextGenerator> LlmReasoningBackend<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }
}

impl LlmReasoningBackend<OpenAiCompatibleGenerator> {
    pub fn from_env() -> Self {
        Self::new(OpenAiCompatibleGenerator::new(LlmConfig::from_env()))
    }
}

#[async_trait]
impl<G: TextGenerator> ReasoningBackend for LlmReasoningBackend<G> {
    fn name(&self) -> &str {
        "llm"
    }

    async fn propose(&self, context: &SimulationContext) -> Result<Vec<CandidateOutcome>, BackendError> {
        let prompt = build_prompt(context);
        let response = self.generator.generate(&prompt.system, &prompt.user).await?;
        log::debug!("llm response ({} chars)", response.len());
        parse_candidates(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let g = OpenAiCompatibleGenerator::new(LlmConfig { base_url: "http://host/v1/".into(),
                                                           ..LlmConfig::default() });
        assert_eq!(g.endpoint(), "http://host/v1/chat/completions");
    }
}
