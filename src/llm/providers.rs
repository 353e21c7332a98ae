use super::{ChatMessage, LLMProvider, LLMResponse, LLM};
use crate::config::LLMConfig;
use crate::error::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

fn build_client(config: &LLMConfig) -> Result<reqwest::Client, LlmError> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .build()?)
}

fn configured_key(config: &LLMConfig) -> Option<&str> {
    config
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
}

/// OpenAI chat-completions provider; also serves LMStudio and other compatible servers
pub struct OpenAICompatibleProvider {
    config: LLMConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
    usage: Option<ChatCompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionUsage {
    total_tokens: u32,
}

impl OpenAICompatibleProvider {
    pub fn new(config: LLMConfig) -> Result<Self, LlmError> {
        let client = build_client(&config)?;
        Ok(Self { config, client })
    }

    fn name(&self) -> String {
        format!("{:?}", self.config.provider)
    }

    fn endpoint(&self) -> Result<&str, LlmError> {
        match (&self.config.endpoint, self.config.provider) {
            (Some(endpoint), _) => Ok(endpoint.as_str()),
            (None, LLMProvider::OpenAI) => Ok(OPENAI_ENDPOINT),
            (None, _) => Err(LlmError::MissingEndpoint(self.name())),
        }
    }
}

#[async_trait]
impl LLM for OpenAICompatibleProvider {
    async fn chat(&self, model: &str, messages: Vec<ChatMessage>) -> Result<LLMResponse, LlmError> {
        if !self.has_credentials() {
            return Err(LlmError::MissingApiKey(self.name()));
        }
        let endpoint = self.endpoint()?;

        let request = ChatCompletionRequest {
            model,
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        debug!("Sending request to {} ({}) at {}", self.name(), model, endpoint);

        let mut builder = self.client.post(endpoint).json(&request);
        if let Some(api_key) = configured_key(&self.config) {
            builder = builder.header("Authorization", format!("Bearer {}", api_key));
        }
        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                provider: self.name(),
                status,
                body,
            });
        }

        let completion: ChatCompletionResponse = response.json().await?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| LlmError::EmptyResponse(self.name()))?;

        Ok(LLMResponse {
            content,
            tokens_used: completion.usage.map(|u| u.total_tokens),
        })
    }

    fn has_credentials(&self) -> bool {
        match self.config.provider {
            LLMProvider::LMStudio => true,
            _ => configured_key(&self.config).is_some(),
        }
    }

    fn provider_type(&self) -> LLMProvider {
        self.config.provider
    }
}

/// Gemini provider implementation
pub struct GeminiProvider {
    config: LLMConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Debug, Deserialize)]
struct GeminiUsage {
    #[serde(rename = "totalTokenCount")]
    total_token_count: u32,
}

impl GeminiProvider {
    pub fn new(config: LLMConfig) -> Result<Self, LlmError> {
        let client = build_client(&config)?;
        Ok(Self { config, client })
    }

    fn url(&self, model: &str) -> String {
        let base = self.config.endpoint.as_deref().unwrap_or(GEMINI_BASE);
        format!("{}/{}:generateContent", base.trim_end_matches('/'), model)
    }

    fn build_request(&self, messages: Vec<ChatMessage>) -> GeminiRequest {
        let mut system = Vec::new();
        let mut contents = Vec::new();

        for message in messages {
            match message.role.as_str() {
                "system" => system.push(GeminiPart { text: message.content }),
                role => contents.push(GeminiContent {
                    role: Some(if role == "assistant" { "model" } else { "user" }.to_string()),
                    parts: vec![GeminiPart { text: message.content }],
                }),
            }
        }

        GeminiRequest {
            contents,
            system_instruction: if system.is_empty() {
                None
            } else {
                Some(GeminiContent { role: None, parts: system })
            },
            generation_config: GeminiGenerationConfig {
                max_output_tokens: self.config.max_tokens,
                temperature: self.config.temperature,
            },
        }
    }
}

#[async_trait]
impl LLM for GeminiProvider {
    async fn chat(&self, model: &str, messages: Vec<ChatMessage>) -> Result<LLMResponse, LlmError> {
        let api_key = configured_key(&self.config).ok_or_else(|| LlmError::MissingApiKey("Gemini".to_string()))?;

        let request = self.build_request(messages);

        debug!("Sending request to Gemini API ({})", model);

        let response = self
            .client
            .post(self.url(model))
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                provider: "Gemini".to_string(),
                status,
                body,
            });
        }

        let gemini_response: GeminiResponse = response.json().await?;

        let content = gemini_response
            .candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| LlmError::EmptyResponse("Gemini".to_string()))?;

        Ok(LLMResponse {
            content,
            tokens_used: gemini_response.usage_metadata.map(|u| u.total_token_count),
        })
    }

    fn has_credentials(&self) -> bool {
        configured_key(&self.config).is_some()
    }

    fn provider_type(&self) -> LLMProvider {
        LLMProvider::Gemini
    }
}
