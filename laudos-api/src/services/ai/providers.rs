//! HTTP clients for the hosted providers
//!
//! OpenAI and OpenRouter share the chat-completions wire format and bearer
//! auth. Anthropic uses the messages API with `x-api-key`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{AiError, AiProvider, TextGenerator, DEFAULT_TEMPERATURE};

const USER_AGENT: &str = concat!("laudos-api/", env!("CARGO_PKG_VERSION"));
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
    temperature: f32,
}

impl<'a> GenerationRequest<'a> {
    fn single_prompt(model: &'a str, prompt: &'a str, max_tokens: u32) -> Self {
        Self {
            model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

/// First choice's message text from a chat-completions body
pub fn parse_chat_completion(body: &Value) -> Result<String, AiError> {
    let response: ChatCompletionResponse =
        serde_json::from_value(body.clone()).map_err(|e| AiError::ParseError(e.to_string()))?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(AiError::EmptyResponse)
}

/// First content block's text from a messages body
pub fn parse_messages(body: &Value) -> Result<String, AiError> {
    let response: MessagesResponse =
        serde_json::from_value(body.clone()).map_err(|e| AiError::ParseError(e.to_string()))?;

    response
        .content
        .into_iter()
        .next()
        .and_then(|block| block.text)
        .ok_or(AiError::EmptyResponse)
}

fn http_client(timeout: Duration) -> Result<reqwest::Client, AiError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| AiError::NetworkError(e.to_string()))
}

async fn read_json(response: reqwest::Response) -> Result<Value, AiError> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(AiError::ApiError(status.as_u16(), error_text));
    }

    response
        .json()
        .await
        .map_err(|e| AiError::ParseError(e.to_string()))
}

// ========================================
// OpenAI / OpenRouter
// ========================================

/// Chat-completions client (OpenAI, OpenRouter)
pub struct ChatCompletionsClient {
    http_client: reqwest::Client,
    provider: AiProvider,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl ChatCompletionsClient {
    pub fn new(
        provider: AiProvider,
        api_key: String,
        model: String,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self, AiError> {
        Ok(Self {
            http_client: http_client(timeout)?,
            provider,
            endpoint: provider.endpoint().to_string(),
            api_key,
            model,
            max_tokens,
        })
    }

    /// Point the client at another base URL (self-hosted gateways, tests)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl TextGenerator for ChatCompletionsClient {
    fn provider(&self) -> AiProvider {
        self.provider
    }

    async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        let request = GenerationRequest::single_prompt(&self.model, prompt, self.max_tokens);

        tracing::debug!(
            provider = %self.provider,
            model = %self.model,
            prompt_chars = prompt.chars().count(),
            "Requesting chat completion"
        );

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AiError::NetworkError(e.to_string()))?;

        let body = read_json(response).await?;
        parse_chat_completion(&body)
    }
}

// ========================================
// Anthropic
// ========================================

/// Anthropic messages client
pub struct AnthropicClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn new(api_key: String, model: String, max_tokens: u32, timeout: Duration) -> Result<Self, AiError> {
        Ok(Self {
            http_client: http_client(timeout)?,
            endpoint: AiProvider::Anthropic.endpoint().to_string(),
            api_key,
            model,
            max_tokens,
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl TextGenerator for AnthropicClient {
    fn provider(&self) -> AiProvider {
        AiProvider::Anthropic
    }

    async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        let request = GenerationRequest::single_prompt(&self.model, prompt, self.max_tokens);

        tracing::debug!(
            model = %self.model,
            prompt_chars = prompt.chars().count(),
            "Requesting Anthropic message"
        );

        let response = self
            .http_client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| AiError::NetworkError(e.to_string()))?;

        let body = read_json(response).await?;
        parse_messages(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, routing::post, Json, Router};
    use serde_json::json;

    /// Serve `router` on an ephemeral local port, return its base URL
    async fn spawn_stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_parse_chat_completion() {
        let body = json!({"choices": [{"message": {"role": "assistant", "content": "Laudo pronto"}}]});
        assert_eq!(parse_chat_completion(&body).unwrap(), "Laudo pronto");

        assert!(matches!(
            parse_chat_completion(&json!({"choices": []})),
            Err(AiError::EmptyResponse)
        ));
        assert!(matches!(
            parse_chat_completion(&json!({"choices": "nope"})),
            Err(AiError::ParseError(_))
        ));
    }

    #[test]
    fn test_parse_messages() {
        let body = json!({"content": [{"type": "text", "text": "Laudo pronto"}]});
        assert_eq!(parse_messages(&body).unwrap(), "Laudo pronto");
        assert!(matches!(parse_messages(&json!({})), Err(AiError::EmptyResponse)));
    }

    #[test]
    fn test_request_shape() {
        let request = GenerationRequest::single_prompt("gpt-3.5-turbo", "olá", 1000);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["model"], "gpt-3.5-turbo");
        assert_eq!(value["messages"], json!([{"role": "user", "content": "olá"}]));
        assert_eq!(value["max_tokens"], 1000);
        assert!((value["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_chat_client_sends_bearer_and_parses() {
        let router = Router::new().route(
            "/chat/completions",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                let echoed = body["messages"][0]["content"].as_str().unwrap_or_default().to_string();
                Json(json!({"choices": [{"message": {"content": format!("{}|{}", auth, echoed)}}]}))
            }),
        );
        let base = spawn_stub(router).await;

        let client = ChatCompletionsClient::new(
            AiProvider::OpenRouter,
            "sk-test".into(),
            "model".into(),
            100,
            Duration::from_secs(5),
        )
        .unwrap()
        .with_endpoint(format!("{}/chat/completions", base));

        let text = client.generate("exame normal").await.unwrap();
        assert_eq!(text, "Bearer sk-test|exame normal");
    }

    #[tokio::test]
    async fn test_anthropic_client_headers() {
        let router = Router::new().route(
            "/messages",
            post(|headers: HeaderMap| async move {
                let key = headers.get("x-api-key").and_then(|v| v.to_str().ok()).unwrap_or_default();
                let version = headers
                    .get("anthropic-version")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default();
                Json(json!({"content": [{"text": format!("{}|{}", key, version)}]}))
            }),
        );
        let base = spawn_stub(router).await;

        let client = AnthropicClient::new("ak".into(), "claude".into(), 100, Duration::from_secs(5))
            .unwrap()
            .with_endpoint(format!("{}/messages", base));

        assert_eq!(client.generate("x").await.unwrap(), format!("ak|{}", ANTHROPIC_VERSION));
    }

    #[tokio::test]
    async fn test_non_success_status_is_api_error() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async { (axum::http::StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let base = spawn_stub(router).await;

        let client = ChatCompletionsClient::new(
            AiProvider::OpenAi,
            "sk".into(),
            "m".into(),
            10,
            Duration::from_secs(5),
        )
        .unwrap()
        .with_endpoint(format!("{}/chat/completions", base));

        match client.generate("x").await {
            Err(AiError::ApiError(status, text)) => {
                assert_eq!(status, 429);
                assert_eq!(text, "slow down");
            }
            other => panic!("expected ApiError, got {:?}", other),
        }
    }
}
