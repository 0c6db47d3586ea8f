use crate::config::{ChatSettings, Config};
use crate::error::{LlmError, Result};
use crate::message::Message;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Request to send to a chat-completion endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    pub fn with_settings(self, settings: &ChatSettings) -> Self {
        self.with_temperature(settings.temperature)
            .with_max_tokens(settings.max_tokens)
    }
}

/// Anything that can turn a chat request into the assistant's reply text
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    error: ProviderErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorDetail {
    message: String,
}

/// HTTP client for OpenAI-compatible chat and image endpoints
#[derive(Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    /// No timeout is configured; requests wait on the transport defaults.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config
            .get_api_key()
            .ok_or_else(|| LlmError::input("No API key configured. Please add an API key first."))?;
        Ok(Self::new(config.base_url.clone(), api_key))
    }

    pub(crate) async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::RemoteService {
                status: status.as_u16(),
                message: provider_message(&error_text),
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| LlmError::MalformedResponse(e.to_string()))
    }

    /// Download a referenced resource (generated images) over plain HTTP
    pub(crate) async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::RemoteService {
                status: status.as_u16(),
                message: provider_message(&error_text),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// Prefer the provider's `error.message`, otherwise keep the raw body
fn provider_message(body: &str) -> String {
    serde_json::from_str::<ProviderErrorBody>(body)
        .map(|parsed| parsed.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

#[async_trait]
impl ChatBackend for OpenAiClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "sending chat completion"
        );

        let response: ChatCompletionResponse = self.post_json("chat/completions", request).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::MalformedResponse("response contained no message content".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn complete_posts_messages_and_reads_first_choice() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .header("authorization", "Bearer sk-test")
                    .json_body(json!({
                        "model": "gpt-3.5-turbo",
                        "messages": [
                            {"role": "system", "content": "be brief"},
                            {"role": "user", "content": "What is 2+2?"}
                        ],
                        "temperature": 0.5,
                        "max_tokens": 1000
                    }));
                then.status(200).json_body(json!({
                    "id": "chatcmpl-1",
                    "choices": [{"index": 0, "message": {"role": "assistant", "content": "4"}}]
                }));
            })
            .await;

        let client = OpenAiClient::new(server.base_url(), "sk-test");
        let request = ChatRequest::new(
            "gpt-3.5-turbo",
            vec![Message::system("be brief"), Message::user("What is 2+2?")],
        )
        .with_temperature(0.5)
        .with_max_tokens(1000);

        let reply = client.complete(&request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(reply, "4");
    }

    #[tokio::test]
    async fn provider_error_message_is_surfaced_verbatim() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(401).json_body(json!({
                    "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
                }));
            })
            .await;

        let client = OpenAiClient::new(server.base_url(), "bad");
        let err = client
            .complete(&ChatRequest::new("gpt-4", vec![Message::user("hi")]))
            .await
            .unwrap_err();

        match err {
            LlmError::RemoteService { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Incorrect API key provided");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn plain_text_error_body_is_kept() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(503).body("upstream unavailable");
            })
            .await;

        let client = OpenAiClient::new(server.base_url(), "k");
        let err = client
            .complete(&ChatRequest::new("gpt-4", vec![Message::user("hi")]))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "API error (503): upstream unavailable");
    }

    #[tokio::test]
    async fn empty_choices_is_malformed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(json!({"choices": []}));
            })
            .await;

        let client = OpenAiClient::new(server.base_url(), "k");
        let err = client
            .complete(&ChatRequest::new("gpt-4", vec![Message::user("hi")]))
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let client = OpenAiClient::new("http://127.0.0.1:1", "k");
        let err = client
            .complete(&ChatRequest::new("gpt-4", vec![Message::user("hi")]))
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::Transport(_)));
    }

    #[tokio::test]
    async fn non_json_success_body_is_malformed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).body("<html>gateway</html>");
            })
            .await;

        let client = OpenAiClient::new(server.base_url(), "k");
        let err = client
            .complete(&ChatRequest::new("gpt-4", vec![Message::user("hi")]))
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::MalformedResponse(_)));
    }

    #[test]
    fn missing_api_key_is_an_input_error() {
        let mut config = Config::default();
        config.api_key = Some("   ".to_string());
        // Only meaningful when the environment does not provide a key either
        if std::env::var(crate::config::API_KEY_ENV).is_err() {
            assert!(matches!(
                OpenAiClient::from_config(&config),
                Err(LlmError::Input(_))
            ));
        }
    }
}
