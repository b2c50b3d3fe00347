//! OpenAI Chat Completions adapter. Secondary provider.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::llm_client::{send_json, ProviderConnection};
use crate::providers::{ModelTier, Prompt, ProviderAdapter, ProviderError, ProviderKind, TaskKind};

const OPENAI_API_URL: &str = "https://api.openai.com";
const EXTRACTION_MODEL: &str = "gpt-4o-mini";
const GENERATION_MODEL: &str = "gpt-4o";

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatCompletionMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatCompletionMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

pub struct OpenAiAdapter {
    conn: ProviderConnection,
}

impl OpenAiAdapter {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            conn: ProviderConnection::new(ProviderKind::OpenAi, api_key, timeout, OPENAI_API_URL),
        }
    }

    #[cfg(test)]
    pub fn with_base_url(self, base_url: &str) -> Self {
        Self {
            conn: self.conn.with_base_url(base_url),
        }
    }

    fn model_for(task: TaskKind) -> &'static str {
        match task.tier() {
            ModelTier::Extraction => EXTRACTION_MODEL,
            ModelTier::Generation => GENERATION_MODEL,
        }
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn is_available(&self) -> bool {
        self.conn.is_available()
    }

    async fn invoke(&self, task: TaskKind, prompt: &Prompt) -> Result<String, ProviderError> {
        let (client, api_key) = self.conn.parts()?;
        let body = ChatCompletionRequest {
            model: Self::model_for(task),
            messages: vec![
                ChatCompletionMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatCompletionMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            response_format: task.expects_json().then_some(ResponseFormat {
                format_type: "json_object",
            }),
        };

        let response: ChatCompletionResponse = send_json(
            ProviderKind::OpenAi,
            client
                .post(format!("{}/v1/chat/completions", self.conn.base_url()))
                .bearer_auth(api_key)
                .json(&body),
        )
        .await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| ProviderError::MalformedResponse("No response from OpenAI".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter(server: &MockServer) -> OpenAiAdapter {
        OpenAiAdapter::new(Some("sk-test".to_string()), Duration::from_secs(5))
            .with_base_url(&server.uri())
    }

    #[tokio::test]
    async fn test_parse_requests_json_mode_with_mini_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "response_format": {"type": "json_object"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "{\"ok\": true}"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = adapter(&server)
            .invoke(TaskKind::Parse, &Prompt::new("sys", "resume text"))
            .await
            .unwrap();
        assert_eq!(text, "{\"ok\": true}");
    }

    #[tokio::test]
    async fn test_unauthorized_is_auth_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"message": "Incorrect API key provided"}
            })))
            .mount(&server)
            .await;

        let err = adapter(&server)
            .invoke(TaskKind::Chat, &Prompt::new("sys", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::AuthFailure(_)));
    }

    #[tokio::test]
    async fn test_null_content_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": null}}]
            })))
            .mount(&server)
            .await;

        let err = adapter(&server)
            .invoke(TaskKind::Chat, &Prompt::new("sys", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_non_json_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&server)
            .await;

        let err = adapter(&server)
            .invoke(TaskKind::Chat, &Prompt::new("sys", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }
}
