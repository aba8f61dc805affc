//! Bedrock runtime model client.
//!
//! Anthropic model ids go through the native messages API, everything else
//! through the Converse API. The rest of the crate only sees the
//! `ModelClient` trait, so swapping providers is a config change.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::types::ModelError;

const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";
const NO_RESPONSE: &str = "No response generated";

#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Ask `model_id` to answer `prompt` in a single turn.
    async fn invoke(&self, model_id: &str, prompt: &str) -> Result<String, ModelError>;
}

pub struct BedrockClient {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
    max_tokens: u32,
    temperature: f32,
}

impl BedrockClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: Client::new(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    async fn invoke_messages(&self, model_id: &str, prompt: &str) -> Result<String, ModelError> {
        let body = MessagesRequest {
            anthropic_version: ANTHROPIC_VERSION,
            max_tokens: self.max_tokens,
            messages: vec![PromptMessage {
                role: "user",
                content: prompt,
            }],
        };

        let url = format!("{}/model/{}/invoke", self.endpoint, model_id);
        let response: MessagesResponse = self.post_json(&url, &body).await?;
        Ok(response.text())
    }

    async fn converse(&self, model_id: &str, prompt: &str) -> Result<String, ModelError> {
        let body = ConverseRequest {
            messages: vec![ConverseMessage {
                role: "user",
                content: vec![TextBlock { text: prompt }],
            }],
            inference_config: InferenceConfig {
                max_tokens: self.max_tokens,
                temperature: self.temperature,
            },
        };

        let url = format!("{}/model/{}/converse", self.endpoint, model_id);
        let response: ConverseResponse = self.post_json(&url, &body).await?;
        Ok(response.text())
    }

    async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R, ModelError>
    where
        B: Serialize + Sync,
        R: for<'de> Deserialize<'de>,
    {
        let mut request = self.http.post(url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ModelError::Unknown(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_type = amzn_error_type(response.headers());
            let detail = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &error_type, &detail));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| ModelError::Unknown(format!("malformed response body: {e}")))
    }
}

#[async_trait]
impl ModelClient for BedrockClient {
    async fn invoke(&self, model_id: &str, prompt: &str) -> Result<String, ModelError> {
        if model_id.to_lowercase().contains("anthropic") {
            self.invoke_messages(model_id, prompt).await
        } else {
            self.converse(model_id, prompt).await
        }
    }
}

/// Bedrock reports the exception class in `x-amzn-errortype`, sometimes
/// suffixed with a URI after a colon.
fn amzn_error_type(headers: &reqwest::header::HeaderMap) -> String {
    headers
        .get("x-amzn-errortype")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(':').next())
        .unwrap_or_default()
        .to_string()
}

fn classify_failure(status: StatusCode, error_type: &str, detail: &str) -> ModelError {
    let detail = format!("{status} {error_type}: {detail}");
    if status == StatusCode::FORBIDDEN || error_type == "AccessDeniedException" {
        ModelError::AccessDenied(detail)
    } else if status == StatusCode::NOT_FOUND || error_type == "ResourceNotFoundException" {
        ModelError::ResourceNotFound(detail)
    } else if status == StatusCode::TOO_MANY_REQUESTS || error_type == "ThrottlingException" {
        ModelError::Throttled(detail)
    } else {
        ModelError::Unknown(detail)
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    anthropic_version: &'static str,
    max_tokens: u32,
    messages: Vec<PromptMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct PromptMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

impl MessagesResponse {
    fn text(&self) -> String {
        match self.content.first() {
            Some(block) if !block.text.is_empty() => block.text.clone(),
            _ => NO_RESPONSE.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ConverseRequest<'a> {
    messages: Vec<ConverseMessage<'a>>,
    #[serde(rename = "inferenceConfig")]
    inference_config: InferenceConfig,
}

#[derive(Debug, Serialize)]
struct ConverseMessage<'a> {
    role: &'static str,
    content: Vec<TextBlock<'a>>,
}

#[derive(Debug, Serialize)]
struct TextBlock<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct InferenceConfig {
    #[serde(rename = "maxTokens")]
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ConverseResponse {
    output: Option<ConverseOutput>,
}

#[derive(Debug, Deserialize)]
struct ConverseOutput {
    message: Option<ConverseOutputMessage>,
}

#[derive(Debug, Deserialize)]
struct ConverseOutputMessage {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

impl ConverseResponse {
    fn text(&self) -> String {
        self.output
            .as_ref()
            .and_then(|o| o.message.as_ref())
            .and_then(|m| m.content.first())
            .filter(|block| !block.text.is_empty())
            .map(|block| block.text.clone())
            .unwrap_or_else(|| NO_RESPONSE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_status_code() {
        assert!(matches!(
            classify_failure(StatusCode::FORBIDDEN, "", ""),
            ModelError::AccessDenied(_)
        ));
        assert!(matches!(
            classify_failure(StatusCode::NOT_FOUND, "", ""),
            ModelError::ResourceNotFound(_)
        ));
        assert!(matches!(
            classify_failure(StatusCode::TOO_MANY_REQUESTS, "", ""),
            ModelError::Throttled(_)
        ));
        assert!(matches!(
            classify_failure(StatusCode::INTERNAL_SERVER_ERROR, "", ""),
            ModelError::Unknown(_)
        ));
    }

    #[test]
    fn classifies_by_errortype_when_status_is_generic() {
        // Bedrock throttling can arrive as a 400 with ThrottlingException.
        assert!(matches!(
            classify_failure(StatusCode::BAD_REQUEST, "ThrottlingException", ""),
            ModelError::Throttled(_)
        ));
        assert!(matches!(
            classify_failure(StatusCode::BAD_REQUEST, "AccessDeniedException", ""),
            ModelError::AccessDenied(_)
        ));
        assert!(matches!(
            classify_failure(StatusCode::BAD_REQUEST, "ResourceNotFoundException", ""),
            ModelError::ResourceNotFound(_)
        ));
    }

    #[test]
    fn classification_detail_keeps_server_context() {
        let err = classify_failure(StatusCode::FORBIDDEN, "AccessDeniedException", "no policy");
        let ModelError::AccessDenied(detail) = err else {
            panic!("wrong kind");
        };
        assert!(detail.contains("AccessDeniedException"));
        assert!(detail.contains("no policy"));
    }

    #[test]
    fn extracts_messages_api_text() {
        let body: MessagesResponse = serde_json::from_str(
            r#"{"content":[{"type":"text","text":"Hello from Haiku"}],"stop_reason":"end_turn"}"#,
        )
        .unwrap();
        assert_eq!(body.text(), "Hello from Haiku");
    }

    #[test]
    fn extracts_converse_api_text() {
        let body: ConverseResponse = serde_json::from_str(
            r#"{"output":{"message":{"role":"assistant","content":[{"text":"Hello from Nova"}]}}}"#,
        )
        .unwrap();
        assert_eq!(body.text(), "Hello from Nova");
    }

    #[test]
    fn empty_responses_fall_back_to_placeholder() {
        let messages: MessagesResponse = serde_json::from_str(r#"{"content":[]}"#).unwrap();
        assert_eq!(messages.text(), NO_RESPONSE);

        let converse: ConverseResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(converse.text(), NO_RESPONSE);
    }
}
