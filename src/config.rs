use serde::{Deserialize, Serialize};
use std::env;

const DEFAULT_MODEL_ID: &str = "anthropic.claude-3-haiku-20240307-v1:0";
const DEFAULT_REGION: &str = "us-east-1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub host: String,
    pub port: u16,

    // Model configuration
    pub model_id: String,
    pub region: String,
    pub endpoint: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    // Inference parameters sent with every request
    pub max_tokens: u32,
    pub temperature: f32,

    // CORS
    pub allowed_origin: String,
}

impl Config {
    /// Read configuration from the environment once at startup. The value
    /// is immutable afterwards; handlers receive it through `AppState`.
    pub fn from_env() -> anyhow::Result<Self> {
        let region = env::var("AWS_REGION").unwrap_or_else(|_| DEFAULT_REGION.to_string());
        let endpoint = env::var("BEDROCK_ENDPOINT")
            .unwrap_or_else(|_| format!("https://bedrock-runtime.{region}.amazonaws.com"));

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,

            model_id: env::var("BEDROCK_MODEL_ID")
                .unwrap_or_else(|_| DEFAULT_MODEL_ID.to_string()),
            region,
            endpoint,
            api_key: env::var("AWS_BEARER_TOKEN_BEDROCK").ok(),

            max_tokens: 1000,
            temperature: 0.7,

            allowed_origin: env::var("ALLOWED_ORIGIN").unwrap_or_else(|_| "*".to_string()),
        })
    }
}
