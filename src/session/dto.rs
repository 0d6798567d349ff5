use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// 错误响应体，例如 `{"error": "unauthorized", "error_description": "..."}`
#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl ErrorResponse {
    pub fn message(&self) -> String {
        match &self.error_description {
            Some(d) if !d.is_empty() => format!("{}: {}", self.error, d),
            _ => self.error.clone(),
        }
    }
}
