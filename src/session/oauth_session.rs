use log::{info, warn};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tokio::sync::RwLock;

use super::dto::{ErrorResponse, TokenResponse};
use super::error::FetchError;

/// OAuth 会话
///
/// 持有 HTTP 客户端与一次认证得到的访问令牌。首次请求前自动认证，
/// 之后的请求带上 `Authorization: OAuth2 <token>`。不做重试。
pub struct OAuthSession {
    client: Client,
    token_url: String,
    grant_form: Vec<(String, String)>,
    token: RwLock<Option<String>>,
}

impl OAuthSession {
    /// # 参数
    ///
    /// * `client` - 共享的 HTTP 客户端
    /// * `token_url` - 令牌端点
    /// * `grant_form` - 认证请求的表单字段
    pub fn new(client: Client, token_url: String, grant_form: Vec<(String, String)>) -> Self {
        Self {
            client,
            token_url,
            grant_form,
            token: RwLock::new(None),
        }
    }

    /// 执行认证请求并保存令牌
    pub async fn auth_request(&self) -> Result<String, FetchError> {
        let resp = self
            .client
            .post(&self.token_url)
            .form(&self.grant_form)
            .send()
            .await?;
        let status = resp.status();
        let raw = resp.text().await?;
        let token = parse_token_response(status, &raw)?;

        info!("{} auth_request(...) [{}]", self, status.as_u16());
        *self.token.write().await = Some(token.access_token.clone());
        Ok(token.access_token)
    }

    async fn access_token(&self) -> Result<String, FetchError> {
        if let Some(t) = self.token.read().await.as_ref() {
            return Ok(t.clone());
        }
        self.auth_request().await
    }

    /// 带认证的 GET 请求，返回解析后的 JSON
    pub async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        let token = self.access_token().await?;
        let resp = self
            .client
            .get(url)
            .header("Authorization", format!("OAuth2 {}", token))
            .send()
            .await?;
        let status = resp.status();
        let raw = resp.text().await?;
        if !status.is_success() {
            warn!("{} get_json(...) [{} {}]", self, status.as_u16(), url);
        } else {
            info!("{} get_json(...) [{}]", self, url);
        }
        parse_json_response(status, &raw)
    }
}

fn error_message(raw: &str) -> String {
    serde_json::from_str::<ErrorResponse>(raw)
        .map(|e| e.message())
        .unwrap_or_else(|_| raw.trim().to_string())
}

/// 非 2xx 响应映射为 `FetchError`
pub fn check_status(status: StatusCode, raw: &str) -> Result<(), FetchError> {
    match status {
        s if s.is_success() => Ok(()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(FetchError::Unauthorized(error_message(raw)))
        }
        s => Err(FetchError::Status {
            status: s.as_u16(),
            message: error_message(raw),
        }),
    }
}

pub fn parse_token_response(status: StatusCode, raw: &str) -> Result<TokenResponse, FetchError> {
    // 令牌端点对错误凭据返回 400，同样视为认证失败
    if status == StatusCode::BAD_REQUEST {
        return Err(FetchError::Unauthorized(error_message(raw)));
    }
    check_status(status, raw)?;
    serde_json::from_str(raw)
        .map_err(|e| FetchError::InvalidResponse(format!("token parse failed: {e}")))
}

pub fn parse_json_response(status: StatusCode, raw: &str) -> Result<Value, FetchError> {
    check_status(status, raw)?;
    serde_json::from_str(raw)
        .map_err(|e| FetchError::InvalidResponse(format!("json parse failed: {e}")))
}

impl std::fmt::Display for OAuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<OAuthSession [{}]>", self.token_url)
    }
}

impl std::fmt::Debug for OAuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<OAuthSession [{}]>", self.token_url)
    }
}
