use async_trait::async_trait;
use log::info;
use reqwest::Client;

use super::error::FetchError;
use super::oauth_session::OAuthSession;
use super::urls::*;
use crate::schema::AppSchema;

/// API 客户端凭据（进程级，来自环境变量）
#[derive(Clone)]
pub struct PodioCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub api_url: String,
}

impl PodioCredentials {
    pub fn from_env() -> Result<Self, FetchError> {
        let client_id = std::env::var("PODIO_CLIENT_ID")
            .map_err(|_| FetchError::MissingEnv("PODIO_CLIENT_ID"))?;
        let client_secret = std::env::var("PODIO_CLIENT_SECRET")
            .map_err(|_| FetchError::MissingEnv("PODIO_CLIENT_SECRET"))?;
        let api_url =
            std::env::var("PODIO_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Ok(Self {
            client_id,
            client_secret,
            api_url,
        })
    }
}

impl std::fmt::Debug for PodioCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<PodioCredentials [{}]>", self.client_id)
    }
}

/// 单个应用的访问凭据：应用 id 与应用令牌
#[derive(Clone, PartialEq, Eq)]
pub struct AppAccess {
    pub app_id: i64,
    pub app_token: String,
}

impl AppAccess {
    pub fn new(app_id: &str, app_token: &str) -> Result<Self, FetchError> {
        let app_id = app_id
            .trim()
            .parse::<i64>()
            .map_err(|_| FetchError::InvalidAppId(app_id.to_string()))?;
        Ok(Self {
            app_id,
            app_token: app_token.trim().to_string(),
        })
    }

    /// 命令行缺省的部分用 `PODIO_APP_ID` / `PODIO_APP_TOKEN` 补齐
    pub fn resolve(app_id: Option<&str>, app_token: Option<&str>) -> Result<Self, FetchError> {
        let id = match app_id {
            Some(s) => s.to_string(),
            None => std::env::var("PODIO_APP_ID")
                .map_err(|_| FetchError::MissingEnv("PODIO_APP_ID"))?,
        };
        let token = match app_token {
            Some(s) => s.to_string(),
            None => std::env::var("PODIO_APP_TOKEN")
                .map_err(|_| FetchError::MissingEnv("PODIO_APP_TOKEN"))?,
        };
        Self::new(&id, &token)
    }
}

impl std::fmt::Debug for AppAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<AppAccess [{}]>", self.app_id)
    }
}

/// 字段结构来源，表单核心只依赖这个接口
#[async_trait]
pub trait SchemaSource: Send + Sync {
    async fn fetch_schema(&self, access: &AppAccess) -> Result<AppSchema, FetchError>;
}

/// Podio 会话
///
/// 每次获取都以应用认证（`grant_type=app`）换取令牌，再读取应用详情。
pub struct PodioSession {
    client: Client,
    credentials: PodioCredentials,
}

impl PodioSession {
    pub fn new(credentials: PodioCredentials) -> Result<Self, FetchError> {
        let client = Client::builder()
            .cookie_store(true)
            .user_agent("rustpodio/0.1")
            .build()?;
        Ok(Self {
            client,
            credentials,
        })
    }

    pub fn from_env() -> Result<Self, FetchError> {
        Self::new(PodioCredentials::from_env()?)
    }

    fn app_grant(&self, access: &AppAccess) -> Vec<(String, String)> {
        vec![
            ("grant_type".to_string(), "app".to_string()),
            ("app_id".to_string(), access.app_id.to_string()),
            ("app_token".to_string(), access.app_token.clone()),
            ("client_id".to_string(), self.credentials.client_id.clone()),
            (
                "client_secret".to_string(),
                self.credentials.client_secret.clone(),
            ),
        ]
    }

    /// 以应用身份认证，返回已持有令牌的会话
    pub async fn app_auth(&self, access: &AppAccess) -> Result<OAuthSession, FetchError> {
        let session = OAuthSession::new(
            self.client.clone(),
            url_oauth_token(&self.credentials.api_url),
            self.app_grant(access),
        );
        session.auth_request().await?;
        Ok(session)
    }

    /// 获取应用详情（原始 JSON）
    pub async fn get_app(&self, access: &AppAccess) -> Result<serde_json::Value, FetchError> {
        let auth = self.app_auth(access).await?;
        let url = url_app(&self.credentials.api_url, access.app_id);
        let app = auth.get_json(&url).await?;
        info!("{} get_app(...) [{}]", self, url);
        Ok(app)
    }
}

#[async_trait]
impl SchemaSource for PodioSession {
    async fn fetch_schema(&self, access: &AppAccess) -> Result<AppSchema, FetchError> {
        let raw = self.get_app(access).await?;
        Ok(AppSchema::from_json(&raw)?)
    }
}

impl std::fmt::Display for PodioSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<PodioSession [{}]>", self.credentials.client_id)
    }
}

impl std::fmt::Debug for PodioSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<PodioSession [{}]>", self.credentials.client_id)
    }
}
