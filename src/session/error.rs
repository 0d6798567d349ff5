use crate::schema::SchemaError;

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("missing env {0}")]
    MissingEnv(&'static str),
    #[error("invalid app id '{0}'")]
    InvalidAppId(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("unexpected status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Http(e.to_string())
    }
}
