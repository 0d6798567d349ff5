pub mod dto;
pub mod error;
pub mod oauth_session;
pub mod podio_session;
pub mod urls;

pub use error::FetchError;
pub use oauth_session::OAuthSession;
pub use podio_session::{AppAccess, PodioCredentials, PodioSession, SchemaSource};
pub use urls::*;
