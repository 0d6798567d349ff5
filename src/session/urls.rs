/// Podio API 基础 URL
pub const DEFAULT_API_URL: &str = "https://api.podio.com";

/// 认证相关 URL
pub fn url_oauth_token(api_url: &str) -> String {
    format!("{}/oauth/token", api_url.trim_end_matches('/'))
}

/// 应用详情 URL
pub fn url_app(api_url: &str, app_id: i64) -> String {
    format!("{}/app/{}", api_url.trim_end_matches('/'), app_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_ignore_trailing_slash() {
        assert_eq!(
            url_oauth_token("https://api.podio.com/"),
            "https://api.podio.com/oauth/token"
        );
        assert_eq!(url_app(DEFAULT_API_URL, 42), "https://api.podio.com/app/42");
    }
}
