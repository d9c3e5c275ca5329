pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8001";

/// Where the income API lives. Set `INCOME_API_BASE_URL` at build time to
/// point a release build somewhere other than the local dev server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(option_env!("INCOME_API_BASE_URL").unwrap_or(DEFAULT_API_BASE_URL))
    }
}
