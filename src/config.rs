use crate::http::{DEFAULT_USER_AGENT, PUBLIC_API_URL, PUBLIC_DOWNLOAD_URL, PUBLIC_UPLOAD_URL};
use std::env;

/// Runtime configuration for the GitHub API client.
/// Values are sourced from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Empty means anonymous calls.
    pub access_token: String,
    pub api_url: String,
    pub upload_url: String,
    pub download_url: String,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            api_url: PUBLIC_API_URL.to_string(),
            upload_url: PUBLIC_UPLOAD_URL.to_string(),
            download_url: PUBLIC_DOWNLOAD_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment.
    ///
    /// Env vars:
    /// - GITHUB_TOKEN (or GH_TOKEN) [optional]
    /// - GITHUB_API_URL (default: https://api.github.com)
    /// - GITHUB_UPLOAD_URL (default: https://uploads.github.com)
    /// - GITHUB_DOWNLOAD_URL (default: https://github.com)
    /// - GITHUB_USER_AGENT (default: github-rest/<version>)
    ///
    /// URLs are validated when the client is built from this config.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let access_token = env::var("GITHUB_TOKEN")
            .or_else(|_| env::var("GH_TOKEN"))
            .unwrap_or_default();

        Self {
            access_token,
            api_url: env::var("GITHUB_API_URL").unwrap_or(defaults.api_url),
            upload_url: env::var("GITHUB_UPLOAD_URL").unwrap_or(defaults.upload_url),
            download_url: env::var("GITHUB_DOWNLOAD_URL").unwrap_or(defaults.download_url),
            user_agent: env::var("GITHUB_USER_AGENT").unwrap_or(defaults.user_agent),
        }
    }
}
