//! Provider configuration
//!
//! Settings come from three places, highest precedence first: command-line
//! flags (which also read `RUNSCOPE_ACCESS_TOKEN` / `RUNSCOPE_API_URL`),
//! the `[provider]` table of the declaration file, then built-in defaults.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

pub const ACCESS_TOKEN_ENV: &str = "RUNSCOPE_ACCESS_TOKEN";
pub const API_URL_ENV: &str = "RUNSCOPE_API_URL";

/// `[provider]` table of the declaration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

/// Fully resolved settings used to build a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub access_token: String,
    pub api_url: String,
}

impl ProviderConfig {
    /// Layer `overrides` (flags and environment) on top of this file config
    pub fn resolve(&self, overrides: &Self) -> Result<ProviderSettings> {
        let access_token = pick(&overrides.access_token, &self.access_token);
        let Some(access_token) = access_token else {
            bail!(
                "no access token: set {ACCESS_TOKEN_ENV}, pass --access-token, \
                 or add access_token to [provider]"
            );
        };

        let api_url = pick(&overrides.api_url, &self.api_url)
            .unwrap_or_else(|| runscope::DEFAULT_API_URL.to_string());

        Ok(ProviderSettings {
            access_token,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }
}

/// First non-empty value
fn pick(first: &Option<String>, second: &Option<String>) -> Option<String> {
    [first, second]
        .into_iter()
        .flatten()
        .find(|s| !s.trim().is_empty())
        .cloned()
}

impl ProviderSettings {
    pub fn client(&self) -> runscope::Client {
        log::debug!("Using Runscope API at {}", self.api_url);
        runscope::Client::new(&self.api_url, &self.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(token: Option<&str>, url: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            access_token: token.map(String::from),
            api_url: url.map(String::from),
        }
    }

    #[test]
    fn test_flags_win_over_file() {
        let file = config(Some("file-token"), Some("https://file.example.com"));
        let flags = config(Some("flag-token"), None);

        let settings = file.resolve(&flags).unwrap();
        assert_eq!(settings.access_token, "flag-token");
        assert_eq!(settings.api_url, "https://file.example.com");
    }

    #[test]
    fn test_default_api_url() {
        let settings = config(Some("t"), None)
            .resolve(&ProviderConfig::default())
            .unwrap();
        assert_eq!(settings.api_url, runscope::DEFAULT_API_URL);
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let settings = config(Some("t"), Some("http://localhost:8080/"))
            .resolve(&ProviderConfig::default())
            .unwrap();
        assert_eq!(settings.api_url, "http://localhost:8080");
    }

    #[test]
    fn test_missing_token() {
        let err = config(None, None)
            .resolve(&config(Some("  "), None))
            .unwrap_err();
        assert!(err.to_string().contains(ACCESS_TOKEN_ENV));
    }

    #[test]
    fn test_parse_provider_table() {
        let parsed: ProviderConfig = toml::from_str("api_url = \"https://x\"").unwrap();
        assert_eq!(parsed, config(None, Some("https://x")));
        assert!(toml::from_str::<ProviderConfig>("region = \"eu\"").is_err());
    }
}
