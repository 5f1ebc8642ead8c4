use serde::{Deserialize, Serialize};
use std::{env, fs, path::PathBuf};
use url::Url;

/// Configuration for a synchronization-engine client.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the messaging backend REST API.
    pub api_base: Url,

    /// Path template for the page-scoped stream endpoint, joined against
    /// `api_base` with the page id appended.
    pub stream_path: String,

    /// Path for the outbound send operation, joined against `api_base`.
    pub send_path: String,

    /// Logging level.
    pub log_level: String,
}

impl ClientConfig {
    /// Generates a default configuration.
    ///
    /// # Panics
    /// Never panics; the default base URL is a valid literal.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            api_base: Url::parse("http://localhost:8080/api/").expect("default api_base is a valid URL"),
            stream_path: "stream/pages/".to_string(),
            send_path: "messages/send".to_string(),
            log_level: "info".to_string(),
        }
    }

    /// Loads the configuration from a file, environment variables, or defaults.
    ///
    /// File values win over defaults; environment variables
    /// (`INBOXSYNC_API_BASE`, `INBOXSYNC_LOG_LEVEL`) fill in anything the file
    /// left at its default.
    ///
    /// # Errors
    /// Returns an error when the file cannot be read or parsed, when an
    /// environment override is not a valid URL, or when validation fails.
    pub fn load_config(config_path: Option<PathBuf>) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = Self::with_defaults();

        if let Some(path) = config_path {
            let content = fs::read_to_string(&path)?;
            let file_config: Self = match path.extension().and_then(|ext| ext.to_str()) {
                Some("yaml" | "yml") => serde_yml::from_str(&content)?,
                Some("json") => serde_json::from_str(&content)?,
                _ => {
                    return Err("Unsupported configuration format. Use 'yaml' or 'json'.".into());
                }
            };
            config = file_config;
        }

        if config.api_base == Self::with_defaults().api_base
            && let Ok(base) = env::var("INBOXSYNC_API_BASE")
        {
            config.api_base = Url::parse(&base)
                .map_err(|_| "Invalid INBOXSYNC_API_BASE value: must be a valid URL")?;
        }
        if config.log_level == Self::with_defaults().log_level
            && let Ok(log_level) = env::var("INBOXSYNC_LOG_LEVEL")
        {
            config.log_level = log_level;
        }

        config.validate().map_err(|errors| errors.join("; "))?;

        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    /// Returns every validation failure, not just the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !matches!(self.api_base.scheme(), "http" | "https") {
            errors.push(format!(
                "Invalid api_base scheme '{}': must be http or https.",
                self.api_base.scheme()
            ));
        }
        if self.stream_path.is_empty() {
            errors.push("stream_path must not be empty.".to_string());
        }
        if self.send_path.is_empty() {
            errors.push("send_path must not be empty.".to_string());
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Resolved stream endpoint URL for a page.
    ///
    /// # Errors
    /// Returns an error when the configured paths do not form a valid URL.
    pub fn stream_url(&self, page_id: &str) -> Result<Url, url::ParseError> {
        self.api_base.join(&format!("{}{page_id}", self.stream_path))
    }

    /// Resolved send endpoint URL.
    ///
    /// # Errors
    /// Returns an error when the configured paths do not form a valid URL.
    pub fn send_url(&self) -> Result<Url, url::ParseError> {
        self.api_base.join(&self.send_path)
    }
}
