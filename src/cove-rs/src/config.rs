use serde::{Deserialize, Serialize};

/// Connection settings for one server, owned by the caller and passed into
/// [`crate::Client::new`]. There is no process-wide client state.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    pub base_url: String,
    /// Per-request timeout in seconds; 0 disables the timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub insecure_skip_verify: bool,
}

fn default_timeout_secs() -> u64 {
    30
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: default_timeout_secs(),
            insecure_skip_verify: false,
        }
    }

    pub fn load(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: ClientConfig = serde_json::from_str(&contents)?;
        Ok(config)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:5984")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"base_url": "http://db:5984"}"#).unwrap();
        assert_eq!(config.base_url, "http://db:5984");
        assert_eq!(config.timeout_secs, 30);
        assert!(!config.insecure_skip_verify);
    }
}
