//! Process configuration, read from environment variables at startup.

use serde::{Deserialize, Serialize};

/// Which LLM family the session should be wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    Openai,
    Google,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for the JSON-file store.
    pub state_dir: String,
    /// HTTP bind address for the gateway.
    pub bind_addr: String,
    /// Route prefix for the HTTP API.
    pub api_prefix: String,

    pub llm_provider: LlmProviderKind,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub google_api_key: String,
    pub google_model: String,
    pub deepgram_api_key: String,
    /// Strip markdown (code fences, tables) before TTS so it is not read
    /// aloud.
    pub tts_filter_markdown: bool,

    pub sqs_completion_queue_url: String,
    pub aws_region: String,

    /// Allowed CORS origins. `localhost:*` matches any localhost port.
    pub cors_origins: Vec<String>,
    /// Quiet window for the artifact debounce pipelines.
    pub debounce_quiet_secs: u64,
    /// Deployment tag (local, staging, prod) carried into logs.
    pub environment: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_dir: "./data".into(),
            bind_addr: "0.0.0.0:8080".into(),
            api_prefix: "/interview/api/v1".into(),
            llm_provider: LlmProviderKind::Google,
            openai_api_key: String::new(),
            openai_base_url: "https://api.openai.com/v1".into(),
            openai_model: "gpt-4o-mini".into(),
            google_api_key: String::new(),
            google_model: "gemini-2.5-flash".into(),
            deepgram_api_key: String::new(),
            tts_filter_markdown: true,
            sqs_completion_queue_url: String::new(),
            aws_region: "ap-south-1".into(),
            cors_origins: vec!["localhost:*".into()],
            debounce_quiet_secs: 30,
            environment: "local".into(),
        }
    }
}

impl Config {
    /// Read the configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Config::default();
        let get = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());

        Self {
            state_dir: get("VIVA_STATE_DIR").unwrap_or(defaults.state_dir),
            bind_addr: get("VIVA_BIND_ADDR").unwrap_or(defaults.bind_addr),
            api_prefix: get("VIVA_API_PREFIX").unwrap_or(defaults.api_prefix),
            llm_provider: match get("LLM_PROVIDER").as_deref() {
                Some("openai") => LlmProviderKind::Openai,
                Some("google") | None => LlmProviderKind::Google,
                Some(other) => {
                    tracing::warn!(provider = other, "unknown LLM_PROVIDER, using google");
                    LlmProviderKind::Google
                }
            },
            openai_api_key: get("OPENAI_API_KEY").unwrap_or_default(),
            openai_base_url: get("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            openai_model: get("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            google_api_key: get("GOOGLE_API_KEY").unwrap_or_default(),
            google_model: get("GOOGLE_MODEL").unwrap_or(defaults.google_model),
            deepgram_api_key: get("DEEPGRAM_API_KEY").unwrap_or_default(),
            tts_filter_markdown: get("TTS_FILTER_MARKDOWN")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(defaults.tts_filter_markdown),
            sqs_completion_queue_url: get("SQS_COMPLETION_QUEUE_URL").unwrap_or_default(),
            aws_region: get("AWS_REGION").unwrap_or(defaults.aws_region),
            cors_origins: get("CORS_ORIGINS")
                .map(|raw| parse_origins(&raw))
                .unwrap_or(defaults.cors_origins),
            debounce_quiet_secs: get("DEBOUNCE_QUIET_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.debounce_quiet_secs),
            environment: get("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    /// Whether an `Origin` header value is allowed by the configured list.
    ///
    /// Supports exact origins, `localhost:*` / `127.0.0.1:*` wildcards, and
    /// generic `*` patterns.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if origin.is_empty() {
            return false;
        }
        for allowed in &self.cors_origins {
            if allowed == origin {
                return true;
            }
            let pattern = match allowed.as_str() {
                "localhost:*" => r"^https?://localhost(:\d+)?/?$".to_string(),
                "127.0.0.1:*" => r"^https?://127\.0\.0\.1(:\d+)?/?$".to_string(),
                other if other.contains('*') => {
                    format!("^{}$", regex::escape(other).replace(r"\*", ".*"))
                }
                _ => continue,
            };
            if regex::Regex::new(&pattern)
                .map(|re| re.is_match(origin))
                .unwrap_or(false)
            {
                return true;
            }
        }
        false
    }
}

/// Parse CORS origins given as a JSON array or a comma-separated string.
fn parse_origins(raw: &str) -> Vec<String> {
    if let Ok(serde_json::Value::Array(items)) = serde_json::from_str(raw) {
        return items
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_owned))
            .collect();
    }
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_from_json_array() {
        let origins = parse_origins(r#"["https://a.example","https://b.example"]"#);
        assert_eq!(origins, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn origins_from_comma_separated() {
        let origins = parse_origins("https://a.example, localhost:*");
        assert_eq!(origins, vec!["https://a.example", "localhost:*"]);
    }

    #[test]
    fn localhost_wildcard_matches_any_port() {
        let config = Config {
            cors_origins: vec!["localhost:*".into()],
            ..Config::default()
        };
        assert!(config.is_origin_allowed("http://localhost:3000"));
        assert!(config.is_origin_allowed("https://localhost"));
        assert!(!config.is_origin_allowed("http://localhost.evil.example"));
        assert!(!config.is_origin_allowed("http://127.0.0.1:3000"));
    }

    #[test]
    fn exact_origin_match() {
        let config = Config {
            cors_origins: vec!["https://app.example".into()],
            ..Config::default()
        };
        assert!(config.is_origin_allowed("https://app.example"));
        assert!(!config.is_origin_allowed("https://other.example"));
    }

    #[test]
    fn generic_wildcard_pattern() {
        let config = Config {
            cors_origins: vec!["https://*.example.com".into()],
            ..Config::default()
        };
        assert!(config.is_origin_allowed("https://app.example.com"));
        assert!(!config.is_origin_allowed("https://example.org"));
    }

    #[test]
    fn empty_origin_rejected() {
        assert!(!Config::default().is_origin_allowed(""));
    }
}
