// src/config/mod.rs
// Relay configuration, resolved from the environment (.env supported)

use std::str::FromStr;

/// Default reasoning model id
pub const DEFAULT_REASONING_MODEL: &str = "deepseek-reasoner";

/// Default synthesis model id
pub const DEFAULT_SYNTHESIS_MODEL: &str = "claude-3-5-sonnet-20241022";

#[derive(Debug, Clone)]
pub struct RelayConfig {
    // ── Reasoning provider
    /// Selector, validated when the pipeline is built (`deepseek` | `gemini`)
    pub reasoning_provider: String,
    pub reasoning_api_key: String,
    /// Overrides the provider's default chat-completions URL
    pub reasoning_api_url: Option<String>,
    pub reasoning_model: String,
    /// Upstream separates reasoning natively (`reasoning_content`) instead of
    /// wrapping it in `<think>` tags
    pub origin_reasoning: bool,

    // ── Synthesis provider
    /// Selector, validated when the pipeline is built (`anthropic` | `openrouter` | `oneapi`)
    pub claude_provider: String,
    pub claude_api_key: String,
    pub claude_api_url: Option<String>,
    pub claude_model: String,

    // ── Server
    /// Bearer key callers must present; empty disables the check
    pub allow_api_key: String,
    pub allow_origins: Vec<String>,
    pub host: String,
    pub port: u16,

    // ── Logging
    pub log_level: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl RelayConfig {
    /// Load from process environment. Call `dotenvy::dotenv()` first to pick up `.env`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (environment, test fixtures, ...)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            reasoning_provider: get("REASONING_PROVIDER").unwrap_or_else(|| "deepseek".to_string()),
            reasoning_api_key: get("DEEPSEEK_API_KEY").unwrap_or_default(),
            reasoning_api_url: get("DEEPSEEK_API_URL"),
            reasoning_model: get("DEEPSEEK_MODEL").unwrap_or_else(|| DEFAULT_REASONING_MODEL.to_string()),
            origin_reasoning: get("IS_ORIGIN_REASONING")
                .map(|v| parse_bool("IS_ORIGIN_REASONING", &v, true))
                .unwrap_or(true),

            claude_provider: get("CLAUDE_PROVIDER").unwrap_or_else(|| "anthropic".to_string()),
            claude_api_key: get("CLAUDE_API_KEY").unwrap_or_default(),
            claude_api_url: get("CLAUDE_API_URL"),
            claude_model: get("CLAUDE_MODEL").unwrap_or_else(|| DEFAULT_SYNTHESIS_MODEL.to_string()),

            allow_api_key: get("ALLOW_API_KEY").unwrap_or_default(),
            allow_origins: get("ALLOW_ORIGINS")
                .map(|v| split_list(&v))
                .unwrap_or_else(|| vec!["*".to_string()]),
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or("PORT", get("PORT"), 8000),

            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        }
    }

    /// Address the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether callers must authenticate
    pub fn requires_api_key(&self) -> bool {
        !self.allow_api_key.is_empty()
    }
}

/// Drop a trailing `# comment` from a typed value. Strings (keys, URLs)
/// are kept whole since `#` is legal in them.
fn strip_comment(val: &str) -> &str {
    val.split('#').next().unwrap_or("").trim()
}

fn parse_or<T>(key: &str, value: Option<String>, default: T) -> T
where
    T: FromStr,
{
    match value {
        Some(val) => match strip_comment(&val).parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                // Logging isn't initialised yet (the level itself comes from here)
                eprintln!("Config: {} = '{}' (parse failed, using default)", key, val);
                default
            }
        },
        None => default,
    }
}

fn parse_bool(key: &str, val: &str, default: bool) -> bool {
    match strip_comment(val).to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        _ => {
            eprintln!("Config: {} = '{}' (not a boolean, using default)", key, val);
            default
        }
    }
}

fn split_list(val: &str) -> Vec<String> {
    val.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
