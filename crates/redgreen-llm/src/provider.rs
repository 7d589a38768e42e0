/// Well-known OpenAI-compatible providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Perplexity,
    DeepSeek,
}

impl Provider {
    /// API root for the provider's chat-completions endpoint.
    pub fn base_url(&self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com/v1",
            Provider::Perplexity => "https://api.perplexity.ai",
            Provider::DeepSeek => "https://api.deepseek.com/v1",
        }
    }

    /// Conventional environment variable holding the provider's API key.
    pub fn env_key(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::Perplexity => "PERPLEXITY_API_KEY",
            Provider::DeepSeek => "DEEPSEEK_API_KEY",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::OpenAi => write!(f, "openai"),
            Provider::Perplexity => write!(f, "perplexity"),
            Provider::DeepSeek => write!(f, "deepseek"),
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "perplexity" => Ok(Provider::Perplexity),
            "deepseek" => Ok(Provider::DeepSeek),
            _ => Err(format!(
                "unknown provider: '{}' (supported: openai, perplexity, deepseek)",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parses_known_providers() {
        assert_eq!(Provider::from_str("openai").unwrap(), Provider::OpenAi);
        assert_eq!(Provider::from_str("DeepSeek").unwrap(), Provider::DeepSeek);
        assert!(Provider::from_str("mystery").is_err());
    }

    #[test]
    fn base_urls_and_env_keys() {
        assert_eq!(Provider::OpenAi.base_url(), "https://api.openai.com/v1");
        assert_eq!(Provider::Perplexity.env_key(), "PERPLEXITY_API_KEY");
    }
}
