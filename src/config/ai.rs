// src/config/ai.rs
use serde::{Deserialize, Serialize};

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

/// Summary/comment backend settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiSettings {
    /// "openai" enables the backend (case-insensitive); anything else disables it.
    pub provider: String,
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            provider: String::new(),
            api_key: String::new(),
            model: default_model(),
        }
    }
}

impl AiSettings {
    pub fn from_lookup<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = get("LLM_PROVIDER")
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        let api_key = get("OPENAI_API_KEY").unwrap_or_default().trim().to_string();
        let model = get("OPENAI_MODEL")
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(default_model);
        Self {
            provider,
            api_key,
            model,
        }
    }

    /// True when a real backend can be built from these settings.
    pub fn is_enabled(&self) -> bool {
        self.provider == "openai" && !self.api_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn provider_is_normalized_and_key_required() {
        let env: HashMap<&str, &str> = [("LLM_PROVIDER", " OpenAI ")].into_iter().collect();
        let cfg = AiSettings::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.provider, "openai");
        assert_eq!(cfg.model, "gpt-4o-mini");
        assert!(!cfg.is_enabled());

        let env: HashMap<&str, &str> = [("LLM_PROVIDER", "openai"), ("OPENAI_API_KEY", "sk-x")]
            .into_iter()
            .collect();
        let cfg = AiSettings::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert!(cfg.is_enabled());
    }
}
