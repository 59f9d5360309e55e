use crate::entry::LookupQuery;
use crate::error::ConfigError;
use crate::links::entry_request_url;
use crate::placement::{PlacementRules, PopupSize};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_LOOKUP_TIMEOUT_MS: u64 = 7_000;
pub const DEFAULT_AUDIO_BASE_URL: &str = "https://media.merriam-webster.com/soundc11";
pub const DEFAULT_DICTIONARY_BASE_URL: &str = "http://learnersdictionary.com/definition/";
pub const DEFAULT_SEARCH_BASE_URL: &str = "https://www.google.com/search?q=";
pub const DEFAULT_ENTRY_ENDPOINT: &str =
    "https://www.dictionaryapi.com/api/v1/references/learners/xml/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopupConfig {
    pub lookup_timeout_ms: u64,
    pub popup_size: PopupSize,
    pub anchor_gap: f64,
    pub edge_margin: f64,
    pub audio_base_url: String,
    pub dictionary_base_url: String,
    pub search_base_url: String,
    pub entry_endpoint: String,
    pub api_key: String,
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            lookup_timeout_ms: DEFAULT_LOOKUP_TIMEOUT_MS,
            popup_size: PopupSize::default(),
            anchor_gap: 8.0,
            edge_margin: 4.0,
            audio_base_url: DEFAULT_AUDIO_BASE_URL.to_string(),
            dictionary_base_url: DEFAULT_DICTIONARY_BASE_URL.to_string(),
            search_base_url: DEFAULT_SEARCH_BASE_URL.to_string(),
            entry_endpoint: DEFAULT_ENTRY_ENDPOINT.to_string(),
            api_key: String::new(),
        }
    }
}

impl PopupConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    /// Entry API request for `query`, keyed with the configured API key.
    pub fn entry_request_url(&self, query: &LookupQuery) -> String {
        entry_request_url(&self.entry_endpoint, query.as_str(), &self.api_key)
    }

    pub fn placement_rules(&self) -> PlacementRules {
        PlacementRules {
            size: self.popup_size,
            gap: self.anchor_gap,
            margin: self.edge_margin,
        }
    }
}
