use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of suggestion kinds the upstream LLM produces for a HAZOP
/// deviation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionType {
    Causes,
    Consequences,
    Safeguards,
    CompleteAnalysis,
}

impl SuggestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionType::Causes => "causes",
            SuggestionType::Consequences => "consequences",
            SuggestionType::Safeguards => "safeguards",
            SuggestionType::CompleteAnalysis => "complete_analysis",
        }
    }
}

impl fmt::Display for SuggestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionRequest {
    pub deviation_id: String,
    pub suggestion_type: SuggestionType,
    /// Free-form AI-assistance context (process description, fluid type,
    /// operating conditions, previous incidents). Opaque to the gateway.
    #[serde(default)]
    pub context: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionResponse {
    pub suggestions: serde_json::Value,
    pub provider: String,
    pub cached: bool,
    pub latency_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    pub endpoint: String,
    pub api_key: String,
    pub timeout_secs: u64,
}
