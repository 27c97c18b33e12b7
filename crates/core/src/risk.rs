//! Risk Report Types
//!
//! The structured result carried by the pipeline's `final` event. The backend
//! produces the report with an LLM, so everything beyond the four scores and
//! the recommendation token is kept opaque.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Upper bound of the fixed risk scale.
pub const RISK_SCALE_MAX: f64 = 5.0;

/// Scored vendor assessment. All four numbers are on a 0-5 scale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskAssessment {
    pub financial_risk: f64,
    pub security_risk: f64,
    pub reputation_risk: f64,
    pub resilience_strength: f64,
    pub overall_recommendation: String,
    /// Free-form reasoning; a string or a list of bullet strings.
    #[serde(
        default,
        rename = "rationale_with_citations",
        skip_serializing_if = "Option::is_none"
    )]
    pub rationale: Option<Value>,
}

impl RiskAssessment {
    /// Mean of the three risk scores (resilience is a strength, not a risk).
    pub fn average_risk(&self) -> f64 {
        (self.financial_risk + self.security_risk + self.reputation_risk) / 3.0
    }

    /// Whether every score lies within the 0-5 scale.
    pub fn is_on_scale(&self) -> bool {
        [
            self.financial_risk,
            self.security_risk,
            self.reputation_risk,
            self.resilience_strength,
        ]
        .iter()
        .all(|v| (0.0..=RISK_SCALE_MAX).contains(v))
    }

    pub fn recommendation(&self) -> Recommendation {
        Recommendation::parse(&self.overall_recommendation)
    }

    /// Rationale flattened to display lines.
    pub fn rationale_lines(&self) -> Vec<String> {
        match &self.rationale {
            Some(Value::String(s)) => s
                .lines()
                .map(|l| l.trim().trim_start_matches(['-', '•', '*']).trim())
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            Some(Value::Null) | None => Vec::new(),
            Some(other) => vec![other.to_string()],
        }
    }
}

/// Report attached to a `final` event.
///
/// `assessment` is optional: the backend emits reports without a structured
/// score (e.g. `{"error": "..."}`) and those must not fail event decoding.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RiskReport {
    #[serde(
        default,
        deserialize_with = "lenient_assessment",
        skip_serializing_if = "Option::is_none"
    )]
    pub assessment: Option<RiskAssessment>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RiskReport {
    /// Company the report was generated for, if the backend included it.
    pub fn company(&self) -> Option<&str> {
        self.extra.get("company").and_then(Value::as_str)
    }

    /// Generation-side failure message, if the report only carries an error.
    pub fn error(&self) -> Option<&str> {
        self.extra.get("error").and_then(Value::as_str)
    }

    pub fn generated_at(&self) -> Option<&str> {
        self.extra.get("generated_at").and_then(Value::as_str)
    }
}

fn lenient_assessment<'de, D>(deserializer: D) -> Result<Option<RiskAssessment>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| match serde_json::from_value::<RiskAssessment>(value) {
        Ok(assessment) => Some(assessment),
        Err(e) => {
            tracing::debug!("Risk report assessment is not structured, ignoring: {}", e);
            None
        }
    }))
}

/// Classification of the free-form `overall_recommendation` token.
///
/// The backend has shipped several vocabularies over time; all of them map
/// onto the same three outcomes. Anything else is preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recommendation {
    Proceed,
    ProceedWithProtections,
    Reject,
    InsufficientData,
    Other(String),
}

impl Recommendation {
    pub fn parse(token: &str) -> Self {
        let normalized = token.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "safe_to_contract" | "proceed" => Recommendation::Proceed,
            "contract_with_protections" | "proceed_with_protections" | "proceed_with_caution" => {
                Recommendation::ProceedWithProtections
            }
            "do_not_contract" | "reject" => Recommendation::Reject,
            "insufficient_data" => Recommendation::InsufficientData,
            _ => Recommendation::Other(token.trim().to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Recommendation::Proceed => "Safe to contract",
            Recommendation::ProceedWithProtections => "Contract with protections",
            Recommendation::Reject => "Do not contract",
            Recommendation::InsufficientData => "Insufficient data",
            Recommendation::Other(token) => token,
        }
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
