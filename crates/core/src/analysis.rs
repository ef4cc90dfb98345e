//! Analysis domain types.
//!
//! An [`AnalysisRequest`] flows in, an [`AnalysisResult`] flows out:
//! Caller submits a message → Orchestrator checks the cache → Providers are
//! tried in order → the completion is parsed (or a fallback is generated).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sentinel `provider_id` carried by canned fallback results.
pub const FALLBACK_PROVIDER_ID: &str = "fallback";

/// Sentinel `provider_used` carried by canned fallback results.
pub const FALLBACK_PROVIDER_NAME: &str = "Fallback System";

/// Inclusive upper bound of the healing score scale.
pub const MAX_HEALING_SCORE: u8 = 10;

/// Score used when a provider omits or garbles the healing score.
pub const DEFAULT_HEALING_SCORE: u8 = 5;

/// What the engine should do with the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Rewrite the message into a more constructive version.
    #[serde(alias = "transform")]
    Rewrite,
    /// Explain what the sender really means and how to respond.
    Interpret,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Rewrite => "rewrite",
            Operation::Interpret => "interpret",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rewrite" | "transform" => Ok(Operation::Rewrite),
            "interpret" => Ok(Operation::Interpret),
            other => Err(format!("unknown operation '{other}' (expected rewrite or interpret)")),
        }
    }
}

/// How much analysis to request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Depth {
    /// Concise answer, smaller token budget.
    #[default]
    Quick,
    /// Richer answer with communication patterns and relationship dynamics.
    Deep,
}

impl Depth {
    pub fn as_str(&self) -> &'static str {
        match self {
            Depth::Quick => "quick",
            Depth::Deep => "deep",
        }
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Depth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quick" => Ok(Depth::Quick),
            "deep" => Ok(Depth::Deep),
            other => Err(format!("unknown depth '{other}' (expected quick or deep)")),
        }
    }
}

/// A single analysis request. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    message: String,
    context: String,
    operation: Operation,
    depth: Depth,
    #[serde(default)]
    subject_id: String,
    #[serde(default)]
    requester_id: String,
}

impl AnalysisRequest {
    pub fn new(
        message: impl Into<String>,
        context: impl Into<String>,
        operation: Operation,
        depth: Depth,
    ) -> Self {
        Self {
            message: message.into(),
            context: context.into(),
            operation,
            depth,
            subject_id: String::new(),
            requester_id: String::new(),
        }
    }

    /// Attach the id of the person the message is about (the contact).
    pub fn with_subject(mut self, subject_id: impl Into<String>) -> Self {
        self.subject_id = subject_id.into();
        self
    }

    /// Attach the id of the person asking for the analysis.
    pub fn with_requester(mut self, requester_id: impl Into<String>) -> Self {
        self.requester_id = requester_id.into();
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn depth(&self) -> Depth {
        self.depth
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn requester_id(&self) -> &str {
        &self.requester_id
    }
}

/// One entry of the ordered model table. Order encodes preference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    /// Fully-qualified model identifier
    pub id: String,

    /// Human-friendly name shown to users
    pub display_name: String,

    /// Free-form operator note
    #[serde(default)]
    pub note: String,
}

impl ProviderDescriptor {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        note: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            note: note.into(),
        }
    }

    /// Derive a readable name from a bare model id:
    /// `"meta-llama/llama-3.3-70b-instruct:free"` → `"llama-3.3-70b-instruct"`.
    pub fn derive_display_name(model_id: &str) -> String {
        let last = model_id.rsplit('/').next().unwrap_or(model_id);
        last.strip_suffix(":free").unwrap_or(last).to_string()
    }
}

/// Emotional tone of the analysed message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
    Unknown,
}

impl Sentiment {
    /// Map a provider-supplied label; anything unrecognised is `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "positive" => Sentiment::Positive,
            "neutral" => Sentiment::Neutral,
            "negative" => Sentiment::Negative,
            _ => Sentiment::Unknown,
        }
    }
}

/// Where a returned result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSource {
    Provider,
    Cache,
    Fallback,
}

/// The canonical analysis result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// The rewrite (REWRITE) or suggested reply (INTERPRET)
    #[serde(default)]
    pub rewritten_text: String,

    /// 0–10 rating of how constructive the result is
    pub healing_score: u8,

    #[serde(default)]
    pub sentiment: Sentiment,

    #[serde(default)]
    pub emotional_state: String,

    #[serde(default)]
    pub explanation: String,

    #[serde(default)]
    pub subtext: String,

    #[serde(default)]
    pub needs: Vec<String>,

    #[serde(default)]
    pub warnings: Vec<String>,

    #[serde(default)]
    pub suggested_responses: Vec<String>,

    #[serde(default)]
    pub communication_patterns: Vec<String>,

    #[serde(default)]
    pub relationship_dynamics: Vec<String>,

    /// Extra rewrites offered alongside `rewritten_text`
    #[serde(default)]
    pub alternatives: Vec<String>,

    /// Display name of the model that produced this result
    #[serde(default)]
    pub provider_used: String,

    /// Model id that produced this result
    #[serde(default)]
    pub provider_id: String,

    #[serde(default)]
    pub depth: Depth,

    /// Set when the result was served from the cache. Never serialized.
    #[serde(skip)]
    pub from_cache: bool,
}

impl Default for AnalysisResult {
    fn default() -> Self {
        Self {
            rewritten_text: String::new(),
            healing_score: DEFAULT_HEALING_SCORE,
            sentiment: Sentiment::Neutral,
            emotional_state: String::new(),
            explanation: String::new(),
            subtext: String::new(),
            needs: Vec::new(),
            warnings: Vec::new(),
            suggested_responses: Vec::new(),
            communication_patterns: Vec::new(),
            relationship_dynamics: Vec::new(),
            alternatives: Vec::new(),
            provider_used: String::new(),
            provider_id: String::new(),
            depth: Depth::Quick,
            from_cache: false,
        }
    }
}

impl AnalysisResult {
    /// Clamp an arbitrary score into the `0..=10` scale.
    pub fn clamp_score(raw: i64) -> u8 {
        raw.clamp(0, MAX_HEALING_SCORE as i64) as u8
    }

    /// Whether this result came from the canned fallback generator.
    pub fn is_fallback(&self) -> bool {
        self.provider_id == FALLBACK_PROVIDER_ID || self.provider_used == FALLBACK_PROVIDER_NAME
    }

    /// "Powered by ..." line for display surfaces.
    pub fn provider_display(&self) -> String {
        if !self.provider_used.is_empty() {
            format!("Powered by {}", self.provider_used)
        } else if !self.provider_id.is_empty() {
            format!(
                "Powered by {}",
                ProviderDescriptor::derive_display_name(&self.provider_id)
            )
        } else {
            "AI-generated response".into()
        }
    }
}

/// Well-known relationship labels and the coaching hint each one adds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipContext {
    Romantic,
    Coparenting,
    Workplace,
    Family,
    Friend,
}

impl RelationshipContext {
    pub const ALL: [RelationshipContext; 5] = [
        RelationshipContext::Romantic,
        RelationshipContext::Coparenting,
        RelationshipContext::Workplace,
        RelationshipContext::Family,
        RelationshipContext::Friend,
    ];

    /// Recognise a free-form context label (case-insensitive).
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|c| c.label() == label)
    }

    pub fn label(&self) -> &'static str {
        match self {
            RelationshipContext::Romantic => "romantic",
            RelationshipContext::Coparenting => "coparenting",
            RelationshipContext::Workplace => "workplace",
            RelationshipContext::Family => "family",
            RelationshipContext::Friend => "friend",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            RelationshipContext::Romantic => "Partner & intimate relationships",
            RelationshipContext::Coparenting => "Raising children together",
            RelationshipContext::Workplace => "Professional relationships",
            RelationshipContext::Family => "Extended family connections",
            RelationshipContext::Friend => "Friendships & social bonds",
        }
    }

    pub fn guidance(&self) -> &'static str {
        match self {
            RelationshipContext::Romantic => {
                "Favor empathy, clarity and intimacy, avoid blame, and suggest a positive next step to keep the connection."
            }
            RelationshipContext::Coparenting => {
                "Keep responses emotionally safe and focused on the children's wellbeing."
            }
            RelationshipContext::Workplace => {
                "Keep a professional tone and make the intent clear."
            }
            RelationshipContext::Family => {
                "Account for family dynamics and aim for better family relationships."
            }
            RelationshipContext::Friend => {
                "Strengthen the bond and help resolve the conflict."
            }
        }
    }
}
