//! Completion parsing: free-form model text → [`AnalysisResult`].
//!
//! Models often wrap their JSON in prose ("Sure! {...} Hope that helps!").
//! The parser finds the first JSON object embedded in the text, maps the
//! known keys onto the result and fills defaults for anything missing.
//! A completion without usable content is a [`ParseError`], which the
//! orchestrator treats exactly like a failed provider call.

use serde_json::{Map, Value};
use thirdvoice_core::analysis::{DEFAULT_HEALING_SCORE, MAX_HEALING_SCORE};
use thirdvoice_core::error::ParseError;
use thirdvoice_core::{AnalysisResult, Depth, Operation, ProviderDescriptor, Sentiment};
use tracing::warn;

/// Upper bound on `{` positions tried before giving up on a completion.
const MAX_CANDIDATES: usize = 64;

const DEFAULT_EMOTIONAL_STATE: &str = "understanding";
const DEFAULT_EXPLANATION: &str = "Providing support";

const DEFAULT_INTERPRET_RESPONSES: [&str; 3] = [
    "I hear you, and I want to understand what you're going through.",
    "Thank you for telling me how you feel. What would help most right now?",
    "I'm here for you. Can we talk about this together?",
];

const DEFAULT_REWRITE_RESPONSES: [&str; 3] = [
    "Thank you for sharing that with me.",
    "I appreciate you telling me how you feel.",
    "Let's find a time to talk this through together.",
];

/// A successfully parsed completion whose score has not been clamped yet.
#[derive(Debug, Clone)]
pub struct ParsedCompletion {
    raw_score: i64,
    result: AnalysisResult,
}

impl ParsedCompletion {
    /// The healing score exactly as the model reported it (after coercion).
    pub fn raw_score(&self) -> i64 {
        self.raw_score
    }

    pub fn score_in_range(&self) -> bool {
        (0..=MAX_HEALING_SCORE as i64).contains(&self.raw_score)
    }

    /// Finish the result, clamping the score into `0..=10`.
    pub fn into_result(self) -> AnalysisResult {
        let in_range = self.score_in_range();
        let raw_score = self.raw_score;
        let mut result = self.result;
        if !in_range {
            warn!(
                raw_score,
                model = %result.provider_id,
                "Healing score out of range, clamping"
            );
        }
        result.healing_score = AnalysisResult::clamp_score(raw_score);
        result
    }
}

/// Find the first JSON object embedded in `text`.
///
/// Each `{` is tried as the start of exactly one JSON value; trailing prose
/// after the value is ignored, so braces in the surrounding text cannot
/// corrupt the match. When no candidate parses, the span from the first `{`
/// to the last `}` decides which error is reported.
pub fn extract_json_object(text: &str) -> Result<Map<String, Value>, ParseError> {
    for (start, _) in text.match_indices('{').take(MAX_CANDIDATES) {
        let mut values = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        if let Some(Ok(Value::Object(map))) = values.next() {
            return Ok(map);
        }
    }

    let (Some(first), Some(last)) = (text.find('{'), text.rfind('}')) else {
        return Err(ParseError::NoJsonObject);
    };
    if last < first {
        return Err(ParseError::NoJsonObject);
    }

    match serde_json::from_str::<Value>(&text[first..=last]) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ParseError::NoJsonObject),
        Err(e) => Err(ParseError::InvalidJson(e.to_string())),
    }
}

fn text_field(map: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|k| map.get(*k))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Lists accept an array of strings or a single string.
fn list_field(map: &Map<String, Value>, key: &str) -> Vec<String> {
    match map.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

/// Integers as-is, floats rounded, numeric strings parsed, anything else 5.
fn coerce_score(value: Option<&Value>) -> i64 {
    let default = DEFAULT_HEALING_SCORE as i64;
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .unwrap_or(default),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(|f| f.round() as i64)
                })
                .unwrap_or(default)
        }
        _ => default,
    }
}

fn coerce_sentiment(value: Option<&Value>) -> Sentiment {
    match value {
        None | Some(Value::Null) => Sentiment::Neutral,
        Some(Value::String(s)) => Sentiment::from_label(s),
        Some(_) => Sentiment::Unknown,
    }
}

fn default_responses(operation: Operation) -> Vec<String> {
    let defaults = match operation {
        Operation::Rewrite => DEFAULT_REWRITE_RESPONSES,
        Operation::Interpret => DEFAULT_INTERPRET_RESPONSES,
    };
    defaults.iter().map(|s| s.to_string()).collect()
}

/// Parse one completion produced by `descriptor`.
pub fn parse(
    raw_completion: &str,
    operation: Operation,
    depth: Depth,
    descriptor: &ProviderDescriptor,
) -> Result<ParsedCompletion, ParseError> {
    let data = extract_json_object(raw_completion)?;

    let mut rewritten_text = text_field(&data, &["rewritten_text", "transformed_message"]);
    let mut alternatives = list_field(&data, "alternatives");
    let explanation = text_field(&data, &["explanation"]);
    let subtext = text_field(&data, &["subtext"]);
    let mut suggested_responses = list_field(&data, "suggested_responses");

    match operation {
        Operation::Rewrite => {
            if rewritten_text.is_empty() && !alternatives.is_empty() {
                rewritten_text = alternatives.remove(0);
            }
            if rewritten_text.is_empty() {
                return Err(ParseError::MissingContent("rewritten_text".into()));
            }
            if suggested_responses.is_empty() {
                suggested_responses = alternatives.clone();
            }
        }
        Operation::Interpret => {
            if explanation.is_empty()
                && suggested_responses.is_empty()
                && subtext.is_empty()
                && rewritten_text.is_empty()
            {
                return Err(ParseError::MissingContent(
                    "explanation, suggested_responses, subtext".into(),
                ));
            }
        }
    }

    if suggested_responses.is_empty() {
        suggested_responses = default_responses(operation);
    }
    if rewritten_text.is_empty() {
        rewritten_text = suggested_responses[0].clone();
    }

    let emotional_state = match text_field(&data, &["emotional_state"]) {
        s if s.is_empty() => DEFAULT_EMOTIONAL_STATE.to_string(),
        s => s,
    };

    let result = AnalysisResult {
        rewritten_text,
        healing_score: DEFAULT_HEALING_SCORE,
        sentiment: coerce_sentiment(data.get("sentiment")),
        emotional_state,
        explanation: if explanation.is_empty() {
            DEFAULT_EXPLANATION.to_string()
        } else {
            explanation
        },
        subtext,
        needs: list_field(&data, "needs"),
        warnings: list_field(&data, "warnings"),
        suggested_responses,
        communication_patterns: list_field(&data, "communication_patterns"),
        relationship_dynamics: list_field(&data, "relationship_dynamics"),
        alternatives,
        provider_used: descriptor.display_name.clone(),
        provider_id: descriptor.id.clone(),
        depth,
        from_cache: false,
    };

    Ok(ParsedCompletion {
        raw_score: coerce_score(data.get("healing_score")),
        result,
    })
}
