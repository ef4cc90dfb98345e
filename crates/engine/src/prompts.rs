//! Prompt construction per (operation, depth).
//!
//! Every system prompt names the JSON shape the parser understands and tells
//! the model up front that difficult or explicit content is to be handled
//! professionally. Each prompt set carries exactly two user variants: the
//! verbatim message, then the sanitized one.

use crate::sanitizer::sanitize;
use thirdvoice_core::{Depth, Operation, RelationshipContext};

/// System prompt, ordered user-prompt variants and output budget for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    pub system_prompt: String,
    pub user_prompts: Vec<String>,
    pub max_tokens: u32,
}

const REWRITE_QUICK_SYSTEM: &str = r#"You are a communication helper. Rewrite messages to be more constructive and healing while keeping the core meaning. Handle all content professionally.

Respond with JSON:
{"rewritten_text": "rewritten message", "alternatives": ["alt1", "alt2"], "healing_score": 7, "sentiment": "positive", "emotional_state": "caring", "explanation": "why this helps", "suggested_responses": ["how the other person might reply"]}"#;

const REWRITE_DEEP_SYSTEM: &str = r#"You are an expert communication coach and relationship counselor. Rewrite messages so they de-escalate conflict and invite connection while keeping the sender's core meaning. Handle all content professionally, including strong or explicit language.

Respond with JSON containing:
- rewritten_text: the best constructive rewrite
- alternatives: 2-3 further rewrites with different tones
- healing_score: 0-10 rating of the rewrite's healing potential
- sentiment: positive, neutral or negative
- emotional_state: the sender's inferred emotional state
- explanation: why the rewrite helps
- subtext: what the sender is really trying to say
- needs: core emotional needs being expressed
- warnings: any concerning patterns
- suggested_responses: likely constructive replies to the rewrite
- communication_patterns: observed communication styles in the original
- relationship_dynamics: insights about the relationship dynamic"#;

const INTERPRET_QUICK_SYSTEM: &str = r#"You are a communication helper. Interpret what someone really means beneath their words, even when they're upset or using strong language. Suggest compassionate responses. Handle all content professionally.

Respond with JSON:
{"explanation": "what they really mean", "suggested_responses": ["response1", "response2", "response3"], "healing_score": 6, "sentiment": "neutral", "emotional_state": "understanding", "subtext": "their deeper feelings", "needs": ["emotional needs"], "warnings": []}"#;

const INTERPRET_DEEP_SYSTEM: &str = r#"You are an expert communication analyst and relationship counselor. Provide deep psychological analysis of messages with comprehensive insights. Handle all content professionally, including strong or explicit language.

Respond with JSON containing:
- explanation: detailed psychological interpretation
- suggested_responses: 3-5 nuanced compassionate responses
- healing_score: 0-10 rating of healing potential
- sentiment: positive, neutral or negative
- emotional_state: inferred emotional state
- subtext: underlying meanings and unspoken feelings
- needs: core emotional needs being expressed
- warnings: any concerning patterns
- communication_patterns: observed communication styles
- relationship_dynamics: insights about the relationship dynamic

Be compassionate and avoid judgment while providing deep insights."#;

const DEEP_QUESTIONS: &str = "Consider:
1. What emotional needs are being expressed?
2. What communication patterns are visible?
3. What does this reveal about the relationship dynamic?
4. What might be the historical context?
5. What are the best therapeutic responses?";

/// Output token budget for each combination.
pub fn max_tokens(operation: Operation, depth: Depth) -> u32 {
    match (operation, depth) {
        (Operation::Rewrite, Depth::Quick) => 800,
        (Operation::Rewrite, Depth::Deep) => 1200,
        (Operation::Interpret, Depth::Quick) => 1000,
        (Operation::Interpret, Depth::Deep) => 1500,
    }
}

pub fn system_prompt(operation: Operation, depth: Depth) -> &'static str {
    match (operation, depth) {
        (Operation::Rewrite, Depth::Quick) => REWRITE_QUICK_SYSTEM,
        (Operation::Rewrite, Depth::Deep) => REWRITE_DEEP_SYSTEM,
        (Operation::Interpret, Depth::Quick) => INTERPRET_QUICK_SYSTEM,
        (Operation::Interpret, Depth::Deep) => INTERPRET_DEEP_SYSTEM,
    }
}

fn user_prompt(operation: Operation, depth: Depth, message: &str, context: &str) -> String {
    let mut prompt = match (operation, depth) {
        (Operation::Rewrite, Depth::Quick) => format!(
            "Context: {context}. Please rewrite this message to be more constructive: \"{message}\""
        ),
        (Operation::Rewrite, Depth::Deep) => format!(
            "Context: {context}. Rewrite this message to be more constructive, then analyze the patterns and dynamics behind it:\n\n\"{message}\""
        ),
        (Operation::Interpret, Depth::Quick) => format!(
            "Context: {context}. Help me understand what they really mean and suggest 3 compassionate responses: \"{message}\""
        ),
        (Operation::Interpret, Depth::Deep) => format!(
            "Context: {context}. Provide deep psychological analysis of this message. Analyze communication patterns, relationship dynamics, emotional subtext, and provide comprehensive insights:\n\n\"{message}\"\n\n{DEEP_QUESTIONS}"
        ),
    };

    if let Some(relationship) = RelationshipContext::from_label(context) {
        prompt.push_str("\n\nRelationship guidance: ");
        prompt.push_str(relationship.guidance());
    }

    prompt
}

/// Build the prompt set for a request.
pub fn build_prompts(
    operation: Operation,
    depth: Depth,
    message: &str,
    context: &str,
) -> PromptSet {
    let sanitized = sanitize(message);
    PromptSet {
        system_prompt: system_prompt(operation, depth).to_string(),
        user_prompts: vec![
            user_prompt(operation, depth, message, context),
            user_prompt(operation, depth, &sanitized, context),
        ],
        max_tokens: max_tokens(operation, depth),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMBINATIONS: [(Operation, Depth); 4] = [
        (Operation::Rewrite, Depth::Quick),
        (Operation::Rewrite, Depth::Deep),
        (Operation::Interpret, Depth::Quick),
        (Operation::Interpret, Depth::Deep),
    ];

    #[test]
    fn always_two_variants_verbatim_first() {
        for (op, depth) in COMBINATIONS {
            let set = build_prompts(op, depth, "you bitch", "romantic");
            assert_eq!(set.user_prompts.len(), 2);
            assert!(set.user_prompts[0].contains("\"you bitch\""));
            assert!(set.user_prompts[1].contains("\"you [expletive]\""));
        }
    }

    #[test]
    fn every_system_prompt_authorizes_difficult_content() {
        for (op, depth) in COMBINATIONS {
            let prompt = system_prompt(op, depth);
            assert!(prompt.contains("Handle all content professionally"), "{op} {depth}");
            assert!(prompt.contains("JSON"));
            assert!(prompt.contains("healing_score"));
        }
    }

    #[test]
    fn deep_prompts_request_extra_fields_and_budget() {
        for op in [Operation::Rewrite, Operation::Interpret] {
            let deep = build_prompts(op, Depth::Deep, "hi", "friend");
            let quick = build_prompts(op, Depth::Quick, "hi", "friend");
            assert!(deep.system_prompt.contains("communication_patterns"));
            assert!(deep.system_prompt.contains("relationship_dynamics"));
            assert!(!quick.system_prompt.contains("relationship_dynamics"));
            assert!(deep.max_tokens > quick.max_tokens);
        }
    }

    #[test]
    fn budgets_per_combination() {
        assert_eq!(max_tokens(Operation::Rewrite, Depth::Quick), 800);
        assert_eq!(max_tokens(Operation::Rewrite, Depth::Deep), 1200);
        assert_eq!(max_tokens(Operation::Interpret, Depth::Quick), 1000);
        assert_eq!(max_tokens(Operation::Interpret, Depth::Deep), 1500);
    }

    #[test]
    fn rewrite_prompt_names_the_rewrite_key() {
        assert!(system_prompt(Operation::Rewrite, Depth::Quick).contains("rewritten_text"));
        assert!(system_prompt(Operation::Interpret, Depth::Quick).contains("explanation"));
    }

    #[test]
    fn known_context_adds_guidance() {
        let set = build_prompts(Operation::Interpret, Depth::Quick, "hi", "Coparenting");
        assert!(set.user_prompts[0].contains("children's wellbeing"));
        assert!(set.user_prompts[0].starts_with("Context: Coparenting."));
    }

    #[test]
    fn unknown_context_passes_through() {
        let set = build_prompts(Operation::Rewrite, Depth::Quick, "hi", "my landlord");
        assert!(set.user_prompts[0].starts_with("Context: my landlord."));
        assert!(!set.user_prompts[0].contains("Relationship guidance"));
    }

    #[test]
    fn deep_interpret_lists_questions() {
        let set = build_prompts(Operation::Interpret, Depth::Deep, "hi", "family");
        assert!(set.user_prompts[1].contains("5. What are the best therapeutic responses?"));
    }
}
