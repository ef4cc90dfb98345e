//! Canned results for when every model attempt has failed.
//!
//! Rules are evaluated in table order; the first whose operation matches and
//! whose predicate accepts the lower-cased message supplies the template.
//! Each operation ends with a catch-all, so [`fallback`] always produces a
//! result without touching the network.

use thirdvoice_core::analysis::{FALLBACK_PROVIDER_ID, FALLBACK_PROVIDER_NAME};
use thirdvoice_core::{AnalysisResult, Depth, Operation, Sentiment};

/// A pre-written result body.
#[derive(Debug)]
pub struct FallbackTemplate {
    pub rewritten_text: &'static str,
    pub healing_score: u8,
    pub emotional_state: &'static str,
    pub explanation: &'static str,
    pub subtext: &'static str,
    pub needs: &'static [&'static str],
    pub suggested_responses: &'static [&'static str],
    pub alternatives: &'static [&'static str],
}

/// One `(operation, predicate, template)` row.
#[derive(Debug)]
pub struct FallbackRule {
    pub name: &'static str,
    pub operation: Operation,
    pub matches: fn(&str) -> bool,
    pub template: FallbackTemplate,
}

fn mentions_immigration(message: &str) -> bool {
    message.contains("deport") || message.contains("immigration")
}

fn mentions_family_torn_apart(message: &str) -> bool {
    message.contains("family") && message.contains("torn apart")
}

fn always(_: &str) -> bool {
    true
}

pub const RULES: &[FallbackRule] = &[
    FallbackRule {
        name: "immigration",
        operation: Operation::Interpret,
        matches: mentions_immigration,
        template: FallbackTemplate {
            rewritten_text: "I can hear how scared and angry you are about the immigration situation. You're dealing with so much uncertainty and betrayal. I'm here for you through all of this, and you don't have to face it alone.",
            healing_score: 7,
            emotional_state: "understanding",
            explanation: "They are expressing deep fear about deportation, anger about betrayal, and the stress of legal troubles. Dark humor may be a way of coping, but what they need is support and understanding.",
            subtext: "Feeling scared, betrayed, and overwhelmed by legal and immigration issues",
            needs: &[
                "safety",
                "support",
                "loyalty",
                "someone who understands",
                "emotional validation",
            ],
            suggested_responses: &[
                "I'm so sorry you're going through this. You must be terrified.",
                "I can't imagine how stressful this is. What do you need most right now?",
                "You're not alone in this. I'm here to support you however I can.",
            ],
            alternatives: &[],
        },
    },
    FallbackRule {
        name: "family-torn-apart",
        operation: Operation::Interpret,
        matches: mentions_family_torn_apart,
        template: FallbackTemplate {
            rewritten_text: "I hear the pain in your words about your family being torn apart. We've both been through hard times in different ways. I see you, I understand your struggle, and I'm grateful you're sharing this with me.",
            healing_score: 6,
            emotional_state: "understanding",
            explanation: "They're sharing deep pain about family separation and life's unfairness, looking for connection with someone who understands similar struggles.",
            subtext: "Feeling isolated and hurt by family separation, seeking understanding from someone who relates",
            needs: &["empathy", "validation", "connection", "shared understanding"],
            suggested_responses: &[
                "Family pain cuts so deep. I'm here to listen whenever you need.",
                "It's heartbreaking when family relationships fracture. How are you holding up?",
                "Thank you for sharing this with me. Your strength in facing this is incredible.",
            ],
            alternatives: &[],
        },
    },
    FallbackRule {
        name: "interpret-generic",
        operation: Operation::Interpret,
        matches: always,
        template: FallbackTemplate {
            rewritten_text: "I can see you're dealing with so much pain and anger right now. Thank you for trusting me with these heavy feelings. I'm here to listen and support you however I can.",
            healing_score: 6,
            emotional_state: "understanding",
            explanation: "They're sharing intense emotions and difficult circumstances, needing someone to witness their pain without judgment.",
            subtext: "Overwhelmed by multiple life challenges and needing emotional support",
            needs: &["validation", "emotional support", "someone to listen"],
            suggested_responses: &[
                "I hear how much you're struggling. Thank you for telling me.",
                "This sounds incredibly difficult. How can I help you through it?",
                "Your feelings are completely valid. I'm here with you in this.",
            ],
            alternatives: &[],
        },
    },
    FallbackRule {
        name: "rewrite-generic",
        operation: Operation::Rewrite,
        matches: always,
        template: FallbackTemplate {
            rewritten_text: "I'm going through a really tough time and feeling overwhelmed by everything happening. I value our relationship and wanted to share what's on my mind. Can we talk?",
            healing_score: 5,
            emotional_state: "caring",
            explanation: "Transformed the raw emotions into a request for connection and support",
            subtext: "",
            needs: &[],
            suggested_responses: &[
                "I'm struggling with some heavy feelings and would appreciate your support if you have space to talk.",
                "There's a lot on my mind right now and I could really use a listening ear if you're available.",
            ],
            alternatives: &[
                "I'm struggling with some heavy feelings and would appreciate your support if you have space to talk.",
                "There's a lot on my mind right now and I could really use a listening ear if you're available.",
            ],
        },
    },
];

const DEEP_COMMUNICATION_PATTERNS: [&str; 3] =
    ["Emotional flooding", "Crisis communication", "Seeking validation"];

const DEEP_RELATIONSHIP_DYNAMICS: [&str; 3] = [
    "High-stress relationship context",
    "Trust and safety concerns",
    "Emotional dependency patterns",
];

const DEEP_SUGGESTED_RESPONSES: [&str; 3] = [
    "I hear the depth of your pain and I want you to know I'm here with you through this.",
    "Thank you for trusting me with these heavy feelings. How can I best support you right now?",
    "I can feel how overwhelming this must be. Let's take this one step at a time together.",
];

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// The rule that applies to `message` for `operation`.
pub fn matching_rule(message: &str, operation: Operation) -> &'static FallbackRule {
    let lower = message.to_lowercase();
    RULES
        .iter()
        .filter(|rule| rule.operation == operation)
        .find(|rule| (rule.matches)(&lower))
        .unwrap_or(&RULES[RULES.len() - 1])
}

/// Build the canned result for a request.
pub fn fallback(message: &str, operation: Operation, depth: Depth) -> AnalysisResult {
    let template = &matching_rule(message, operation).template;

    let mut result = AnalysisResult {
        rewritten_text: template.rewritten_text.to_string(),
        healing_score: template.healing_score,
        sentiment: Sentiment::Neutral,
        emotional_state: template.emotional_state.to_string(),
        explanation: template.explanation.to_string(),
        subtext: template.subtext.to_string(),
        needs: owned(template.needs),
        warnings: Vec::new(),
        suggested_responses: owned(template.suggested_responses),
        communication_patterns: Vec::new(),
        relationship_dynamics: Vec::new(),
        alternatives: owned(template.alternatives),
        provider_used: FALLBACK_PROVIDER_NAME.to_string(),
        provider_id: FALLBACK_PROVIDER_ID.to_string(),
        depth,
        from_cache: false,
    };

    if depth == Depth::Deep {
        result.communication_patterns = owned(&DEEP_COMMUNICATION_PATTERNS);
        result.relationship_dynamics = owned(&DEEP_RELATIONSHIP_DYNAMICS);
        // Rewrites keep their own suggestions; these replies answer the other person.
        if operation == Operation::Interpret {
            result.suggested_responses = owned(&DEEP_SUGGESTED_RESPONSES);
        }
    }

    result
}
