//! `thirdvoice analyze` / `thirdvoice rewrite`: run one message through the engine.

use thirdvoice_core::{
    AnalysisRequest, AnalysisResult, Depth, Operation, RelationshipContext, ResultSource,
};
use thirdvoice_engine::Orchestrator;
use tracing::debug;

/// Requester id recorded on cache entries written by the CLI.
const CLI_REQUESTER: &str = "cli";

pub async fn run(
    operation: Operation,
    message: &str,
    context: &str,
    deep: bool,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let cache = thirdvoice_cache::build_from_config(&config.cache).await?;
    let orchestrator = Orchestrator::from_config(&config, cache);

    if orchestrator.is_degraded() && !json {
        eprintln!("⚠️  No API key configured; results will come from the offline fallback.");
        eprintln!("   Set THIRDVOICE_API_KEY or OPENROUTER_API_KEY, or run `thirdvoice doctor`.");
        eprintln!();
    }

    let depth = if deep { Depth::Deep } else { Depth::Quick };
    let request =
        AnalysisRequest::new(message, context, operation, depth).with_requester(CLI_REQUESTER);
    debug!(%operation, %depth, context, "Running analysis");
    let (result, source) = orchestrator.process_with_source(&request).await;
    debug!(?source, provider = %result.provider_id, "Analysis finished");

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", render(&result, source, operation, context));
    }

    Ok(())
}

fn bullet_list(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("\n  {title}:\n"));
    for item in items {
        out.push_str(&format!("    • {item}\n"));
    }
}

/// Human-readable rendering of a result.
pub fn render(
    result: &AnalysisResult,
    source: ResultSource,
    operation: Operation,
    context: &str,
) -> String {
    let mut out = String::new();

    let heading = match operation {
        Operation::Rewrite => "✍️  Rewritten message",
        Operation::Interpret => "🔍 What they might mean",
    };
    out.push_str(&format!("{heading}\n"));
    out.push_str(&"=".repeat(40));
    out.push('\n');

    match RelationshipContext::from_label(context) {
        Some(known) => out.push_str(&format!(
            "  Context: {} ({})\n",
            known.label(),
            known.description()
        )),
        None if !context.trim().is_empty() => {
            out.push_str(&format!("  Context: {}\n", context.trim()))
        }
        None => {}
    }

    match operation {
        Operation::Rewrite => {
            out.push_str(&format!("\n  {}\n", result.rewritten_text));
            bullet_list(&mut out, "Alternatives", &result.alternatives);
            out.push_str(&format!("\n  Why this helps: {}\n", result.explanation));
        }
        Operation::Interpret => {
            out.push_str(&format!("\n  {}\n", result.explanation));
            if !result.subtext.is_empty() {
                out.push_str(&format!("\n  Subtext: {}\n", result.subtext));
            }
            bullet_list(&mut out, "Needs", &result.needs);
        }
    }

    bullet_list(&mut out, "Suggested responses", &result.suggested_responses);
    bullet_list(&mut out, "Warnings", &result.warnings);
    bullet_list(&mut out, "Communication patterns", &result.communication_patterns);
    bullet_list(&mut out, "Relationship dynamics", &result.relationship_dynamics);

    out.push_str(&format!(
        "\n  Healing score: {}/10 · sentiment: {:?} · feeling: {}\n",
        result.healing_score, result.sentiment, result.emotional_state
    ));

    let provenance = match source {
        ResultSource::Provider => result.provider_display(),
        ResultSource::Cache => format!("{} (cached)", result.provider_display()),
        ResultSource::Fallback => "Offline fallback (no model answered)".to_string(),
    };
    out.push_str(&format!("  {provenance}\n"));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_rewrite_shows_alternatives() {
        let result = AnalysisResult {
            rewritten_text: "Can we talk tonight?".into(),
            alternatives: vec!["I'd love to talk.".into()],
            suggested_responses: vec!["Sure.".into()],
            healing_score: 8,
            provider_used: "DeepSeek Chat v3.1".into(),
            ..Default::default()
        };
        let text = render(&result, ResultSource::Provider, Operation::Rewrite, "Coparenting");
        assert!(text.contains("Can we talk tonight?"));
        assert!(text.contains("• I'd love to talk."));
        assert!(text.contains("8/10"));
        assert!(text.contains("Powered by DeepSeek Chat v3.1"));
        assert!(text.contains("Context: coparenting (Raising children together)"));
    }

    #[test]
    fn render_marks_cache_and_fallback() {
        let result = thirdvoice_engine::fallback("hi", Operation::Interpret, Depth::Quick);
        let text = render(&result, ResultSource::Fallback, Operation::Interpret, "my landlord");
        assert!(text.contains("Offline fallback"));
        assert!(text.contains("Context: my landlord\n"));

        let cached = render(
            &AnalysisResult::default(),
            ResultSource::Cache,
            Operation::Interpret,
            "",
        );
        assert!(cached.contains("(cached)"));
        assert!(!cached.contains("Context:"));
    }
}
