//! `thirdvoice providers`: Show the ordered model table.

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;

    println!("🤖 Model table (tried in this order)");
    println!("====================================");
    println!();
    println!("  Endpoint: {} ({})", config.provider, config.base_url);
    println!(
        "  API key:  {}",
        if config.has_api_key() { "configured" } else { "missing" }
    );
    println!();

    for (i, model) in config.models.iter().enumerate() {
        println!("  {:>2}. {}", i + 1, model.display_name);
        println!("      id:   {}", model.id);
        if !model.note.is_empty() {
            println!("      note: {}", model.note);
        }
    }

    println!();
    println!("  Each model gets the verbatim message first, then a sanitized copy.");
    println!("  Reorder or replace entries with [[models]] blocks in config.toml.");

    Ok(())
}
