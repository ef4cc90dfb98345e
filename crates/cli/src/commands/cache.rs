//! `thirdvoice cache`: Response cache maintenance.

use thirdvoice_core::CacheStore;

pub async fn purge(requester: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let cache = thirdvoice_cache::build_from_config(&config.cache).await?;

    println!("🧹 Purging {} cache", cache.name());

    let removed = match requester {
        Some(requester) => cache.purge_requester(requester).await?,
        None => cache.purge_expired().await?,
    };
    let remaining = cache.count().await?;

    match requester {
        Some(requester) => println!("   Removed {removed} entries written for '{requester}'"),
        None => println!("   Removed {removed} expired entries"),
    }
    println!("   {remaining} entries remain");

    if config.cache.backend == "memory" {
        println!("   (the in-memory cache only lives for a single command)");
    }

    Ok(())
}
