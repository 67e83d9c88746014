//! Label lookup demo.
//!
//! Usage:
//!   cargo run -- 1 2 menu.open     # Print the given labels
//!   cargo run -- --cache           # Same, served twice through an in-memory cache
//!
//! Required environment variables:
//! - LOCALE_KIT_PACKAGE
//!
//! Optional:
//! - LOCALE_KIT_LOCALE (defaults to en-US)
//! - LOCALE_KIT_STRICT (defaults to false)
//! - LOCALE_KIT_CACHE (defaults to false, same as --cache)
//! - LOCALE_KIT_CACHE_NAMESPACE (defaults to locale-kit)

use anyhow::{Context, Result};
use locale_kit::{config::Config, CacheBackend, LabelKey, MemoryCache, PackageResolver};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("locale_kit=info".parse()?),
        )
        .init();

    let config = Config::from_env()?;
    let use_cache = config.cache_enabled || std::env::args().any(|a| a == "--cache");

    let mut keys: Vec<LabelKey> = std::env::args()
        .skip(1)
        .filter(|a| !a.starts_with("--"))
        .map(|a| match a.parse::<i64>() {
            Ok(id) => LabelKey::Id(id),
            Err(_) => LabelKey::Name(a),
        })
        .collect();
    if keys.is_empty() {
        keys = vec![LabelKey::Id(1), LabelKey::Id(2), LabelKey::Id(3)];
    }

    let mut package = PackageResolver::open(&config.package_path, &config.locale, config.strict_locale)
        .await
        .with_context(|| format!("Failed to open package {}", config.package_path))?;

    if let Some(state) = package.locale() {
        info!(
            "Active locale {} (id {}, fallback: {})",
            state.locale_code, state.locale_id, state.is_fallback
        );
    }

    let cache = MemoryCache::new(config.cache_namespace.clone());
    if use_cache {
        package
            .set_cache(true)
            .set_cache_backend(Some(Arc::new(cache.clone())));
    }

    let rounds = if use_cache { 2 } else { 1 };
    for round in 1..=rounds {
        let mut labels: Vec<_> = package
            .get_labels(&keys, false)
            .await
            .context("Failed to fetch labels")?
            .into_iter()
            .collect();
        labels.sort();

        println!("Labels (round {}):", round);
        for (key, value) in labels {
            println!("  {:>12}  {}", key, value);
        }
    }

    println!("\nSupported locales:");
    for entry in package.supported_locales().await? {
        println!(
            "  {:<8} {} (id {}{})",
            entry.locale,
            entry.language,
            entry.id,
            if entry.locked { ", locked" } else { "" }
        );
    }

    let italian = package.is_locale_supported("it-IT", config.strict_locale).await?;
    println!("\nItalian supported: {}", italian);

    if use_cache {
        info!("Cached {} labels", cache.len());
        cache
            .invalidate()
            .await
            .map_err(|e| anyhow::anyhow!(e))
            .context("Failed to invalidate cache")?;
    }

    Ok(())
}
