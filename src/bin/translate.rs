//! Translation demo - translates and detects a few sample texts and lists the
//! provider's languages
//!
//! Usage:
//!   cargo run --bin translate              # Translate into Italian
//!   cargo run --bin translate -- fr        # Translate into French
//!   cargo run --bin translate -- --cache   # Run twice through an in-memory cache
//!
//! Required environment variables:
//! - TRANSLATOR_TOKEN
//!
//! Optional:
//! - TRANSLATOR_PROVIDER (yandex, google or microsoft; defaults to yandex)
//! - TRANSLATOR_TEXT_FORMAT (defaults to text)
//! - TRANSLATOR_MODEL (defaults to nmt)
//! - TRANSLATOR_PROFANITY (defaults to none)
//! - TRANSLATOR_API_URL (override the provider endpoint)

use anyhow::{Context, Result};
use locale_kit::{
    config::Config, translation::supported_providers, CacheBackend, MemoryCache,
    TranslationService,
};
use std::sync::Arc;
use tracing::info;

const SAMPLES: &[&str] = &["Hello world!", "How are you today?", "Hello world!"];

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("locale_kit=info".parse()?),
        )
        .init();

    let config = Config::translator_from_env()?;
    let use_cache = config.cache_enabled || std::env::args().any(|a| a == "--cache");
    let target = std::env::args()
        .skip(1)
        .find(|a| !a.starts_with("--"))
        .unwrap_or_else(|| "it".to_string());

    info!("Supported providers: {}", supported_providers().join(", "));

    let mut service = TranslationService::new(config.provider_config()?);
    if let Some(url) = &config.translator_api_url {
        service = service.with_base_url(url.clone());
    }

    let cache = MemoryCache::new(config.cache_namespace.clone());
    if use_cache {
        service
            .set_cache(true)
            .set_cache_backend(Some(Arc::new(cache.clone())));
    }

    let rounds = if use_cache { 2 } else { 1 };
    for round in 1..=rounds {
        let translations = service
            .translate_text(SAMPLES, &target, Some("en"), false)
            .await
            .context("Translation failed")?;

        println!("Translations into {} (round {}):", target, round);
        for (text, translated) in &translations {
            println!("  {} -> {}", text, translated.as_deref().unwrap_or("<none>"));
        }
    }

    let detections = service
        .detect_language(SAMPLES, &["en", "it"], false)
        .await
        .context("Language detection failed")?;
    println!("\nDetected languages:");
    for (text, lang) in &detections {
        println!("  {} -> {}", text, lang.as_deref().unwrap_or("<unknown>"));
    }

    let languages = service
        .supported_languages(None)
        .await
        .context("Failed to list languages")?;
    println!("\n{} languages supported by {}", languages.len(), service.provider());

    let supported = service.language_supported(&target).await?;
    println!("Target {} supported: {}", target, supported);

    if use_cache {
        info!("Cached {} entries", cache.len());
        cache
            .invalidate()
            .await
            .map_err(|e| anyhow::anyhow!(e))
            .context("Failed to invalidate cache")?;
    }

    Ok(())
}
