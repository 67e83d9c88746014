use crate::translation::{
    ProfanityHandling, ProviderConfig, ProviderKind, TextFormat, TranslationModel,
};
use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    // Package
    pub package_path: String,
    pub locale: String,
    pub strict_locale: bool,

    // Cache
    pub cache_enabled: bool,
    pub cache_namespace: String,

    // Translator
    pub translator_provider: ProviderKind,
    pub translator_token: Option<String>,
    pub translator_text_format: TextFormat,
    pub translator_model: TranslationModel,
    pub translator_profanity: ProfanityHandling,
    pub translator_api_url: Option<String>,
}

impl Config {
    /// Read everything the binaries need. Only `LOCALE_KIT_PACKAGE` is
    /// required.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::translator_from_env()?;
        config.package_path =
            std::env::var("LOCALE_KIT_PACKAGE").context("LOCALE_KIT_PACKAGE not set")?;
        Ok(config)
    }

    /// Like [`Config::from_env`] but without requiring a package, for tools
    /// that only translate.
    pub fn translator_from_env() -> Result<Self> {
        Ok(Self {
            // Package
            package_path: std::env::var("LOCALE_KIT_PACKAGE").unwrap_or_default(),
            locale: std::env::var("LOCALE_KIT_LOCALE")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "en-US".to_string()),
            strict_locale: env_flag("LOCALE_KIT_STRICT")?,

            // Cache
            cache_enabled: env_flag("LOCALE_KIT_CACHE")?,
            cache_namespace: std::env::var("LOCALE_KIT_CACHE_NAMESPACE")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "locale-kit".to_string()),

            // Translator
            translator_provider: std::env::var("TRANSLATOR_PROVIDER")
                .map(|v| ProviderKind::from_name(&v))
                .unwrap_or_default(),
            translator_token: std::env::var("TRANSLATOR_TOKEN")
                .ok()
                .filter(|v| !v.is_empty()),
            translator_text_format: std::env::var("TRANSLATOR_TEXT_FORMAT")
                .map(|v| TextFormat::from_name(&v))
                .unwrap_or_default(),
            translator_model: std::env::var("TRANSLATOR_MODEL")
                .map(|v| TranslationModel::from_code(&v))
                .unwrap_or_default(),
            translator_profanity: std::env::var("TRANSLATOR_PROFANITY")
                .map(|v| ProfanityHandling::from_name(&v))
                .unwrap_or_default(),
            translator_api_url: std::env::var("TRANSLATOR_API_URL")
                .ok()
                .filter(|v| !v.is_empty()),
        })
    }

    /// Provider settings for [`crate::TranslationService::new`].
    pub fn provider_config(&self) -> Result<ProviderConfig> {
        let token = self
            .translator_token
            .as_deref()
            .context("TRANSLATOR_TOKEN not set")?;

        Ok(ProviderConfig::new(self.translator_provider, token)?
            .with_text_format(self.translator_text_format)
            .with_translation_model(self.translator_model)
            .with_profanity_handling(self.translator_profanity))
    }
}

/// `true`/`1`/`yes`/`on` (any case) enable, unset or empty disables.
fn env_flag(name: &str) -> Result<bool> {
    let Ok(value) = std::env::var(name) else {
        return Ok(false);
    };
    match value.trim().to_lowercase().as_str() {
        "" | "0" | "false" | "no" | "off" => Ok(false),
        "1" | "true" | "yes" | "on" => Ok(true),
        other => anyhow::bail!("{} must be a boolean, got '{}'", name, other),
    }
}
