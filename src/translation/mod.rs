//! Machine translation and language detection through a remote provider,
//! with results cached per text.
//!
//! # Architecture
//!
//! - `provider`: configuration types and the `TranslationProvider` trait
//! - `yandex`, `google`: HTTP adapters
//! - `microsoft`: placeholder adapter that rejects every call
//!
//! [`TranslationService`] validates input, builds cache keys and runs every
//! request through [`CacheOrchestrator`].

mod google;
mod microsoft;
mod provider;
mod yandex;

pub use google::GOOGLE_API_URL;
pub use provider::{
    build_provider, supported_providers, DetectionResult, ProfanityHandling, ProviderConfig,
    ProviderKind, TextFormat, TranslationModel, TranslationProvider, TranslationResult,
};
pub use yandex::{MAX_TEXT_LENGTH as YANDEX_MAX_TEXT_LENGTH, YANDEX_API_URL};

use crate::cache::{content_hash, CacheBackend, CacheOrchestrator, KEY_PREFIX};
use crate::error::{Error, Result};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Display locale used when none is given.
const DEFAULT_DISPLAY_LOCALE: &str = "en";

pub struct TranslationService {
    client: reqwest::Client,
    config: ProviderConfig,
    base_url: Option<String>,
    provider: Box<dyn TranslationProvider>,
    cache_enabled: bool,
    cache: Option<Arc<dyn CacheBackend>>,
}

impl Default for TranslationService {
    /// Yandex without a token; every remote call fails with
    /// [`Error::NotBound`] until one is set.
    fn default() -> Self {
        Self::new(ProviderConfig::default())
    }
}

impl TranslationService {
    pub fn new(config: ProviderConfig) -> Self {
        let client = reqwest::Client::new();
        let provider = build_provider(client.clone(), &config, None);
        Self {
            client,
            config,
            base_url: None,
            provider,
            cache_enabled: false,
            cache: None,
        }
    }

    /// Use `client` for every provider request.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self.rebuild();
        self
    }

    /// Send provider requests to `base_url` instead of the public endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self.rebuild();
        self
    }

    fn rebuild(&mut self) {
        self.provider = build_provider(self.client.clone(), &self.config, self.base_url.as_deref());
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn provider(&self) -> ProviderKind {
        self.config.provider
    }

    /// Switch to Yandex with the given token and text format.
    pub fn setup_yandex(&mut self, token: &str, text_format: TextFormat) -> Result<&mut Self> {
        self.setup(
            ProviderConfig::new(ProviderKind::Yandex, token)?.with_text_format(text_format),
        );
        Ok(self)
    }

    /// Switch to Google with the given token, text format and model.
    pub fn setup_google(
        &mut self,
        token: &str,
        text_format: TextFormat,
        model: TranslationModel,
    ) -> Result<&mut Self> {
        self.setup(
            ProviderConfig::new(ProviderKind::Google, token)?
                .with_text_format(text_format)
                .with_translation_model(model),
        );
        Ok(self)
    }

    fn setup(&mut self, config: ProviderConfig) {
        info!("Translation provider set to {}", config.provider);
        self.config = config;
        self.rebuild();
    }

    pub fn set_provider(&mut self, provider: ProviderKind) -> &mut Self {
        self.config.provider = provider;
        self.rebuild();
        self
    }

    pub fn set_token(&mut self, token: &str) -> Result<&mut Self> {
        if token.is_empty() {
            return Err(Error::InvalidArgument("Invalid token.".to_string()));
        }
        self.config.token = token.to_string();
        self.rebuild();
        Ok(self)
    }

    pub fn set_text_format(&mut self, text_format: TextFormat) -> &mut Self {
        self.config.text_format = text_format;
        self.rebuild();
        self
    }

    pub fn set_translation_model(&mut self, model: TranslationModel) -> &mut Self {
        self.config.translation_model = model;
        self.rebuild();
        self
    }

    pub fn set_profanity_handling(&mut self, handling: ProfanityHandling) -> &mut Self {
        self.config.profanity_handling = handling;
        self.rebuild();
        self
    }

    pub fn set_cache(&mut self, enabled: bool) -> &mut Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache_enabled
    }

    pub fn set_cache_backend(&mut self, backend: Option<Arc<dyn CacheBackend>>) -> &mut Self {
        self.cache = backend;
        self
    }

    pub fn cache_backend(&self) -> Option<&Arc<dyn CacheBackend>> {
        self.cache.as_ref()
    }

    /// Caching is enabled and a ready backend is attached.
    pub fn cache_ready(&self) -> bool {
        self.cache_enabled && self.cache.as_ref().is_some_and(|cache| cache.is_ready())
    }

    fn orchestrator(&self, fresh: bool) -> CacheOrchestrator<'_> {
        if !fresh && self.cache_ready() {
            CacheOrchestrator::new(self.cache.as_deref())
        } else {
            CacheOrchestrator::disabled()
        }
    }

    fn ensure_token(&self) -> Result<()> {
        if self.config.token.is_empty() {
            return Err(Error::NotBound("No token has been defined.".to_string()));
        }
        Ok(())
    }

    /// Drop empty texts, enforce the provider's length limit and remove
    /// duplicates, keeping first-seen order.
    fn prepare_texts<S: AsRef<str>>(&self, texts: &[S]) -> Result<Vec<String>> {
        let limit = self.provider.max_text_length();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut prepared = Vec::with_capacity(texts.len());

        for text in texts.iter().map(|text| text.as_ref()).filter(|t| !t.is_empty()) {
            if limit.is_some_and(|limit| text.chars().count() > limit) {
                return Err(Error::InvalidArgument("The given text is too long.".to_string()));
            }
            if seen.insert(text) {
                prepared.push(text.to_string());
            }
        }

        if prepared.is_empty() {
            return Err(Error::InvalidArgument("No valid text were found.".to_string()));
        }
        Ok(prepared)
    }

    /// Translate `texts` into `target`.
    ///
    /// Every distinct non-empty input appears in the result; `None` means the
    /// provider returned nothing for it (such entries are not cached). With
    /// `fresh` set the cache is neither read nor written.
    ///
    /// # Errors
    /// * [`Error::InvalidArgument`] for an empty target, no usable text or a
    ///   text over the provider's limit
    /// * [`Error::NotBound`] when no token is configured
    /// * [`Error::Transport`] / [`Error::Provider`] from the provider
    /// * [`Error::CacheRead`] / [`Error::CacheWrite`] from the cache backend
    pub async fn translate_text<S: AsRef<str>>(
        &self,
        texts: &[S],
        target: &str,
        source: Option<&str>,
        fresh: bool,
    ) -> Result<TranslationResult> {
        if target.is_empty() {
            return Err(Error::InvalidArgument("Invalid target language.".to_string()));
        }
        self.ensure_token()?;
        let texts = self.prepare_texts(texts)?;

        let prefix = format!("{}.translate:{}:", KEY_PREFIX, target);
        let keyed = texts
            .iter()
            .map(|text| (format!("{}{}", prefix, content_hash(text)), text.clone()))
            .collect();

        let provider = self.provider.as_ref();
        let resolved = self
            .orchestrator(fresh)
            .resolve_batch(keyed, |missing: Vec<String>| async move {
                debug!("Translating {} texts into {}", missing.len(), target);
                let translated = provider.translate(&missing, target, source).await?;
                Ok(answered(translated))
            })
            .await?;

        Ok(complete(texts, resolved))
    }

    /// Detect the language of each text. `hints` are candidate language
    /// codes forwarded to providers that accept them.
    ///
    /// Errors as for [`TranslationService::translate_text`].
    pub async fn detect_language<S: AsRef<str>>(
        &self,
        texts: &[S],
        hints: &[&str],
        fresh: bool,
    ) -> Result<DetectionResult> {
        self.ensure_token()?;
        let texts = self.prepare_texts(texts)?;
        let hints: Vec<String> = hints
            .iter()
            .filter(|hint| !hint.is_empty())
            .map(|hint| hint.to_string())
            .collect();

        let prefix = format!("{}.detect:", KEY_PREFIX);
        let keyed = texts
            .iter()
            .map(|text| (format!("{}{}", prefix, content_hash(text)), text.clone()))
            .collect();

        let provider = self.provider.as_ref();
        let hints = &hints;
        let resolved = self
            .orchestrator(fresh)
            .resolve_batch(keyed, |missing: Vec<String>| async move {
                debug!("Detecting language of {} texts", missing.len());
                let detected = provider.detect(&missing, hints).await?;
                Ok(answered(detected))
            })
            .await?;

        Ok(complete(texts, resolved))
    }

    /// Language code → name, names given in `display_locale` (default `en`).
    /// Always fetched from the provider.
    pub async fn supported_languages(
        &self,
        display_locale: Option<&str>,
    ) -> Result<BTreeMap<String, String>> {
        self.ensure_token()?;
        let display_locale = display_locale
            .filter(|locale| !locale.is_empty())
            .unwrap_or(DEFAULT_DISPLAY_LOCALE);

        let languages = self.provider.list_languages(display_locale).await?;
        debug!("{} supports {} languages", self.provider.kind(), languages.len());
        Ok(languages)
    }

    /// Whether the provider can handle `code` (compared lower-cased).
    pub async fn language_supported(&self, code: &str) -> Result<bool> {
        if code.is_empty() {
            return Err(Error::InvalidArgument("Invalid language code.".to_string()));
        }
        let languages = self.supported_languages(Some(DEFAULT_DISPLAY_LOCALE)).await?;
        Ok(languages.contains_key(&code.to_lowercase()))
    }
}

/// Keep only the entries the provider actually answered.
fn answered(results: HashMap<String, Option<String>>) -> HashMap<String, String> {
    results
        .into_iter()
        .filter_map(|(text, value)| value.map(|value| (text, value)))
        .collect()
}

/// Give every requested text an entry, `None` where nothing was resolved.
fn complete(texts: Vec<String>, mut resolved: HashMap<String, String>) -> HashMap<String, Option<String>> {
    texts
        .into_iter()
        .map(|text| {
            let value = resolved.remove(&text);
            (text, value)
        })
        .collect()
}
