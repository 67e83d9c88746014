//! Provider configuration and the capability trait every provider adapter
//! implements.

use crate::error::{Error, Result};
use crate::translation::{google::GoogleProvider, microsoft::MicrosoftProvider, yandex::YandexProvider};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::{debug, warn};

/// Original text → translated text, or `None` when the provider had no answer.
pub type TranslationResult = HashMap<String, Option<String>>;

/// Original text → detected language code, or `None` when undetectable.
pub type DetectionResult = HashMap<String, Option<String>>;

/// Remote translation providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProviderKind {
    #[default]
    Yandex,
    Google,
    Microsoft,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::Google,
        ProviderKind::Microsoft,
        ProviderKind::Yandex,
    ];

    /// Lower-case identifier (e.g., "yandex").
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::Yandex => "yandex",
            ProviderKind::Google => "google",
            ProviderKind::Microsoft => "microsoft",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::Yandex => "Yandex",
            ProviderKind::Google => "Google",
            ProviderKind::Microsoft => "Microsoft",
        }
    }

    /// Parse a provider name, case-insensitively. Unknown names select
    /// Yandex.
    pub fn from_name(name: &str) -> Self {
        Self::parse(name).unwrap_or_default()
    }

    /// Parse a provider name, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn is_supported(name: &str) -> bool {
        Self::parse(name).is_some()
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Names of every supported provider.
pub fn supported_providers() -> Vec<&'static str> {
    ProviderKind::ALL.iter().map(|kind| kind.name()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextFormat {
    #[default]
    Text,
    Html,
}

impl TextFormat {
    pub fn name(&self) -> &'static str {
        match self {
            TextFormat::Text => "text",
            TextFormat::Html => "html",
        }
    }

    /// `html` (any case) selects HTML, everything else plain text.
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("html") {
            TextFormat::Html
        } else {
            TextFormat::Text
        }
    }
}

/// Translation engine requested from providers that offer a choice (Google).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranslationModel {
    #[default]
    Neural,
    PhraseBased,
}

impl TranslationModel {
    pub fn code(&self) -> &'static str {
        match self {
            TranslationModel::Neural => "nmt",
            TranslationModel::PhraseBased => "pbmt",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TranslationModel::Neural => "Neural Machine Translation",
            TranslationModel::PhraseBased => "Phrase-Based Machine Translation",
        }
    }

    /// `pbmt` selects phrase-based translation, everything else neural.
    pub fn from_code(code: &str) -> Self {
        if code.trim().eq_ignore_ascii_case("pbmt") {
            TranslationModel::PhraseBased
        } else {
            TranslationModel::Neural
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProfanityHandling {
    #[default]
    NoAction,
    Marked,
    Deleted,
}

impl ProfanityHandling {
    pub fn name(&self) -> &'static str {
        match self {
            ProfanityHandling::NoAction => "NoAction",
            ProfanityHandling::Marked => "Marked",
            ProfanityHandling::Deleted => "Deleted",
        }
    }

    /// `marked` or `deleted` (any case); everything else means no action.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "marked" => ProfanityHandling::Marked,
            "deleted" => ProfanityHandling::Deleted,
            _ => ProfanityHandling::NoAction,
        }
    }
}

/// Settings for one provider. Fields a provider does not support are
/// ignored by its adapter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProviderConfig {
    pub provider: ProviderKind,
    pub token: String,
    pub text_format: TextFormat,
    pub translation_model: TranslationModel,
    pub profanity_handling: ProfanityHandling,
}

impl ProviderConfig {
    pub fn new(provider: ProviderKind, token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(Error::InvalidArgument("Invalid token.".to_string()));
        }
        Ok(Self {
            provider,
            token,
            ..Self::default()
        })
    }

    pub fn with_text_format(mut self, text_format: TextFormat) -> Self {
        self.text_format = text_format;
        self
    }

    pub fn with_translation_model(mut self, translation_model: TranslationModel) -> Self {
        self.translation_model = translation_model;
        self
    }

    pub fn with_profanity_handling(mut self, profanity_handling: ProfanityHandling) -> Self {
        self.profanity_handling = profanity_handling;
        self
    }
}

/// Operations every provider adapter offers.
///
/// Inputs are already validated and deduplicated by the caller. Results are
/// keyed by the original text; every input has an entry, `None` when the
/// provider gave no usable answer for it.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Longest text, in characters, the provider accepts.
    fn max_text_length(&self) -> Option<usize> {
        None
    }

    async fn translate(
        &self,
        texts: &[String],
        target: &str,
        source: Option<&str>,
    ) -> Result<TranslationResult>;

    async fn detect(&self, texts: &[String], hints: &[String]) -> Result<DetectionResult>;

    /// Language code → language name, names in `display_locale`.
    async fn list_languages(&self, display_locale: &str) -> Result<BTreeMap<String, String>>;
}

/// Build the adapter for `config.provider`.
pub fn build_provider(
    client: reqwest::Client,
    config: &ProviderConfig,
    base_url: Option<&str>,
) -> Box<dyn TranslationProvider> {
    match config.provider {
        ProviderKind::Yandex => Box::new(YandexProvider::new(client, config, base_url)),
        ProviderKind::Google => Box::new(GoogleProvider::new(client, config, base_url)),
        ProviderKind::Microsoft => Box::new(MicrosoftProvider),
    }
}

/// `src-tgt` when a source locale is given, otherwise just `tgt`.
pub(crate) fn direction(target: &str, source: Option<&str>) -> String {
    match source.filter(|source| !source.is_empty()) {
        Some(source) => format!("{}-{}", source, target),
        None => target.to_string(),
    }
}

/// Pair every input with the string at the same position of `values`.
pub(crate) fn zip_positional<F>(texts: &[String], values: &[Value], extract: F) -> HashMap<String, Option<String>>
where
    F: Fn(&Value) -> Option<String>,
{
    texts
        .iter()
        .enumerate()
        .map(|(index, text)| (text.clone(), values.get(index).and_then(&extract)))
        .collect()
}

/// POST `params` as a URL-encoded form and parse the JSON body.
///
/// Transport failures map to [`Error::Transport`]; an empty or non-JSON body
/// maps to an invalid-response [`Error::Provider`]. The HTTP status is not
/// interpreted here, providers signal failures inside the body.
pub(crate) async fn post_form(
    client: &reqwest::Client,
    provider: ProviderKind,
    url: &str,
    params: &[(&str, String)],
) -> Result<Value> {
    debug!("POST {} ({} form fields)", url, params.len());

    let response = client
        .post(url)
        .form(params)
        .send()
        .await
        .map_err(|source| Error::Transport { provider, source })?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|source| Error::Transport { provider, source })?;

    if body.trim().is_empty() {
        warn!("Empty response from {} ({})", provider, status);
        return Err(Error::invalid_response(provider));
    }

    serde_json::from_str(&body).map_err(|e| {
        warn!("Unparseable response from {} ({}): {}", provider, status, e);
        Error::invalid_response(provider)
    })
}
