//! Locale matching against a package's supported locale set.
//!
//! A requested locale is matched exactly first. When that fails and the
//! caller allows it, the language prefix (`en` for `en-CA`) is matched
//! against the package's languages, one level deep.

use crate::error::{Error, Result};
use async_trait::async_trait;
use tracing::debug;

/// One locale supported by a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleEntry {
    /// Lower-case language code (e.g., "en")
    pub language: String,

    /// Full locale code as stored (e.g., "en-US")
    pub locale: String,

    /// Join key used by label rows, always > 0
    pub id: i64,

    pub locked: bool,
}

/// The locale currently bound to a package session.
///
/// Replaced wholesale on every successful `set_locale`; never edited in
/// place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveLocaleState {
    pub locale_code: String,
    pub locale_id: i64,
    pub is_fallback: bool,
}

/// Lookup capability needed by [`resolve`].
#[async_trait]
pub trait LocaleCatalog: Send + Sync {
    /// Entry whose code equals `code` exactly (case-sensitive).
    async fn locale_by_code(&self, code: &str) -> Result<Option<LocaleEntry>>;

    /// First entry whose language equals `language`.
    async fn locale_by_language(&self, language: &str) -> Result<Option<LocaleEntry>>;
}

#[async_trait]
impl LocaleCatalog for Vec<LocaleEntry> {
    async fn locale_by_code(&self, code: &str) -> Result<Option<LocaleEntry>> {
        Ok(self.iter().find(|entry| entry.locale == code).cloned())
    }

    async fn locale_by_language(&self, language: &str) -> Result<Option<LocaleEntry>> {
        Ok(self.iter().find(|entry| entry.language == language).cloned())
    }
}

/// Language prefix of a locale code, lower-cased.
///
/// Returns `None` when the code has no `-` separator.
pub fn language_prefix(locale: &str) -> Option<String> {
    locale
        .split_once('-')
        .map(|(language, _)| language.to_lowercase())
}

/// Resolve `requested` against `catalog`.
///
/// # Errors
/// * [`Error::InvalidArgument`] when `requested` is empty
/// * [`Error::UnsupportedLocale`] when there is no exact match and either
///   `strict` is set, the code has no language prefix, or no locale of that
///   language exists
/// * Whatever the catalog returns for a failed lookup
pub async fn resolve<C>(catalog: &C, requested: &str, strict: bool) -> Result<ActiveLocaleState>
where
    C: LocaleCatalog + ?Sized,
{
    if requested.is_empty() {
        return Err(Error::InvalidArgument("Invalid locale code.".to_string()));
    }

    if let Some(entry) = catalog.locale_by_code(requested).await? {
        return Ok(ActiveLocaleState {
            locale_code: requested.to_string(),
            locale_id: entry.id,
            is_fallback: false,
        });
    }

    if strict {
        return Err(Error::UnsupportedLocale(requested.to_string()));
    }

    let Some(language) = language_prefix(requested) else {
        return Err(Error::UnsupportedLocale(requested.to_string()));
    };

    match catalog.locale_by_language(&language).await? {
        Some(entry) => {
            debug!(
                "Locale {} not found, falling back to language {} (id {})",
                requested, language, entry.id
            );
            Ok(ActiveLocaleState {
                locale_code: language,
                locale_id: entry.id,
                is_fallback: true,
            })
        }
        None => Err(Error::UnsupportedLocale(requested.to_string())),
    }
}
