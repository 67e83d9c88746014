//! Label lookup against a locale package, with optional caching.

use crate::cache::{content_hash, CacheBackend, CacheOrchestrator, KEY_PREFIX};
use crate::db::PackageStore;
use crate::error::{Error, Result};
use crate::i18n::locale::{self, ActiveLocaleState, LocaleEntry};
use crate::i18n::LabelKey;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Everything tied to one package path. Dropped as a whole when the path
/// changes.
struct PackageBinding {
    path: String,
    store: PackageStore,
    identifier: String,
    locale: Option<ActiveLocaleState>,
}

/// Serves labels from a locale package for one active locale.
///
/// Bind a package with [`PackageResolver::set_path`] (or
/// [`PackageResolver::open`]), choose a locale with
/// [`PackageResolver::set_locale`], then look labels up with
/// [`PackageResolver::get_labels`]. When caching is enabled and a backend is
/// ready, label lookups go through the cache first.
#[derive(Default)]
pub struct PackageResolver {
    binding: Option<PackageBinding>,
    cache_enabled: bool,
    cache: Option<Arc<dyn CacheBackend>>,
}

impl std::fmt::Debug for PackageResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageResolver")
            .field("cache_enabled", &self.cache_enabled)
            .finish_non_exhaustive()
    }
}

impl PackageResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the package at `path` and set `locale` on it.
    pub async fn open(path: &str, locale: &str, strict: bool) -> Result<Self> {
        let mut resolver = Self::new();
        resolver.set_package(path, locale, strict).await?;
        Ok(resolver)
    }

    /// Bind the package at `path` and set `locale` on it.
    pub async fn set_package(&mut self, path: &str, locale: &str, strict: bool) -> Result<&ActiveLocaleState> {
        if path.is_empty() {
            return Err(Error::InvalidArgument("Invalid path.".to_string()));
        }
        if locale.is_empty() {
            return Err(Error::InvalidArgument("Invalid locale code.".to_string()));
        }
        self.set_path(path).await?;
        self.set_locale(locale, strict).await
    }

    /// Connect to the package at `path`, replacing any previous binding.
    ///
    /// The previous binding (and its active locale) is dropped before the
    /// new connection is attempted, so a failed call leaves the resolver
    /// unbound.
    pub async fn set_path(&mut self, path: &str) -> Result<()> {
        if path.is_empty() {
            return Err(Error::InvalidArgument("Invalid path.".to_string()));
        }

        if let Some(previous) = self.binding.take() {
            previous.store.close().await;
        }

        let store = PackageStore::open(path).await?;
        let identifier = match store.identifier().await? {
            Some(identifier) => identifier,
            None => content_hash(path),
        };

        info!("Connected to locale package {} ({})", path, identifier);

        self.binding = Some(PackageBinding {
            path: path.to_string(),
            store,
            identifier,
            locale: None,
        });
        Ok(())
    }

    pub fn path(&self) -> Option<&str> {
        self.binding.as_ref().map(|binding| binding.path.as_str())
    }

    pub fn connected(&self) -> bool {
        self.binding.is_some()
    }

    /// Identifier used to namespace this package's cache keys.
    pub fn identifier(&self) -> Result<&str> {
        Ok(self.bound()?.identifier.as_str())
    }

    /// Override the package identifier; `None` clears it, which drops the
    /// identifier segment from cache keys.
    pub fn set_identifier(&mut self, identifier: Option<&str>) -> Result<()> {
        let binding = self.bound_mut()?;
        binding.identifier = identifier.unwrap_or_default().to_string();
        Ok(())
    }

    pub async fn supported_locales(&self) -> Result<Vec<LocaleEntry>> {
        self.bound()?.store.locales().await
    }

    /// Whether `locale` would be accepted by [`PackageResolver::set_locale`].
    pub async fn is_locale_supported(&self, locale: &str, strict: bool) -> Result<bool> {
        if locale.is_empty() {
            return Err(Error::InvalidArgument("Invalid locale code.".to_string()));
        }
        let binding = self.bound()?;
        match locale::resolve(&binding.store, locale, strict).await {
            Ok(_) => Ok(true),
            Err(Error::UnsupportedLocale(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Resolve `locale` against the package and make it the active locale.
    ///
    /// On failure the previously active locale stays in place.
    pub async fn set_locale(&mut self, locale: &str, strict: bool) -> Result<&ActiveLocaleState> {
        if locale.is_empty() {
            return Err(Error::InvalidArgument("Invalid locale code.".to_string()));
        }
        let binding = self.bound_mut()?;
        let state = locale::resolve(&binding.store, locale, strict).await?;

        if state.is_fallback {
            info!(
                "Locale {} is not supported by the package, using {} instead",
                locale, state.locale_code
            );
        }

        let state = binding.locale.insert(state);
        Ok(&*state)
    }

    pub fn locale(&self) -> Option<&ActiveLocaleState> {
        self.binding.as_ref().and_then(|binding| binding.locale.as_ref())
    }

    pub fn is_fallback(&self) -> bool {
        self.locale().is_some_and(|state| state.is_fallback)
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

    /// Caching is on, a backend is set and the backend is ready.
    pub fn cache_ready(&self) -> bool {
        self.cache_enabled && self.cache.as_ref().is_some_and(|cache| cache.is_ready())
    }

    /// Look up labels for the active locale.
    ///
    /// Duplicate keys are collapsed. Keys the package has no value for are
    /// absent from the result. With `fresh` set, the cache is bypassed for
    /// both reading and writing.
    ///
    /// # Errors
    /// * [`Error::NotBound`] when no package or no locale is set
    /// * [`Error::InvalidArgument`] for a non-positive id or an empty name
    pub async fn get_labels(
        &self,
        keys: &[LabelKey],
        fresh: bool,
    ) -> Result<HashMap<LabelKey, String>> {
        let (binding, state) = self.bound_locale()?;
        for key in keys {
            key.validate()?;
        }
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let prefix = if binding.identifier.is_empty() {
            format!("{}.lbl:{}:", KEY_PREFIX, state.locale_id)
        } else {
            format!(
                "{}.lbl:{}:{}:",
                KEY_PREFIX, binding.identifier, state.locale_id
            )
        };
        let keyed = keys
            .iter()
            .map(|key| (format!("{}{}", prefix, key.cache_segment()), key.clone()))
            .collect();

        let backend = if !fresh && self.cache_ready() {
            self.cache.as_deref()
        } else {
            None
        };

        let store = &binding.store;
        let locale_id = state.locale_id;
        let labels = CacheOrchestrator::new(backend)
            .resolve_batch(keyed, |missing: Vec<LabelKey>| async move {
                store.labels(locale_id, &missing).await
            })
            .await?;

        debug!("Resolved {} labels for locale {}", labels.len(), state.locale_code);
        Ok(labels)
    }

    /// Every label of the active locale, read straight from the package.
    pub async fn get_all_labels(&self) -> Result<HashMap<LabelKey, String>> {
        let (binding, state) = self.bound_locale()?;
        binding.store.all_labels(state.locale_id).await
    }

    fn bound(&self) -> Result<&PackageBinding> {
        self.binding
            .as_ref()
            .ok_or_else(|| Error::NotBound("No package has been defined.".to_string()))
    }

    fn bound_mut(&mut self) -> Result<&mut PackageBinding> {
        self.binding
            .as_mut()
            .ok_or_else(|| Error::NotBound("No package has been defined.".to_string()))
    }

    fn bound_locale(&self) -> Result<(&PackageBinding, &ActiveLocaleState)> {
        let binding = self.bound()?;
        let state = binding
            .locale
            .as_ref()
            .ok_or_else(|| Error::NotBound("No locale defined.".to_string()))?;
        Ok((binding, state))
    }
}
