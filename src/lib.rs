//! Keyed text resolution from locale packages and remote translation
//! providers, with an optional shared cache in front of both.
//!
//! - [`i18n::PackageResolver`] serves labels from a SQLite locale package
//! - [`translation::TranslationService`] translates text and detects
//!   languages through Yandex or Google
//! - [`cache::CacheOrchestrator`] is the cache-then-source pipeline both use

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod i18n;
pub mod translation;

pub use cache::{CacheBackend, MemoryCache};
pub use error::{Error, Result};
pub use i18n::{LabelKey, PackageResolver};
pub use translation::{ProviderConfig, ProviderKind, TranslationService};
