//! Locale packages: locale matching and label lookup.
//!
//! # Architecture
//!
//! - `locale`: locale entries, the active-locale snapshot and the
//!   exact-then-language matching algorithm
//! - `label`: validated label keys
//! - `package`: `PackageResolver`, which binds a package file, tracks the
//!   active locale and serves labels through the cache
//!
//! # Example
//!
//! ```rust,ignore
//! use locale_kit::i18n::{LabelKey, PackageResolver};
//!
//! let mut package = PackageResolver::open("demo.db", "en-US", false).await?;
//! let labels = package.get_labels(&[LabelKey::Id(1), LabelKey::Id(2)], false).await?;
//! ```

mod label;
pub mod locale;
mod package;

pub use label::LabelKey;
pub use locale::{ActiveLocaleState, LocaleCatalog, LocaleEntry};
pub use package::PackageResolver;
