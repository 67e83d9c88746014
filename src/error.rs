//! Crate-wide error type.
//!
//! Every public operation returns [`Result`]. Variants are terminal for the
//! call that raised them; nothing in this crate retries. The underlying cause
//! (SQLite, HTTP, cache backend) stays reachable through
//! [`std::error::Error::source`] so callers decide how much to log.

use crate::translation::ProviderKind;

/// Boxed error returned by external collaborators such as cache backends.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or empty input, detected before any I/O.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation needs state that has not been set up yet
    /// (no package, no locale, no provider token).
    #[error("precondition failed: {0}")]
    NotBound(String),

    /// Neither the exact locale nor its language prefix is in the package.
    #[error("unsupported locale: {0}")]
    UnsupportedLocale(String),

    #[error("package store error: {context}")]
    Store {
        context: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("request to {provider} failed")]
    Transport {
        provider: ProviderKind,
        #[source]
        source: reqwest::Error,
    },

    /// The provider answered but reported a failure or returned a body of
    /// an unexpected shape (`code` is `None` in the latter case).
    #[error("{message}")]
    Provider {
        provider: ProviderKind,
        code: Option<i64>,
        message: String,
    },

    #[error("an error occurred while fetching data from the cache")]
    CacheRead(#[source] BoxError),

    #[error("an error occurred while saving elements within the cache")]
    CacheWrite(#[source] BoxError),
}

impl Error {
    pub(crate) fn store(context: impl Into<String>, source: sqlx::Error) -> Self {
        Error::Store {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn invalid_response(provider: ProviderKind) -> Self {
        Error::Provider {
            provider,
            code: None,
            message: format!("Invalid response from {}.", provider.display_name()),
        }
    }

    /// Provider-specific status code carried by a [`Error::Provider`].
    pub fn provider_code(&self) -> Option<i64> {
        match self {
            Error::Provider { code, .. } => *code,
            _ => None,
        }
    }
}
