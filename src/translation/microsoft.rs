//! Microsoft Translator placeholder. Accepted as a configuration so callers
//! can select it, but every operation fails.

use crate::error::{Error, Result};
use crate::translation::provider::{
    DetectionResult, ProviderKind, TranslationProvider, TranslationResult,
};
use async_trait::async_trait;
use std::collections::BTreeMap;

pub struct MicrosoftProvider;

fn not_implemented() -> Error {
    Error::Provider {
        provider: ProviderKind::Microsoft,
        code: None,
        message: "Microsoft Translator is not implemented yet.".to_string(),
    }
}

#[async_trait]
impl TranslationProvider for MicrosoftProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Microsoft
    }

    async fn translate(
        &self,
        _texts: &[String],
        _target: &str,
        _source: Option<&str>,
    ) -> Result<TranslationResult> {
        Err(not_implemented())
    }

    async fn detect(&self, _texts: &[String], _hints: &[String]) -> Result<DetectionResult> {
        Err(not_implemented())
    }

    async fn list_languages(&self, _display_locale: &str) -> Result<BTreeMap<String, String>> {
        Err(not_implemented())
    }
}
