//! Yandex Translate (API v1.5) adapter.

use crate::error::{Error, Result};
use crate::translation::provider::{
    direction, post_form, zip_positional, DetectionResult, ProviderConfig, ProviderKind,
    TextFormat, TranslationProvider, TranslationResult,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

pub const YANDEX_API_URL: &str = "https://translate.yandex.net/api/v1.5/tr.json";

/// Longest text, in characters, Yandex accepts per item.
pub const MAX_TEXT_LENGTH: usize = 10_000;

const SUCCESS: i64 = 200;

/// Fields shared by every Yandex response; absent ones depend on the endpoint.
#[derive(Debug, Deserialize)]
struct YandexResponse {
    code: Option<i64>,
    lang: Option<Value>,
    text: Option<Vec<Value>>,
    langs: Option<BTreeMap<String, Value>>,
}

/// Human-readable message for a Yandex status code.
pub fn error_message(code: i64) -> String {
    match code {
        401 => "The API key that has been set within the class instance is not valid.".to_string(),
        402 => "The API key that has been set within the class instance has been rejected by Yandex.".to_string(),
        404 => "Your translate limit has expired, you cannot translate any text until the limit is reset.".to_string(),
        413 => "The provided text is too long.".to_string(),
        422 => "The provided text cannot be translated.".to_string(),
        501 => "The specified translation direction is not supported.".to_string(),
        other => format!("Unexpected error from Yandex ({other})."),
    }
}

pub struct YandexProvider {
    client: reqwest::Client,
    base_url: String,
    token: String,
    text_format: TextFormat,
}

impl YandexProvider {
    pub fn new(client: reqwest::Client, config: &ProviderConfig, base_url: Option<&str>) -> Self {
        Self {
            client,
            base_url: base_url
                .unwrap_or(YANDEX_API_URL)
                .trim_end_matches('/')
                .to_string(),
            token: config.token.clone(),
            text_format: config.text_format,
        }
    }

    fn format_param(&self) -> &'static str {
        match self.text_format {
            TextFormat::Text => "plain",
            TextFormat::Html => "html",
        }
    }

    async fn call(&self, endpoint: &str, params: &[(&str, String)]) -> Result<YandexResponse> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let body = post_form(&self.client, ProviderKind::Yandex, &url, params).await?;
        serde_json::from_value(body).map_err(|_| Error::invalid_response(ProviderKind::Yandex))
    }
}

/// Turn a non-200 `code` into a provider error. A missing code is only
/// tolerated when `required` is false.
fn check_code(response: &YandexResponse, required: bool) -> Result<()> {
    match response.code {
        Some(SUCCESS) => Ok(()),
        Some(code) => Err(Error::Provider {
            provider: ProviderKind::Yandex,
            code: Some(code),
            message: error_message(code),
        }),
        None if required => Err(Error::invalid_response(ProviderKind::Yandex)),
        None => Ok(()),
    }
}

#[async_trait]
impl TranslationProvider for YandexProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Yandex
    }

    fn max_text_length(&self) -> Option<usize> {
        Some(MAX_TEXT_LENGTH)
    }

    async fn translate(
        &self,
        texts: &[String],
        target: &str,
        source: Option<&str>,
    ) -> Result<TranslationResult> {
        let mut params: Vec<(&str, String)> = texts.iter().map(|t| ("text", t.clone())).collect();
        params.push(("lang", direction(target, source)));
        params.push(("format", self.format_param().to_string()));
        params.push(("key", self.token.clone()));

        let response = self.call("translate", &params).await?;
        check_code(&response, true)?;

        let translations = response
            .text
            .ok_or_else(|| Error::invalid_response(ProviderKind::Yandex))?;

        debug!("Yandex returned {} translations", translations.len());
        Ok(zip_positional(texts, &translations, |v| {
            v.as_str().map(str::to_string)
        }))
    }

    /// Yandex detects one text per request, so this issues `texts.len()`
    /// sequential calls.
    async fn detect(&self, texts: &[String], hints: &[String]) -> Result<DetectionResult> {
        let hints = hints.join(",");
        let mut detections = HashMap::with_capacity(texts.len());

        for text in texts {
            let mut params = vec![("key", self.token.clone()), ("text", text.clone())];
            if !hints.is_empty() {
                params.push(("hints", hints.clone()));
            }

            let response = self.call("detect", &params).await?;
            check_code(&response, true)?;

            let lang = response
                .lang
                .as_ref()
                .and_then(Value::as_str)
                .filter(|lang| !lang.is_empty())
                .map(str::to_string);
            detections.insert(text.clone(), lang);
        }

        Ok(detections)
    }

    async fn list_languages(&self, display_locale: &str) -> Result<BTreeMap<String, String>> {
        let params = [
            ("ui", display_locale.to_string()),
            ("key", self.token.clone()),
        ];

        let response = self.call("getLangs", &params).await?;
        check_code(&response, false)?;

        let langs = response
            .langs
            .ok_or_else(|| Error::invalid_response(ProviderKind::Yandex))?;

        Ok(langs
            .into_iter()
            .filter_map(|(code, name)| match name {
                Value::String(name) if !name.is_empty() => Some((code, name)),
                _ => None,
            })
            .collect())
    }
}
