//! Google Cloud Translation (v2) adapter.

use crate::error::{Error, Result};
use crate::translation::provider::{
    direction, post_form, zip_positional, DetectionResult, ProviderConfig, ProviderKind,
    TextFormat, TranslationModel, TranslationProvider, TranslationResult,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

pub const GOOGLE_API_URL: &str = "https://translation.googleapis.com/language/translate/v2";

/// Detection result Google uses for text it cannot classify.
const UNDETERMINED: &str = "und";

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    data: Option<GoogleData>,
    error: Option<GoogleError>,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    code: Option<i64>,
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GoogleData {
    #[serde(default)]
    translations: Vec<Value>,
    #[serde(default)]
    detections: Vec<Value>,
    #[serde(default)]
    languages: Vec<Value>,
}

pub fn error_message(code: i64) -> String {
    format!("Unexpected error from Google ({code}).")
}

pub struct GoogleProvider {
    client: reqwest::Client,
    base_url: String,
    token: String,
    text_format: TextFormat,
    model: TranslationModel,
}

impl GoogleProvider {
    pub fn new(client: reqwest::Client, config: &ProviderConfig, base_url: Option<&str>) -> Self {
        Self {
            client,
            base_url: base_url
                .unwrap_or(GOOGLE_API_URL)
                .trim_end_matches('/')
                .to_string(),
            token: config.token.clone(),
            text_format: config.text_format,
            model: config.translation_model,
        }
    }

    /// POST to `{base}{suffix}` and return the `data` object.
    async fn call(&self, suffix: &str, params: &[(&str, String)]) -> Result<GoogleData> {
        let url = format!("{}{}", self.base_url, suffix);
        let body = post_form(&self.client, ProviderKind::Google, &url, params).await?;
        let response: GoogleResponse = serde_json::from_value(body)
            .map_err(|_| Error::invalid_response(ProviderKind::Google))?;

        if let Some(GoogleError {
            code: Some(code),
            message,
        }) = response.error
        {
            debug!(
                "Google reported error {}: {}",
                code,
                message.as_deref().unwrap_or("")
            );
            return Err(Error::Provider {
                provider: ProviderKind::Google,
                code: Some(code),
                message: error_message(code),
            });
        }

        response
            .data
            .ok_or_else(|| Error::invalid_response(ProviderKind::Google))
    }
}

/// A detection entry is either a bare language code or a list of candidates,
/// the first of which carries the best guess.
fn detected_language(entry: &Value) -> Option<String> {
    let language = match entry {
        Value::String(language) => Some(language.as_str()),
        Value::Array(candidates) => candidates
            .first()
            .and_then(|candidate| candidate.get("language"))
            .and_then(Value::as_str),
        Value::Object(_) => entry.get("language").and_then(Value::as_str),
        _ => None,
    };
    language
        .filter(|language| !language.is_empty() && *language != UNDETERMINED)
        .map(str::to_string)
}

/// `{language, name}` entry of the language catalog. Entries without a
/// language code are skipped; a missing name falls back to the code.
fn catalog_entry(entry: &Value) -> Option<(String, String)> {
    let language = entry
        .get("language")
        .and_then(Value::as_str)
        .filter(|language| !language.is_empty())?;
    let name = entry
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .unwrap_or(language);
    Some((language.to_string(), name.to_string()))
}

#[async_trait]
impl TranslationProvider for GoogleProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    async fn translate(
        &self,
        texts: &[String],
        target: &str,
        source: Option<&str>,
    ) -> Result<TranslationResult> {
        let mut params: Vec<(&str, String)> = texts.iter().map(|t| ("text", t.clone())).collect();
        params.push(("lang", direction(target, source)));
        params.push(("format", self.text_format.name().to_string()));
        params.push(("model", self.model.code().to_string()));
        params.push(("key", self.token.clone()));

        let data = self.call("", &params).await?;
        if data.translations.is_empty() {
            return Err(Error::invalid_response(ProviderKind::Google));
        }

        Ok(zip_positional(texts, &data.translations, |entry| {
            entry
                .get("translatedText")
                .and_then(Value::as_str)
                .map(str::to_string)
        }))
    }

    async fn detect(&self, texts: &[String], _hints: &[String]) -> Result<DetectionResult> {
        let mut params: Vec<(&str, String)> = texts.iter().map(|t| ("text", t.clone())).collect();
        params.push(("key", self.token.clone()));

        let data = self.call("/detect", &params).await?;
        if data.detections.is_empty() {
            return Err(Error::invalid_response(ProviderKind::Google));
        }

        Ok(zip_positional(texts, &data.detections, detected_language))
    }

    async fn list_languages(&self, display_locale: &str) -> Result<BTreeMap<String, String>> {
        let params = [
            ("target", display_locale.to_string()),
            ("model", self.model.code().to_string()),
            ("key", self.token.clone()),
        ];

        let data = self.call("/languages", &params).await?;
        if data.languages.is_empty() {
            return Err(Error::invalid_response(ProviderKind::Google));
        }

        Ok(data.languages.iter().filter_map(catalog_entry).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        matchers::{body_string_contains, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn provider(server: &MockServer) -> GoogleProvider {
        let config = ProviderConfig::new(ProviderKind::Google, "g-key")
            .unwrap()
            .with_text_format(TextFormat::Html)
            .with_translation_model(TranslationModel::PhraseBased);
        GoogleProvider::new(reqwest::Client::new(), &config, Some(&server.uri()))
    }

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    // ==================== Detection Parsing Tests ====================

    #[test]
    fn test_detected_language_shapes() {
        assert_eq!(detected_language(&json!("fr")), Some("fr".to_string()));
        assert_eq!(
            detected_language(&json!([{"language": "de", "confidence": 0.9}])),
            Some("de".to_string())
        );
        assert_eq!(
            detected_language(&json!({"language": "es"})),
            Some("es".to_string())
        );
        assert_eq!(detected_language(&json!("und")), None);
        assert_eq!(detected_language(&json!([])), None);
        assert_eq!(detected_language(&json!(3)), None);
    }

    // ==================== Translate Tests ====================

    #[tokio::test]
    async fn test_translate_sends_model_and_format() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_string_contains("lang=en&format=html&model=pbmt&key=g-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"translations": [
                    {"translatedText": "Hello"},
                    {"detectedSourceLanguage": "it"}
                ]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = provider(&server)
            .translate(&texts(&["Ciao", "Boh"]), "en", None)
            .await
            .expect("Should succeed");

        assert_eq!(result["Ciao"], Some("Hello".to_string()));
        assert_eq!(result["Boh"], None);
    }

    #[tokio::test]
    async fn test_translate_error_object() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"code": 400, "message": "API key not valid."}
            })))
            .mount(&server)
            .await;

        let err = provider(&server)
            .translate(&texts(&["Ciao"]), "en", None)
            .await
            .unwrap_err();

        assert_eq!(err.provider_code(), Some(400));
        assert_eq!(err.to_string(), "Unexpected error from Google (400).");
    }

    #[tokio::test]
    async fn test_translate_empty_translations_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": {"translations": []}})),
            )
            .mount(&server)
            .await;

        let err = provider(&server)
            .translate(&texts(&["Ciao"]), "en", None)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Invalid response from Google.");
    }

    // ==================== Detect Tests ====================

    #[tokio::test]
    async fn test_detect_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/detect"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"detections": [
                    [{"language": "en", "confidence": 1.0}],
                    "it"
                ]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = provider(&server)
            .detect(&texts(&["Hello world!", "Ciao"]), &[])
            .await
            .expect("Should succeed");

        assert_eq!(result["Hello world!"], Some("en".to_string()));
        assert_eq!(result["Ciao"], Some("it".to_string()));
    }

    // ==================== Languages Tests ====================

    #[tokio::test]
    async fn test_list_languages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/languages"))
            .and(body_string_contains("target=en"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"languages": [
                    {"language": "en", "name": "English"},
                    {"language": "it", "name": "Italian"}
                ]}
            })))
            .mount(&server)
            .await;

        let langs = provider(&server)
            .list_languages("en")
            .await
            .expect("Should succeed");

        assert_eq!(langs.len(), 2);
        assert_eq!(langs["it"], "Italian");
    }

    #[tokio::test]
    async fn test_list_languages_skips_malformed_entries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/languages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"languages": [
                    {"name": "Nameless"},
                    {"language": 42, "name": "Numeric"},
                    {"language": "de"},
                    {"language": "it", "name": "Italian"}
                ]}
            })))
            .mount(&server)
            .await;

        let langs = provider(&server)
            .list_languages("en")
            .await
            .expect("Should succeed");

        assert_eq!(langs.len(), 2);
        assert_eq!(langs["de"], "de");
        assert_eq!(langs["it"], "Italian");
    }

    #[tokio::test]
    async fn test_list_languages_missing_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/languages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let err = provider(&server).list_languages("en").await.unwrap_err();
        assert!(matches!(err, Error::Provider { code: None, .. }));
    }
}
