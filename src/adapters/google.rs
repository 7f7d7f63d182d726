use crate::domain::ports::TranslationService;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://translate.googleapis.com";

/// Google Translate 的公開網頁端點（`translate_a/single`，client=gtx）
pub struct GoogleTranslateService {
    client: Client,
    endpoint: String,
    source_language: String,
    target_language: String,
}

impl GoogleTranslateService {
    pub fn new(
        endpoint: impl Into<String>,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            source_language: source_language.into(),
            target_language: target_language.into(),
        })
    }

    pub fn target_language(&self) -> &str {
        &self.target_language
    }
}

#[async_trait]
impl TranslationService for GoogleTranslateService {
    async fn translate(&self, text: &str) -> Result<String> {
        let url = format!("{}/translate_a/single", self.endpoint.trim_end_matches('/'));

        let response = self
            .client
            .get(&url)
            .query(&[
                ("client", "gtx"),
                ("sl", self.source_language.as_str()),
                ("tl", self.target_language.as_str()),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EtlError::TranslationError {
                message: format!("HTTP {}: {}", status, body.chars().take(200).collect::<String>()),
            });
        }

        let body: Value = response.json().await?;
        parse_translation(&body)
    }
}

/// 回應形如 `[[["譯文", "原文", ...], ...], ...]`，依序串接每段譯文
pub fn parse_translation(body: &Value) -> Result<String> {
    let segments = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| EtlError::TranslationError {
            message: "unexpected response shape: missing segment list".to_string(),
        })?;

    let translated: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();

    if translated.is_empty() {
        return Err(EtlError::TranslationError {
            message: "response contained no translated text".to_string(),
        });
    }
    Ok(translated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn service(server: &MockServer) -> GoogleTranslateService {
        GoogleTranslateService::new(server.base_url(), "auto", "bn", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_parse_joins_segments() {
        let body = json!([[["কে ", "Who ", null], ["রাজা?", "is king?", null]], null, "en"]);
        assert_eq!(parse_translation(&body).unwrap(), "কে রাজা?");
    }

    #[test]
    fn test_parse_rejects_unexpected_shape() {
        assert!(parse_translation(&json!({"error": "bad"})).is_err());
        assert!(parse_translation(&json!([[]])).is_err());
    }

    #[tokio::test]
    async fn test_translate_sends_language_pair() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/translate_a/single")
                .query_param("client", "gtx")
                .query_param("sl", "auto")
                .query_param("tl", "bn")
                .query_param("q", "Bob");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!([[["ববি", "Bob", null, null, 1]], null, "en"]));
        });

        let translated = service(&server).translate("Bob").await.unwrap();

        api_mock.assert();
        assert_eq!(translated, "ববি");
    }

    #[tokio::test]
    async fn test_translate_rate_limited_is_error() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/translate_a/single");
            then.status(429).body("Too Many Requests");
        });

        let err = service(&server).translate("Bob").await.unwrap_err();

        api_mock.assert();
        assert!(matches!(err, EtlError::TranslationError { .. }));
        assert!(err.to_string().contains("429"));
    }
}
