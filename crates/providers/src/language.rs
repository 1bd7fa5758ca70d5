//! 语言检测适配器
//!
//! 支持自建 Lingua 检测服务与 Google Cloud Translation 检测接口。
//! 提示词语言决定后续 TTS 的语言参数。

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde_json::{json, Value};
use vidcast_core::models::{LanguageDetection, LanguageInfo};

use crate::error::{ProviderCallError, ProviderCallResult};
use crate::json_probe::{find_f64_value, find_string_value, find_value_by_path, normalize_host};
use crate::traits::{AdapterContext, LanguageProvider};

const DEFAULT_LINGUA_HOST: &str = "http://localhost:7860";
const DEFAULT_GOOGLE_HOST: &str = "https://translation.googleapis.com";

/// ISO 639-1 代码到语言名称
pub fn language_name(code: &str) -> String {
    match code.to_lowercase().as_str() {
        "zh" | "zh-cn" | "zh-tw" => "Chinese",
        "en" => "English",
        "ja" => "Japanese",
        "ko" => "Korean",
        "es" => "Spanish",
        "fr" => "French",
        "de" => "German",
        "it" => "Italian",
        "pt" => "Portuguese",
        "ru" => "Russian",
        "ar" => "Arabic",
        "hi" => "Hindi",
        "th" => "Thai",
        "vi" => "Vietnamese",
        "id" => "Indonesian",
        "nl" => "Dutch",
        "tr" => "Turkish",
        "pl" => "Polish",
        other => return other.to_uppercase(),
    }
    .to_string()
}

fn require_text(text: &str) -> ProviderCallResult<()> {
    if text.trim().is_empty() {
        return Err(ProviderCallError::Payload("检测文本为空".to_string()));
    }
    Ok(())
}

/// 自建 Lingua 检测服务适配器
pub struct LinguaHttpAdapter {
    id: String,
    client: Client,
    context: AdapterContext,
}

impl LinguaHttpAdapter {
    pub fn new(id: impl Into<String>, context: AdapterContext) -> Self {
        Self {
            id: id.into(),
            client: Client::new(),
            context,
        }
    }
}

#[async_trait]
impl LanguageProvider for LinguaHttpAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    async fn detect(&self, text: &str) -> ProviderCallResult<LanguageDetection> {
        require_text(text)?;
        let base_url = normalize_host(&self.context.api_host, DEFAULT_LINGUA_HOST);
        let endpoint = format!("{base_url}/detect");

        let response = self
            .client
            .post(endpoint)
            .header(CONTENT_TYPE, "application/json")
            .json(&json!({ "text": text }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let payload = response.text().await.unwrap_or_default();
            return Err(ProviderCallError::Status {
                status: status.as_u16(),
                payload,
            });
        }
        let value: Value = response
            .json()
            .await
            .map_err(|error| ProviderCallError::Payload(error.to_string()))?;

        let code = find_string_value(&value, &["language", "code", "detected_language"])
            .ok_or_else(|| ProviderCallError::Payload("响应缺少语言代码".to_string()))?;
        let confidence = find_f64_value(&value, &["confidence", "score"]).unwrap_or(0.0);

        let mut alternatives = Vec::new();
        if let Some(Value::Array(items)) = find_value_by_path(&value, "alternatives") {
            for item in items {
                if let Some(alt_code) = find_string_value(item, &["language", "code"]) {
                    alternatives.push(LanguageInfo {
                        name: language_name(&alt_code),
                        code: alt_code,
                        confidence: find_f64_value(item, &["confidence", "score"]).unwrap_or(0.0),
                    });
                }
            }
        }

        Ok(LanguageDetection {
            detected_language: LanguageInfo {
                name: language_name(&code),
                code,
                confidence,
            },
            alternatives,
        })
    }
}

/// Google Cloud Translation 检测适配器
pub struct GoogleLanguageAdapter {
    id: String,
    client: Client,
    context: AdapterContext,
}

impl GoogleLanguageAdapter {
    pub fn new(id: impl Into<String>, context: AdapterContext) -> Self {
        Self {
            id: id.into(),
            client: Client::new(),
            context,
        }
    }
}

#[async_trait]
impl LanguageProvider for GoogleLanguageAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    async fn detect(&self, text: &str) -> ProviderCallResult<LanguageDetection> {
        require_text(text)?;
        let api_key = self.context.require_key(&self.id)?;
        let base_url = normalize_host(&self.context.api_host, DEFAULT_GOOGLE_HOST);
        let endpoint = format!("{base_url}/language/translate/v2/detect?key={api_key}");

        let response = self
            .client
            .post(endpoint)
            .header(CONTENT_TYPE, "application/json")
            .json(&json!({ "q": text }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let payload = response.text().await.unwrap_or_default();
            return Err(ProviderCallError::Status {
                status: status.as_u16(),
                payload,
            });
        }
        let value: Value = response
            .json()
            .await
            .map_err(|error| ProviderCallError::Payload(error.to_string()))?;

        let code = find_string_value(&value, &["data.detections.0.0.language"])
            .ok_or_else(|| ProviderCallError::Payload("响应缺少语言代码".to_string()))?;
        let confidence =
            find_f64_value(&value, &["data.detections.0.0.confidence"]).unwrap_or(0.0);

        Ok(LanguageDetection {
            detected_language: LanguageInfo {
                name: language_name(&code),
                code,
                confidence,
            },
            alternatives: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_name_known_codes() {
        assert_eq!(language_name("zh"), "Chinese");
        assert_eq!(language_name("EN"), "English");
        assert_eq!(language_name("ja"), "Japanese");
    }

    #[test]
    fn test_language_name_unknown_code_uppercased() {
        assert_eq!(language_name("xx"), "XX");
    }

    #[tokio::test]
    async fn test_detect_empty_text_rejected() {
        let adapter = LinguaHttpAdapter::new("lingua", AdapterContext::default());
        let err = adapter.detect("   ").await.unwrap_err();
        assert!(matches!(err, ProviderCallError::Payload(_)));
    }

    #[tokio::test]
    async fn test_google_without_key_is_unavailable() {
        let adapter = GoogleLanguageAdapter::new("google_cloud", AdapterContext::default());
        let err = adapter.detect("hello world").await.unwrap_err();
        assert!(matches!(err, ProviderCallError::Unavailable(_)));
    }
}
