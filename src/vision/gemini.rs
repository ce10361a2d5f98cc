//! Gemini 图像生成客户端（REST generateContent）
//!
//! 请求体：文本提示词 + inlineData 参考图，`responseModalities = ["IMAGE", "TEXT"]`；
//! 响应中取第一个 inlineData 部分作为结果。只有文字时返回 NoImage，并带上模型原话。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::imaging::ViewImage;
use crate::vision::{GenerationError, ViewGenerator, ViewRequest};

pub const DEFAULT_GEMINI_IMAGE_MODEL: &str = "gemini-2.5-flash-image-preview";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gemini REST 客户端：持有 HTTP Client、API Key 与模型名
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    /// 从环境变量 GEMINI_API_KEY 创建；未设置时返回 None
    pub fn from_env(model: Option<&str>) -> Option<Self> {
        let key = std::env::var("GEMINI_API_KEY").ok()?;
        if key.trim().is_empty() {
            return None;
        }
        Some(Self::new(key, model.unwrap_or(DEFAULT_GEMINI_IMAGE_MODEL)))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// 单次请求超时（默认不设，由 reqwest / 服务端决定）
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(request: &ViewRequest) -> GenerateContentRequest {
        let mut parts = vec![Part::Text {
            text: request.prompt.clone(),
        }];
        parts.extend(request.images.iter().map(|img| Part::InlineData {
            inline_data: InlineDataPayload {
                mime_type: img.mime_type().to_string(),
                data: img.to_base64(),
            },
        }));
        GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts,
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["IMAGE".to_string(), "TEXT".to_string()],
            },
        }
    }

    async fn send_request(
        &self,
        body: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GenerationError> {
        let url = format!(
            "{}/{model}:generateContent?key={api_key}",
            self.base_url,
            model = self.model,
            api_key = self.api_key
        );

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| GenerationError::Http(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(map_http_error(status, body_text));
        }

        let body_text = response
            .text()
            .await
            .map_err(|e| GenerationError::Http(e.without_url().to_string()))?;
        parse_response(&body_text)
    }
}

#[async_trait]
impl ViewGenerator for GeminiClient {
    async fn generate(&self, request: &ViewRequest) -> Result<ViewImage, GenerationError> {
        tracing::debug!(
            model = %self.model,
            images = request.images.len(),
            "Gemini generateContent"
        );
        let body = Self::build_request(request);
        let response = self.send_request(&body).await?;
        let result = extract_image(response);
        if let Err(ref e) = result {
            tracing::error!("Error calling Gemini API: {}", e);
        }
        result
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<String>,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineDataPayload,
    },
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineDataPayload {
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Option<Vec<PartResponse>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartResponse {
    text: Option<String>,
    inline_data: Option<InlineDataPayload>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

/// 取第一个候选的第一个图片部分；没有图片时把文字部分拼接进错误
fn extract_image(response: GenerateContentResponse) -> Result<ViewImage, GenerationError> {
    let parts = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts)
        .ok_or(GenerationError::EmptyResponse)?;

    let mut texts = Vec::new();
    for part in parts {
        if let Some(inline) = part.inline_data {
            return ViewImage::from_base64(&inline.mime_type, &inline.data)
                .map_err(|e| GenerationError::Decode(e.to_string()));
        }
        if let Some(text) = part.text.filter(|t| !t.is_empty()) {
            texts.push(text);
        }
    }

    let text = if texts.is_empty() {
        "No text response.".to_string()
    } else {
        texts.join(" ")
    };
    Err(GenerationError::NoImage { text })
}

fn parse_response(body: &str) -> Result<GenerateContentResponse, GenerationError> {
    serde_json::from_str(body).map_err(|e| GenerationError::InvalidResponse(e.to_string()))
}

fn map_http_error(status: StatusCode, body: String) -> GenerationError {
    let message = serde_json::from_str::<ErrorWrapper>(&body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.clone());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.clone());

    GenerationError::Api {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> GenerateContentResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_request_body_shape() {
        let req = ViewRequest::new("make a grid").with_image(ViewImage::new("image/jpeg", vec![1, 2, 3]));
        let body = serde_json::to_value(GeminiClient::build_request(&req)).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "make a grid");
        assert_eq!(body["contents"][0]["parts"][1]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(body["contents"][0]["parts"][1]["inlineData"]["data"], "AQID");
        assert_eq!(body["generationConfig"]["responseModalities"][0], "IMAGE");
    }

    #[test]
    fn test_extract_first_image() {
        let resp = parse(
            r#"{"candidates":[{"content":{"parts":[
                {"text":"here you go"},
                {"inlineData":{"mimeType":"image/png","data":"AAEC"}}
            ]}}]}"#,
        );
        let img = extract_image(resp).unwrap();
        assert_eq!(img.mime_type(), "image/png");
        assert_eq!(img.bytes(), &[0, 1, 2]);
    }

    #[test]
    fn test_text_only_response_is_no_image() {
        let resp = parse(
            r#"{"candidates":[{"content":{"parts":[{"text":"I cannot"},{"text":"do that"}]}}]}"#,
        );
        match extract_image(resp) {
            Err(GenerationError::NoImage { text }) => assert_eq!(text, "I cannot do that"),
            other => panic!("Expected NoImage, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_parts_is_empty_response() {
        assert_eq!(
            extract_image(parse(r#"{"candidates":[]}"#)).unwrap_err(),
            GenerationError::EmptyResponse
        );
        assert_eq!(
            extract_image(parse(r#"{"candidates":[{"content":{}}]}"#)).unwrap_err(),
            GenerationError::EmptyResponse
        );
    }

    #[test]
    fn test_malformed_body_is_invalid_response() {
        assert!(matches!(
            parse_response("<html>gateway</html>"),
            Err(GenerationError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_response(r#"{"candidates":"oops"}"#),
            Err(GenerationError::InvalidResponse(_))
        ));
        assert!(parse_response(r#"{"candidates":[]}"#).is_ok());
    }

    #[test]
    fn test_map_http_error_reads_status() {
        let err = map_http_error(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"code":429,"message":"quota","status":"RESOURCE_EXHAUSTED"}}"#.to_string(),
        );
        assert_eq!(
            err,
            GenerationError::Api {
                status: 429,
                message: "RESOURCE_EXHAUSTED: quota".to_string()
            }
        );
    }
}
