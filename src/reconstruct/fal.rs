//! fal.ai 多视图重建客户端（队列协议）
//!
//! 1. POST {queue}/{endpoint} 提交任务，Header `Authorization: Key <凭证>`
//! 2. 轮询 status_url 直到 COMPLETED（间隔 poll_interval，总时长 max_wait）
//! 3. GET response_url 取结果，依次查找 pbr_model / model_mesh / base_model 的 url
//!
//! Hunyuan 只用 front/back/left 三视图；Tripo3D 使用全部四个视图。图片以 data URL 传输。

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{CompleteViews, EngineOptions, ReconstructionSettings};
use crate::reconstruct::{ModelAsset, ReconstructionError, Reconstructor};

pub const FAL_QUEUE_URL: &str = "https://queue.fal.run";
pub const HUNYUAN_MULTIVIEW: &str = "fal-ai/hunyuan3d/v2/multi-view";
pub const HUNYUAN_MULTIVIEW_TURBO: &str = "fal-ai/hunyuan3d/v2/multi-view/turbo";
pub const TRIPO_MULTIVIEW: &str = "tripo3d/tripo/v2.5/multiview-to-3d";

/// fal 队列客户端
#[derive(Clone)]
pub struct FalClient {
    client: Client,
    queue_url: String,
    poll_interval: Duration,
    max_wait: Duration,
}

impl Default for FalClient {
    fn default() -> Self {
        Self::new(FAL_QUEUE_URL)
    }
}

impl FalClient {
    pub fn new(queue_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            queue_url: queue_url.into().trim_end_matches('/').to_string(),
            poll_interval: Duration::from_millis(1000),
            max_wait: Duration::from_secs(600),
        }
    }

    pub fn with_polling(mut self, poll_interval_ms: u64, max_wait_secs: u64) -> Self {
        self.poll_interval = Duration::from_millis(poll_interval_ms.max(1));
        self.max_wait = Duration::from_secs(max_wait_secs);
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        self
    }

    fn authorized(&self, builder: RequestBuilder, settings: &ReconstructionSettings) -> RequestBuilder {
        builder.header(AUTHORIZATION, format!("Key {}", settings.api_key.expose()))
    }

    async fn submit(
        &self,
        endpoint: &str,
        input: &Value,
        settings: &ReconstructionSettings,
    ) -> Result<QueueSubmission, ReconstructionError> {
        let url = format!("{}/{}", self.queue_url, endpoint);
        let response = self
            .authorized(self.client.post(url), settings)
            .json(input)
            .send()
            .await
            .map_err(|e| ReconstructionError::Http(e.to_string()))?;
        read_json(response).await
    }

    async fn wait_for_completion(
        &self,
        submission: &QueueSubmission,
        settings: &ReconstructionSettings,
    ) -> Result<(), ReconstructionError> {
        let started = Instant::now();
        loop {
            let response = self
                .authorized(self.client.get(&submission.status_url), settings)
                .send()
                .await
                .map_err(|e| ReconstructionError::Http(e.to_string()))?;
            let status: QueueStatus = read_json(response).await?;
            match status.status.as_str() {
                "COMPLETED" => {
                    if let Some(error) = status.error {
                        return Err(ReconstructionError::Failed(error));
                    }
                    return Ok(());
                }
                "IN_QUEUE" | "IN_PROGRESS" => {
                    tracing::debug!(
                        request_id = %submission.request_id,
                        status = %status.status,
                        queue_position = ?status.queue_position,
                        "fal request pending"
                    );
                }
                other => {
                    return Err(ReconstructionError::Failed(format!(
                        "unexpected queue status: {other}"
                    )));
                }
            }

            if started.elapsed() >= self.max_wait {
                return Err(ReconstructionError::Timeout {
                    waited_secs: started.elapsed().as_secs(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn fetch_result(
        &self,
        submission: &QueueSubmission,
        settings: &ReconstructionSettings,
    ) -> Result<Value, ReconstructionError> {
        let response = self
            .authorized(self.client.get(&submission.response_url), settings)
            .send()
            .await
            .map_err(|e| ReconstructionError::Http(e.to_string()))?;
        read_json(response).await
    }
}

#[async_trait]
impl Reconstructor for FalClient {
    async fn reconstruct(
        &self,
        views: &CompleteViews,
        settings: &ReconstructionSettings,
    ) -> Result<ModelAsset, ReconstructionError> {
        let (endpoint, input) = build_input(views, &settings.engine);
        tracing::info!(endpoint, "Submitting multi-view reconstruction");

        let submission = self.submit(endpoint, &input, settings).await?;
        self.wait_for_completion(&submission, settings).await?;
        let result = self.fetch_result(&submission, settings).await?;

        let url = extract_model_url(&result).ok_or_else(|| {
            tracing::error!("Unexpected API response structure: {}", result);
            ReconstructionError::MissingModelUrl
        })?;
        Ok(ModelAsset::new(url))
    }
}

#[derive(Serialize)]
struct HunyuanInput {
    front_image_url: String,
    back_image_url: String,
    left_image_url: String,
    textured_mesh: bool,
}

#[derive(Serialize)]
struct TripoInput {
    front_image_url: String,
    back_image_url: String,
    left_image_url: String,
    right_image_url: String,
    texture: &'static str,
    pbr: bool,
    quad: bool,
}

#[derive(Deserialize)]
struct QueueSubmission {
    request_id: String,
    status_url: String,
    response_url: String,
}

#[derive(Deserialize)]
struct QueueStatus {
    status: String,
    queue_position: Option<u64>,
    error: Option<String>,
}

/// 按引擎选择端点并构造输入
pub fn build_input(views: &CompleteViews, engine: &EngineOptions) -> (&'static str, Value) {
    match *engine {
        EngineOptions::Hunyuan { fast, textured } => {
            let endpoint = if fast {
                HUNYUAN_MULTIVIEW_TURBO
            } else {
                HUNYUAN_MULTIVIEW
            };
            let input = HunyuanInput {
                front_image_url: views.front.to_data_url(),
                back_image_url: views.back.to_data_url(),
                left_image_url: views.left.to_data_url(),
                textured_mesh: textured,
            };
            (endpoint, serde_json::to_value(input).unwrap_or(Value::Null))
        }
        EngineOptions::Tripo { texture, pbr, quad } => {
            let input = TripoInput {
                front_image_url: views.front.to_data_url(),
                back_image_url: views.back.to_data_url(),
                left_image_url: views.left.to_data_url(),
                right_image_url: views.right.to_data_url(),
                texture: texture.as_api_str(),
                pbr,
                quad,
            };
            (TRIPO_MULTIVIEW, serde_json::to_value(input).unwrap_or(Value::Null))
        }
    }
}

/// 结果中的模型地址：pbr_model > model_mesh > base_model
pub fn extract_model_url(result: &Value) -> Option<String> {
    let data = result.get("data").unwrap_or(result);
    ["pbr_model", "model_mesh", "base_model"]
        .iter()
        .find_map(|key| {
            data.get(key)?
                .get("url")?
                .as_str()
                .filter(|url| !url.is_empty())
        })
        .map(String::from)
}

async fn read_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, ReconstructionError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(map_http_error(status, body));
    }
    response
        .json()
        .await
        .map_err(|e| ReconstructionError::Http(format!("invalid response body: {e}")))
}

fn map_http_error(status: StatusCode, body: String) -> ReconstructionError {
    // fal 错误体通常为 {"detail": "..."} 或 {"detail": [{"msg": ...}]}
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| match v.get("detail") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Array(items)) => Some(
                items
                    .iter()
                    .filter_map(|i| i.get("msg").and_then(Value::as_str))
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            _ => None,
        })
        .filter(|m| !m.is_empty())
        .unwrap_or(body);
    ReconstructionError::Api {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TripoTexture;
    use crate::imaging::ViewImage;
    use serde_json::json;

    fn views() -> CompleteViews {
        CompleteViews {
            front: ViewImage::png(vec![0]),
            back: ViewImage::png(vec![1]),
            left: ViewImage::png(vec![2]),
            right: ViewImage::png(vec![3]),
        }
    }

    #[test]
    fn test_hunyuan_input_skips_right_view() {
        let (endpoint, input) =
            build_input(&views(), &EngineOptions::Hunyuan { fast: true, textured: false });
        assert_eq!(endpoint, HUNYUAN_MULTIVIEW_TURBO);
        assert_eq!(input["front_image_url"], "data:image/png;base64,AA==");
        assert_eq!(input["textured_mesh"], false);
        assert!(input.get("right_image_url").is_none());

        let (endpoint, _) =
            build_input(&views(), &EngineOptions::Hunyuan { fast: false, textured: true });
        assert_eq!(endpoint, HUNYUAN_MULTIVIEW);
    }

    #[test]
    fn test_tripo_input_uses_all_views() {
        let (endpoint, input) = build_input(
            &views(),
            &EngineOptions::Tripo { texture: TripoTexture::Hd, pbr: true, quad: false },
        );
        assert_eq!(endpoint, TRIPO_MULTIVIEW);
        assert_eq!(input["right_image_url"], "data:image/png;base64,Aw==");
        assert_eq!(input["texture"], "HD");
        assert_eq!(input["pbr"], true);
        assert_eq!(input["quad"], false);
    }

    #[test]
    fn test_extract_model_url_priority() {
        let result = json!({
            "model_mesh": {"url": "https://cdn/mesh.glb"},
            "pbr_model": {"url": "https://cdn/pbr.glb"}
        });
        assert_eq!(extract_model_url(&result).as_deref(), Some("https://cdn/pbr.glb"));

        let tripo = json!({"data": {"base_model": {"url": "https://cdn/base.glb"}}});
        assert_eq!(extract_model_url(&tripo).as_deref(), Some("https://cdn/base.glb"));

        let empty_pbr = json!({
            "pbr_model": {"url": ""},
            "model_mesh": {"url": "https://cdn/m.glb"}
        });
        assert_eq!(extract_model_url(&empty_pbr).as_deref(), Some("https://cdn/m.glb"));

        assert_eq!(extract_model_url(&json!({"seed": 1})), None);
        assert_eq!(extract_model_url(&json!({"base_model": {"url": ""}})), None);
    }

    #[test]
    fn test_map_http_error_detail() {
        let err = map_http_error(StatusCode::UNAUTHORIZED, r#"{"detail":"No user found"}"#.into());
        assert_eq!(
            err,
            ReconstructionError::Api { status: 401, message: "No user found".into() }
        );
        let err = map_http_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"detail":[{"msg":"bad image"},{"msg":"bad size"}]}"#.into(),
        );
        assert!(err.to_string().contains("bad image; bad size"));
    }
}
