//! 视图生成客户端抽象
//!
//! 所有后端（Gemini / Mock）实现 ViewGenerator：给定提示词与有序参考图，返回恰好一张图片。
//! 客户端每次调用无状态；重试由上层状态机负责。

use async_trait::async_trait;
use thiserror::Error;

use crate::imaging::ViewImage;

/// 一次视图生成请求：提示词 + 有序参考图（原图，可选的已生成视图）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewRequest {
    pub prompt: String,
    pub images: Vec<ViewImage>,
}

impl ViewRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            images: Vec::new(),
        }
    }

    pub fn with_image(mut self, image: ViewImage) -> Self {
        self.images.push(image);
        self
    }
}

/// 视图生成错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Image generation request failed: {0}")]
    Http(String),

    #[error("Image generation API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid API response: No content parts found.")]
    EmptyResponse,

    /// 模型只返回了文字，没有图片
    #[error("No image found in API response. Model said: \"{text}\"")]
    NoImage { text: String },

    /// 响应体不是预期的 JSON 结构
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    #[error("Failed to decode generated image: {0}")]
    Decode(String),
}

/// 视图生成客户端 trait
#[async_trait]
pub trait ViewGenerator: Send + Sync {
    async fn generate(&self, request: &ViewRequest) -> Result<ViewImage, GenerationError>;
}
