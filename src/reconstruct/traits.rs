//! 多视图重建客户端抽象
//!
//! 输入四视图（类型上保证齐全）与校验后的引擎设置，返回可下载的 3D 模型地址。
//! 客户端无状态，不做自动重试。

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::core::{CompleteViews, ReconstructionSettings};

/// 重建得到的模型资源
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelAsset {
    pub url: String,
}

impl ModelAsset {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// 重建错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconstructionError {
    #[error("Failed to generate 3D model: request failed: {0}")]
    Http(String),

    #[error("Failed to generate 3D model: API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to generate 3D model: {0}")]
    Failed(String),

    #[error("Failed to generate 3D model: no result after {waited_secs}s")]
    Timeout { waited_secs: u64 },

    #[error("Failed to generate 3D model: API response did not contain a valid model URL.")]
    MissingModelUrl,
}

#[async_trait]
pub trait Reconstructor: Send + Sync {
    async fn reconstruct(
        &self,
        views: &CompleteViews,
        settings: &ReconstructionSettings,
    ) -> Result<ModelAsset, ReconstructionError>;
}
