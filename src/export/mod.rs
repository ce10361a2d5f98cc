//! 导出：把当前视图（与模型）打包为 zip
//!
//! 模型下载失败只记录警告，压缩包照常生成。

pub mod archive;

use reqwest::Client;
use thiserror::Error;

use crate::core::ViewSet;
use crate::reconstruct::ModelAsset;

pub use archive::{model_file_name, pack_archive, views_archive};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Nothing to export")]
    Empty,

    #[error("Failed to build archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Failed to write archive: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to download model: {0}")]
    Download(String),
}

/// 已下载的模型文件
#[derive(Debug, Clone)]
pub struct ModelFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

pub async fn fetch_model(client: &Client, asset: &ModelAsset) -> Result<ModelFile, ExportError> {
    let response = client
        .get(&asset.url)
        .send()
        .await
        .map_err(|e| ExportError::Download(e.without_url().to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(ExportError::Download(format!("HTTP {status}")));
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ExportError::Download(e.without_url().to_string()))?;
    Ok(ModelFile {
        name: model_file_name(&asset.url),
        bytes: bytes.to_vec(),
    })
}

/// 视图 + 模型；模型缺失或下载失败时只打包视图
pub async fn export_pack(
    client: &Client,
    views: &ViewSet,
    model: Option<&ModelAsset>,
) -> Result<Vec<u8>, ExportError> {
    let file = match model {
        Some(asset) => match fetch_model(client, asset).await {
            Ok(file) => Some(file),
            Err(e) => {
                tracing::warn!(url = %asset.url, "Model not bundled: {}", e);
                None
            }
        },
        None => None,
    };
    pack_archive(views, file.as_ref())
}
