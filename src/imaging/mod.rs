//! 图片层：视图图片值类型与 2x2 网格拆分

pub mod grid;
pub mod view_image;

use thiserror::Error;

pub use self::grid::{encode_png, split_grid, GridViews};
pub use self::view_image::{ViewImage, DEFAULT_MIME};

/// 图片编解码与拆分错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImagingError {
    #[error("Invalid data URL: {0}")]
    InvalidDataUrl(String),

    #[error("Image decode failed: {0}")]
    Decode(String),

    #[error("Image encode failed: {0}")]
    Encode(String),

    #[error("Grid image too small to split: {width}x{height}")]
    TooSmall { width: u32, height: u32 },
}
