//! 视图图片值类型：字节 + MIME，支持 data URL 互转
//!
//! 源图、生成视图、网格合成图都用 ViewImage 表示；内部用 Arc 共享字节，克隆廉价。

use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;

use crate::imaging::ImagingError;

/// MIME 缺失或无法解析时的默认值
pub const DEFAULT_MIME: &str = "image/png";

/// 不可变图片：原始字节与 MIME 类型
#[derive(Clone, PartialEq, Eq)]
pub struct ViewImage {
    mime_type: String,
    data: Arc<[u8]>,
}

impl ViewImage {
    pub fn new(mime_type: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        let mime_type = mime_type.into();
        let mime_type = if mime_type.trim().is_empty() {
            DEFAULT_MIME.to_string()
        } else {
            mime_type
        };
        Self {
            mime_type,
            data: Arc::from(data.into()),
        }
    }

    /// PNG 字节的快捷构造（网格拆分输出）
    pub fn png(data: Vec<u8>) -> Self {
        Self::new(DEFAULT_MIME, data)
    }

    /// 按文件头识别 MIME（上传文件用）；无法识别时按 PNG 处理
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let mime = image::guess_format(&data)
            .map(|format| format.to_mime_type())
            .unwrap_or(DEFAULT_MIME);
        Self::new(mime, data)
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Base64 负载（不含 data: 头），用于 Gemini inlineData
    pub fn to_base64(&self) -> String {
        BASE64_STANDARD.encode(&self.data)
    }

    /// 从 Base64 负载构造
    pub fn from_base64(mime_type: &str, payload: &str) -> Result<Self, ImagingError> {
        let data = BASE64_STANDARD
            .decode(payload.trim())
            .map_err(|e| ImagingError::InvalidDataUrl(format!("bad base64 payload: {e}")))?;
        Ok(Self::new(mime_type, data))
    }

    /// `data:<mime>;base64,<payload>`
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }

    /// 解析 data URL；头部缺少 MIME 时回退为 image/png
    pub fn from_data_url(url: &str) -> Result<Self, ImagingError> {
        let (header, payload) = url
            .split_once(',')
            .ok_or_else(|| ImagingError::InvalidDataUrl("missing ',' separator".to_string()))?;
        let header = header
            .strip_prefix("data:")
            .ok_or_else(|| ImagingError::InvalidDataUrl("missing 'data:' prefix".to_string()))?;
        if !header.ends_with(";base64") {
            return Err(ImagingError::InvalidDataUrl(
                "only base64 data URLs are supported".to_string(),
            ));
        }
        let mime = header.trim_end_matches(";base64");
        let mime = if mime.is_empty() { DEFAULT_MIME } else { mime };
        Self::from_base64(mime, payload)
    }

    /// 按 MIME 推断文件扩展名（打包导出用）
    pub fn extension(&self) -> &'static str {
        match self.mime_type.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "png",
        }
    }
}

impl fmt::Debug for ViewImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewImage")
            .field("mime_type", &self.mime_type)
            .field("len", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url_parse() {
        let img = ViewImage::from_data_url("data:image/jpeg;base64,AAEC").unwrap();
        assert_eq!(img.mime_type(), "image/jpeg");
        assert_eq!(img.bytes(), &[0u8, 1, 2]);
        assert_eq!(img.extension(), "jpg");
        assert_eq!(img.to_data_url(), "data:image/jpeg;base64,AAEC");
    }

    #[test]
    fn test_data_url_missing_mime_defaults_to_png() {
        let img = ViewImage::from_data_url("data:;base64,AAEC").unwrap();
        assert_eq!(img.mime_type(), DEFAULT_MIME);
    }

    #[test]
    fn test_data_url_rejects_plain_url() {
        assert!(ViewImage::from_data_url("https://example.com/a.png").is_err());
        assert!(ViewImage::from_data_url("data:image/png,raw").is_err());
    }

    #[test]
    fn test_from_bytes_sniffs_format() {
        let jpeg = ViewImage::from_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10]);
        assert_eq!(jpeg.mime_type(), "image/jpeg");
        let unknown = ViewImage::from_bytes(vec![1, 2, 3]);
        assert_eq!(unknown.mime_type(), DEFAULT_MIME);
    }

    #[test]
    fn test_debug_hides_bytes() {
        let img = ViewImage::png(vec![1, 2, 3]);
        let dbg = format!("{:?}", img);
        assert!(dbg.contains("len: 3"));
    }
}
