//! Mock 视图生成客户端（用于测试与无 API Key 时本地跑通流程）
//!
//! 记录每次请求；按脚本依次返回结果，脚本耗尽后生成一张四象限异色的 4x4 PNG。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use image::{DynamicImage, Rgba, RgbaImage};

use crate::imaging::{encode_png, ViewImage};
use crate::vision::{GenerationError, ViewGenerator, ViewRequest};

/// Mock 客户端：可脚本化结果并记录请求
#[derive(Debug, Default)]
pub struct MockViewGenerator {
    script: Mutex<VecDeque<Result<ViewImage, GenerationError>>>,
    requests: Mutex<Vec<ViewRequest>>,
}

impl MockViewGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个脚本结果（按调用顺序消费）
    pub fn push_result(&self, result: Result<ViewImage, GenerationError>) {
        self.script.lock().unwrap().push_back(result);
    }

    pub fn push_failure(&self, error: GenerationError) {
        self.push_result(Err(error));
    }

    /// 已收到的请求（按完成顺序）
    pub fn requests(&self) -> Vec<ViewRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<ViewRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    /// 默认输出：四个象限颜色不同的 4x4 图，便于拆分
    pub fn placeholder_image(seed: u8) -> ViewImage {
        let img = RgbaImage::from_fn(4, 4, |x, y| {
            let quadrant = (y / 2) * 2 + x / 2;
            Rgba([seed, (quadrant as u8) * 60, 255 - seed, 255])
        });
        encode_png(&DynamicImage::ImageRgba8(img)).unwrap_or_else(|_| ViewImage::png(vec![seed]))
    }
}

#[async_trait]
impl ViewGenerator for MockViewGenerator {
    async fn generate(&self, request: &ViewRequest) -> Result<ViewImage, GenerationError> {
        let seq = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len()
        };
        let scripted = self.script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(Self::placeholder_image(seq as u8)))
    }
}
