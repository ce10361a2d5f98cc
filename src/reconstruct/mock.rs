//! Mock 重建客户端（用于测试，无需 API）

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::{CompleteViews, ReconstructionSettings};
use crate::reconstruct::{ModelAsset, ReconstructionError, Reconstructor};

pub const MOCK_MODEL_URL: &str = "https://mock.local/models/product_model.glb";

/// 记录调用参数；脚本为空时返回固定的模型地址
#[derive(Debug, Default)]
pub struct MockReconstructor {
    script: Mutex<VecDeque<Result<ModelAsset, ReconstructionError>>>,
    calls: Mutex<Vec<(CompleteViews, ReconstructionSettings)>>,
}

impl MockReconstructor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_result(&self, result: Result<ModelAsset, ReconstructionError>) {
        self.script.lock().unwrap().push_back(result);
    }

    pub fn calls(&self) -> Vec<(CompleteViews, ReconstructionSettings)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Reconstructor for MockReconstructor {
    async fn reconstruct(
        &self,
        views: &CompleteViews,
        settings: &ReconstructionSettings,
    ) -> Result<ModelAsset, ReconstructionError> {
        self.calls
            .lock()
            .unwrap()
            .push((views.clone(), settings.clone()));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ModelAsset::new(MOCK_MODEL_URL)))
    }
}
