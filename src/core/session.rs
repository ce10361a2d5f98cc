//! Session：一次用户流程的全部可变状态
//!
//! 上传时创建，随阶段迁移原地修改，「重新开始」时整体重置为默认值。

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::core::{
    FailedStage, GenerationSettings, Phase, SessionSnapshot, ViewKey, ViewSet,
};
use crate::imaging::ViewImage;
use crate::reconstruct::ModelAsset;

#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub phase: Phase,
    /// 用户上传的原图，会话独占
    pub source: Option<ViewImage>,
    pub views: ViewSet,
    /// 仅网格策略下存在；象限重生成以它为准
    pub grid: Option<ViewImage>,
    pub settings: GenerationSettings,
    pub error: Option<String>,
    pub failed_stage: Option<FailedStage>,
    pub model: Option<ModelAsset>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            phase: Phase::Upload,
            source: None,
            views: ViewSet::default(),
            grid: None,
            settings: GenerationSettings::default(),
            error: None,
            failed_stage: None,
            model: None,
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// 开始新一轮视图生成前清空上一轮结果
    pub(crate) fn clear_generated(&mut self) {
        self.views = ViewSet::default();
        self.grid = None;
        self.model = None;
        self.error = None;
    }

    /// 投影为 UI 快照
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.clone(),
            phase: self.phase,
            status_text: self.phase.status_text().to_string(),
            has_source: self.source.is_some(),
            views: self.views.iter().map(|(k, _)| k).collect::<Vec<ViewKey>>(),
            has_grid: self.grid.is_some(),
            settings: self.settings.clone(),
            error_message: self.error.clone(),
            failed_stage: self.failed_stage,
            model_url: self.model.as_ref().map(|m| m.url.clone()),
        }
    }
}
