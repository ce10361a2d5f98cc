//! 状态定义：流程阶段、用户动作、允许的迁移表与 UI 投影快照
//!
//! UI 只持有轻量的 SessionSnapshot（阶段、已生成视图、错误、模型地址）；完整 Session 由 Workflow 维护并投影。

use std::fmt;

use serde::Serialize;

use crate::core::{GenerationSettings, ViewKey};

/// 流程阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Upload,
    Settings2D,
    GeneratingGrid,
    GeneratingFront,
    ConfirmFront,
    GeneratingRemaining,
    ConfirmViews,
    Settings3D,
    Generating3D,
    Viewer,
    Failed,
}

impl Phase {
    /// 是否处于远程生成调用中
    pub fn is_generating(&self) -> bool {
        matches!(
            self,
            Phase::GeneratingGrid
                | Phase::GeneratingFront
                | Phase::GeneratingRemaining
                | Phase::Generating3D
        )
    }

    /// 迁移表：当前阶段是否接受该动作
    pub fn accepts(&self, action: Action) -> bool {
        match action {
            Action::StartOver => true,
            Action::Upload => *self == Phase::Upload,
            Action::StartViews => *self == Phase::Settings2D,
            Action::ConfirmFront => *self == Phase::ConfirmFront,
            Action::Regenerate | Action::ConfirmViews => *self == Phase::ConfirmViews,
            Action::StartModel | Action::BackToViews => *self == Phase::Settings3D,
            Action::Retry => matches!(self, Phase::Failed | Phase::ConfirmFront),
            Action::Reconfigure => *self == Phase::Viewer,
        }
    }

    /// 界面状态文案
    pub fn status_text(&self) -> &'static str {
        match self {
            Phase::GeneratingGrid => "Generating 2x2 grid...",
            Phase::GeneratingFront => "Generating front view...",
            Phase::GeneratingRemaining => "Generating remaining views...",
            Phase::Generating3D => "Building 3D mesh...",
            _ => "",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// 用户可触发的动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Upload,
    StartViews,
    ConfirmFront,
    Regenerate,
    ConfirmViews,
    StartModel,
    Retry,
    Reconfigure,
    BackToViews,
    StartOver,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// 主流程失败所在阶段，决定 Retry 走哪条路径
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedStage {
    Views,
    Model,
}

/// UI 看到的「投影」状态，轻量且易于渲染
#[derive(Clone, Debug, Default, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub phase: Phase,
    pub status_text: String,
    pub has_source: bool,
    pub views: Vec<ViewKey>,
    pub has_grid: bool,
    pub settings: GenerationSettings,
    pub error_message: Option<String>,
    pub failed_stage: Option<FailedStage>,
    pub model_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_over_always_allowed() {
        for phase in [Phase::Upload, Phase::Generating3D, Phase::Failed, Phase::Viewer] {
            assert!(phase.accepts(Action::StartOver));
        }
    }

    #[test]
    fn test_back_to_views_only_from_settings_3d() {
        assert!(Phase::Settings3D.accepts(Action::BackToViews));
        assert!(!Phase::Viewer.accepts(Action::BackToViews));
        assert!(!Phase::ConfirmViews.accepts(Action::BackToViews));
    }

    #[test]
    fn test_generating_phases_reject_user_actions() {
        for phase in [Phase::GeneratingGrid, Phase::GeneratingRemaining, Phase::Generating3D] {
            assert!(phase.is_generating());
            assert!(!phase.accepts(Action::Retry));
            assert!(!phase.accepts(Action::Regenerate));
        }
    }
}
