//! 流程错误类型
//!
//! 三类错误：主流程生成失败（进入 Failed，带 FailedStage）、单视图重生成失败（只返回给调用方）、
//! 前置条件不满足（记录错误信息但不迁移阶段）。

use thiserror::Error;

use crate::core::{Action, Phase, SideView};
use crate::export::ExportError;
use crate::imaging::ImagingError;
use crate::reconstruct::ReconstructionError;
use crate::vision::GenerationError;

/// Workflow 各操作可能返回的错误
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Action {action} is not allowed in phase {phase}")]
    InvalidTransition { phase: Phase, action: Action },

    #[error("No source image uploaded")]
    NoSourceImage,

    #[error("Source image is empty")]
    EmptySourceImage,

    #[error("View settings have not been chosen")]
    MissingViewSettings,

    #[error("All four views are required to generate a 3D model ({populated}/4 present)")]
    IncompleteViews { populated: usize },

    #[error("Cannot regenerate view without a valid front view")]
    MissingFrontView,

    #[error("Cannot regenerate grid view without the current grid image")]
    MissingGridComposite,

    #[error("3D settings have not been chosen")]
    MissingModelSettings,

    #[error("Fal.ai API key is missing")]
    MissingCredential,

    #[error("Failed to generate {target}: {source}")]
    Generation {
        target: &'static str,
        source: GenerationError,
    },

    #[error("Failed to split grid image: {0}")]
    Split(#[from] ImagingError),

    #[error("{0}")]
    Reconstruction(#[from] ReconstructionError),

    #[error("Failed to regenerate {view} view: {message}")]
    Regeneration { view: SideView, message: String },

    #[error(transparent)]
    Export(#[from] ExportError),
}

impl WorkflowError {
    pub fn generation(target: &'static str, source: GenerationError) -> Self {
        WorkflowError::Generation { target, source }
    }

    /// 前置条件类错误：只在界面提示，不改变阶段
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            WorkflowError::NoSourceImage
                | WorkflowError::EmptySourceImage
                | WorkflowError::MissingViewSettings
                | WorkflowError::IncompleteViews { .. }
                | WorkflowError::MissingFrontView
                | WorkflowError::MissingGridComposite
                | WorkflowError::MissingModelSettings
                | WorkflowError::MissingCredential
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_error_names_target() {
        let err = WorkflowError::generation(
            "grid view",
            GenerationError::NoImage { text: "I cannot do that".into() },
        );
        assert_eq!(
            err.to_string(),
            "Failed to generate grid view: No image found in API response. Model said: \"I cannot do that\""
        );
        assert!(!err.is_precondition());
    }

    #[test]
    fn test_precondition_classification() {
        assert!(WorkflowError::MissingCredential.is_precondition());
        assert!(WorkflowError::IncompleteViews { populated: 2 }.is_precondition());
        assert!(!WorkflowError::InvalidTransition {
            phase: Phase::Upload,
            action: Action::StartModel
        }
        .is_precondition());
    }
}
