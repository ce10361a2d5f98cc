//! 核心编排层：视图与设置模型、阶段状态机、会话、错误、主控循环

pub mod error;
pub mod orchestrator;
pub mod session;
pub mod settings;
pub mod state;
pub mod views;
pub mod workflow;

pub use error::WorkflowError;
pub use orchestrator::{create_session, spawn_session, Command, SessionError, SessionHandle};
pub use session::Session;
pub use settings::{
    ApiKey, Engine, EngineOptions, GenerationSettings, ModelSettings, ReconstructionSettings,
    RenderStyle, TextureMode, TripoTexture, ViewSettings, ViewStrategy,
};
pub use state::{Action, FailedStage, Phase, SessionSnapshot};
pub use views::{CompleteViews, Quadrant, SideView, ViewKey, ViewSet};
pub use workflow::Workflow;
