//! 生成流程状态机
//!
//! Workflow 独占 Session 与两个远程客户端，每个用户动作对应一个方法：
//! 先查迁移表（Phase::accepts），不允许则直接返回 InvalidTransition 且不产生副作用；
//! 主流程远程调用失败进入 Failed（记录 FailedStage 供 Retry 选择路径）；
//! 单视图重生成失败与前置条件错误只记录错误信息，不迁移阶段。
//!
//! 剩余视图阶段：back 与 left 并发生成（try_join，首个失败即中止），两者都成功后
//! 再以 left 为镜像参考生成 right。任一失败时丢弃已成功的兄弟结果，只保留 front。

use std::sync::Arc;

use tokio::sync::watch;

use crate::core::{
    Action, FailedStage, ModelSettings, Phase, Session, SessionSnapshot, SideView, ViewKey,
    ViewSettings, ViewStrategy, WorkflowError,
};
use crate::imaging::{split_grid, GridViews, ViewImage};
use crate::reconstruct::Reconstructor;
use crate::vision::{prompts, ViewGenerator, ViewRequest};

pub struct Workflow {
    generator: Arc<dyn ViewGenerator>,
    reconstructor: Arc<dyn Reconstructor>,
    session: Session,
    observer: Option<watch::Sender<SessionSnapshot>>,
}

impl Workflow {
    pub fn new(generator: Arc<dyn ViewGenerator>, reconstructor: Arc<dyn Reconstructor>) -> Self {
        Self {
            generator,
            reconstructor,
            session: Session::new(),
            observer: None,
        }
    }

    /// 每次状态变化时把快照推送到 watch 通道
    pub fn with_observer(mut self, observer: watch::Sender<SessionSnapshot>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// 从已有 Session 恢复（测试与断点续跑用）
    pub fn with_session(mut self, session: Session) -> Self {
        self.session = session;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn phase(&self) -> Phase {
        self.session.phase
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    // ---- 用户动作 ----

    /// Upload → Settings2D
    pub fn upload(&mut self, image: ViewImage) -> Result<(), WorkflowError> {
        self.ensure(Action::Upload)?;
        if image.is_empty() {
            return Err(self.reject(WorkflowError::EmptySourceImage));
        }
        tracing::info!(
            session = %self.session.id,
            mime = image.mime_type(),
            bytes = image.len(),
            "Source image uploaded"
        );
        self.session.source = Some(image);
        self.session.error = None;
        self.set_phase(Phase::Settings2D);
        Ok(())
    }

    /// Settings2D → GeneratingGrid | GeneratingFront
    pub async fn start_views(&mut self, settings: ViewSettings) -> Result<(), WorkflowError> {
        self.ensure(Action::StartViews)?;
        self.run_view_generation(settings).await
    }

    /// ConfirmFront → GeneratingRemaining → ConfirmViews
    pub async fn confirm_front(&mut self) -> Result<(), WorkflowError> {
        self.ensure(Action::ConfirmFront)?;
        let source = self.require_source()?;
        let settings = self.require_view_settings()?;
        let Some(front) = self.session.views.front.clone() else {
            return Err(self.reject(WorkflowError::MissingFrontView));
        };

        self.set_phase(Phase::GeneratingRemaining);
        let generator = Arc::clone(&self.generator);
        match generate_remaining(generator.as_ref(), settings, &source, &front).await {
            Ok([back, left, right]) => {
                self.session.views.set(ViewKey::Back, back);
                self.session.views.set(ViewKey::Left, left);
                self.session.views.set(ViewKey::Right, right);
                self.set_phase(Phase::ConfirmViews);
                Ok(())
            }
            Err(e) => Err(self.fail(FailedStage::Views, e)),
        }
    }

    /// ConfirmViews 上的局部重试：重新生成 back / left / right 之一，阶段不变
    pub async fn regenerate(&mut self, view: SideView) -> Result<(), WorkflowError> {
        self.ensure(Action::Regenerate)?;
        let source = self.require_source()?;
        let settings = self.require_view_settings()?;
        let generator = Arc::clone(&self.generator);

        match settings.strategy {
            ViewStrategy::Grid => {
                let Some(grid) = self.session.grid.clone() else {
                    return Err(self.reject(WorkflowError::MissingGridComposite));
                };
                let request = prompts::quadrant_request(view, &source, &grid);
                match generate_grid(generator.as_ref(), &request, "grid view").await {
                    Ok((new_grid, views)) => {
                        // 拆分没有局部模式，四个槽位全部由新网格重新派生
                        self.session.grid = Some(new_grid);
                        self.session.views = views.into();
                    }
                    Err(e) => return Err(self.regeneration_failed(view, e)),
                }
            }
            ViewStrategy::Individual => {
                let Some(front) = self.session.views.front.clone() else {
                    return Err(self.reject(WorkflowError::MissingFrontView));
                };
                let left = match view {
                    SideView::Right => self.session.views.left.clone(),
                    _ => None,
                };
                let request =
                    prompts::side_request(view, settings.style, &source, &front, left.as_ref());
                match generator.generate(&request).await {
                    Ok(image) => self.session.views.set(view.key(), image),
                    Err(e) => {
                        let err = WorkflowError::generation(view.key().as_str(), e);
                        return Err(self.regeneration_failed(view, err));
                    }
                }
            }
        }

        tracing::info!(session = %self.session.id, %view, "View regenerated");
        self.session.error = None;
        self.publish();
        Ok(())
    }

    /// ConfirmViews → Settings3D（需四视图齐全）
    pub fn confirm_views(&mut self) -> Result<(), WorkflowError> {
        self.ensure(Action::ConfirmViews)?;
        if !self.session.views.is_complete() {
            let populated = self.session.views.populated();
            return Err(self.reject(WorkflowError::IncompleteViews { populated }));
        }
        self.session.error = None;
        self.set_phase(Phase::Settings3D);
        Ok(())
    }

    /// Settings3D → Generating3D → Viewer
    pub async fn start_model(&mut self, model: ModelSettings) -> Result<(), WorkflowError> {
        self.ensure(Action::StartModel)?;
        self.session.settings.merge_model(model);

        let Some(views) = self.session.views.complete() else {
            let populated = self.session.views.populated();
            return Err(self.reject(WorkflowError::IncompleteViews { populated }));
        };
        let settings = match self.session.settings.finalize() {
            Ok(settings) => settings,
            Err(e) => return Err(self.reject(e)),
        };

        self.session.error = None;
        self.session.failed_stage = None;
        self.set_phase(Phase::Generating3D);

        let reconstructor = Arc::clone(&self.reconstructor);
        match reconstructor.reconstruct(&views, &settings).await {
            Ok(asset) => {
                tracing::info!(session = %self.session.id, url = %asset.url, "Model ready");
                self.session.model = Some(asset);
                self.set_phase(Phase::Viewer);
                Ok(())
            }
            Err(e) => Err(self.fail(FailedStage::Model, e.into())),
        }
    }

    /// Failed / ConfirmFront 上的重试
    ///
    /// 模型阶段失败回到 Settings3D；其余情况用上次的 2D 设置重放视图生成请求。
    pub async fn retry(&mut self) -> Result<(), WorkflowError> {
        self.ensure(Action::Retry)?;
        if self.session.phase == Phase::Failed
            && self.session.failed_stage == Some(FailedStage::Model)
        {
            self.session.error = None;
            self.session.failed_stage = None;
            self.set_phase(Phase::Settings3D);
            return Ok(());
        }
        let settings = self.require_view_settings()?;
        self.run_view_generation(settings).await
    }

    /// Viewer → Settings3D：丢弃模型，保留四视图
    pub fn reconfigure(&mut self) -> Result<(), WorkflowError> {
        self.ensure(Action::Reconfigure)?;
        self.session.model = None;
        self.session.error = None;
        self.set_phase(Phase::Settings3D);
        Ok(())
    }

    /// Settings3D → ConfirmViews
    pub fn back_to_views(&mut self) -> Result<(), WorkflowError> {
        self.ensure(Action::BackToViews)?;
        self.set_phase(Phase::ConfirmViews);
        Ok(())
    }

    /// 任意阶段 → Upload，清空全部会话数据
    pub fn start_over(&mut self) {
        tracing::info!(session = %self.session.id, from = %self.session.phase, "Start over");
        self.session = Session::new();
        self.publish();
    }

    // ---- 内部 ----

    async fn run_view_generation(&mut self, settings: ViewSettings) -> Result<(), WorkflowError> {
        let source = self.require_source()?;
        self.session.settings.merge_view(settings);
        self.session.clear_generated();
        self.session.failed_stage = None;

        let request = prompts::initial_request(settings, &source);
        let generator = Arc::clone(&self.generator);

        match settings.strategy {
            ViewStrategy::Grid => {
                self.set_phase(Phase::GeneratingGrid);
                match generate_grid(generator.as_ref(), &request, "grid view").await {
                    Ok((grid, views)) => {
                        self.session.grid = Some(grid);
                        self.session.views = views.into();
                        self.set_phase(Phase::ConfirmViews);
                        Ok(())
                    }
                    Err(e) => Err(self.fail(FailedStage::Views, e)),
                }
            }
            ViewStrategy::Individual => {
                self.set_phase(Phase::GeneratingFront);
                match generator.generate(&request).await {
                    Ok(front) => {
                        self.session.views.set(ViewKey::Front, front);
                        self.set_phase(Phase::ConfirmFront);
                        Ok(())
                    }
                    Err(e) => Err(self.fail(
                        FailedStage::Views,
                        WorkflowError::generation("front view", e),
                    )),
                }
            }
        }
    }

    fn ensure(&self, action: Action) -> Result<(), WorkflowError> {
        let phase = self.session.phase;
        if phase.accepts(action) {
            Ok(())
        } else {
            tracing::debug!(%phase, %action, "Rejected action");
            Err(WorkflowError::InvalidTransition { phase, action })
        }
    }

    fn require_source(&mut self) -> Result<ViewImage, WorkflowError> {
        match self.session.source.clone() {
            Some(source) => Ok(source),
            None => Err(self.reject(WorkflowError::NoSourceImage)),
        }
    }

    fn require_view_settings(&mut self) -> Result<ViewSettings, WorkflowError> {
        match self.session.settings.view {
            Some(settings) => Ok(settings),
            None => Err(self.reject(WorkflowError::MissingViewSettings)),
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        let from = self.session.phase;
        self.session.phase = phase;
        tracing::info!(session = %self.session.id, %from, to = %phase, "Phase transition");
        self.publish();
    }

    fn publish(&self) {
        if let Some(observer) = &self.observer {
            let _ = observer.send(self.session.snapshot());
        }
    }

    /// 主流程失败：记录错误与阶段标签，进入 Failed
    fn fail(&mut self, stage: FailedStage, err: WorkflowError) -> WorkflowError {
        tracing::error!(session = %self.session.id, ?stage, "Generation failed: {}", err);
        self.session.error = Some(err.to_string());
        self.session.failed_stage = Some(stage);
        self.set_phase(Phase::Failed);
        err
    }

    /// 前置条件不满足：只记录错误信息
    fn reject(&mut self, err: WorkflowError) -> WorkflowError {
        tracing::warn!(session = %self.session.id, phase = %self.session.phase, "{}", err);
        self.session.error = Some(err.to_string());
        self.publish();
        err
    }

    fn regeneration_failed(&mut self, view: SideView, err: WorkflowError) -> WorkflowError {
        self.reject(WorkflowError::Regeneration {
            view,
            message: err.to_string(),
        })
    }
}

/// 生成网格并拆分
async fn generate_grid(
    generator: &dyn ViewGenerator,
    request: &ViewRequest,
    target: &'static str,
) -> Result<(ViewImage, GridViews), WorkflowError> {
    let grid = generator
        .generate(request)
        .await
        .map_err(|e| WorkflowError::generation(target, e))?;
    let views = split_grid(&grid)?;
    Ok((grid, views))
}

/// back + left 并发，随后 right（以 left 为镜像参考）；返回 [back, left, right]
async fn generate_remaining(
    generator: &dyn ViewGenerator,
    settings: ViewSettings,
    source: &ViewImage,
    front: &ViewImage,
) -> Result<[ViewImage; 3], WorkflowError> {
    let style = settings.style;
    let back_request = prompts::side_request(SideView::Back, style, source, front, None);
    let left_request = prompts::side_request(SideView::Left, style, source, front, None);

    let (back, left) = tokio::try_join!(
        async {
            generator
                .generate(&back_request)
                .await
                .map_err(|e| WorkflowError::generation("back view", e))
        },
        async {
            generator
                .generate(&left_request)
                .await
                .map_err(|e| WorkflowError::generation("left view", e))
        },
    )?;

    let right_request = prompts::side_request(SideView::Right, style, source, front, Some(&left));
    let right = generator
        .generate(&right_request)
        .await
        .map_err(|e| WorkflowError::generation("right view", e))?;

    Ok([back, left, right])
}
