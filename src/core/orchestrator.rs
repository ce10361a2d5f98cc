//! 会话编排器：主控循环
//!
//! 后台任务独占 Workflow，按到达顺序逐条处理命令（同一时刻只有一个写者），
//! 每条命令处理完毕后通过 watch 通道发布最新快照，并经 oneshot 回复结果。

use std::sync::Arc;

use reqwest::Client;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::core::{
    ModelSettings, SessionSnapshot, SideView, ViewSettings, Workflow, WorkflowError,
};
use crate::export;
use crate::imaging::ViewImage;
use crate::reconstruct::Reconstructor;
use crate::vision::ViewGenerator;

/// 发往编排器的用户命令
#[derive(Debug, Clone)]
pub enum Command {
    Upload(ViewImage),
    StartViews(ViewSettings),
    ConfirmFront,
    Regenerate(SideView),
    ConfirmViews,
    StartModel(ModelSettings),
    Retry,
    Reconfigure,
    BackToViews,
    StartOver,
    /// 退出主循环
    Quit,
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session task has stopped")]
    Closed,

    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

enum Request {
    Command(Command, oneshot::Sender<Result<SessionSnapshot, WorkflowError>>),
    Export(oneshot::Sender<Result<Vec<u8>, WorkflowError>>),
}

/// 编排器句柄：发送命令、订阅快照、导出压缩包
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<Request>,
    state: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    /// 发送命令并等待其处理完成
    pub async fn execute(&self, command: Command) -> Result<SessionSnapshot, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Request::Command(command, reply_tx))
            .map_err(|_| SessionError::Closed)?;
        let snapshot = reply_rx.await.map_err(|_| SessionError::Closed)??;
        Ok(snapshot)
    }

    /// Viewer 阶段打包视图与模型，其余阶段只打包视图
    pub async fn export(&self) -> Result<Vec<u8>, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Request::Export(reply_tx))
            .map_err(|_| SessionError::Closed)?;
        let archive = reply_rx.await.map_err(|_| SessionError::Closed)??;
        Ok(archive)
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }
}

/// 用两个客户端创建 Workflow 并启动主控循环
pub fn create_session(
    generator: Arc<dyn ViewGenerator>,
    reconstructor: Arc<dyn Reconstructor>,
) -> (SessionHandle, JoinHandle<()>) {
    spawn_session(Workflow::new(generator, reconstructor))
}

/// 启动主控循环；所有句柄被丢弃或收到 Quit 时退出
pub fn spawn_session(workflow: Workflow) -> (SessionHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<Request>();
    let (state_tx, state_rx) = watch::channel(workflow.snapshot());
    let mut workflow = workflow.with_observer(state_tx);
    let http = Client::new();

    let task = tokio::spawn(async move {
        tracing::info!(session = %workflow.session().id, "Session started");
        while let Some(request) = rx.recv().await {
            match request {
                Request::Command(Command::Quit, reply) => {
                    let _ = reply.send(Ok(workflow.snapshot()));
                    break;
                }
                Request::Command(command, reply) => {
                    let result = dispatch(&mut workflow, command).await;
                    if let Err(e) = &result {
                        tracing::warn!(phase = %workflow.phase(), "Command failed: {}", e);
                    }
                    let _ = reply.send(result.map(|_| workflow.snapshot()));
                }
                Request::Export(reply) => {
                    let _ = reply.send(export_archive(&workflow, &http).await);
                }
            }
        }
        tracing::info!(session = %workflow.session().id, "Session stopped");
    });

    (SessionHandle { tx, state: state_rx }, task)
}

async fn dispatch(workflow: &mut Workflow, command: Command) -> Result<(), WorkflowError> {
    match command {
        Command::Upload(image) => workflow.upload(image),
        Command::StartViews(settings) => workflow.start_views(settings).await,
        Command::ConfirmFront => workflow.confirm_front().await,
        Command::Regenerate(view) => workflow.regenerate(view).await,
        Command::ConfirmViews => workflow.confirm_views(),
        Command::StartModel(settings) => workflow.start_model(settings).await,
        Command::Retry => workflow.retry().await,
        Command::Reconfigure => workflow.reconfigure(),
        Command::BackToViews => workflow.back_to_views(),
        Command::StartOver => {
            workflow.start_over();
            Ok(())
        }
        Command::Quit => Ok(()),
    }
}

async fn export_archive(workflow: &Workflow, http: &Client) -> Result<Vec<u8>, WorkflowError> {
    let session = workflow.session();
    let archive = match &session.model {
        Some(model) => export::export_pack(http, &session.views, Some(model)).await?,
        None => export::views_archive(&session.views)?,
    };
    tracing::info!(bytes = archive.len(), "Archive exported");
    Ok(archive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Phase;
    use crate::reconstruct::MockReconstructor;
    use crate::vision::MockViewGenerator;

    #[tokio::test]
    async fn test_commands_are_processed_in_order() {
        let (handle, task) = create_session(
            Arc::new(MockViewGenerator::new()),
            Arc::new(MockReconstructor::new()),
        );
        let snap = handle
            .execute(Command::Upload(ViewImage::png(vec![1, 2])))
            .await
            .unwrap();
        assert_eq!(snap.phase, Phase::Settings2D);

        let snap = handle
            .execute(Command::StartViews(ViewSettings::default()))
            .await
            .unwrap();
        assert_eq!(snap.phase, Phase::ConfirmViews);
        assert_eq!(handle.snapshot().phase, Phase::ConfirmViews);

        let err = handle.execute(Command::ConfirmFront).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Workflow(WorkflowError::InvalidTransition { .. })
        ));

        let archive = handle.export().await.unwrap();
        assert!(!archive.is_empty());

        handle.execute(Command::Quit).await.unwrap();
        task.await.unwrap();
        assert!(matches!(
            handle.execute(Command::StartOver).await,
            Err(SessionError::Closed)
        ));
    }
}
