//! Viewforge 命令行入口
//!
//! 无交互跑完一次会话：上传 → 生成视图 → 确认 → 生成 3D 模型 → 导出 zip。
//! 未设置 GEMINI_API_KEY / FAL_KEY 时使用 Mock 客户端。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use viewforge::config::{load_config, AppConfig};
use viewforge::core::{create_session, ApiKey, Command, Phase, SessionHandle};
use viewforge::imaging::ViewImage;
use viewforge::reconstruct::{FalClient, MockReconstructor, Reconstructor};
use viewforge::vision::{GeminiClient, MockViewGenerator, ViewGenerator};

const ARCHIVE_NAME: &str = "product_pack.zip";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    viewforge::observability::init();

    let mut args = std::env::args().skip(1);
    let Some(image_path) = args.next().map(PathBuf::from) else {
        bail!("Usage: viewforge <product-image> [config.toml]");
    };
    let config_path = args.next().map(PathBuf::from);

    let cfg = load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });

    let bytes = std::fs::read(&image_path)
        .with_context(|| format!("Failed to read {}", image_path.display()))?;
    let source = ViewImage::from_bytes(bytes);

    let (handle, task) = create_session(create_generator(&cfg), create_reconstructor(&cfg));
    let result = run(&handle, &cfg, source).await;
    let _ = handle.execute(Command::Quit).await;
    let _ = task.await;
    result
}

fn create_generator(cfg: &AppConfig) -> Arc<dyn ViewGenerator> {
    match GeminiClient::from_env(Some(cfg.gemini.model.as_str())) {
        Some(client) => {
            tracing::info!("Using Gemini ({})", client.model());
            Arc::new(
                client
                    .with_base_url(cfg.gemini.base_url.as_str())
                    .with_timeout(cfg.gemini.timeout_secs),
            )
        }
        None => {
            tracing::warn!("GEMINI_API_KEY not set, using mock view generator");
            Arc::new(MockViewGenerator::new())
        }
    }
}

fn create_reconstructor(cfg: &AppConfig) -> Arc<dyn Reconstructor> {
    if fal_key().is_blank() {
        tracing::warn!("FAL_KEY not set, using mock reconstructor");
        return Arc::new(MockReconstructor::new());
    }
    Arc::new(
        FalClient::new(cfg.fal.queue_url.as_str())
            .with_timeout(cfg.fal.timeout_secs)
            .with_polling(cfg.fal.poll_interval_ms, cfg.fal.max_wait_secs),
    )
}

fn fal_key() -> ApiKey {
    ApiKey::new(std::env::var("FAL_KEY").unwrap_or_default())
}

async fn run(handle: &SessionHandle, cfg: &AppConfig, source: ViewImage) -> anyhow::Result<()> {
    handle
        .execute(Command::Upload(source))
        .await
        .context("Upload failed")?;

    let snapshot = handle
        .execute(Command::StartViews(cfg.defaults.view_settings()))
        .await
        .context("View generation failed")?;
    if snapshot.phase == Phase::ConfirmFront {
        handle
            .execute(Command::ConfirmFront)
            .await
            .context("Remaining views failed")?;
    }
    handle
        .execute(Command::ConfirmViews)
        .await
        .context("Views incomplete")?;

    let mut model = cfg.defaults.model_settings();
    model.api_key = fal_key();
    if model.api_key.is_blank() {
        model.api_key = ApiKey::new("mock");
    }
    tracing::info!(
        engine = ?model.engine,
        "Estimated cost: ${:.3}",
        model.estimated_cost_usd()
    );
    let snapshot = handle
        .execute(Command::StartModel(model))
        .await
        .context("3D generation failed")?;
    if let Some(url) = &snapshot.model_url {
        tracing::info!("Model: {}", url);
    }

    let archive = handle.export().await.context("Export failed")?;
    std::fs::create_dir_all(&cfg.app.output_dir)
        .with_context(|| format!("Failed to create {}", cfg.app.output_dir.display()))?;
    let path = cfg.app.output_dir.join(ARCHIVE_NAME);
    std::fs::write(&path, archive)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Wrote {}", path.display());
    Ok(())
}
