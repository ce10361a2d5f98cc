//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `VIEWFORGE__*` 覆盖（双下划线表示嵌套，如 `VIEWFORGE__FAL__MAX_WAIT_SECS=900`）。
//! 凭证不进配置文件：Gemini 读 `GEMINI_API_KEY`，fal 凭证按会话传入。

use std::path::PathBuf;

use serde::Deserialize;

use crate::core::{
    Engine, ModelSettings, RenderStyle, TextureMode, TripoTexture, ViewSettings, ViewStrategy,
};
use crate::reconstruct::fal::FAL_QUEUE_URL;
use crate::vision::gemini::{GEMINI_BASE_URL, DEFAULT_GEMINI_IMAGE_MODEL};

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub gemini: GeminiSection,
    pub fal: FalSection,
    pub defaults: DefaultsSection,
}

/// [app] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    /// 导出压缩包的目录
    pub output_dir: PathBuf,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
        }
    }
}

/// [gemini] 段：图像模型与请求超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeminiSection {
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for GeminiSection {
    fn default() -> Self {
        Self {
            model: DEFAULT_GEMINI_IMAGE_MODEL.to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
            timeout_secs: 120,
        }
    }
}

/// [fal] 段：队列地址与轮询参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FalSection {
    pub queue_url: String,
    pub poll_interval_ms: u64,
    /// 最长等待时间，超时视为失败
    pub max_wait_secs: u64,
    pub timeout_secs: u64,
}

impl Default for FalSection {
    fn default() -> Self {
        Self {
            queue_url: FAL_QUEUE_URL.to_string(),
            poll_interval_ms: 1000,
            max_wait_secs: 600,
            timeout_secs: 60,
        }
    }
}

/// [defaults] 段：无交互运行时使用的设置
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DefaultsSection {
    pub strategy: ViewStrategy,
    pub style: RenderStyle,
    pub engine: Engine,
    pub texture: TextureMode,
    pub tripo_texture: TripoTexture,
    pub enable_pbr: bool,
    pub quad_meshing: bool,
}

impl DefaultsSection {
    pub fn view_settings(&self) -> ViewSettings {
        ViewSettings {
            strategy: self.strategy,
            style: self.style,
        }
    }

    /// 3D 设置（不含凭证）
    pub fn model_settings(&self) -> ModelSettings {
        ModelSettings {
            engine: self.engine,
            texture: self.texture,
            tripo_texture: self.tripo_texture,
            enable_pbr: self.enable_pbr,
            quad_meshing: self.quad_meshing,
            ..Default::default()
        }
    }
}

/// 从 config 目录加载配置，环境变量 VIEWFORGE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 VIEWFORGE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("VIEWFORGE")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_sources() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.gemini.model, DEFAULT_GEMINI_IMAGE_MODEL);
        assert_eq!(cfg.fal.queue_url, FAL_QUEUE_URL);
        assert_eq!(cfg.defaults.view_settings(), ViewSettings::default());
        assert!(cfg.defaults.model_settings().api_key.is_blank());
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[app]
output_dir = "exports"

[fal]
max_wait_secs = 30

[defaults]
strategy = "individual"
style = "clay"
engine = "tripo3d"
tripo_texture = "HD"
"#
        )
        .unwrap();

        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.app.output_dir, PathBuf::from("exports"));
        assert_eq!(cfg.fal.max_wait_secs, 30);
        assert_eq!(cfg.fal.poll_interval_ms, 1000);
        assert_eq!(cfg.defaults.strategy, ViewStrategy::Individual);
        assert_eq!(cfg.defaults.style, RenderStyle::Clay);
        assert_eq!(cfg.defaults.engine, Engine::Tripo3d);
        assert_eq!(cfg.defaults.tripo_texture, TripoTexture::Hd);
    }
}
