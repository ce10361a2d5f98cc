//! 生成设置：2D 设置（视图策略 / 风格）与 3D 设置（引擎 / 纹理 / 凭证）
//!
//! 两部分设置分别在各自步骤中收集并合并进 GenerationSettings（后写入者只覆盖自己那部分）；
//! 只有在发起重建请求时才通过 `finalize` 统一校验为 ReconstructionSettings。

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::WorkflowError;

/// 视图生成策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewStrategy {
    /// 一次生成 2x2 网格再拆分（快）
    #[default]
    Grid,
    /// 先 front，再以 front 为锚点依次生成其余视图（质量高）
    Individual,
}

/// 视觉风格
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStyle {
    #[default]
    Realistic,
    /// 哑光灰色黏土材质，便于 3D 扫描
    Clay,
}

/// 2D 设置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViewSettings {
    pub strategy: ViewStrategy,
    pub style: RenderStyle,
}

/// 重建引擎
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Engine {
    /// Hunyuan 快速模式
    #[default]
    Turbo,
    /// Hunyuan 标准模式
    Standard,
    /// Tripo3D，使用全部四个视图
    Tripo3d,
}

impl Engine {
    pub fn is_hunyuan(&self) -> bool {
        matches!(self, Engine::Turbo | Engine::Standard)
    }
}

/// Hunyuan 纹理开关
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextureMode {
    #[default]
    Textured,
    NonTextured,
}

/// Tripo3D 纹理档位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TripoTexture {
    #[serde(rename = "no")]
    No,
    #[default]
    #[serde(rename = "standard")]
    Standard,
    #[serde(rename = "HD")]
    Hd,
}

impl TripoTexture {
    /// 接口要求的取值
    pub fn as_api_str(&self) -> &'static str {
        match self {
            TripoTexture::No => "no",
            TripoTexture::Standard => "standard",
            TripoTexture::Hd => "HD",
        }
    }
}

/// 用户在会话中临时输入的访问凭证；Debug 输出脱敏，不参与序列化
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_blank() {
            f.write_str("ApiKey(<empty>)")
        } else {
            f.write_str("ApiKey(***)")
        }
    }
}

/// 3D 设置（各引擎的选项都保留，切换引擎时不丢失）
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelSettings {
    pub engine: Engine,
    pub texture: TextureMode,
    pub tripo_texture: TripoTexture,
    pub enable_pbr: bool,
    pub quad_meshing: bool,
    #[serde(skip)]
    pub api_key: ApiKey,
}

impl ModelSettings {
    /// 预估单次生成费用（美元）
    pub fn estimated_cost_usd(&self) -> f64 {
        match self.engine {
            Engine::Tripo3d => {
                let mut cost = 0.10;
                cost += match self.tripo_texture {
                    TripoTexture::No => 0.0,
                    TripoTexture::Standard => 0.05,
                    TripoTexture::Hd => 0.10,
                };
                if self.quad_meshing {
                    cost += 0.05;
                }
                cost
            }
            Engine::Standard => match self.texture {
                TextureMode::Textured => 0.051,
                TextureMode::NonTextured => 0.017,
            },
            Engine::Turbo => match self.texture {
                TextureMode::Textured => 0.045,
                TextureMode::NonTextured => 0.015,
            },
        }
    }
}

/// 会话内累积的设置：2D 先填，3D 后填，合并而非替换
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct GenerationSettings {
    pub view: Option<ViewSettings>,
    pub model: Option<ModelSettings>,
}

impl GenerationSettings {
    pub fn merge_view(&mut self, view: ViewSettings) {
        self.view = Some(view);
    }

    pub fn merge_model(&mut self, model: ModelSettings) {
        self.model = Some(model);
    }

    /// 发起重建前的最终校验
    pub fn finalize(&self) -> Result<ReconstructionSettings, WorkflowError> {
        let model = self
            .model
            .as_ref()
            .ok_or(WorkflowError::MissingModelSettings)?;
        if model.api_key.is_blank() {
            return Err(WorkflowError::MissingCredential);
        }
        let engine = match model.engine {
            Engine::Turbo | Engine::Standard => EngineOptions::Hunyuan {
                fast: model.engine == Engine::Turbo,
                textured: model.texture == TextureMode::Textured,
            },
            Engine::Tripo3d => EngineOptions::Tripo {
                texture: model.tripo_texture,
                pbr: model.enable_pbr,
                quad: model.quad_meshing,
            },
        };
        Ok(ReconstructionSettings {
            engine,
            api_key: model.api_key.clone(),
        })
    }
}

/// 引擎相关选项（只保留所选引擎需要的部分）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineOptions {
    Hunyuan { fast: bool, textured: bool },
    Tripo { texture: TripoTexture, pbr: bool, quad: bool },
}

/// 校验后的重建参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconstructionSettings {
    pub engine: EngineOptions,
    pub api_key: ApiKey,
}
