//! Viewforge - 单张产品照片 → 四视图 → 3D 模型
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 视图与设置模型、阶段状态机、会话、主控循环
//! - **export**: 视图与模型打包为 zip
//! - **imaging**: 图片载体与 2x2 网格拆分
//! - **observability**: 日志初始化
//! - **reconstruct**: 多视图 → 3D 模型客户端（fal.ai / Mock）
//! - **vision**: 视图生成客户端（Gemini / Mock）与提示词

pub mod config;
pub mod core;
pub mod export;
pub mod imaging;
pub mod observability;
pub mod reconstruct;
pub mod vision;
