//! 视图生成层：客户端抽象、提示词模板与实现（Gemini / Mock）

pub mod gemini;
pub mod mock;
pub mod prompts;
pub mod traits;

pub use gemini::{GeminiClient, DEFAULT_GEMINI_IMAGE_MODEL};
pub use mock::MockViewGenerator;
pub use traits::{GenerationError, ViewGenerator, ViewRequest};
