//! 重建层：多视图 → 3D 模型客户端抽象与实现（fal.ai / Mock）

pub mod fal;
pub mod mock;
pub mod traits;

pub use fal::FalClient;
pub use mock::MockReconstructor;
pub use traits::{ModelAsset, ReconstructionError, Reconstructor};
