//! F-wave solver on the [Burn](https://github.com/tracel-ai/burn) tensor framework.
//!
//! The whole block is uploaded as `(ny + 2) × (nx + 2)` tensors and every
//! edge Riemann problem of one direction is solved in a single batch of
//! elementwise tensor operations. Branches of the host solver (dry
//! neighbours, wave direction) become masks.
//!
//! # Backend Selection
//!
//! - **CUDA**: NVIDIA GPUs, `burn-cuda` feature
//! - **WGPU**: cross-platform GPU (Vulkan/DX12/Metal), `burn-wgpu` feature
//! - **NdArray**: CPU reference, `burn-ndarray` feature
//!
//! For small blocks the host backend is usually faster because of the
//! transfer overhead per step.

mod backend;
mod error;
mod flux;
mod grid;

pub use backend::SweBackend;
pub use error::BurnError;
pub use flux::{BatchedUpdates, NormalStates, fwave_batched};
pub use grid::BurnBackend;
