//! Per-view numeric stages of the preprocessing pipeline.
//!
//! - [`select_frames`]: motion-gated (or fixed-stride) keyframe selection
//!   over a 3D trajectory.
//! - [`estimate_intrinsics`]: linear least-squares fit of a per-axis pinhole
//!   model from paired 2D/3D joint positions.
//!
//! Both are pure functions of their inputs.

mod frame_select;
mod intrinsics_fit;

pub use frame_select::*;
pub use intrinsics_fit::*;
