//! Core types for `h36m-prep`.
//!
//! This crate contains:
//! - linear algebra type aliases (`Real`, `Pt2`, `Pt3`, ...),
//! - fixed-skeleton pose sequences ([`PoseSeq`]),
//! - the per-axis pinhole [`Intrinsics`] model,
//! - sequence / view identifiers ([`SequenceKey`], [`ViewKey`]),
//! - the corpus metadata table ([`Metadata`]) loaded from `metadata.xml`,
//! - deterministic synthetic data used by tests across the workspace.
//!
//! Everything here is plain data; the processing stages live in
//! `h36m-linear` and `h36m-pipeline`.

/// Identifiers for sequences and views.
pub mod ids;
/// Per-axis pinhole intrinsics.
pub mod intrinsics;
/// Linear algebra type aliases.
pub mod math;
/// Corpus metadata table.
pub mod metadata;
/// Joint position sequences.
pub mod pose;
pub mod synthetic;

pub use ids::*;
pub use intrinsics::*;
pub use math::*;
pub use metadata::*;
pub use pose::*;
