//! Keyframe selection over a view's 3D trajectory.
//!
//! Two policies:
//!
//! - **Fixed stride** for the evaluation subjects: every `sparse_stride`-th
//!   frame, starting at 0, regardless of motion.
//! - **Motion gated** for everyone else: frame 0 is kept, and a later frame
//!   is kept once some joint has moved at least `sqrt(motion_threshold_sq)`
//!   away from its position in the most recently *kept* frame. Sampling is
//!   dense during motion and sparse while the subject stands still.

use h36m_core::{PoseSeq3, Pt3, Real};
use log::debug;
use serde::{Deserialize, Serialize};

/// Frame selection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameSelectOptions {
    /// Subjects sampled with a fixed stride.
    pub sparse_subjects: Vec<String>,
    /// Stride used for `sparse_subjects`.
    pub sparse_stride: usize,
    /// Squared per-joint displacement (mm²) that triggers a new keyframe.
    pub motion_threshold_sq: Real,
}

impl Default for FrameSelectOptions {
    fn default() -> Self {
        Self {
            sparse_subjects: vec!["S9".to_string(), "S11".to_string()],
            sparse_stride: 64,
            motion_threshold_sq: 40.0 * 40.0,
        }
    }
}

impl FrameSelectOptions {
    pub fn is_sparse(&self, subject: &str) -> bool {
        self.sparse_subjects.iter().any(|s| s == subject)
    }
}

/// Select 0-based frame indices to keep for `subject`.
///
/// The result is strictly increasing. An empty trajectory yields no indices
/// and a single-frame trajectory yields `[0]`.
pub fn select_frames(subject: &str, trajectory: &PoseSeq3, opts: &FrameSelectOptions) -> Vec<usize> {
    let n = trajectory.num_frames();
    let indices = if opts.is_sparse(subject) {
        (0..n).step_by(opts.sparse_stride.max(1)).collect()
    } else {
        motion_gated(trajectory, opts.motion_threshold_sq)
    };
    debug!(
        "{}: kept {} of {} frames ({})",
        subject,
        indices.len(),
        n,
        if opts.is_sparse(subject) { "stride" } else { "motion" }
    );
    indices
}

fn motion_gated(trajectory: &PoseSeq3, threshold_sq: Real) -> Vec<usize> {
    let mut kept = Vec::new();
    let mut reference: Option<usize> = None;
    for (i, joints) in trajectory.frames().enumerate() {
        if let Some(r) = reference {
            if max_joint_displacement_sq(trajectory.frame(r), joints) < threshold_sq {
                continue;
            }
        }
        reference = Some(i);
        kept.push(i);
    }
    kept
}

/// Largest squared Euclidean distance between corresponding joints.
pub fn max_joint_displacement_sq(a: &[Pt3], b: &[Pt3]) -> Real {
    a.iter()
        .zip(b)
        .map(|(p, q)| (q - p).norm_squared())
        .fold(0.0, Real::max)
}
