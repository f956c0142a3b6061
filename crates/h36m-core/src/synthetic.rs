//! Deterministic synthetic skeleton data.
//!
//! Small building blocks for tests and demos:
//! - a fixed 32-joint rest skeleton (millimetres, root at the origin),
//! - trajectories that move the skeleton in front of a camera,
//! - pinhole projection of a trajectory into 2D annotations,
//! - seeded per-joint jitter that does not depend on `rand` internals.
//!
//! # Example
//!
//! ```
//! use h36m_core::{synthetic, Intrinsics, Vec3};
//!
//! let traj = synthetic::trajectory(10, |f| Vec3::new(f as f64 * 5.0, 0.0, 4500.0));
//! let k = Intrinsics::new(1145.0, 512.0, 1144.0, 515.0);
//! let pose_2d = synthetic::project_sequence(&traj, &k).unwrap();
//! assert_eq!(pose_2d.num_frames(), 10);
//! ```

use crate::{Intrinsics, PoseSeq2, PoseSeq3, Pt3, Real, Vec3, NUM_JOINTS};
use anyhow::{ensure, Result};

/// Rest pose with [`NUM_JOINTS`] joints spread over a human-sized volume.
///
/// Joints are placed on a deterministic lattice so that every joint has a
/// distinct depth, which keeps the intrinsics solve well conditioned.
pub fn rest_skeleton() -> Vec<Pt3> {
    (0..NUM_JOINTS)
        .map(|j| {
            let t = j as Real;
            Pt3::new(
                ((j % 4) as Real - 1.5) * 180.0,
                (j / 4) as Real * 220.0 - 800.0,
                (t * 37.0) % 400.0 - 200.0,
            )
        })
        .collect()
}

/// Rest skeleton translated by `root(frame)` for each of `num_frames` frames.
pub fn trajectory(num_frames: usize, root: impl Fn(usize) -> Vec3) -> PoseSeq3 {
    let rest = rest_skeleton();
    let mut points = Vec::with_capacity(num_frames * NUM_JOINTS);
    for f in 0..num_frames {
        let offset = root(f);
        points.extend(rest.iter().map(|p| p + offset));
    }
    PoseSeq3::from_parts(NUM_JOINTS, points)
}

/// A skeleton standing still at `depth` millimetres.
pub fn still(num_frames: usize, depth: Real) -> PoseSeq3 {
    trajectory(num_frames, |_| Vec3::new(0.0, 0.0, depth))
}

/// Project every joint with the per-axis pinhole model.
pub fn project_sequence(seq: &PoseSeq3, k: &Intrinsics) -> Result<PoseSeq2> {
    let mut points = Vec::with_capacity(seq.points().len());
    for (i, p) in seq.points().iter().enumerate() {
        ensure!(p.z > 0.0, "joint-frame {} is behind the camera (z = {})", i, p.z);
        points.push(k.project(p));
    }
    Ok(PoseSeq2::from_points(seq.num_joints(), points)?)
}

/// Seeded uniform jitter in `[-max_abs, +max_abs]` per component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Jitter {
    pub seed: u64,
    pub max_abs: Real,
}

impl Jitter {
    pub fn sample(&self, frame: usize, joint: usize) -> Vec3 {
        let key = self.seed
            ^ (frame as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
            ^ (joint as u64).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        let a = splitmix64(key);
        let b = splitmix64(a);
        let c = splitmix64(b);
        let scale = 2.0 * self.max_abs.abs();
        Vec3::new(
            (unit(a) - 0.5) * scale,
            (unit(b) - 0.5) * scale,
            (unit(c) - 0.5) * scale,
        )
    }

    /// Jitter every joint of `seq`.
    pub fn apply(&self, seq: &PoseSeq3) -> PoseSeq3 {
        let nj = seq.num_joints();
        let points = seq
            .points()
            .iter()
            .enumerate()
            .map(|(i, p)| p + self.sample(i / nj, i % nj))
            .collect();
        PoseSeq3::from_parts(nj, points)
    }
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn unit(x: u64) -> Real {
    (x >> 11) as Real / (1u64 << 53) as Real
}
