use crate::{Pt2, Pt3, Real};
use thiserror::Error;

/// Number of joints in every annotated skeleton.
pub const NUM_JOINTS: usize = 32;

/// A point type that can be stored in a [`PoseSeq`].
pub trait JointPoint: Copy + std::fmt::Debug + PartialEq {
    /// Number of scalar components per joint.
    const DIM: usize;

    /// Build a point from exactly `DIM` components.
    fn from_components(c: &[Real]) -> Self;

    /// Append the `DIM` components of this point to `out`.
    fn extend_components(&self, out: &mut Vec<Real>);
}

impl JointPoint for Pt2 {
    const DIM: usize = 2;

    fn from_components(c: &[Real]) -> Self {
        Pt2::new(c[0], c[1])
    }

    fn extend_components(&self, out: &mut Vec<Real>) {
        out.extend_from_slice(&[self.x, self.y]);
    }
}

impl JointPoint for Pt3 {
    const DIM: usize = 3;

    fn from_components(c: &[Real]) -> Self {
        Pt3::new(c[0], c[1], c[2])
    }

    fn extend_components(&self, out: &mut Vec<Real>) {
        out.extend_from_slice(&[self.x, self.y, self.z]);
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PoseError {
    #[error("joint count must be positive")]
    ZeroJoints,
    #[error("row {row} has {len} values, expected {expected} ({joints} joints x {dim})")]
    BadRowLength {
        row: usize,
        len: usize,
        expected: usize,
        joints: usize,
        dim: usize,
    },
    #[error("{points} points do not split into frames of {joints} joints")]
    RaggedPoints { points: usize, joints: usize },
    #[error("cannot append a {other}-joint sequence to a {this}-joint sequence")]
    JointCountMismatch { this: usize, other: usize },
}

/// Sequence of skeleton frames with a fixed joint count.
///
/// Points are stored frame-major in one flat buffer, so [`PoseSeq::points`]
/// yields one entry per joint-frame in the order the intrinsics solve
/// expects.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseSeq<P> {
    num_joints: usize,
    points: Vec<P>,
}

pub type PoseSeq2 = PoseSeq<Pt2>;
pub type PoseSeq3 = PoseSeq<Pt3>;

impl<P: JointPoint> PoseSeq<P> {
    /// Empty sequence with the standard skeleton size.
    pub fn new() -> Self {
        Self {
            num_joints: NUM_JOINTS,
            points: Vec::new(),
        }
    }

    /// Build from a flat, frame-major point buffer.
    pub fn from_points(num_joints: usize, points: Vec<P>) -> Result<Self, PoseError> {
        if num_joints == 0 {
            return Err(PoseError::ZeroJoints);
        }
        if points.len() % num_joints != 0 {
            return Err(PoseError::RaggedPoints {
                points: points.len(),
                joints: num_joints,
            });
        }
        Ok(Self { num_joints, points })
    }

    pub(crate) fn from_parts(num_joints: usize, points: Vec<P>) -> Self {
        debug_assert!(num_joints > 0 && points.len() % num_joints == 0);
        Self { num_joints, points }
    }

    /// Build from annotation rows of `num_joints * P::DIM` scalars each.
    pub fn from_rows(num_joints: usize, rows: &[Vec<Real>]) -> Result<Self, PoseError> {
        if num_joints == 0 {
            return Err(PoseError::ZeroJoints);
        }
        let expected = num_joints * P::DIM;
        let mut points = Vec::with_capacity(rows.len() * num_joints);
        for (row, values) in rows.iter().enumerate() {
            if values.len() != expected {
                return Err(PoseError::BadRowLength {
                    row,
                    len: values.len(),
                    expected,
                    joints: num_joints,
                    dim: P::DIM,
                });
            }
            points.extend(values.chunks_exact(P::DIM).map(P::from_components));
        }
        Ok(Self { num_joints, points })
    }

    pub fn num_joints(&self) -> usize {
        self.num_joints
    }

    pub fn num_frames(&self) -> usize {
        self.points.len() / self.num_joints
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Joints of frame `i`.
    ///
    /// # Panics
    /// If `i >= num_frames()`.
    pub fn frame(&self, i: usize) -> &[P] {
        &self.points[i * self.num_joints..(i + 1) * self.num_joints]
    }

    pub fn frames(&self) -> std::slice::ChunksExact<'_, P> {
        self.points.chunks_exact(self.num_joints)
    }

    /// All joint-frame points, frame-major.
    pub fn points(&self) -> &[P] {
        &self.points
    }

    /// `[frames, joints, dim]`.
    pub fn shape(&self) -> [usize; 3] {
        [self.num_frames(), self.num_joints, P::DIM]
    }

    /// Copy the frames at `indices`, in the given order.
    ///
    /// # Panics
    /// If any index is out of range.
    pub fn select(&self, indices: &[usize]) -> Self {
        let mut points = Vec::with_capacity(indices.len() * self.num_joints);
        for &i in indices {
            points.extend_from_slice(self.frame(i));
        }
        Self {
            num_joints: self.num_joints,
            points,
        }
    }

    /// Append all frames of `other`.
    pub fn append(&mut self, other: &Self) -> Result<(), PoseError> {
        if other.num_joints != self.num_joints {
            return Err(PoseError::JointCountMismatch {
                this: self.num_joints,
                other: other.num_joints,
            });
        }
        self.points.extend_from_slice(&other.points);
        Ok(())
    }

    /// Flatten to scalars in `[frame][joint][component]` order.
    pub fn to_flat(&self) -> Vec<Real> {
        let mut out = Vec::with_capacity(self.points.len() * P::DIM);
        for p in &self.points {
            p.extend_components(&mut out);
        }
        out
    }
}

impl<P: JointPoint> Default for PoseSeq<P> {
    fn default() -> Self {
        Self::new()
    }
}
