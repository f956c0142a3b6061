use crate::{Pt2, Pt3, Real};
use serde::{Deserialize, Serialize};

/// Pinhole intrinsics with one focal scale and one principal offset per axis.
///
/// Projection of a camera-space point `(x, y, z)`:
///
/// ```text
/// u = alpha_x * x / z + x0
/// v = alpha_y * y / z + y0
/// ```
///
/// Serialized as the 4-vector `[alpha_x, x0, alpha_y, y0]`, which is also the
/// layout of the `intrinsics/*` output datasets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[Real; 4]", into = "[Real; 4]")]
pub struct Intrinsics {
    /// Horizontal focal scale.
    pub alpha_x: Real,
    /// Horizontal principal offset.
    pub x0: Real,
    /// Vertical focal scale.
    pub alpha_y: Real,
    /// Vertical principal offset.
    pub y0: Real,
}

impl Intrinsics {
    pub fn new(alpha_x: Real, x0: Real, alpha_y: Real, y0: Real) -> Self {
        Self {
            alpha_x,
            x0,
            alpha_y,
            y0,
        }
    }

    /// Project a camera-space point to image coordinates.
    pub fn project(&self, p: &Pt3) -> Pt2 {
        Pt2::new(
            self.alpha_x * p.x / p.z + self.x0,
            self.alpha_y * p.y / p.z + self.y0,
        )
    }

    pub fn to_array(&self) -> [Real; 4] {
        [self.alpha_x, self.x0, self.alpha_y, self.y0]
    }
}

impl From<[Real; 4]> for Intrinsics {
    fn from(v: [Real; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<Intrinsics> for [Real; 4] {
    fn from(k: Intrinsics) -> Self {
        k.to_array()
    }
}
