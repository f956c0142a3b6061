use crate::{DatasetLayout, LoadError};
use h36m_core::Real;
use serde::{Deserialize, Serialize};
use std::{fmt, fs, io};

/// The three joint-position annotation variants stored per view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnnotationKind {
    /// Image-plane positions, pixels.
    Positions2d,
    /// Camera-frame 3D positions, millimetres.
    Positions3dMono,
    /// Camera-frame 3D positions of the size-normalised skeleton.
    Positions3dUniversal,
}

impl AnnotationKind {
    pub const ALL: [AnnotationKind; 3] = [
        AnnotationKind::Positions2d,
        AnnotationKind::Positions3dMono,
        AnnotationKind::Positions3dUniversal,
    ];

    /// Directory below `{extracted}/{subject}` holding this kind.
    pub fn dir_name(self) -> &'static str {
        match self {
            AnnotationKind::Positions2d => "Poses_D2_Positions",
            AnnotationKind::Positions3dMono => "Poses_D3_Positions_mono",
            AnnotationKind::Positions3dUniversal => "Poses_D3_Positions_mono_universal",
        }
    }

    /// Scalars per joint.
    pub fn components(self) -> usize {
        match self {
            AnnotationKind::Positions2d => 2,
            AnnotationKind::Positions3dMono | AnnotationKind::Positions3dUniversal => 3,
        }
    }
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AnnotationKind::Positions2d => "2d",
            AnnotationKind::Positions3dMono => "3d",
            AnnotationKind::Positions3dUniversal => "3d universal",
        })
    }
}

/// Provider of raw per-frame joint positions.
pub trait AnnotationSource {
    /// Rows of `NUM_JOINTS * kind.components()` scalars, one per video frame.
    fn load(&self, subject: &str, kind: AnnotationKind, base: &str)
        -> Result<Vec<Vec<Real>>, LoadError>;
}

/// Reads `{extracted}/{subject}/{kind dir}/{base}.json`, a JSON array of rows.
#[derive(Debug, Clone)]
pub struct JsonAnnotationSource {
    layout: DatasetLayout,
}

impl JsonAnnotationSource {
    pub fn new(layout: DatasetLayout) -> Self {
        Self { layout }
    }
}

impl AnnotationSource for JsonAnnotationSource {
    fn load(
        &self,
        subject: &str,
        kind: AnnotationKind,
        base: &str,
    ) -> Result<Vec<Vec<Real>>, LoadError> {
        let path = self.layout.annotation_file(subject, kind, base);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(LoadError::Missing { path })
            }
            Err(source) => return Err(LoadError::Io { path, source }),
        };
        serde_json::from_str(&text).map_err(|source| LoadError::Parse { path, source })
    }
}
