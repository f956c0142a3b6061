use crate::AnnotationKind;
use h36m_core::{IdError, MetadataError, PoseError};
use h36m_linear::SolveError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to resolve or read the inputs of one view.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("annotation file {} not found", path.display())]
    Missing { path: PathBuf },
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{kind} annotations: {source}")]
    Shape {
        kind: AnnotationKind,
        #[source]
        source: PoseError,
    },
    #[error("{kind} annotations hold no frames")]
    Empty { kind: AnnotationKind },
    #[error("frame counts disagree: 2d {frames_2d}, 3d {frames_3d}, 3d universal {frames_3d_univ}")]
    FrameCountMismatch {
        frames_2d: usize,
        frames_3d: usize,
        frames_3d_univ: usize,
    },
    #[error("video {} not found", .0.display())]
    MissingVideo(PathBuf),
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error(transparent)]
    Id(#[from] IdError),
}

/// Failure while decoding frames or moving them into place.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("ffmpeg not found on PATH; install it or set `ffmpeg.binary` in the config")]
    NotFound,
    #[error("failed to launch {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} exited with {status}: {stderr}", program.display())]
    Failed {
        program: PathBuf,
        status: String,
        stderr: String,
    },
    #[error("decoder did not produce frame {}", .0.display())]
    MissingFrame(PathBuf),
    #[error("i/o error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to remove scratch directory {}: {source}", path.display())]
    ScratchCleanup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{primary} (scratch cleanup also failed: {cleanup})")]
    WithCleanup {
        primary: Box<ExtractionError>,
        cleanup: Box<ExtractionError>,
    },
}

impl ExtractionError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Why one camera view contributed nothing to its sequence.
#[derive(Debug, Error)]
pub enum ViewError {
    #[error("load failed: {0}")]
    Load(#[from] LoadError),
    #[error("intrinsics solve failed: {0}")]
    Solve(#[from] SolveError),
    #[error("frame extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
}

impl ViewError {
    /// Short stage label used in reports.
    pub fn stage(&self) -> &'static str {
        match self {
            ViewError::Load(_) => "load",
            ViewError::Solve(_) => "solve",
            ViewError::Extraction(_) => "extraction",
        }
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("i/o error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("dataset {name}: {len} values do not fill shape {shape:?}")]
    Shape {
        name: String,
        shape: Vec<usize>,
        len: usize,
    },
    #[error("dataset {0} holds a non-finite value")]
    NonFinite(String),
    #[error("dataset {name}: value is not a valid {dtype}")]
    BadValue { name: String, dtype: &'static str },
    #[error("duplicate dataset {0}")]
    Duplicate(String),
}

/// Sequence-level failure; the batch driver records it and moves on.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error("failed to merge views: {0}")]
    Merge(#[from] PoseError),
    #[error("failed to write output: {0}")]
    Sink(#[from] SinkError),
}
