//! Shared fixture: a small corpus held in memory, with real output on disk.
#![allow(dead_code)]

use h36m_core::{
    synthetic, Intrinsics, JointPoint, Metadata, PoseSeq, PoseSeq3, Real, SequenceKey, Vec3,
};
use h36m_pipeline::{
    frame_filename, AnnotationKind, AnnotationSource, ExtractionError, FrameExtractor,
    JsonArraySink, LoadError, Pipeline, PipelineConfig,
};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const CAMERAS: [&str; 4] = ["54138969", "55011271", "58860488", "60457274"];

/// Frames per video: 20 walking frames (kept by motion gating), then 60 still.
pub const VIDEO_FRAMES: usize = 80;
pub const WALKING_FRAMES: usize = 20;

/// Annotations keyed by `(subject, kind, base)`.
#[derive(Debug, Default)]
pub struct MemorySource {
    pub rows: HashMap<(String, AnnotationKind, String), Vec<Vec<Real>>>,
}

impl MemorySource {
    pub fn insert<P: JointPoint>(
        &mut self,
        subject: &str,
        kind: AnnotationKind,
        base: &str,
        seq: &PoseSeq<P>,
    ) {
        let rows = seq
            .to_flat()
            .chunks(seq.num_joints() * P::DIM)
            .map(<[Real]>::to_vec)
            .collect();
        self.rows
            .insert((subject.to_string(), kind, base.to_string()), rows);
    }

    pub fn remove(&mut self, subject: &str, kind: AnnotationKind, base: &str) {
        self.rows
            .remove(&(subject.to_string(), kind, base.to_string()));
    }
}

impl AnnotationSource for MemorySource {
    fn load(
        &self,
        subject: &str,
        kind: AnnotationKind,
        base: &str,
    ) -> Result<Vec<Vec<Real>>, LoadError> {
        self.rows
            .get(&(subject.to_string(), kind, base.to_string()))
            .cloned()
            .ok_or_else(|| LoadError::Missing {
                path: PathBuf::from(format!("{subject}/{}/{base}.json", kind.dir_name())),
            })
    }
}

/// Writes `VIDEO_FRAMES` small files per call and remembers what it decoded.
#[derive(Debug, Default)]
pub struct CountingExtractor {
    pub calls: Cell<usize>,
    pub videos: RefCell<Vec<PathBuf>>,
}

impl CountingExtractor {
    pub fn decoded(&self, video_name: &str) -> bool {
        self.videos
            .borrow()
            .iter()
            .any(|v| v.file_name().is_some_and(|n| n == video_name))
    }
}

impl FrameExtractor for CountingExtractor {
    fn extract_all(&self, video: &Path, out_dir: &Path) -> Result<(), ExtractionError> {
        self.calls.set(self.calls.get() + 1);
        self.videos.borrow_mut().push(video.to_path_buf());
        let stem = video.file_stem().unwrap_or_default().to_string_lossy();
        for n in 1..=VIDEO_FRAMES {
            let path = out_dir.join(frame_filename(n));
            fs::write(&path, format!("{stem} #{n}")).map_err(|source| ExtractionError::Io {
                path: path.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

pub fn ground_truth(camera_index: usize) -> Intrinsics {
    let i = camera_index as Real;
    Intrinsics::new(1145.0 + 10.0 * i, 512.0 + i, 1144.0 + 10.0 * i, 515.0 - i)
}

/// Camera-frame skeleton motion seen by camera `camera_index`.
pub fn camera_trajectory(camera_index: usize) -> PoseSeq3 {
    let depth = 4500.0 + 100.0 * camera_index as Real;
    synthetic::trajectory(VIDEO_FRAMES, move |f| {
        Vec3::new(50.0 * f.min(WALKING_FRAMES - 1) as Real, 0.0, depth)
    })
}

pub struct Fixture {
    pub root: TempDir,
    pub metadata: Metadata,
    pub config: PipelineConfig,
    pub source: MemorySource,
    pub extractor: CountingExtractor,
    pub sink: JsonArraySink,
}

impl Fixture {
    /// Subjects S1 (motion gated) and S9 (fixed stride), four cameras.
    pub fn new() -> Self {
        let metadata = Metadata::new(["S1", "S9"], CAMERAS)
            .with_action("1", "_ALL")
            .with_action("2", "Directions")
            .with_action("3", "Discussion")
            .with_sequence("S1", "1", "1", "_ALL 1")
            .with_sequence("S1", "2", "1", "Directions 1")
            .with_sequence("S1", "2", "2", "Directions")
            .with_sequence("S1", "3", "1", "Discussion 1")
            .with_sequence("S9", "2", "1", "Directions 1");
        Self::with_metadata(metadata)
    }

    pub fn with_metadata(metadata: Metadata) -> Self {
        let root = TempDir::new().unwrap();
        let mut config = PipelineConfig {
            extracted_dir: root.path().join("extracted"),
            processed_dir: root.path().join("processed"),
            scratch_dir: Some(root.path().join("scratch")),
            ..PipelineConfig::default()
        };
        config.subjects = metadata.subjects().to_vec();

        let mut source = MemorySource::default();
        let layout = config.layout();
        for subject in metadata.subjects() {
            for seq in metadata.sequences(subject).unwrap() {
                for (i, camera) in metadata.camera_ids().iter().enumerate() {
                    let base = metadata.base_filename(&seq, camera).unwrap();
                    let pose_3d = camera_trajectory(i);
                    let pose_2d = synthetic::project_sequence(&pose_3d, &ground_truth(i)).unwrap();
                    source.insert(subject, AnnotationKind::Positions2d, &base, &pose_2d);
                    source.insert(subject, AnnotationKind::Positions3dMono, &base, &pose_3d);
                    source.insert(subject, AnnotationKind::Positions3dUniversal, &base, &pose_3d);

                    let video = layout.video_file(subject, &base);
                    fs::create_dir_all(video.parent().unwrap()).unwrap();
                    fs::write(&video, b"not really an mp4").unwrap();
                }
            }
        }

        Self {
            root,
            metadata,
            config,
            source,
            extractor: CountingExtractor::default(),
            sink: JsonArraySink,
        }
    }

    pub fn pipeline(&self) -> Pipeline<'_> {
        Pipeline::new(
            &self.metadata,
            &self.config,
            &self.source,
            &self.extractor,
            &self.sink,
        )
    }

    pub fn base(&self, seq: &SequenceKey, camera: &str) -> String {
        self.metadata.base_filename(seq, camera).unwrap()
    }

    pub fn sequence_dir(&self, seq: &SequenceKey) -> PathBuf {
        let name = self.metadata.action_name(&seq.action).unwrap();
        self.config
            .layout()
            .sequence_dir(&seq.subject, name, &seq.subaction)
    }

    pub fn video(&self, seq: &SequenceKey, camera: &str) -> PathBuf {
        self.config
            .layout()
            .video_file(&seq.subject, &self.base(seq, camera))
    }
}

/// Datasets of a written container, by name.
pub fn read_datasets(path: &Path) -> BTreeMap<String, h36m_pipeline::Dataset> {
    JsonArraySink::read(path)
        .unwrap()
        .into_iter()
        .map(|d| (d.name.clone(), d))
        .collect()
}
