use crate::Dataset;
use h36m_core::{Intrinsics, JointPoint, PoseError, PoseSeq, PoseSeq2, PoseSeq3, ViewTags};
use std::collections::BTreeMap;

/// Per-frame identity columns, one entry per selected frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameTags {
    /// 1-based video frame numbers.
    pub frame: Vec<i64>,
    pub camera: Vec<i64>,
    pub subject: Vec<i64>,
    pub action: Vec<i64>,
    pub subaction: Vec<i64>,
}

impl FrameTags {
    /// `tags` repeated for each of `frame_numbers`.
    pub fn repeat(tags: ViewTags, frame_numbers: &[usize]) -> Self {
        let n = frame_numbers.len();
        Self {
            frame: frame_numbers.iter().map(|&f| f as i64).collect(),
            camera: vec![tags.camera; n],
            subject: vec![tags.subject; n],
            action: vec![tags.action; n],
            subaction: vec![tags.subaction; n],
        }
    }

    pub fn len(&self) -> usize {
        self.frame.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }

    pub fn append(&mut self, other: &FrameTags) {
        self.frame.extend_from_slice(&other.frame);
        self.camera.extend_from_slice(&other.camera);
        self.subject.extend_from_slice(&other.subject);
        self.action.extend_from_slice(&other.action);
        self.subaction.extend_from_slice(&other.subaction);
    }
}

/// Selected frames of one camera view.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewRecord {
    pub camera: String,
    pub pose_2d: PoseSeq2,
    pub pose_3d: PoseSeq3,
    pub pose_3d_univ: PoseSeq3,
    /// Fit against `pose_3d`.
    pub intrinsics: Intrinsics,
    /// Fit against `pose_3d_univ`.
    pub intrinsics_univ: Intrinsics,
    pub tags: FrameTags,
}

impl ViewRecord {
    pub fn num_frames(&self) -> usize {
        self.tags.len()
    }
}

/// All contributing views of a sequence, concatenated in camera order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SequenceRecord {
    pub pose_2d: PoseSeq2,
    pub pose_3d: PoseSeq3,
    pub pose_3d_univ: PoseSeq3,
    pub intrinsics: BTreeMap<String, Intrinsics>,
    pub intrinsics_univ: BTreeMap<String, Intrinsics>,
    pub tags: FrameTags,
    /// Contributing cameras, in the order they were appended.
    pub cameras: Vec<String>,
}

impl SequenceRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one view's frames and register its intrinsics.
    pub fn push(&mut self, view: ViewRecord) -> Result<(), PoseError> {
        self.pose_2d.append(&view.pose_2d)?;
        self.pose_3d.append(&view.pose_3d)?;
        self.pose_3d_univ.append(&view.pose_3d_univ)?;
        self.tags.append(&view.tags);
        self.intrinsics.insert(view.camera.clone(), view.intrinsics);
        self.intrinsics_univ
            .insert(view.camera.clone(), view.intrinsics_univ);
        self.cameras.push(view.camera);
        Ok(())
    }

    /// Merge views in iteration order.
    pub fn merge(views: impl IntoIterator<Item = ViewRecord>) -> Result<Self, PoseError> {
        let mut record = Self::new();
        for view in views {
            record.push(view)?;
        }
        Ok(record)
    }

    pub fn num_frames(&self) -> usize {
        self.tags.len()
    }

    /// `true` when no view has been merged.
    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }

    /// Named arrays in the persisted layout.
    pub fn to_datasets(&self) -> Vec<Dataset> {
        let mut out = vec![
            pose_dataset("pose/2d", &self.pose_2d),
            pose_dataset("pose/3d", &self.pose_3d),
            pose_dataset("pose/3d-univ", &self.pose_3d_univ),
        ];
        for (camera, k) in &self.intrinsics {
            out.push(intrinsics_dataset("intrinsics", camera, k));
        }
        for (camera, k) in &self.intrinsics_univ {
            out.push(intrinsics_dataset("intrinsics-univ", camera, k));
        }
        let n = self.num_frames();
        for (name, column) in [
            ("frame", &self.tags.frame),
            ("camera", &self.tags.camera),
            ("subject", &self.tags.subject),
            ("action", &self.tags.action),
            ("subaction", &self.tags.subaction),
        ] {
            out.push(Dataset::i64(name, vec![n], column.clone()));
        }
        out
    }
}

fn pose_dataset<P: JointPoint>(name: &str, seq: &PoseSeq<P>) -> Dataset {
    Dataset::f64(name, seq.shape().to_vec(), seq.to_flat())
}

fn intrinsics_dataset(group: &str, camera: &str, k: &Intrinsics) -> Dataset {
    Dataset::f64(format!("{group}/{camera}"), vec![4], k.to_array().to_vec())
}
