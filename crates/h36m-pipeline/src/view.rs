use crate::{
    ensure_frames, frames_present, AnnotationKind, FrameTags, LoadError, Pipeline, ViewError,
    ViewRecord,
};
use h36m_core::{JointPoint, PoseSeq, PoseSeq2, PoseSeq3, ViewKey, NUM_JOINTS};
use h36m_linear::{estimate_view_intrinsics, select_frames};
use log::debug;
use std::path::Path;

impl Pipeline<'_> {
    /// Process one camera view into `sequence_dir`.
    ///
    /// Loads the three annotation kinds, fits intrinsics against both 3D
    /// variants, selects keyframes on the universal 3D trajectory and makes
    /// sure their images exist under `imageSequence/{camera}`.
    pub fn process_view(
        &self,
        sequence_dir: &Path,
        view: &ViewKey,
    ) -> Result<ViewRecord, ViewError> {
        let base = self
            .metadata
            .base_filename(&view.sequence(), &view.camera)
            .map_err(LoadError::from)?;
        let tags = view.numeric_tags().map_err(LoadError::from)?;

        let subject = view.subject.as_str();
        let pose_2d: PoseSeq2 = self.load_poses(subject, AnnotationKind::Positions2d, &base)?;
        let pose_3d: PoseSeq3 = self.load_poses(subject, AnnotationKind::Positions3dMono, &base)?;
        let pose_3d_univ: PoseSeq3 =
            self.load_poses(subject, AnnotationKind::Positions3dUniversal, &base)?;
        let frames = pose_2d.num_frames();
        if pose_3d.num_frames() != frames || pose_3d_univ.num_frames() != frames {
            return Err(LoadError::FrameCountMismatch {
                frames_2d: frames,
                frames_3d: pose_3d.num_frames(),
                frames_3d_univ: pose_3d_univ.num_frames(),
            }
            .into());
        }

        let intrinsics = estimate_view_intrinsics(&pose_2d, &pose_3d)?;
        let intrinsics_univ = estimate_view_intrinsics(&pose_2d, &pose_3d_univ)?;

        let indices = select_frames(subject, &pose_3d_univ, &self.config.frame_selection);
        let frame_numbers: Vec<usize> = indices.iter().map(|i| i + 1).collect();
        debug!("{view}: {} of {frames} frames selected", indices.len());

        let frames_dir = self.layout.frames_dir(sequence_dir, &view.camera);
        let video = self.layout.video_file(subject, &base);
        if !video.is_file() && !frames_present(&frames_dir, &frame_numbers)? {
            return Err(LoadError::MissingVideo(video).into());
        }
        ensure_frames(
            self.extractor,
            &video,
            &frames_dir,
            &frame_numbers,
            self.config.scratch_dir.as_deref(),
        )?;

        Ok(ViewRecord {
            camera: view.camera.clone(),
            pose_2d: pose_2d.select(&indices),
            pose_3d: pose_3d.select(&indices),
            pose_3d_univ: pose_3d_univ.select(&indices),
            intrinsics,
            intrinsics_univ,
            tags: FrameTags::repeat(tags, &frame_numbers),
        })
    }

    fn load_poses<P: JointPoint>(
        &self,
        subject: &str,
        kind: AnnotationKind,
        base: &str,
    ) -> Result<PoseSeq<P>, LoadError> {
        let rows = self.source.load(subject, kind, base)?;
        if rows.is_empty() {
            return Err(LoadError::Empty { kind });
        }
        PoseSeq::from_rows(NUM_JOINTS, &rows).map_err(|source| LoadError::Shape { kind, source })
    }
}
