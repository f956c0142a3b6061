//! Idempotent extraction of selected video frames.

use crate::{frame_filename, ExtractionError, FfmpegConfig, FRAME_PATTERN};
use log::{debug, warn};
use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

const SCRATCH_PREFIX: &str = "h36m-frames-";

/// Decodes a whole video into numbered still images.
pub trait FrameExtractor {
    /// Write every frame of `video` into `out_dir` as [`FRAME_PATTERN`],
    /// numbered from 1.
    fn extract_all(&self, video: &Path, out_dir: &Path) -> Result<(), ExtractionError>;
}

/// Runs an external `ffmpeg` binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegExtractor {
    binary: PathBuf,
    qscale: u32,
}

impl FfmpegExtractor {
    pub fn new(binary: impl Into<PathBuf>, qscale: u32) -> Self {
        Self {
            binary: binary.into(),
            qscale,
        }
    }

    /// Use the configured binary, or find `ffmpeg` on `PATH`.
    pub fn from_config(config: &FfmpegConfig) -> Result<Self, ExtractionError> {
        let binary = match &config.binary {
            Some(binary) => binary.clone(),
            None => which::which("ffmpeg").map_err(|_| ExtractionError::NotFound)?,
        };
        Ok(Self::new(binary, config.qscale))
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Decoder arguments for one video.
    pub fn args(&self, video: &Path, out_dir: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-nostats", "-loglevel", "error", "-i"]
            .iter()
            .map(OsString::from)
            .collect();
        args.push(video.as_os_str().to_owned());
        args.push(OsString::from("-qscale:v"));
        args.push(OsString::from(self.qscale.to_string()));
        args.push(out_dir.join(FRAME_PATTERN).into_os_string());
        args
    }
}

impl FrameExtractor for FfmpegExtractor {
    fn extract_all(&self, video: &Path, out_dir: &Path) -> Result<(), ExtractionError> {
        debug!("decoding {} into {}", video.display(), out_dir.display());
        let output = Command::new(&self.binary)
            .args(self.args(video, out_dir))
            .output()
            .map_err(|source| ExtractionError::Spawn {
                program: self.binary.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(ExtractionError::Failed {
                program: self.binary.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

/// Result of [`ensure_frames`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// Every requested frame was already on disk; the decoder was not run.
    AlreadyPresent,
    /// The decoder ran and this many frames were moved into place.
    Extracted(usize),
}

/// `true` if `frames_dir` holds every frame in `frame_numbers`.
pub fn frames_present(frames_dir: &Path, frame_numbers: &[usize]) -> Result<bool, ExtractionError> {
    let entries = match fs::read_dir(frames_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(source) => return Err(ExtractionError::io(frames_dir, source)),
    };
    let mut existing = HashSet::new();
    for entry in entries {
        let entry = entry.map_err(|source| ExtractionError::io(frames_dir, source))?;
        existing.insert(entry.file_name());
    }
    Ok(frame_numbers
        .iter()
        .all(|&n| existing.contains(OsStr::new(&frame_filename(n)))))
}

/// Make sure the 1-based `frame_numbers` of `video` exist in `frames_dir`.
///
/// When any frame is missing, the whole video is decoded into a fresh
/// scratch directory (below `scratch_root`, or the system temp dir) and the
/// selected frames are moved out of it. The scratch directory is removed on
/// every path. If only that removal fails, the frames are in place and the
/// problem is logged; if it fails after an earlier error, both are reported.
pub fn ensure_frames(
    extractor: &dyn FrameExtractor,
    video: &Path,
    frames_dir: &Path,
    frame_numbers: &[usize],
    scratch_root: Option<&Path>,
) -> Result<FrameStatus, ExtractionError> {
    fs::create_dir_all(frames_dir).map_err(|source| ExtractionError::io(frames_dir, source))?;
    if frames_present(frames_dir, frame_numbers)? {
        debug!(
            "{} frames already in {}, skipping decode",
            frame_numbers.len(),
            frames_dir.display()
        );
        return Ok(FrameStatus::AlreadyPresent);
    }

    let mut builder = tempfile::Builder::new();
    builder.prefix(SCRATCH_PREFIX);
    let scratch = match scratch_root {
        Some(root) => {
            fs::create_dir_all(root).map_err(|source| ExtractionError::io(root, source))?;
            builder.tempdir_in(root)
        }
        None => builder.tempdir(),
    }
    .map_err(|source| {
        let root = scratch_root.map_or_else(std::env::temp_dir, Path::to_path_buf);
        ExtractionError::io(root, source)
    })?;
    let scratch_path = scratch.path().to_path_buf();

    let result = extractor
        .extract_all(video, &scratch_path)
        .and_then(|()| move_frames(&scratch_path, frames_dir, frame_numbers))
        .map(|()| FrameStatus::Extracted(frame_numbers.len()));
    settle_scratch(result, scratch.close(), scratch_path)
}

/// Combine the extraction result with the outcome of removing its scratch
/// directory.
fn settle_scratch(
    result: Result<FrameStatus, ExtractionError>,
    cleanup: std::io::Result<()>,
    scratch: PathBuf,
) -> Result<FrameStatus, ExtractionError> {
    match (result, cleanup) {
        (result, Ok(())) => result,
        (Ok(status), Err(source)) => {
            warn!(
                "frames extracted but scratch directory {} was not removed: {source}",
                scratch.display()
            );
            Ok(status)
        }
        (Err(primary), Err(source)) => Err(ExtractionError::WithCleanup {
            primary: Box::new(primary),
            cleanup: Box::new(ExtractionError::ScratchCleanup {
                path: scratch,
                source,
            }),
        }),
    }
}

fn move_frames(
    scratch: &Path,
    frames_dir: &Path,
    frame_numbers: &[usize],
) -> Result<(), ExtractionError> {
    for &n in frame_numbers {
        let name = frame_filename(n);
        let from = scratch.join(&name);
        if !from.is_file() {
            return Err(ExtractionError::MissingFrame(from));
        }
        move_file(&from, &frames_dir.join(&name))?;
    }
    Ok(())
}

/// Rename, falling back to copy and remove when the rename is refused
/// (e.g. scratch and output on different file systems).
fn move_file(from: &Path, to: &Path) -> Result<(), ExtractionError> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to).map_err(|source| ExtractionError::io(to, source))?;
    fs::remove_file(from).map_err(|source| ExtractionError::io(from, source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use tempfile::TempDir;

    /// Writes `frames` tiny files, counting invocations.
    struct FakeDecoder {
        frames: usize,
        calls: Cell<usize>,
        last_dir: RefCell<Option<PathBuf>>,
    }

    impl FakeDecoder {
        fn new(frames: usize) -> Self {
            Self {
                frames,
                calls: Cell::new(0),
                last_dir: RefCell::new(None),
            }
        }
    }

    impl FrameExtractor for FakeDecoder {
        fn extract_all(&self, _video: &Path, out_dir: &Path) -> Result<(), ExtractionError> {
            self.calls.set(self.calls.get() + 1);
            *self.last_dir.borrow_mut() = Some(out_dir.to_path_buf());
            for n in 1..=self.frames {
                fs::write(out_dir.join(frame_filename(n)), format!("frame {n}"))
                    .map_err(|source| ExtractionError::io(out_dir, source))?;
            }
            Ok(())
        }
    }

    struct BrokenDecoder {
        last_dir: RefCell<Option<PathBuf>>,
    }

    impl FrameExtractor for BrokenDecoder {
        fn extract_all(&self, _video: &Path, out_dir: &Path) -> Result<(), ExtractionError> {
            *self.last_dir.borrow_mut() = Some(out_dir.to_path_buf());
            fs::write(out_dir.join(frame_filename(1)), "partial").unwrap();
            Err(ExtractionError::Failed {
                program: PathBuf::from("ffmpeg"),
                status: "exit status: 1".to_string(),
                stderr: "moov atom not found".to_string(),
            })
        }
    }

    #[test]
    fn second_call_does_not_decode() {
        let dir = TempDir::new().unwrap();
        let frames_dir = dir.path().join("imageSequence").join("54138969");
        let decoder = FakeDecoder::new(10);
        let video = dir.path().join("video.mp4");

        let status =
            ensure_frames(&decoder, &video, &frames_dir, &[1, 4, 9], Some(dir.path())).unwrap();
        assert_eq!(status, FrameStatus::Extracted(3));
        assert_eq!(decoder.calls.get(), 1);

        let mut names: Vec<_> = fs::read_dir(&frames_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, ["img_000001.jpg", "img_000004.jpg", "img_000009.jpg"]);
        assert_eq!(
            fs::read_to_string(frames_dir.join("img_000004.jpg")).unwrap(),
            "frame 4"
        );

        let status =
            ensure_frames(&decoder, &video, &frames_dir, &[1, 4, 9], Some(dir.path())).unwrap();
        assert_eq!(status, FrameStatus::AlreadyPresent);
        assert_eq!(decoder.calls.get(), 1);
    }

    #[test]
    fn one_missing_frame_triggers_decode() {
        let dir = TempDir::new().unwrap();
        let frames_dir = dir.path().join("frames");
        fs::create_dir_all(&frames_dir).unwrap();
        fs::write(frames_dir.join(frame_filename(1)), "old").unwrap();

        assert!(!frames_present(&frames_dir, &[1, 2]).unwrap());
        let decoder = FakeDecoder::new(2);
        ensure_frames(&decoder, Path::new("v.mp4"), &frames_dir, &[1, 2], Some(dir.path()))
            .unwrap();
        assert_eq!(decoder.calls.get(), 1);
        assert!(frames_present(&frames_dir, &[1, 2]).unwrap());
    }

    #[test]
    fn scratch_is_removed_on_success_and_failure() {
        let dir = TempDir::new().unwrap();
        let scratch_root = dir.path().join("scratch");

        let decoder = FakeDecoder::new(3);
        let video = Path::new("v.mp4");
        ensure_frames(&decoder, video, &dir.path().join("a"), &[2], Some(&scratch_root)).unwrap();
        let used = decoder.last_dir.borrow().clone().unwrap();
        assert!(used.starts_with(&scratch_root));
        assert!(!used.exists());

        let broken = BrokenDecoder {
            last_dir: RefCell::new(None),
        };
        let err = ensure_frames(&broken, video, &dir.path().join("b"), &[1], Some(&scratch_root))
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Failed { .. }), "{err}");
        assert!(!broken.last_dir.borrow().clone().unwrap().exists());
        assert!(!frames_present(&dir.path().join("b"), &[1]).unwrap());
    }

    /// Removes its own output directory, so nothing can be moved or cleaned.
    struct VanishingDecoder;

    impl FrameExtractor for VanishingDecoder {
        fn extract_all(&self, _video: &Path, out_dir: &Path) -> Result<(), ExtractionError> {
            fs::remove_dir_all(out_dir).map_err(|source| ExtractionError::io(out_dir, source))
        }
    }

    #[test]
    fn cleanup_failure_keeps_the_original_error() {
        let dir = TempDir::new().unwrap();
        let frames_dir = dir.path().join("frames");
        let err = ensure_frames(
            &VanishingDecoder,
            Path::new("v.mp4"),
            &frames_dir,
            &[1],
            Some(dir.path()),
        )
        .unwrap_err();

        match &err {
            ExtractionError::WithCleanup { primary, cleanup } => {
                assert!(
                    matches!(**primary, ExtractionError::MissingFrame(_)),
                    "{primary}"
                );
                assert!(
                    matches!(**cleanup, ExtractionError::ScratchCleanup { .. }),
                    "{cleanup}"
                );
            }
            other => panic!("unexpected error: {other}"),
        }
        let message = err.to_string();
        assert!(message.contains("did not produce frame"), "{message}");
        assert!(message.contains("scratch cleanup also failed"), "{message}");
    }

    #[test]
    fn cleanup_failure_after_success_keeps_the_frames() {
        let scratch = PathBuf::from("/tmp/h36m-frames-x");
        let busy = || std::io::Error::new(std::io::ErrorKind::PermissionDenied, "busy");

        let status = settle_scratch(Ok(FrameStatus::Extracted(3)), Err(busy()), scratch.clone());
        assert_eq!(status.unwrap(), FrameStatus::Extracted(3));

        let err = settle_scratch(
            Err(ExtractionError::MissingFrame(scratch.join("img_000001.jpg"))),
            Ok(()),
            scratch.clone(),
        )
        .unwrap_err();
        assert!(matches!(err, ExtractionError::MissingFrame(_)), "{err}");

        let err = settle_scratch(
            Err(ExtractionError::MissingFrame(scratch.join("img_000001.jpg"))),
            Err(busy()),
            scratch,
        )
        .unwrap_err();
        assert!(matches!(err, ExtractionError::WithCleanup { .. }), "{err}");
    }

    #[test]
    fn frame_beyond_video_end_is_an_error() {
        let dir = TempDir::new().unwrap();
        let decoder = FakeDecoder::new(5);
        let frames_dir = dir.path().join("f");
        let err = ensure_frames(&decoder, Path::new("v.mp4"), &frames_dir, &[1, 6], Some(dir.path()))
            .unwrap_err();
        match err {
            ExtractionError::MissingFrame(path) => {
                assert!(path.ends_with("img_000006.jpg"), "{}", path.display())
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn ffmpeg_arguments() {
        let ffmpeg = FfmpegExtractor::new("/opt/ffmpeg/bin/ffmpeg", 3);
        let video = Path::new("/data/S1/Videos/Walking.55011271.mp4");
        let args: Vec<String> = ffmpeg
            .args(video, Path::new("/tmp/x"))
            .into_iter()
            .map(|a| a.into_string().unwrap())
            .collect();
        assert_eq!(
            args,
            [
                "-nostats",
                "-loglevel",
                "error",
                "-i",
                "/data/S1/Videos/Walking.55011271.mp4",
                "-qscale:v",
                "3",
                "/tmp/x/img_%06d.jpg",
            ]
        );
    }

    #[test]
    fn configured_binary_is_used_verbatim() {
        let config = FfmpegConfig {
            binary: Some(PathBuf::from("/nonexistent/ffmpeg")),
            qscale: 5,
        };
        let ffmpeg = FfmpegExtractor::from_config(&config).unwrap();
        assert_eq!(ffmpeg.binary(), Path::new("/nonexistent/ffmpeg"));

        let dir = TempDir::new().unwrap();
        let err = ffmpeg
            .extract_all(Path::new("v.mp4"), dir.path())
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Spawn { .. }), "{err}");
    }
}
