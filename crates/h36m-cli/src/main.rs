use std::{
    collections::BTreeMap,
    error::Error,
    fs,
    path::{Path, PathBuf},
};

use clap::{Args, Parser, Subcommand};
use h36m_core::{Metadata, SequenceKey};
use h36m_pipeline::{
    BatchReport, FfmpegExtractor, JsonAnnotationSource, JsonArraySink, Pipeline, PipelineConfig,
};
use log::info;
use serde::Serialize;

/// Human3.6M preprocessing: keyframes, intrinsics and merged annotations.
#[derive(Debug, Parser)]
#[command(author, version, about = "Human3.6M preprocessing pipeline")]
struct Cli {
    /// Enable debug logging (RUST_LOG is honoured otherwise).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Process sequences and print the batch report as JSON.
    Process(ProcessArgs),
    /// Print a summary of metadata.xml as JSON.
    Metadata(MetadataArgs),
}

#[derive(Debug, Default, Args)]
struct ProcessArgs {
    /// Optional path to a JSON PipelineConfig. Defaults are used if omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override `metadata_file`.
    #[arg(long)]
    metadata: Option<PathBuf>,

    /// Override `extracted_dir`.
    #[arg(long)]
    extracted: Option<PathBuf>,

    /// Override `processed_dir`.
    #[arg(long)]
    processed: Option<PathBuf>,

    /// Subject to process; repeat for several. Replaces the configured list.
    #[arg(long = "subject")]
    subjects: Vec<String>,

    /// Process only SUBJECT:ACTION:SUBACTION; repeat for several.
    #[arg(long = "sequence")]
    sequences: Vec<SequenceKey>,

    /// Write the report here instead of stdout.
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct MetadataArgs {
    #[arg(long, default_value = "metadata.xml")]
    metadata: PathBuf,
}

#[derive(Debug, Serialize)]
struct MetadataSummary<'a> {
    subjects: &'a [String],
    cameras: &'a [String],
    actions: &'a BTreeMap<String, String>,
    /// Processable sequences per subject.
    sequences: BTreeMap<&'a str, usize>,
}

fn load_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, Box<dyn Error>> {
    let data = fs::read_to_string(path)?;
    let value = serde_json::from_str(&data)?;
    Ok(value)
}

fn resolve_config(args: &ProcessArgs) -> Result<PipelineConfig, Box<dyn Error>> {
    let mut config = if let Some(path) = &args.config {
        load_json_file::<PipelineConfig>(path)?
    } else {
        PipelineConfig::default()
    };
    if let Some(path) = &args.metadata {
        config.metadata_file = path.clone();
    }
    if let Some(dir) = &args.extracted {
        config.extracted_dir = dir.clone();
    }
    if let Some(dir) = &args.processed {
        config.processed_dir = dir.clone();
    }
    if !args.subjects.is_empty() {
        config.subjects = args.subjects.clone();
    }
    Ok(config)
}

fn run_process(args: &ProcessArgs) -> Result<BatchReport, Box<dyn Error>> {
    let config = resolve_config(args)?;
    let metadata = Metadata::load(&config.metadata_file)?;
    info!(
        "{} subjects, {} cameras in {}",
        metadata.subjects().len(),
        metadata.camera_ids().len(),
        config.metadata_file.display()
    );

    let source = JsonAnnotationSource::new(config.layout());
    let extractor = FfmpegExtractor::from_config(&config.ffmpeg)?;
    let sink = JsonArraySink;
    let pipeline = Pipeline::new(&metadata, &config, &source, &extractor, &sink);

    let report = if args.sequences.is_empty() {
        pipeline.run_batch()
    } else {
        pipeline.run_sequences(args.sequences.iter().cloned())
    };
    Ok(report)
}

fn metadata_summary_json(path: &Path) -> Result<String, Box<dyn Error>> {
    let metadata = Metadata::load(path)?;
    let mut sequences = BTreeMap::new();
    for subject in metadata.subjects() {
        sequences.insert(subject.as_str(), metadata.sequences(subject)?.len());
    }
    let summary = MetadataSummary {
        subjects: metadata.subjects(),
        cameras: metadata.camera_ids(),
        actions: metadata.action_names(),
        sequences,
    };
    Ok(serde_json::to_string_pretty(&summary)?)
}

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Process(args) => {
            let report = run_process(&args)?;
            let json = serde_json::to_string_pretty(&report)?;
            match &args.report {
                Some(path) => fs::write(path, json)?,
                None => println!("{json}"),
            }
        }
        Command::Metadata(args) => println!("{}", metadata_summary_json(&args.metadata)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use h36m_core::{synthetic, Intrinsics, JointPoint, PoseSeq, Real, Vec3};
    use h36m_pipeline::{frame_filename, SequenceStatus};
    use tempfile::TempDir;

    const CAMERA: &str = "54138969";

    const METADATA_XML: &str = r#"<?xml version="1.0"?>
<metadata>
  <mapping>
    <tr><td>Action</td><td>Subaction</td><td>S9</td></tr>
    <tr><td>1</td><td>1</td><td>_ALL</td></tr>
    <tr><td>2</td><td>1</td><td>Directions 1</td></tr>
  </mapping>
  <actionnames>
    <item>_ALL</item>
    <item>Directions</item>
  </actionnames>
  <dbcameras>
    <index2id>
      <item>54138969</item>
    </index2id>
  </dbcameras>
</metadata>
"#;

    fn write_rows<P: JointPoint>(path: &Path, seq: &PoseSeq<P>) {
        let rows: Vec<Vec<Real>> = seq
            .to_flat()
            .chunks(seq.num_joints() * P::DIM)
            .map(<[Real]>::to_vec)
            .collect();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, serde_json::to_string(&rows).unwrap()).unwrap();
    }

    /// A one-view corpus whose only selected frame is already extracted,
    /// so no decoder is needed.
    fn corpus(dir: &Path) -> PipelineConfig {
        fs::write(dir.join("metadata.xml"), METADATA_XML).unwrap();

        let config = PipelineConfig {
            metadata_file: dir.join("metadata.xml"),
            extracted_dir: dir.join("extracted"),
            processed_dir: dir.join("processed"),
            subjects: vec!["S9".to_string()],
            ffmpeg: h36m_pipeline::FfmpegConfig {
                binary: Some(dir.join("no-ffmpeg")),
                qscale: 3,
            },
            ..PipelineConfig::default()
        };

        let layout = config.layout();
        let base = format!("Directions 1.{CAMERA}");
        let pose_3d = synthetic::trajectory(3, |f| Vec3::new(10.0 * f as Real, 0.0, 4200.0));
        let k = Intrinsics::new(1145.0, 512.0, 1144.0, 515.0);
        let pose_2d = synthetic::project_sequence(&pose_3d, &k).unwrap();
        write_rows(
            &layout.annotation_file("S9", h36m_pipeline::AnnotationKind::Positions2d, &base),
            &pose_2d,
        );
        for kind in [
            h36m_pipeline::AnnotationKind::Positions3dMono,
            h36m_pipeline::AnnotationKind::Positions3dUniversal,
        ] {
            write_rows(&layout.annotation_file("S9", kind, &base), &pose_3d);
        }

        let seq_dir = layout.sequence_dir("S9", "Directions", "1");
        let frames_dir = layout.frames_dir(&seq_dir, CAMERA);
        fs::create_dir_all(&frames_dir).unwrap();
        fs::write(frames_dir.join(frame_filename(1)), b"jpeg").unwrap();
        config
    }

    #[test]
    fn parses_process_flags() {
        let cli = Cli::try_parse_from([
            "h36m",
            "-v",
            "process",
            "--subject",
            "S1",
            "--subject",
            "S5",
            "--sequence",
            "S1:2:1",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Process(args) => {
                assert_eq!(args.subjects, ["S1", "S5"]);
                assert_eq!(args.sequences, vec![SequenceKey::new("S1", "2", "1")]);
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(Cli::try_parse_from(["h36m", "process", "--sequence", "S1-2-1"]).is_err());
    }

    #[test]
    fn flags_override_config_file() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.json");
        fs::write(&config_path, r#"{"processed_dir": "/from/file", "subjects": ["S1"]}"#)
            .unwrap();

        let args = ProcessArgs {
            config: Some(config_path),
            extracted: Some(PathBuf::from("/from/flag")),
            subjects: vec!["S11".to_string()],
            ..ProcessArgs::default()
        };
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.processed_dir, PathBuf::from("/from/file"));
        assert_eq!(config.extracted_dir, PathBuf::from("/from/flag"));
        assert_eq!(config.subjects, ["S11"]);
        assert_eq!(config.metadata_file, PathBuf::from("metadata.xml"));
    }

    #[test]
    fn process_writes_annotations() {
        let dir = TempDir::new().unwrap();
        let config = corpus(dir.path());
        let config_path = dir.path().join("config.json");
        fs::write(&config_path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

        let args = ProcessArgs {
            config: Some(config_path),
            ..ProcessArgs::default()
        };
        let report = run_process(&args).expect("process should succeed");
        assert_eq!(report.written, 1, "{report:?}");
        assert_eq!(report.view_failures().count(), 0);

        let expected = dir.path().join("processed/S9/Directions-1/annot.json");
        assert_eq!(
            report.sequences[0].status,
            SequenceStatus::Written {
                path: expected.clone(),
                frames: 1
            }
        );
        let datasets = h36m_pipeline::JsonArraySink::read(&expected).unwrap();
        assert!(datasets.iter().any(|d| d.name == "intrinsics/54138969"));
    }

    #[test]
    fn metadata_summary_counts_sequences() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metadata.xml");
        fs::write(&path, METADATA_XML).unwrap();

        let json = metadata_summary_json(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["subjects"][0], "S9");
        assert_eq!(value["cameras"][0], CAMERA);
        assert_eq!(value["actions"]["2"], "Directions");
        assert_eq!(value["sequences"]["S9"], 1);
    }
}
