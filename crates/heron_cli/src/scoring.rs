//! `heron run-scoring`: the entry operation of a remote run.
//!
//! Copies the staged payload into a scratch directory, hands it to the model's
//! scoring script and destroys the staged payload afterwards, whatever the script did.

use crate::staging::StagingArgs;

use anyhow::Context;
use clap::Args;
use heron_core::prelude::{names::*, *};
use heron_jobs::scrub::run_then_scrub;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{info, warn};

#[derive(Args, Debug, Clone)]
pub struct RunScoringArgs {
    #[arg(long)]
    pub model_id: String,

    /// Directory the model's files were deployed to
    #[arg(long, env = "HERON_MODEL_FOLDER", default_value = ".")]
    pub model_folder: PathBuf,

    /// Scoring script inside the model folder
    #[arg(long, default_value = SCORE_SCRIPT)]
    pub script_name: String,

    /// Path of the payload in the staging store
    #[arg(long)]
    pub staged_path: String,

    /// Program the scoring script is run with
    #[arg(long, env = "HERON_SCORING_INTERPRETER", default_value = "python")]
    pub interpreter: String,

    /// Where the script is asked to put the result archive
    #[arg(long, env = "HERON_OUTPUT_DIR", default_value = "outputs")]
    pub output_dir: PathBuf,

    #[command(flatten)]
    pub staging: StagingArgs,
}

/// Returns the scoring script's exit code.
pub async fn run(args: RunScoringArgs) -> anyhow::Result<i32> {
    let storage = args.staging.open()?;

    let code = run_then_scrub(&storage, &args.staged_path, score(&storage, &args))
        .await
        .context("Failed to scrub the staged payload")??;

    info!("Scoring for {} finished with exit code {code}", args.model_id);
    Ok(code)
}

async fn score<S: StorageBackend>(storage: &S, args: &RunScoringArgs) -> anyhow::Result<i32> {
    let payload = storage
        .read_file(&args.staged_path)
        .await
        .with_context(|| format!("Failed to read staged payload {}", args.staged_path))?;

    // Removed on drop, together with the local copy of the payload.
    let data_folder = tempfile::tempdir()?;
    tokio::fs::write(data_folder.path().join(IMAGE_DATA_FILE), &payload).await?;

    tokio::fs::create_dir_all(&args.output_dir).await?;
    let output_dir = std::path::absolute(&args.output_dir)?;
    let script = args.model_folder.join(&args.script_name);

    info!(
        "Scoring {} bytes with {} for model {}",
        payload.len(),
        script.display(),
        args.model_id
    );

    let status = Command::new(&args.interpreter)
        .arg(&script)
        .arg("--data_folder")
        .arg(data_folder.path())
        .arg("--image_files")
        .arg(IMAGE_DATA_FILE)
        .arg("--model_id")
        .arg(&args.model_id)
        .arg("--use_dicom")
        .arg("True")
        .env("HERON_OUTPUT_DIR", &output_dir)
        .status()
        .await
        .with_context(|| format!("Failed to start {}", args.interpreter))?;

    let code = status.code().unwrap_or_else(|| {
        warn!("Scoring script was terminated by a signal");
        1
    });

    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use heron_fs::FileSystemStorage;
    use heron_jobs::scrub::is_scrubbed;
    use std::path::Path;

    const STAGED: &str = "temp-image-store/abc/imagedata.zip";

    // Copies its input to the outputs dir and exits with the code in `$EXIT_WITH`.
    const SCRIPT: &str = r#"
cp "$2/$4" "$HERON_OUTPUT_DIR/seen.zip"
echo "$6" > "$HERON_OUTPUT_DIR/model"
exit $EXIT_WITH
"#;

    async fn setup(root: &Path, exit_with: i32) -> RunScoringArgs {
        let storage = FileSystemStorage::new(root.join("staging"));
        storage
            .write_file(STAGED, Bytes::from_static(b"PK\x03\x04series"))
            .await
            .unwrap();

        let model_folder = root.join("model");
        tokio::fs::create_dir_all(&model_folder).await.unwrap();
        let script = SCRIPT.replace("$EXIT_WITH", &exit_with.to_string());
        tokio::fs::write(model_folder.join("score.sh"), script).await.unwrap();

        RunScoringArgs {
            model_id: "PassThroughModel:1729".into(),
            model_folder,
            script_name: "score.sh".into(),
            staged_path: STAGED.into(),
            interpreter: "sh".into(),
            output_dir: root.join("outputs"),
            staging: StagingArgs {
                staging_root: root.join("staging"),
                staging_scheme: None,
                staging_options: Vec::new(),
            },
        }
    }

    #[tokio::test]
    async fn scorer_sees_payload_and_staging_is_scrubbed() {
        let dir = tempfile::tempdir().unwrap();
        let args = setup(dir.path(), 0).await;

        assert_eq!(run(args.clone()).await.unwrap(), 0);

        let seen = tokio::fs::read(dir.path().join("outputs/seen.zip")).await.unwrap();
        assert_eq!(seen, b"PK\x03\x04series");
        let model = tokio::fs::read_to_string(dir.path().join("outputs/model")).await.unwrap();
        assert_eq!(model.trim(), "PassThroughModel:1729");

        let storage = FileSystemStorage::new(dir.path().join("staging"));
        assert!(is_scrubbed(&storage, STAGED).await.unwrap());
    }

    #[tokio::test]
    async fn failing_scorer_still_scrubs() {
        let dir = tempfile::tempdir().unwrap();
        let args = setup(dir.path(), 3).await;

        assert_eq!(run(args).await.unwrap(), 3);

        let storage = FileSystemStorage::new(dir.path().join("staging"));
        assert!(is_scrubbed(&storage, STAGED).await.unwrap());
    }

    #[tokio::test]
    async fn missing_interpreter_still_scrubs() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = setup(dir.path(), 0).await;
        args.interpreter = "heron-no-such-interpreter".into();

        assert!(run(args).await.is_err());

        let storage = FileSystemStorage::new(dir.path().join("staging"));
        assert!(is_scrubbed(&storage, STAGED).await.unwrap());
    }
}
