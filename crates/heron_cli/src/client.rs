//! `ping`, `submit` and `wait`.

use anyhow::Context;
use clap::Args;
use heron_client::HeronClient;
use heron_core::prelude::{names::*, *};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Args, Debug, Clone)]
pub struct ClientArgs {
    /// Gateway base URL
    #[arg(long, env = "HERON_URL", default_value = "http://localhost:5000")]
    pub url: String,

    /// Shared secret sent with every request
    #[arg(long, env = "HERON_API_AUTH_SECRET", hide_env_values = true)]
    pub secret: Option<String>,

    /// Header the secret is sent in
    #[arg(long, env = "HERON_AUTH_HEADER", default_value = DEFAULT_AUTH_HEADER)]
    pub auth_header: String,
}

impl ClientArgs {
    pub fn client(&self) -> HeronClient {
        HeronClient::new(&self.url, self.secret.clone()).with_auth_header(&self.auth_header)
    }
}

#[derive(Args, Debug, Clone)]
pub struct PollArgs {
    /// Where to write the result archive
    #[arg(long, short, default_value = RESULT_ARCHIVE)]
    pub output: PathBuf,

    /// Milliseconds between polls
    #[arg(long, default_value_t = 1000)]
    pub interval_ms: u64,

    /// Give up after this many seconds
    #[arg(long, default_value_t = 3600)]
    pub timeout_secs: u64,
}

#[derive(Args, Debug)]
pub struct SubmitArgs {
    #[command(flatten)]
    pub client: ClientArgs,

    /// Model to run, e.g. `PassThroughModel:1729`
    #[arg(long)]
    pub model_id: String,

    /// Zipped image series to upload
    pub file: PathBuf,

    /// Wait for the result instead of printing the job id only
    #[arg(long)]
    pub wait: bool,

    #[command(flatten)]
    pub poll: PollArgs,
}

#[derive(Args, Debug)]
pub struct WaitArgs {
    #[command(flatten)]
    pub client: ClientArgs,

    pub job_id: String,

    #[command(flatten)]
    pub poll: PollArgs,
}

pub async fn ping(args: ClientArgs) -> anyhow::Result<()> {
    args.client().ping().await?;
    println!("OK");
    Ok(())
}

pub async fn submit(args: SubmitArgs) -> anyhow::Result<()> {
    let client = args.client.client();
    let job_id = client
        .start_file(&args.model_id, &args.file)
        .await
        .with_context(|| format!("Failed to submit {}", args.file.display()))?;
    println!("{job_id}");

    if args.wait {
        wait_and_save(&client, &job_id, &args.poll).await?;
    }
    Ok(())
}

pub async fn wait(args: WaitArgs) -> anyhow::Result<()> {
    wait_and_save(&args.client.client(), &args.job_id, &args.poll).await
}

async fn wait_and_save(client: &HeronClient, job_id: &str, poll: &PollArgs) -> anyhow::Result<()> {
    let data = client
        .wait_for_result(
            job_id,
            Duration::from_millis(poll.interval_ms),
            Duration::from_secs(poll.timeout_secs),
        )
        .await
        .with_context(|| format!("Job {job_id} did not produce a result"))?;

    write_result(&poll.output, &data).await?;
    eprintln!("Wrote {} bytes to {}", data.len(), poll.output.display());
    Ok(())
}

async fn write_result(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, data)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}
