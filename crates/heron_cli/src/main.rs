use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod client;
mod scoring;
mod serve;
mod staging;

#[derive(Debug, Parser)]
#[command(name = "heron", version, about = "Asynchronous inference job gateway")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the gateway
    Serve(serve::ServeArgs),
    /// Check that a gateway is reachable and accepts the secret
    Ping(client::ClientArgs),
    /// Upload a zipped image series to a model
    Submit(client::SubmitArgs),
    /// Wait for a job and save its result archive
    Wait(client::WaitArgs),
    /// Score a staged payload (the entry operation of a remote run)
    RunScoring(scoring::RunScoringArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => serve::run(args).await?,
        Commands::Ping(args) => client::ping(args).await?,
        Commands::Submit(args) => client::submit(args).await?,
        Commands::Wait(args) => client::wait(args).await?,
        Commands::RunScoring(args) => {
            let code = scoring::run(args).await?;
            return Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)));
        }
    }

    Ok(ExitCode::SUCCESS)
}
