//! # Simple Client Example
//!
//! Submits a zipped image series and waits for the segmentation archive.
//!
//! ## Usage
//!
//! ```sh
//! cargo run --example simple_client --features "client" -- series.zip
//! ```

use heron::prelude::*;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let url = env::var("HERON_URL").unwrap_or_else(|_| "http://localhost:5000".to_string());
    let secret = env::var("HERON_API_AUTH_SECRET").ok();
    let input = PathBuf::from(env::args().nth(1).unwrap_or_else(|| "series.zip".to_string()));

    let client = HeronClient::new(url, secret);
    client.ping().await?;

    let job_id = client.start_file("PassThroughModel:1729", &input).await?;
    println!("Started job {job_id}");

    let result = client
        .wait_for_result(&job_id, Duration::from_secs(1), Duration::from_secs(600))
        .await?;
    tokio::fs::write(names::RESULT_ARCHIVE, &result).await?;
    println!("Wrote {} bytes to {}", result.len(), names::RESULT_ARCHIVE);

    Ok(())
}
