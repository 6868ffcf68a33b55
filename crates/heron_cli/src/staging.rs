//! Staging store selection shared by `serve` and `run-scoring`.

use bytes::Bytes;
use clap::Args;
use heron_core::prelude::*;
use heron_fs::FileSystemStorage;
use heron_opendal::OpendalStorage;
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct StagingArgs {
    /// Root directory of the staging store when staging on the file system
    #[arg(long, env = "HERON_STAGING_ROOT", default_value = "./heron_staging")]
    pub staging_root: PathBuf,

    /// OpenDAL scheme to stage with instead, e.g. `s3` or `azblob`
    #[arg(long, env = "HERON_STAGING_SCHEME")]
    pub staging_scheme: Option<String>,

    /// OpenDAL option as `key=value`, repeatable
    #[arg(
        long = "staging-option",
        env = "HERON_STAGING_OPTION",
        value_delimiter = ',',
        value_parser = parse_key_val
    )]
    pub staging_options: Vec<(String, String)>,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    Ok((key.trim().to_string(), value.trim().to_string()))
}

impl StagingArgs {
    pub fn open(&self) -> Result<Staging, StorageError> {
        match &self.staging_scheme {
            Some(scheme) => OpendalStorage::from_options(scheme, self.staging_options.clone())
                .map(Staging::Opendal),
            None => Ok(Staging::Fs(FileSystemStorage::new(&self.staging_root))),
        }
    }
}

/// One of the staging backends, picked at startup.
#[derive(Clone, Debug)]
pub enum Staging {
    Fs(FileSystemStorage),
    Opendal(OpendalStorage),
}

impl StorageBackend for Staging {
    async fn write_file(&self, path: &str, data: Bytes) -> Result<(), StorageError> {
        match self {
            Staging::Fs(s) => s.write_file(path, data).await,
            Staging::Opendal(s) => s.write_file(path, data).await,
        }
    }

    async fn read_file(&self, path: &str) -> Result<Bytes, StorageError> {
        match self {
            Staging::Fs(s) => s.read_file(path).await,
            Staging::Opendal(s) => s.read_file(path).await,
        }
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        match self {
            Staging::Fs(s) => s.exists(path).await,
            Staging::Opendal(s) => s.exists(path).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_values() {
        assert_eq!(
            parse_key_val("bucket = images").unwrap(),
            ("bucket".to_string(), "images".to_string())
        );
        assert!(parse_key_val("bucket").is_err());
    }

    #[test]
    fn scheme_selects_opendal() {
        let args = StagingArgs {
            staging_root: "./unused".into(),
            staging_scheme: Some("memory".into()),
            staging_options: Vec::new(),
        };
        assert!(matches!(args.open().unwrap(), Staging::Opendal(_)));

        let args = StagingArgs {
            staging_scheme: None,
            ..args
        };
        assert!(matches!(args.open().unwrap(), Staging::Fs(_)));
    }
}
