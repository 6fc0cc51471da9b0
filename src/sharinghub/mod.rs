//! Dataset repositories: git clone/checkout plus DVC-tracked data.
//!
//! A dataset is a git repository whose large files are tracked by DVC. The
//! download flow is:
//!
//! 1. clone the repository (or reuse an existing local clone)
//! 2. optionally check out a revision
//! 3. if the repository uses DVC, write remote credentials to
//!    `.dvc/config.local` and pull with `--force`

pub mod dvc;
pub mod repository;

use std::path::PathBuf;

use thiserror::Error;

pub use dvc::{
    configure_dvc, select_credentials, write_local_remote_option, DataVersioning, DvcCli,
};
pub use repository::{
    checkout_revision, display_url, download_repository, repository_dir_from_url,
};

/// Credentials for the git host and the DVC remote
#[derive(Clone, Default)]
pub struct DatasetCredentials {
    pub user: Option<String>,
    /// Access token, used as git password and as DVC remote password
    pub token: Option<String>,
    pub s3_access_key_id: Option<String>,
    pub s3_secret_access_key: Option<String>,
}

impl std::fmt::Debug for DatasetCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "***");
        f.debug_struct("DatasetCredentials")
            .field("user", &self.user)
            .field("token", &redact(&self.token))
            .field("s3_access_key_id", &redact(&self.s3_access_key_id))
            .field("s3_secret_access_key", &redact(&self.s3_secret_access_key))
            .finish()
    }
}

/// Errors from dataset download and DVC configuration
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Invalid repository: {}", .0.display())]
    InvalidRepository(PathBuf),

    #[error("Cannot derive a directory name from URL: {0}")]
    InvalidUrl(String),

    #[error("dvc: no remote configured")]
    NoRemote,

    #[error("dvc: no credentials given")]
    NoCredentials,

    #[error("dvc configuration error: {0}")]
    Config(String),

    #[error("`{command}` failed: {stderr}")]
    Command { command: String, stderr: String },

    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
