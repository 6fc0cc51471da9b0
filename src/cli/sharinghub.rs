//! `sharinghub` subcommands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use crate::config;
use crate::sharinghub::{
    checkout_revision, configure_dvc, display_url, download_repository, DataVersioning,
    DatasetCredentials, DvcCli,
};

#[derive(Subcommand, Debug)]
pub enum SharinghubCommands {
    /// Clone a dataset repository and pull its DVC-tracked data
    DownloadDataset {
        /// Repository URL
        url: String,

        /// Local directory [default: repository name from the URL]
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Branch, tag or commit to check out
        #[arg(short, long)]
        revision: Option<String>,

        #[command(flatten)]
        credentials: CredentialArgs,
    },
}

/// Credential flags; each falls back to its environment variable
#[derive(Args, Debug, Clone, Default)]
pub struct CredentialArgs {
    /// Git user name
    #[arg(long, env = "SHARINGHUB_USER")]
    pub user: Option<String>,

    /// Access token (git password and DVC remote password)
    #[arg(long, env = "SHARINGHUB_ACCESS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// S3 access key id for the DVC remote
    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    pub s3_access_key_id: Option<String>,

    /// S3 secret access key for the DVC remote
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub s3_secret_access_key: Option<String>,
}

impl From<CredentialArgs> for DatasetCredentials {
    fn from(args: CredentialArgs) -> Self {
        Self {
            user: args.user,
            token: args.token,
            s3_access_key_id: args.s3_access_key_id,
            s3_secret_access_key: args.s3_secret_access_key,
        }
    }
}

pub async fn execute(command: SharinghubCommands) -> Result<()> {
    match command {
        SharinghubCommands::DownloadDataset {
            url,
            path,
            revision,
            credentials,
        } => {
            let credentials = DatasetCredentials::from(credentials);
            let dvc = DvcCli::with_binary_path(config::config()?.dvc_binary.clone());
            download_dataset(&url, path, revision, &credentials, &dvc).await
        }
    }
}

/// Clone (or reuse) the repository, check out `revision`, then pull DVC data
pub async fn download_dataset(
    url: &str,
    path: Option<PathBuf>,
    revision: Option<String>,
    credentials: &DatasetCredentials,
    dvc: &dyn DataVersioning,
) -> Result<()> {
    let repo_path = {
        let clone_url = url.to_string();
        let credentials = credentials.clone();
        tokio::task::spawn_blocking(move || {
            let repo_path = download_repository(&clone_url, path.as_deref(), &credentials)?;
            if let Some(revision) = revision {
                checkout_revision(&repo_path, &revision)?;
            }
            Ok::<_, crate::sharinghub::DatasetError>(repo_path)
        })
        .await
        .context("Repository task panicked")?
        .with_context(|| format!("Failed to download repository {}", display_url(url)))?
    };

    match configure_dvc(&repo_path, credentials, dvc)
        .await
        .context("Failed to configure DVC")?
    {
        Some(remote) => {
            dvc.pull(&repo_path)
                .await
                .with_context(|| format!("Failed to pull DVC data from remote '{}'", remote))?;
            tracing::info!("dataset ready in {}", repo_path.display());
        }
        None => {
            tracing::info!("no dvc, repository ready in {}", repo_path.display());
        }
    }

    Ok(())
}
