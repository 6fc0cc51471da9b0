//! DVC remote configuration and pull.
//!
//! DVC has no library interface outside Python, so [`DvcCli`] drives the `dvc`
//! executable for reads and pulls. Credentials never go through its command
//! line: they are written to `.dvc/config.local` directly. The credential
//! logic in [`configure_dvc`] only depends on the [`DataVersioning`] trait.

use std::path::Path;
use std::process::{Output, Stdio};

use async_trait::async_trait;
use ini::{EscapePolicy, Ini, ParseOption, WriteOption};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use url::Url;

use super::{DatasetCredentials, DatasetError};

/// Operations needed from the data-versioning tool
#[async_trait]
pub trait DataVersioning: Send + Sync {
    /// Whether `repo` is a DVC repository
    fn is_repository(&self, repo: &Path) -> bool {
        repo.join(".dvc").is_dir()
    }

    /// Name of the default remote, if any
    async fn default_remote(&self, repo: &Path) -> Result<Option<String>, DatasetError>;

    /// URL of `remote`
    async fn remote_url(&self, repo: &Path, remote: &str) -> Result<String, DatasetError>;

    /// Set `key = value` on `remote` in the repository-local config, which
    /// is not committed
    async fn set_local_remote_option(
        &self,
        repo: &Path,
        remote: &str,
        key: &str,
        value: &str,
    ) -> Result<(), DatasetError>;

    /// Pull tracked data, overwriting local changes
    async fn pull(&self, repo: &Path) -> Result<(), DatasetError>;
}

/// Printed by `dvc remote default` when no default remote is set
const NO_DEFAULT_REMOTE: &str = "No default remote set";

/// `dvc` executable driver
pub struct DvcCli {
    /// Path to the dvc binary (default: "dvc")
    binary_path: String,
}

impl Default for DvcCli {
    fn default() -> Self {
        Self::new()
    }
}

impl DvcCli {
    pub fn new() -> Self {
        Self::with_binary_path("dvc")
    }

    pub fn with_binary_path(binary_path: impl Into<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    async fn run(&self, repo: &Path, args: &[&str]) -> Result<Output, DatasetError> {
        let output = Command::new(&self.binary_path)
            .args(args)
            .current_dir(repo)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;
        Ok(output)
    }

    /// Run and require success; returns trimmed stdout
    async fn run_checked(
        &self,
        repo: &Path,
        args: &[&str],
        display: &str,
    ) -> Result<String, DatasetError> {
        let output = self.run(repo, args).await?;
        if !output.status.success() {
            return Err(DatasetError::Command {
                command: format!("{} {}", self.binary_path, display),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl DataVersioning for DvcCli {
    async fn default_remote(&self, repo: &Path) -> Result<Option<String>, DatasetError> {
        let output = self.run(repo, &["remote", "default"]).await?;
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();

        if output.status.success() {
            return Ok(Some(stdout).filter(|n| !n.is_empty()));
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if stdout.contains(NO_DEFAULT_REMOTE) || stderr.contains(NO_DEFAULT_REMOTE) {
            return Ok(None);
        }

        Err(DatasetError::Command {
            command: format!("{} remote default", self.binary_path),
            stderr,
        })
    }

    async fn remote_url(&self, repo: &Path, remote: &str) -> Result<String, DatasetError> {
        let key = format!("remote.{}.url", remote);
        self.run_checked(repo, &["config", &key], &format!("config {}", key))
            .await
    }

    async fn set_local_remote_option(
        &self,
        repo: &Path,
        remote: &str,
        key: &str,
        value: &str,
    ) -> Result<(), DatasetError> {
        write_local_remote_option(repo, remote, key, value).await
    }

    async fn pull(&self, repo: &Path) -> Result<(), DatasetError> {
        tracing::info!("dvc pull...");
        self.run_checked(repo, &["pull", "--force"], "pull --force")
            .await?;
        Ok(())
    }
}

/// Section of `remote` in a DVC config file: `['remote "<name>"']`
fn remote_section(remote: &str) -> String {
    format!("'remote \"{}\"'", remote)
}

/// Set `key = value` on `remote` in `<repo>/.dvc/config.local`, keeping the
/// other entries. The file is readable by its owner only.
pub async fn write_local_remote_option(
    repo: &Path,
    remote: &str,
    key: &str,
    value: &str,
) -> Result<(), DatasetError> {
    let path = repo.join(".dvc").join("config.local");

    // Section names and values are kept verbatim, quotes included
    let parse = ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..ParseOption::default()
    };
    let mut config = match fs::read_to_string(&path).await {
        Ok(content) => Ini::load_from_str_opt(&content, parse)
            .map_err(|e| DatasetError::Config(format!("{}: {}", path.display(), e)))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ini::new(),
        Err(e) => return Err(e.into()),
    };
    config
        .with_section(Some(remote_section(remote)))
        .set(key, value);

    let mut content = Vec::new();
    config.write_to_opt(
        &mut content,
        WriteOption {
            escape_policy: EscapePolicy::Nothing,
            ..WriteOption::default()
        },
    )?;

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(&path).await?;
    file.write_all(&content).await?;
    file.flush().await?;

    // An existing file keeps its mode on open
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).await?;
    }

    tracing::debug!("dvc remote '{}': {} set in {}", remote, key, path.display());
    Ok(())
}

/// Remote options to write for a remote using `scheme`.
///
/// S3 key pairs win over a token; on a non-S3 remote the key id is used as
/// the password.
pub fn select_credentials(
    scheme: &str,
    credentials: &DatasetCredentials,
) -> Result<Vec<(&'static str, String)>, DatasetError> {
    match (
        &credentials.s3_access_key_id,
        &credentials.s3_secret_access_key,
        &credentials.token,
    ) {
        (Some(key_id), Some(secret), _) if scheme == "s3" => Ok(vec![
            ("access_key_id", key_id.clone()),
            ("secret_access_key", secret.clone()),
        ]),
        (Some(key_id), Some(_), _) => Ok(vec![("password", key_id.clone())]),
        (_, _, Some(token)) => Ok(vec![("password", token.clone())]),
        _ => Err(DatasetError::NoCredentials),
    }
}

/// Write credentials for the default remote of a DVC repository.
///
/// Returns `Ok(None)` when `repo` does not use DVC, otherwise the name of the
/// configured remote.
pub async fn configure_dvc(
    repo: &Path,
    credentials: &DatasetCredentials,
    client: &dyn DataVersioning,
) -> Result<Option<String>, DatasetError> {
    if !client.is_repository(repo) {
        return Ok(None);
    }
    tracing::info!("dvc detected");

    let remote = client
        .default_remote(repo)
        .await?
        .ok_or(DatasetError::NoRemote)?;
    tracing::info!("dvc remote: {}", remote);

    let remote_url = client.remote_url(repo, &remote).await?;
    let scheme = Url::parse(&remote_url)
        .map(|u| u.scheme().to_string())
        .unwrap_or_default();

    let options = select_credentials(&scheme, credentials)?;

    tracing::info!("dvc credentials configuration...");
    for (key, value) in &options {
        client
            .set_local_remote_option(repo, &remote, key, value)
            .await?;
    }

    let keys: Vec<_> = options.iter().map(|(k, _)| *k).collect();
    tracing::debug!("dvc credentials configured: {}", keys.join(", "));

    Ok(Some(remote))
}
