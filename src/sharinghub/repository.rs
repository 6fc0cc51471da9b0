//! Git clone, reuse and checkout via libgit2.

use std::path::{Path, PathBuf};

use git2::build::RepoBuilder;
use git2::{Cred, FetchOptions, RemoteCallbacks, Repository};
use url::Url;

use super::{DatasetCredentials, DatasetError};

/// Default clone directory for `url`: the file stem of its path
///
/// `https://host/group/dataset.git` → `dataset`
pub fn repository_dir_from_url(url: &str) -> Result<PathBuf, DatasetError> {
    let path = Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string());

    Path::new(&path)
        .file_stem()
        .map(PathBuf::from)
        .ok_or_else(|| DatasetError::InvalidUrl(url.to_string()))
}

/// `url` without user name and password, for logs
pub fn display_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) if !parsed.username().is_empty() || parsed.password().is_some() => {
            // Only fails for URLs that cannot carry user info at all
            let _ = parsed.set_username("");
            let _ = parsed.set_password(None);
            parsed.to_string()
        }
        _ => url.to_string(),
    }
}

/// Clone `url` into `path` (or the directory derived from the URL).
///
/// An existing directory is reused as-is if it is a git repository and
/// rejected otherwise. User and token, when both given, are answered to the
/// host's authentication challenge.
pub fn download_repository(
    url: &str,
    path: Option<&Path>,
    credentials: &DatasetCredentials,
) -> Result<PathBuf, DatasetError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => repository_dir_from_url(url)?,
    };

    if path.is_dir() {
        Repository::open(&path).map_err(|_| DatasetError::InvalidRepository(path.clone()))?;
        tracing::info!("repository found locally: {}", path.display());
        return Ok(path);
    }

    tracing::info!("clone url: {}", display_url(url));

    let mut callbacks = RemoteCallbacks::new();
    if let (Some(user), Some(token)) = (credentials.user.clone(), credentials.token.clone()) {
        let mut attempts = 0;
        callbacks.credentials(move |_url, _username_from_url, _allowed| {
            // libgit2 asks again after a rejected answer
            attempts += 1;
            if attempts > 1 {
                return Err(git2::Error::from_str("authentication failed"));
            }
            Cred::userpass_plaintext(&user, &token)
        });
    }

    let mut fetch_options = FetchOptions::new();
    fetch_options.remote_callbacks(callbacks);

    tracing::info!("cloning repository...");
    RepoBuilder::new()
        .fetch_options(fetch_options)
        .clone(url, &path)?;

    Ok(path)
}

/// Check out `revision` (branch, tag or commit) in the repository at `repo_path`.
///
/// Branches only known on `origin` are resolved through `origin/<revision>`.
pub fn checkout_revision(repo_path: &Path, revision: &str) -> Result<(), DatasetError> {
    let repo = Repository::open(repo_path)?;

    let (object, reference) = match repo.revparse_ext(revision) {
        Ok(found) => found,
        Err(err) => repo
            .revparse_ext(&format!("origin/{}", revision))
            .map_err(|_| err)?,
    };

    repo.checkout_tree(&object, None)?;

    match reference.as_ref().and_then(|r| r.name()) {
        Some(name) if name.starts_with("refs/heads/") => repo.set_head(name)?,
        _ => repo.set_head_detached(object.id())?,
    }

    tracing::info!("checked out revision: {}", revision);
    Ok(())
}
