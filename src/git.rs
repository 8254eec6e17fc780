use crate::{
    clone::{CloneDepth, Cloner},
    Secret,
};
use anyhow::{Context, Error};
use async_trait::async_trait;
use git2::{build::RepoBuilder, Cred, CredentialType, FetchOptions, RemoteCallbacks};
use std::path::Path;
use tokio::task;
use tracing::debug;

/// Gives up after this many rejected credentials, libgit2 would otherwise ask forever.
const MAX_CREDENTIAL_ATTEMPTS: u8 = 3;

/// Clones with libgit2.
///
/// SSH remotes authenticate through the ssh-agent, HTTPS remotes with the access token when one
/// is configured.
#[derive(Clone, Debug, Default)]
pub struct GitCloner {
    token: Option<Secret<String>>,
}

impl GitCloner {
    pub fn new(token: Option<Secret<String>>) -> Self {
        Self { token }
    }
}

#[async_trait]
impl Cloner for GitCloner {
    async fn clone_repository(
        &self,
        url: &str,
        destination: &Path,
        depth: CloneDepth,
    ) -> Result<(), Error> {
        let url = url.to_owned();
        let destination = destination.to_owned();
        let token = self.token.clone();
        task::spawn_blocking(move || clone_repository(&url, &destination, depth, token.as_ref()))
            .await
            .context("Clone task did not complete.")?
    }
}

fn clone_repository(
    url: &str,
    path: &Path,
    depth: CloneDepth,
    token: Option<&Secret<String>>,
) -> Result<(), Error> {
    let mut opts = create_fetch_options(token);
    if let CloneDepth::Shallow(depth) = depth {
        let depth = i32::try_from(depth).context("Clone depth is too large.")?;
        opts.depth(depth);
    }
    let repo = RepoBuilder::new()
        .fetch_options(opts)
        .clone(url, path)
        .with_context(|| format!("Failed to clone `{url}`."))?;
    debug!(path = %repo.path().display(), "cloned");
    Ok(())
}

fn create_fetch_options(token: Option<&Secret<String>>) -> FetchOptions<'_> {
    let mut opts = FetchOptions::new();
    opts.remote_callbacks(create_remote_callbacks(token));
    opts
}

fn create_remote_callbacks(token: Option<&Secret<String>>) -> RemoteCallbacks<'_> {
    let mut attempts = 0;
    let mut cbs = RemoteCallbacks::new();
    cbs.credentials(move |_url, username_from_url, allowed| {
        attempts += 1;
        if attempts > MAX_CREDENTIAL_ATTEMPTS {
            return Err(git2::Error::from_str("Authentication failed."));
        }
        if allowed.contains(CredentialType::SSH_KEY) {
            let username = username_from_url.unwrap_or("git");
            return Cred::ssh_key_from_agent(username);
        }
        match token {
            Some(token) if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) => {
                Cred::userpass_plaintext("x-access-token", &token.0)
            }
            _ => Cred::default(),
        }
    });
    cbs
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{Repository, Signature};

    fn create_origin(dir: &Path) {
        let repo = Repository::init(dir).unwrap();
        std::fs::write(dir.join("README.md"), "hello\n").unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("README.md")).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = Signature::now("Octo Cat", "octocat@example.com").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "Initial commit", &tree, &[]).unwrap();
    }

    #[tokio::test]
    async fn test_clone_local_repository() {
        let origin = tempfile::tempdir().unwrap();
        create_origin(origin.path());
        let workspace = tempfile::tempdir().unwrap();
        let destination = workspace.path().join("octocat").join("hello");
        std::fs::create_dir_all(workspace.path().join("octocat")).unwrap();

        let url = origin.path().to_str().unwrap();
        GitCloner::default().clone_repository(url, &destination, CloneDepth::Full).await.unwrap();

        assert!(destination.join("README.md").is_file());
        assert!(Repository::open(&destination).is_ok());
    }

    #[tokio::test]
    async fn test_clone_missing_repository_fails() {
        let workspace = tempfile::tempdir().unwrap();
        let url = workspace.path().join("nowhere");
        let destination = workspace.path().join("octocat").join("nowhere");

        let err = GitCloner::default()
            .clone_repository(url.to_str().unwrap(), &destination, CloneDepth::Full)
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("Failed to clone"), "{err:#}");
    }
}
