//! Bulk cloning of a repository listing into a workspace.
//!
//! Every repository lands at `<workspace>/<owner>/<name>`. Repositories are processed one at a
//! time and in listing order; a repository reaches a terminal [`CloneOutcome`] before the next
//! one is looked at.

use crate::{create_local_repository_path, github::RepositoryDescriptor};
use anyhow::{Context, Error};
use async_trait::async_trait;
use serde::Deserialize;
use std::{fmt, path::Path, str::FromStr};
use tokio::fs;
use tracing::{debug, info, warn};

/// Transport used to fetch a repository.
#[derive(Deserialize, PartialEq, Eq, Copy, Clone, Debug, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CloneMethod {
    #[default]
    Https,
    Ssh,
}

impl CloneMethod {
    /// Picks the remote URL matching this transport.
    pub fn url_for(self, repo: &RepositoryDescriptor) -> &str {
        match self {
            CloneMethod::Https => &repo.clone_url,
            CloneMethod::Ssh => &repo.ssh_url,
        }
    }
}

#[derive(PartialEq, Eq, Copy, Clone, Debug, Default)]
pub enum CloneDepth {
    #[default]
    Full,
    /// Fetch only the given number of most recent commits.
    Shallow(u32),
}

impl CloneDepth {
    /// `0` means full history.
    pub fn from_depth(depth: u32) -> Self {
        if depth == 0 {
            CloneDepth::Full
        } else {
            CloneDepth::Shallow(depth)
        }
    }
}

/// What to do when the destination of a repository already exists.
#[derive(Deserialize, PartialEq, Eq, Copy, Clone, Debug, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Leave the existing directory alone.
    #[default]
    Skip,
    /// Remove the existing directory, then clone.
    Overwrite,
    /// Stop the run. Nothing after the conflict is cloned.
    Abort,
}

macro_rules! impl_str_enum {
    ($ty:ident, $err:ident, $what:literal, { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl $ty {
            fn as_str(self) -> &'static str {
                match self {
                    $($ty::$variant => $s,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = $err;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok($ty::$variant),)+
                    _ => Err($err(s.to_owned())),
                }
            }
        }

        #[derive(Debug, thiserror::Error)]
        #[error("unexpected {} `{0}`, expecting one of {}", $what, [$($s),+].join(", "))]
        pub struct $err(String);
    };
}

impl_str_enum!(CloneMethod, ParseCloneMethodError, "clone method", {
    Https => "https",
    Ssh => "ssh",
});

impl_str_enum!(ConflictPolicy, ParseConflictPolicyError, "conflict policy", {
    Skip => "skip",
    Overwrite => "overwrite",
    Abort => "abort",
});

/// Terminal state of one repository in a bulk run.
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum CloneOutcome {
    Cloned,
    Skipped(String /* reason */),
    Failed(String /* reason */),
    /// Not attempted because the run was aborted.
    Aborted,
}

impl fmt::Display for CloneOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloneOutcome::Cloned => write!(f, "cloned"),
            CloneOutcome::Skipped(reason) => write!(f, "skipped: {reason}"),
            CloneOutcome::Failed(reason) => write!(f, "failed: {reason}"),
            CloneOutcome::Aborted => write!(f, "aborted"),
        }
    }
}

#[derive(PartialEq, Eq, Copy, Clone, Debug, Default)]
pub struct CloneSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Repositories left unattempted by an abort, the conflicting one included.
    pub aborted: usize,
}

impl CloneSummary {
    fn record(&mut self, outcome: &CloneOutcome) {
        match outcome {
            CloneOutcome::Cloned => self.succeeded += 1,
            CloneOutcome::Skipped(_) => self.skipped += 1,
            CloneOutcome::Failed(_) => self.failed += 1,
            CloneOutcome::Aborted => self.aborted += 1,
        }
    }

    fn processed(&self) -> usize {
        self.succeeded + self.failed + self.skipped + self.aborted
    }
}

impl fmt::Display for CloneSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} total, {} cloned, {} failed, {} skipped",
            self.total, self.succeeded, self.failed, self.skipped
        )?;
        if self.aborted > 0 {
            write!(f, ", {} not attempted", self.aborted)?;
        }
        Ok(())
    }
}

/// Fetches a remote repository into a local directory.
#[async_trait]
pub trait Cloner: Send + Sync {
    async fn clone_repository(
        &self,
        url: &str,
        destination: &Path,
        depth: CloneDepth,
    ) -> Result<(), Error>;
}

/// Decides the [`ConflictPolicy`] for one existing destination.
pub trait ResolveConflict {
    fn resolve(&mut self, repo: &RepositoryDescriptor, path: &Path)
        -> Result<ConflictPolicy, Error>;
}

/// A fixed policy applies to every conflict of the run.
impl ResolveConflict for ConflictPolicy {
    fn resolve(&mut self, _: &RepositoryDescriptor, _: &Path) -> Result<ConflictPolicy, Error> {
        Ok(*self)
    }
}

#[derive(PartialEq, Copy, Clone, Debug)]
pub struct BulkCloneOptions<'a> {
    pub owner: &'a str,
    pub workspace_root_dir: &'a Path,
    pub method: CloneMethod,
    pub depth: CloneDepth,
}

/// Clones `repos` in order.
///
/// A failed clone is recorded and the run moves on. An abort decided by `resolver` marks the
/// conflicting repository and everything after it as [`CloneOutcome::Aborted`] without touching
/// them. `on_outcome` sees every repository once, in order.
///
/// A `resolver` that fails is taken as an abort, so the summary still covers every repository.
///
/// Errors only when the owner directory can not be created.
pub async fn bulk_clone<C, R, F>(
    cloner: &C,
    repos: &[RepositoryDescriptor],
    options: BulkCloneOptions<'_>,
    resolver: &mut R,
    mut on_outcome: F,
) -> Result<CloneSummary, Error>
where
    C: Cloner + ?Sized,
    R: ResolveConflict + ?Sized,
    F: FnMut(&RepositoryDescriptor, &CloneOutcome),
{
    let BulkCloneOptions { owner, workspace_root_dir, method, depth } = options;

    let owner_dir = workspace_root_dir.join(owner);
    fs::create_dir_all(&owner_dir)
        .await
        .with_context(|| format!("Failed to create directory `{}`.", owner_dir.display()))?;

    let mut summary = CloneSummary { total: repos.len(), ..Default::default() };
    let mut aborted = false;

    for repo in repos {
        let outcome = if aborted {
            CloneOutcome::Aborted
        } else {
            let path = create_local_repository_path(workspace_root_dir, owner, &repo.name);
            let outcome = clone_one(cloner, repo, &path, method, depth, resolver).await;
            aborted = outcome == CloneOutcome::Aborted;
            if aborted {
                warn!(repo = %repo.name, remaining = repos.len() - summary.processed(), "aborting");
            }
            outcome
        };
        summary.record(&outcome);
        on_outcome(repo, &outcome);
    }

    info!(%summary, "bulk clone finished");
    Ok(summary)
}

async fn clone_one<C, R>(
    cloner: &C,
    repo: &RepositoryDescriptor,
    path: &Path,
    method: CloneMethod,
    depth: CloneDepth,
    resolver: &mut R,
) -> CloneOutcome
where
    C: Cloner + ?Sized,
    R: ResolveConflict + ?Sized,
{
    if fs::symlink_metadata(path).await.is_ok() {
        let policy = match resolver.resolve(repo, path) {
            Ok(policy) => policy,
            Err(err) => {
                let reason = format!("{err:#}");
                warn!(repo = %repo.name, %reason, "conflict left unresolved, aborting");
                ConflictPolicy::Abort
            }
        };
        debug!(repo = %repo.name, path = %path.display(), %policy, "destination exists");
        match policy {
            ConflictPolicy::Skip => {
                let reason = format!("`{}` already exists", path.display());
                return CloneOutcome::Skipped(reason);
            }
            ConflictPolicy::Abort => return CloneOutcome::Aborted,
            ConflictPolicy::Overwrite => {
                if let Err(err) = remove_path(path).await {
                    let reason = format!("{err:#}");
                    warn!(repo = %repo.name, %reason, "failed to remove existing directory");
                    return CloneOutcome::Failed(reason);
                }
            }
        }
    }

    let url = method.url_for(repo);
    info!(repo = %repo.name, url, path = %path.display(), ?depth, "cloning");
    match cloner.clone_repository(url, path, depth).await {
        Ok(()) => CloneOutcome::Cloned,
        Err(err) => {
            let reason = format!("{err:#}");
            warn!(repo = %repo.name, %reason, "clone failed");
            CloneOutcome::Failed(reason)
        }
    }
}

async fn remove_path(path: &Path) -> Result<(), Error> {
    let meta = fs::symlink_metadata(path).await?;
    let removed = if meta.is_dir() {
        fs::remove_dir_all(path).await
    } else {
        fs::remove_file(path).await
    };
    removed.with_context(|| format!("Failed to remove `{}`.", path.display()))
}
