pub mod app;
pub mod clone;
pub mod config;
pub mod display;
pub mod filter;
pub mod git;
pub mod github;

use serde::Deserialize;
use std::{
    convert::Infallible,
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};
use thiserror::Error;

/// A value that must not end up in logs.
#[derive(Deserialize, PartialEq, Eq, Copy, Clone, Default)]
#[serde(transparent)]
pub struct Secret<T>(pub T);

impl<T> Secret<T> {
    pub fn as_ref(&self) -> Secret<&T> {
        Secret(&self.0)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Secret<U> {
        Secret(f(self.0))
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl FromStr for Secret<String> {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Secret(s.to_owned()))
    }
}

#[derive(PartialEq, Clone, Debug)]
pub struct RepositoryId {
    pub owner: String,
    pub name: String,
}

impl RepositoryId {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self { owner: owner.into(), name: name.into() }
    }
}

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A repository named either as `:owner/:name` or as a bare `:name` of the configured owner.
#[derive(PartialEq, Clone, Debug)]
pub struct PartialRepositoryId {
    pub owner: Option<String>,
    pub name: String,
}

impl PartialRepositoryId {
    pub fn complete(self, default_owner: impl Into<String>) -> RepositoryId {
        let PartialRepositoryId { owner, name } = self;
        RepositoryId { owner: owner.unwrap_or_else(|| default_owner.into()), name }
    }
}

#[derive(Debug, Error)]
#[error("Expecting in `:owner?/:name` format, but was `{0}`.")]
pub struct ParseRepositoryIdError(String);

impl FromStr for PartialRepositoryId {
    type Err = ParseRepositoryIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseRepositoryIdError(s.to_owned());
        let (owner, name) = match s.split_once('/') {
            Some((owner, name)) => (Some(owner), name),
            None => (None, s),
        };
        if name.is_empty() || name.contains('/') || owner.map_or(false, str::is_empty) {
            return Err(invalid());
        }
        Ok(Self { owner: owner.map(ToOwned::to_owned), name: name.to_owned() })
    }
}

/// Local checkout location of a repository, `<workspace>/<owner>/<name>`.
pub fn create_local_repository_path(
    workspace_root_dir: impl AsRef<Path>,
    owner: &str,
    name: &str,
) -> PathBuf {
    workspace_root_dir.as_ref().join(owner).join(name)
}
