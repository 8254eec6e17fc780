//! Repository selection.

use crate::github::RepositoryDescriptor;
use serde::Deserialize;
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Which repositories of a listing to keep.
#[derive(Deserialize, PartialEq, Eq, Copy, Clone, Debug, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FilterCriterion {
    #[default]
    #[serde(rename = "all")]
    AllRepositories,
    SkipForks,
    OnlyForks,
    OnlyPublic,
    OnlyPrivate,
}

impl FilterCriterion {
    pub const VARIANTS: [FilterCriterion; 5] = [
        FilterCriterion::AllRepositories,
        FilterCriterion::SkipForks,
        FilterCriterion::OnlyForks,
        FilterCriterion::OnlyPublic,
        FilterCriterion::OnlyPrivate,
    ];

    pub fn matches(self, repo: &RepositoryDescriptor) -> bool {
        use FilterCriterion::*;
        match self {
            AllRepositories => true,
            SkipForks => !repo.fork,
            OnlyForks => repo.fork,
            OnlyPublic => !repo.private,
            OnlyPrivate => repo.private,
        }
    }

    fn as_str(self) -> &'static str {
        use FilterCriterion::*;
        match self {
            AllRepositories => "all",
            SkipForks => "skip-forks",
            OnlyForks => "only-forks",
            OnlyPublic => "only-public",
            OnlyPrivate => "only-private",
        }
    }
}

/// Keeps the repositories matching `criterion`, in their original order.
pub fn filter_repositories(
    repos: impl IntoIterator<Item = RepositoryDescriptor>,
    criterion: FilterCriterion,
) -> Vec<RepositoryDescriptor> {
    repos.into_iter().filter(|x| criterion.matches(x)).collect()
}

impl fmt::Display for FilterCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterCriterion {
    type Err = ParseFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::VARIANTS
            .into_iter()
            .find(|x| x.as_str() == s)
            .ok_or_else(|| ParseFilterError(s.to_owned()))
    }
}

#[derive(Debug, Error)]
#[error(
    "unexpected filter `{0}`, expecting one of all, skip-forks, only-forks, only-public, only-private"
)]
pub struct ParseFilterError(String);
