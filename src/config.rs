//! Settings, layered from flags and environment, a TOML file, then defaults.

use crate::{
    clone::{CloneDepth, CloneMethod, ConflictPolicy},
    filter::FilterCriterion,
    github::client::DEFAULT_API_URL,
    Secret,
};
use directories_next::ProjectDirs;
use serde::Deserialize;
use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
    str::FromStr,
};
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file `{}`.", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config file `{}`.", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Missing owner, set `--owner`, GHRM_OWNER, or `owner` in the config file.")]
    MissingOwner,

    #[error("Invalid owner `{0}`, expecting a GitHub login.")]
    InvalidOwner(String),

    #[error("Invalid API URL `{url}`.")]
    InvalidApiUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// How conflicts are settled in a bulk clone, one policy for the run or a prompt per conflict.
#[derive(Deserialize, PartialEq, Eq, Copy, Clone, Debug)]
#[serde(rename_all = "kebab-case")]
pub enum OnConflict {
    Skip,
    Overwrite,
    Abort,
    Ask,
}

impl Default for OnConflict {
    fn default() -> Self {
        ConflictPolicy::default().into()
    }
}

impl From<ConflictPolicy> for OnConflict {
    fn from(x: ConflictPolicy) -> Self {
        match x {
            ConflictPolicy::Skip => OnConflict::Skip,
            ConflictPolicy::Overwrite => OnConflict::Overwrite,
            ConflictPolicy::Abort => OnConflict::Abort,
        }
    }
}

impl OnConflict {
    /// The uniform policy, `None` when every conflict is to be asked.
    pub fn policy(self) -> Option<ConflictPolicy> {
        match self {
            OnConflict::Skip => Some(ConflictPolicy::Skip),
            OnConflict::Overwrite => Some(ConflictPolicy::Overwrite),
            OnConflict::Abort => Some(ConflictPolicy::Abort),
            OnConflict::Ask => None,
        }
    }
}

impl fmt::Display for OnConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.policy() {
            Some(policy) => fmt::Display::fmt(&policy, f),
            None => f.write_str("ask"),
        }
    }
}

impl FromStr for OnConflict {
    type Err = ParseOnConflictError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ask" => Ok(OnConflict::Ask),
            _ => s
                .parse::<ConflictPolicy>()
                .map(Into::into)
                .map_err(|_| ParseOnConflictError(s.to_owned())),
        }
    }
}

#[derive(Debug, Error)]
#[error("unexpected conflict policy `{0}`, expecting one of skip, overwrite, abort, ask")]
pub struct ParseOnConflictError(String);

/// Content of the config file. Every key is optional.
#[derive(Deserialize, PartialEq, Default, Debug)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub owner: Option<String>,
    pub token: Option<Secret<String>>,
    pub workspace: Option<PathBuf>,
    pub api_url: Option<String>,
    pub clone: CloneSection,
}

#[derive(Deserialize, PartialEq, Default, Debug)]
#[serde(default, deny_unknown_fields)]
pub struct CloneSection {
    pub method: Option<CloneMethod>,
    pub filter: Option<FilterCriterion>,
    /// `0` for full history.
    pub depth: Option<u32>,
    pub on_conflict: Option<OnConflict>,
}

impl ConfigFile {
    /// Default location, `<platform config dir>/ghrm/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", env!("CARGO_PKG_NAME"))
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Reads `path` when given, it must exist. Otherwise reads the default location if present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::read(path),
            None => match Self::default_path() {
                Some(path) if path.is_file() => Self::read(&path),
                _ => {
                    debug!("no config file");
                    Ok(Self::default())
                }
            },
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "reading config file");
        let text = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_owned(), source })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse { path: path.to_owned(), source })
    }
}

/// Values given on the command line or through the environment.
#[derive(PartialEq, Default, Debug)]
pub struct Overrides {
    pub owner: Option<String>,
    pub token: Option<Secret<String>>,
    pub workspace: Option<PathBuf>,
    pub api_url: Option<String>,
}

#[derive(PartialEq, Copy, Clone, Debug, Default)]
pub struct CloneSettings {
    pub method: CloneMethod,
    pub filter: FilterCriterion,
    pub depth: CloneDepth,
    pub on_conflict: OnConflict,
}

#[derive(PartialEq, Clone, Debug)]
pub struct Settings {
    pub owner: String,
    pub token: Option<Secret<String>>,
    pub workspace_root_dir: PathBuf,
    pub api_url: Url,
    /// Defaults for `clone-all`, each flag of the command takes precedence.
    pub clone: CloneSettings,
}

impl Settings {
    pub fn resolve(overrides: Overrides, file: ConfigFile) -> Result<Self, ConfigError> {
        let Overrides { owner, token, workspace, api_url } = overrides;

        let owner =
            owner.or(file.owner).filter(|x| !x.is_empty()).ok_or(ConfigError::MissingOwner)?;
        if !is_valid_login(&owner) {
            return Err(ConfigError::InvalidOwner(owner));
        }
        let token = token.or(file.token).filter(|x| !x.0.is_empty());
        let workspace_root_dir = workspace.or(file.workspace).unwrap_or_else(|| PathBuf::from("."));
        let api_url = api_url.or(file.api_url).unwrap_or_else(|| DEFAULT_API_URL.to_owned());
        let api_url = api_url
            .parse()
            .map_err(|source| ConfigError::InvalidApiUrl { url: api_url.clone(), source })?;

        let CloneSection { method, filter, depth, on_conflict } = file.clone;
        let clone = CloneSettings {
            method: method.unwrap_or_default(),
            filter: filter.unwrap_or_default(),
            depth: depth.map(CloneDepth::from_depth).unwrap_or_default(),
            on_conflict: on_conflict.unwrap_or_default(),
        };

        Ok(Self { owner, token, workspace_root_dir, api_url, clone })
    }
}

/// The owner ends up in request paths and in the checkout path, only login characters pass.
fn is_valid_login(login: &str) -> bool {
    login.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !login.starts_with('.')
        && !login.contains("..")
}
