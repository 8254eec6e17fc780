use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One element of a repository listing page.
///
/// [GitHub Docs].
///
/// [GitHub Docs]: https://docs.github.com/en/rest/repos/repos#list-repositories-for-a-user
#[derive(Deserialize, PartialEq, Clone, Debug)]
pub struct RepositoryDescriptor {
    pub name: String,
    pub owner: RepositoryOwner,
    pub clone_url: String,
    pub ssh_url: String,
    pub fork: bool,
    pub private: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub pushed_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, PartialEq, Clone, Debug)]
pub struct RepositoryOwner {
    pub login: String,
}

impl RepositoryDescriptor {
    /// Whether `owner` owns this repository. Logins are case insensitive.
    pub fn is_owned_by(&self, owner: &str) -> bool {
        self.owner.login.eq_ignore_ascii_case(owner)
    }
}

/// Error payload returned by the API alongside a non-success status.
#[derive(Deserialize, PartialEq, Clone, Debug)]
pub struct ApiMessage {
    pub message: String,
    #[serde(default)]
    pub documentation_url: Option<String>,
}

#[derive(Deserialize, PartialEq, Clone, Debug)]
pub struct CreatedRepository {
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    pub private: bool,
}
