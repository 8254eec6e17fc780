use serde::{Deserialize, Serialize};

/// [GitHub Docs](https://docs.github.com/en/rest/repos/repos#create-a-repository-for-the-authenticated-user).
#[derive(Deserialize, Serialize, PartialEq, Default, Debug)]
pub struct CreateRepository {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub private: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_init: Option<bool>,
}
