//! Domain data model
//!
//! These are the values a core service hands to a plugin when it asks for a
//! decision. Field names follow the JSON representation used on the wire, and
//! every field falls back to its zero value when absent so that older and
//! newer peers can exchange envelopes without failing to decode.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// A user account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: i64,
    pub login: String,
    pub email: String,
    #[serde(rename = "avatar_url")]
    pub avatar: String,
    pub active: bool,
    pub admin: bool,
    pub machine: bool,
    pub syncing: bool,
    pub synced: i64,
    pub created: i64,
    pub updated: i64,
    pub last_login: i64,
    pub token: String,
}

/// A repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Repo {
    pub id: i64,
    pub uid: String,
    pub user_id: i64,
    pub namespace: String,
    pub name: String,
    pub slug: String,
    pub scm: String,
    #[serde(rename = "git_http_url")]
    pub http_url: String,
    #[serde(rename = "git_ssh_url")]
    pub ssh_url: String,
    pub link: String,
    #[serde(rename = "default_branch")]
    pub branch: String,
    pub private: bool,
    pub visibility: String,
    pub active: bool,
    #[serde(rename = "config_path")]
    pub config: String,
    pub trusted: bool,
    pub protected: bool,
    pub ignore_forks: bool,
    #[serde(rename = "ignore_pull_requests")]
    pub ignore_pulls: bool,
    #[serde(rename = "auto_cancel_pull_requests")]
    pub cancel_pulls: bool,
    #[serde(rename = "auto_cancel_pushes")]
    pub cancel_push: bool,
    #[serde(rename = "auto_cancel_running")]
    pub cancel_running: bool,
    pub throttle: i64,
    pub timeout: i64,
    pub counter: i64,
    pub synced: i64,
    pub created: i64,
    pub updated: i64,
    pub version: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub signer: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub secret: String,
}

/// A build of a repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Build {
    pub id: i64,
    pub repo_id: i64,
    pub trigger: String,
    pub number: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub parent: i64,
    pub status: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
    pub event: String,
    pub action: String,
    pub link: String,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    pub message: String,
    pub before: String,
    pub after: String,
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(rename = "source_repo")]
    pub fork: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "author_login")]
    pub author: String,
    pub author_name: String,
    pub author_email: String,
    pub author_avatar: String,
    pub sender: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub params: HashMap<String, String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cron: String,
    #[serde(rename = "deploy_to", skip_serializing_if = "String::is_empty")]
    pub deploy: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub deploy_id: i64,
    pub debug: bool,
    pub started: i64,
    pub finished: i64,
    pub created: i64,
    pub updated: i64,
    pub version: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<Stage>,
}

/// A stage of build execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stage {
    pub id: i64,
    pub build_id: i64,
    pub number: i32,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub kind_type: String,
    pub status: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(rename = "errignore")]
    pub err_ignore: bool,
    pub exit_code: i32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub machine: String,
    pub os: String,
    pub arch: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub variant: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub kernel: String,
    pub started: i64,
    pub stopped: i64,
    pub created: i64,
    pub updated: i64,
    pub version: i64,
    pub on_success: bool,
    pub on_failure: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<Step>,
}

/// An individual step in a stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Step {
    pub id: i64,
    #[serde(rename = "step_id")]
    pub stage_id: i64,
    pub number: i32,
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(rename = "errignore")]
    pub err_ignore: bool,
    pub exit_code: i32,
    pub started: i64,
    pub stopped: i64,
    pub version: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub image: String,
    pub detached: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub schema: String,
}

/// A pipeline configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: String,
    pub kind: String,
}

/// Container registry credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Registry {
    pub address: String,
    pub username: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub password: String,
    pub email: String,
    pub token: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub policy: String,
}

/// A secret variable, such as a password or token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Secret {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub data: String,
    pub pull_request: bool,
    pub pull_request_push: bool,
}

/// Information about the calling system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct System {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub proto: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub host: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub link: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

/// Decode a nested object, treating an explicit `null` like an absent field.
///
/// Only the nested envelope objects carry this attribute. Use
/// [`crate::codec::from_slice`] to accept `null` on every field.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
