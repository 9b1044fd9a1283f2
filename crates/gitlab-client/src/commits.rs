//! Commits API
//!
//! https://docs.gitlab.com/ee/api/commits.html

use std::collections::HashMap;

use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::context::Context;
use crate::error::Result;
use crate::options::{ListOptions, path_escape};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Commit {
    pub id: String,
    pub short_id: String,
    pub title: String,
    pub author_name: String,
    pub author_email: String,
    pub authored_date: Option<String>,
    pub committer_name: String,
    pub committer_email: String,
    pub committed_date: Option<String>,
    pub created_at: Option<String>,
    pub message: String,
    pub parent_ids: Vec<String>,
    pub stats: Option<CommitStats>,
    pub status: Option<String>,
    pub project_id: Option<u64>,
    pub trailers: HashMap<String, String>,
    pub web_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CommitStats {
    pub additions: u64,
    pub deletions: u64,
    pub total: u64,
}

/// Filters for `Commits::list`. Timestamps are ISO 8601 strings.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListCommitsOptions {
    #[serde(flatten)]
    pub list: ListOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub with_stats: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_parent: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trailers: Option<bool>,
}

pub struct Commits<'a> {
    client: &'a Client,
}

impl<'a> Commits<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Repository commits of a project, by numeric ID or `namespace/path`.
    pub async fn list(
        &self,
        ctx: &Context,
        project: &str,
        opts: &ListCommitsOptions,
    ) -> Result<Vec<Commit>> {
        let path = format!(
            "/api/v4/projects/{}/repository/commits",
            path_escape(project)
        );
        self.client
            .invoke_authenticated(ctx, Method::GET, &path, Some(opts))
            .await
    }
}
