//! Version API
//!
//! https://docs.gitlab.com/ee/api/version.html

use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::context::Context;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Version {
    pub version: String,
    #[serde(default)]
    pub revision: String,
}

pub struct VersionService<'a> {
    client: &'a Client,
}

impl<'a> VersionService<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Version and revision of the GitLab instance.
    pub async fn get(&self, ctx: &Context) -> Result<Version> {
        self.client
            .invoke_authenticated::<(), _>(ctx, Method::GET, "/api/v4/version", None)
            .await
    }
}
