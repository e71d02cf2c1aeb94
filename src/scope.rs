//! OAuth scopes and the token scope check.
//! See <https://docs.github.com/developers/apps/scopes-for-oauth-apps>

use crate::context::Context;
use crate::error::{Error, Result};
use crate::http::{Client, Sink};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::fmt;

const HEADER_SCOPES: &str = "x-oauth-scopes";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    /// Full access to private and public repositories.
    #[serde(rename = "repo")]
    Repo,
    #[serde(rename = "repo:status")]
    RepoStatus,
    #[serde(rename = "repo_deployment")]
    RepoDeployment,
    #[serde(rename = "public_repo")]
    PublicRepo,
    #[serde(rename = "repo:invite")]
    RepoInvite,
    #[serde(rename = "security_events")]
    SecurityEvents,
    #[serde(rename = "write:packages")]
    WritePackages,
    #[serde(rename = "read:packages")]
    ReadPackages,
    #[serde(rename = "delete:packages")]
    DeletePackages,
    #[serde(rename = "admin:org")]
    AdminOrg,
    #[serde(rename = "write:org")]
    WriteOrg,
    #[serde(rename = "read:org")]
    ReadOrg,
    #[serde(rename = "admin:public_key")]
    AdminPublicKey,
    #[serde(rename = "write:public_key")]
    WritePublicKey,
    #[serde(rename = "read:public_key")]
    ReadPublicKey,
    #[serde(rename = "admin:repo_hook")]
    AdminRepoHook,
    #[serde(rename = "write:repo_hook")]
    WriteRepoHook,
    #[serde(rename = "read:repo_hook")]
    ReadRepoHook,
    #[serde(rename = "admin:org_hook")]
    AdminOrgHook,
    #[serde(rename = "gist")]
    Gist,
    #[serde(rename = "notifications")]
    Notifications,
    /// Read/write access to profile info only.
    #[serde(rename = "user")]
    User,
    #[serde(rename = "read:user")]
    ReadUser,
    #[serde(rename = "user:email")]
    UserEmail,
    #[serde(rename = "user:follow")]
    UserFollow,
    #[serde(rename = "delete_repo")]
    DeleteRepo,
    #[serde(rename = "write:discussion")]
    WriteDiscussion,
    #[serde(rename = "read:discussion")]
    ReadDiscussion,
    #[serde(rename = "admin:gpg_key")]
    AdminGpgKey,
    #[serde(rename = "write:gpg_key")]
    WriteGpgKey,
    #[serde(rename = "read:gpg_key")]
    ReadGpgKey,
    /// Add and update GitHub Actions workflow files.
    #[serde(rename = "workflow")]
    Workflow,
}

impl Scope {
    pub const ALL: [Scope; 32] = [
        Scope::Repo,
        Scope::RepoStatus,
        Scope::RepoDeployment,
        Scope::PublicRepo,
        Scope::RepoInvite,
        Scope::SecurityEvents,
        Scope::WritePackages,
        Scope::ReadPackages,
        Scope::DeletePackages,
        Scope::AdminOrg,
        Scope::WriteOrg,
        Scope::ReadOrg,
        Scope::AdminPublicKey,
        Scope::WritePublicKey,
        Scope::ReadPublicKey,
        Scope::AdminRepoHook,
        Scope::WriteRepoHook,
        Scope::ReadRepoHook,
        Scope::AdminOrgHook,
        Scope::Gist,
        Scope::Notifications,
        Scope::User,
        Scope::ReadUser,
        Scope::UserEmail,
        Scope::UserFollow,
        Scope::DeleteRepo,
        Scope::WriteDiscussion,
        Scope::ReadDiscussion,
        Scope::AdminGpgKey,
        Scope::WriteGpgKey,
        Scope::ReadGpgKey,
        Scope::Workflow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Repo => "repo",
            Scope::RepoStatus => "repo:status",
            Scope::RepoDeployment => "repo_deployment",
            Scope::PublicRepo => "public_repo",
            Scope::RepoInvite => "repo:invite",
            Scope::SecurityEvents => "security_events",
            Scope::WritePackages => "write:packages",
            Scope::ReadPackages => "read:packages",
            Scope::DeletePackages => "delete:packages",
            Scope::AdminOrg => "admin:org",
            Scope::WriteOrg => "write:org",
            Scope::ReadOrg => "read:org",
            Scope::AdminPublicKey => "admin:public_key",
            Scope::WritePublicKey => "write:public_key",
            Scope::ReadPublicKey => "read:public_key",
            Scope::AdminRepoHook => "admin:repo_hook",
            Scope::WriteRepoHook => "write:repo_hook",
            Scope::ReadRepoHook => "read:repo_hook",
            Scope::AdminOrgHook => "admin:org_hook",
            Scope::Gist => "gist",
            Scope::Notifications => "notifications",
            Scope::User => "user",
            Scope::ReadUser => "read:user",
            Scope::UserEmail => "user:email",
            Scope::UserFollow => "user:follow",
            Scope::DeleteRepo => "delete_repo",
            Scope::WriteDiscussion => "write:discussion",
            Scope::ReadDiscussion => "read:discussion",
            Scope::AdminGpgKey => "admin:gpg_key",
            Scope::WriteGpgKey => "write:gpg_key",
            Scope::ReadGpgKey => "read:gpg_key",
            Scope::Workflow => "workflow",
        }
    }

    pub fn parse(s: &str) -> Option<Scope> {
        Scope::ALL.into_iter().find(|scope| scope.as_str() == s)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scopes granted to a token, as listed in `X-OAuth-Scopes` (`"repo, user"`).
fn granted_scopes(header: &str) -> Vec<&str> {
    header
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

impl Client {
    /// Fails with [`Error::MissingScope`] for the first of `scopes` the
    /// configured access token was not granted.
    pub async fn ensure_scopes(&self, ctx: &Context, scopes: &[Scope]) -> Result<()> {
        let req = self.new_request(Some(ctx), Method::HEAD, "/user", None)?;
        let resp = self.execute(req, Sink::Discard).await?;

        let header = resp
            .headers
            .get(HEADER_SCOPES)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        let granted = granted_scopes(header);

        match scopes.iter().find(|s| !granted.contains(&s.as_str())) {
            Some(missing) => Err(Error::MissingScope(*missing)),
            None => Ok(()),
        }
    }
}
