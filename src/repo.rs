//! Repository endpoints: commits, branches, tags, issues, pulls and releases.

use crate::context::Context;
use crate::error::Result;
use crate::http::{Body, Client, Response, Sink};
use crate::types::{
    Branch, Commit, Event, Issue, Permission, Pull, Release, ReleaseAsset, ReleaseParams,
    Repository, Tag, Timestamp,
};
use chrono::SecondsFormat;
use log::warn;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::io;
use std::path::{Path, PathBuf};
use urlencoding::encode;

/// Optional filters for [`RepoService::issues`].
#[derive(Debug, Clone, Default)]
pub struct IssuesParams {
    /// `open`, `closed` or `all`; empty leaves the server default.
    pub state: String,
    pub since: Option<Timestamp>,
}

/// Optional filters for [`RepoService::pulls`].
#[derive(Debug, Clone, Default)]
pub struct PullsParams {
    pub state: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PermissionBody {
    permission: Permission,
}

/// Endpoints scoped to one repository.
#[derive(Debug, Clone)]
pub struct RepoService<'a> {
    client: &'a Client,
    owner: String,
    repo: String,
}

impl Client {
    pub fn repo(&self, owner: &str, repo: &str) -> RepoService<'_> {
        RepoService {
            client: self,
            owner: owner.to_string(),
            repo: repo.to_string(),
        }
    }
}

impl RepoService<'_> {
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.repo
    }

    fn path(&self, rest: &str) -> String {
        format!("/repos/{}/{}{}", encode(&self.owner), encode(&self.repo), rest)
    }

    async fn get_json<T>(&self, ctx: &Context, path: &str) -> Result<(T, Response)>
    where
        T: DeserializeOwned + Default + Send,
    {
        let req = self.client.new_request(Some(ctx), Method::GET, path, None)?;
        let mut value = T::default();
        let resp = self.client.execute(req, Sink::Json(&mut value)).await?;
        Ok((value, resp))
    }

    async fn list<T>(
        &self,
        ctx: &Context,
        path: &str,
        per_page: u32,
        page: u32,
        query: &[(&str, String)],
    ) -> Result<(Vec<T>, Response)>
    where
        T: DeserializeOwned + Send,
    {
        let mut req = self
            .client
            .new_page_request(Some(ctx), Method::GET, path, per_page, page, None)?;
        for (key, value) in query {
            req.append_query(key, value);
        }
        let mut items: Vec<T> = Vec::new();
        let resp = self.client.execute(req, Sink::Json(&mut items)).await?;
        Ok((items, resp))
    }

    async fn send_release(
        &self,
        ctx: &Context,
        method: Method,
        path: &str,
        params: &ReleaseParams,
    ) -> Result<(Release, Response)> {
        let body = Body::json(params)?;
        let req = self.client.new_request(Some(ctx), method, path, Some(body))?;
        let mut release = Release::default();
        let resp = self.client.execute(req, Sink::Json(&mut release)).await?;
        Ok((release, resp))
    }

    /// See <https://docs.github.com/rest/reference/repos#get-a-repository>
    pub async fn get(&self, ctx: &Context) -> Result<(Repository, Response)> {
        self.get_json(ctx, &self.path("")).await
    }

    /// Permission level of a collaborator.
    /// See <https://docs.github.com/rest/reference/repos#get-repository-permissions-for-a-user>
    pub async fn permission(&self, ctx: &Context, username: &str) -> Result<(Permission, Response)> {
        let path = self.path(&format!("/collaborators/{}/permission", encode(username)));
        let (body, resp) = self.get_json::<PermissionBody>(ctx, &path).await?;
        Ok((body.permission, resp))
    }

    /// `git_ref` is a SHA, branch or tag name.
    /// See <https://docs.github.com/rest/reference/repos#get-a-commit>
    pub async fn commit(&self, ctx: &Context, git_ref: &str) -> Result<(Commit, Response)> {
        self.get_json(ctx, &self.path(&format!("/commits/{}", encode(git_ref))))
            .await
    }

    /// See <https://docs.github.com/rest/reference/repos#list-commits>
    pub async fn commits(&self, ctx: &Context, per_page: u32, page: u32) -> Result<(Vec<Commit>, Response)> {
        self.list(ctx, &self.path("/commits"), per_page, page, &[]).await
    }

    /// See <https://docs.github.com/rest/reference/repos#get-a-branch>
    pub async fn branch(&self, ctx: &Context, name: &str) -> Result<(Branch, Response)> {
        self.get_json(ctx, &self.path(&format!("/branches/{}", encode(name))))
            .await
    }

    /// Enables or disables enforcement of branch protection for administrators.
    /// See <https://docs.github.com/rest/reference/repos#set-admin-branch-protection>
    pub async fn branch_protection(&self, ctx: &Context, branch: &str, enabled: bool) -> Result<Response> {
        let method = if enabled { Method::POST } else { Method::DELETE };
        let path = self.path(&format!("/branches/{}/protection/enforce_admins", encode(branch)));
        let req = self.client.new_request(Some(ctx), method, &path, None)?;
        self.client.execute(req, Sink::Discard).await
    }

    pub async fn tags(&self, ctx: &Context, per_page: u32, page: u32) -> Result<(Vec<Tag>, Response)> {
        self.list(ctx, &self.path("/tags"), per_page, page, &[]).await
    }

    /// See <https://docs.github.com/rest/reference/issues#list-repository-issues>
    pub async fn issues(
        &self,
        ctx: &Context,
        per_page: u32,
        page: u32,
        params: &IssuesParams,
    ) -> Result<(Vec<Issue>, Response)> {
        let mut query = Vec::new();
        if !params.state.is_empty() {
            query.push(("state", params.state.clone()));
        }
        if let Some(since) = params.since {
            query.push(("since", since.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        self.list(ctx, &self.path("/issues"), per_page, page, &query)
            .await
    }

    /// See <https://docs.github.com/rest/reference/pulls#get-a-pull-request>
    pub async fn pull(&self, ctx: &Context, number: u64) -> Result<(Pull, Response)> {
        self.get_json(ctx, &self.path(&format!("/pulls/{}", number)))
            .await
    }

    /// See <https://docs.github.com/rest/reference/pulls#list-pull-requests>
    pub async fn pulls(
        &self,
        ctx: &Context,
        per_page: u32,
        page: u32,
        params: &PullsParams,
    ) -> Result<(Vec<Pull>, Response)> {
        let mut query = Vec::new();
        if !params.state.is_empty() {
            query.push(("state", params.state.clone()));
        }
        self.list(ctx, &self.path("/pulls"), per_page, page, &query)
            .await
    }

    /// Events of one issue or pull request.
    /// See <https://docs.github.com/rest/reference/issues#list-issue-events>
    pub async fn events(
        &self,
        ctx: &Context,
        number: u64,
        per_page: u32,
        page: u32,
    ) -> Result<(Vec<Event>, Response)> {
        let path = self.path(&format!("/issues/{}/events", number));
        self.list(ctx, &path, per_page, page, &[]).await
    }

    /// See <https://docs.github.com/rest/reference/repos#get-the-latest-release>
    pub async fn latest_release(&self, ctx: &Context) -> Result<(Release, Response)> {
        self.get_json(ctx, &self.path("/releases/latest")).await
    }

    /// See <https://docs.github.com/rest/reference/repos#create-a-release>
    pub async fn create_release(&self, ctx: &Context, params: &ReleaseParams) -> Result<(Release, Response)> {
        self.send_release(ctx, Method::POST, &self.path("/releases"), params)
            .await
    }

    /// See <https://docs.github.com/rest/reference/repos#update-a-release>
    pub async fn update_release(
        &self,
        ctx: &Context,
        release_id: u64,
        params: &ReleaseParams,
    ) -> Result<(Release, Response)> {
        let path = self.path(&format!("/releases/{}", release_id));
        self.send_release(ctx, Method::PATCH, &path, params).await
    }

    /// Uploads a local file as a release asset named after the file.
    /// See <https://docs.github.com/rest/reference/repos#upload-a-release-asset>
    pub async fn upload_release_asset(
        &self,
        ctx: &Context,
        release_id: u64,
        file: impl AsRef<Path>,
        label: &str,
    ) -> Result<(ReleaseAsset, Response)> {
        let file = file.as_ref();
        let path = self.path(&format!("/releases/{}/assets", release_id));
        let mut req = self.client.new_upload_request(Some(ctx), &path, file).await?;

        if let Some(name) = file.file_name() {
            req.append_query("name", &name.to_string_lossy());
        }
        if !label.is_empty() {
            req.append_query("label", label);
        }

        let mut asset = ReleaseAsset::default();
        let resp = self.client.execute(req, Sink::Json(&mut asset)).await?;
        Ok((asset, resp))
    }

    /// Streams a release asset from the download host into `out_file`.
    ///
    /// The body lands in a `.part` sibling that replaces `out_file` only
    /// once the whole asset arrived; a failed call leaves `out_file` as it was.
    pub async fn download_release_asset(
        &self,
        ctx: &Context,
        tag: &str,
        asset: &str,
        out_file: impl AsRef<Path>,
    ) -> Result<Response> {
        let path = format!(
            "/{}/{}/releases/download/{}/{}",
            encode(&self.owner),
            encode(&self.repo),
            encode(tag),
            encode(asset)
        );
        let req = self.client.new_download_request(Some(ctx), &path)?;

        let out_file = out_file.as_ref();
        let partial = partial_path(out_file)?;
        let mut out = tokio::fs::File::create(&partial).await?;
        let result = self.client.execute(req, Sink::Raw(&mut out)).await;
        drop(out);

        match result {
            Ok(resp) => {
                tokio::fs::rename(&partial, out_file).await?;
                Ok(resp)
            }
            Err(err) => {
                if let Err(e) = tokio::fs::remove_file(&partial).await {
                    warn!("{}: {}", partial.display(), e);
                }
                Err(err)
            }
        }
    }
}

/// Sibling of `out_file` that a download streams into before it replaces
/// the target.
fn partial_path(out_file: &Path) -> Result<PathBuf> {
    let Some(name) = out_file.file_name() else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{}: not a file path", out_file.display()),
        )
        .into());
    };
    let mut partial = name.to_os_string();
    partial.push(".part");
    Ok(out_file.with_file_name(partial))
}
