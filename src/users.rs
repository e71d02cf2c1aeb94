//! Users endpoints.

use crate::context::Context;
use crate::error::Result;
use crate::http::{Client, Response, Sink};
use crate::types::User;
use reqwest::Method;
use urlencoding::encode;

/// See <https://docs.github.com/rest/reference/users>
#[derive(Debug, Clone, Copy)]
pub struct UsersService<'a> {
    client: &'a Client,
}

impl Client {
    pub fn users(&self) -> UsersService<'_> {
        UsersService { client: self }
    }
}

impl UsersService<'_> {
    /// See <https://docs.github.com/rest/reference/users#get-a-user>
    pub async fn get(&self, ctx: &Context, login: &str) -> Result<(User, Response)> {
        self.fetch(ctx, &format!("/users/{}", encode(login))).await
    }

    /// See <https://docs.github.com/rest/reference/users#get-the-authenticated-user>
    pub async fn authenticated(&self, ctx: &Context) -> Result<(User, Response)> {
        self.fetch(ctx, "/user").await
    }

    async fn fetch(&self, ctx: &Context, path: &str) -> Result<(User, Response)> {
        let req = self.client.new_request(Some(ctx), Method::GET, path, None)?;
        let mut user = User::default();
        let resp = self.client.execute(req, Sink::Json(&mut user)).await?;
        Ok((user, resp))
    }
}
