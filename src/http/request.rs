use super::sniff::{detect_content_type, SNIFF_LEN};
use super::Client;
use crate::context::Context;
use crate::error::{Error, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use serde::Serialize;
use std::io::{self, SeekFrom};
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use url::Url;

/// See <https://docs.github.com/rest/overview/media-types>
pub const MEDIA_TYPE_V3: &str = "application/vnd.github.v3+json";
pub const MEDIA_JSON: &str = "application/json";

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Sent verbatim.
    Raw(Vec<u8>),
    /// Serialized as JSON.
    Json(serde_json::Value),
}

impl Body {
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Body> {
        Ok(Body::Json(serde_json::to_value(value)?))
    }

    fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            Body::Raw(bytes) => Ok(bytes),
            Body::Json(value) => Ok(serde_json::to_vec(&value)?),
        }
    }
}

/// A request ready for [`Client::execute`], bound to the context it runs under.
#[derive(Debug)]
pub struct Request {
    pub(crate) ctx: Context,
    pub(crate) inner: reqwest::Request,
}

impl Request {
    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    pub fn url(&self) -> &Url {
        self.inner.url()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Buffered body bytes; `None` without a body or for streaming bodies.
    pub fn body_bytes(&self) -> Option<&[u8]> {
        self.inner.body().and_then(|b| b.as_bytes())
    }

    pub fn append_query(&mut self, key: &str, value: &str) {
        self.inner.url_mut().query_pairs_mut().append_pair(key, value);
    }
}

impl Client {
    fn authorize(&self, headers: &mut HeaderMap) {
        if let Some(auth) = &self.authorization {
            headers.insert(AUTHORIZATION, auth.clone());
        }
    }

    /// Builds a JSON API request against the API base URL.
    ///
    /// Fails before any I/O on an unparseable path, a body that cannot be
    /// serialized, or a missing context.
    pub fn new_request(
        &self,
        ctx: Option<&Context>,
        method: Method,
        path: &str,
        body: Option<Body>,
    ) -> Result<Request> {
        let url = self.api_url.join(path)?;
        let payload = body.map(Body::into_bytes).transpose()?;
        let ctx = ctx.ok_or(Error::NilContext)?;

        let mut inner = reqwest::Request::new(method, url);
        let headers = inner.headers_mut();
        headers.insert(USER_AGENT, self.user_agent.clone());
        headers.insert(ACCEPT, HeaderValue::from_static(MEDIA_TYPE_V3));
        self.authorize(headers);
        if let Some(payload) = payload {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(MEDIA_JSON));
            *inner.body_mut() = Some(payload.into());
        }

        Ok(Request {
            ctx: ctx.clone(),
            inner,
        })
    }

    /// [`Client::new_request`] plus `per_page`/`page` query parameters, each
    /// added only when positive.
    pub fn new_page_request(
        &self,
        ctx: Option<&Context>,
        method: Method,
        path: &str,
        per_page: u32,
        page: u32,
        body: Option<Body>,
    ) -> Result<Request> {
        let mut req = self.new_request(ctx, method, path, body)?;
        if per_page > 0 {
            req.append_query("per_page", &per_page.to_string());
        }
        if page > 0 {
            req.append_query("page", &page.to_string());
        }
        Ok(req)
    }

    /// Builds a streaming `POST` of a local file against the upload base URL.
    ///
    /// The content type is sniffed from the first 512 bytes. The open file
    /// moves into the request body and is closed when the request is
    /// executed or dropped.
    pub async fn new_upload_request(
        &self,
        ctx: Option<&Context>,
        path: &str,
        file: impl AsRef<Path>,
    ) -> Result<Request> {
        let url = self.upload_url.join(path)?;

        let mut f = tokio::fs::File::open(file.as_ref()).await?;
        let size = f.metadata().await?.len();
        let mut head = [0u8; SNIFF_LEN];
        let n = f.read(&mut head).await?;
        if n == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "EOF").into());
        }
        let media_type = detect_content_type(&head[..n]);
        f.seek(SeekFrom::Start(0)).await?;

        let ctx = ctx.ok_or(Error::NilContext)?;

        let mut inner = reqwest::Request::new(Method::POST, url);
        let headers = inner.headers_mut();
        headers.insert(USER_AGENT, self.user_agent.clone());
        headers.insert(ACCEPT, HeaderValue::from_static(MEDIA_TYPE_V3));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(media_type));
        headers.insert(CONTENT_LENGTH, HeaderValue::from(size));
        self.authorize(headers);
        *inner.body_mut() = Some(reqwest::Body::from(f));

        Ok(Request {
            ctx: ctx.clone(),
            inner,
        })
    }

    /// Builds a `GET` against the download base URL. The response is an
    /// opaque byte stream, so no `Accept` or `Content-Type` is sent.
    pub fn new_download_request(&self, ctx: Option<&Context>, path: &str) -> Result<Request> {
        let url = self.download_url.join(path)?;
        let ctx = ctx.ok_or(Error::NilContext)?;

        let mut inner = reqwest::Request::new(Method::GET, url);
        let headers = inner.headers_mut();
        headers.insert(USER_AGENT, self.user_agent.clone());
        self.authorize(headers);

        Ok(Request {
            ctx: ctx.clone(),
            inner,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn client() -> Client {
        Client::new("access-token").unwrap()
    }

    #[test]
    fn new_request_sets_headers() {
        let ctx = Context::background();
        let req = client()
            .new_request(Some(&ctx), Method::GET, "/user", None)
            .unwrap();
        assert_eq!(req.url().as_str(), "https://api.github.com/user");
        assert_eq!(req.headers()[ACCEPT], MEDIA_TYPE_V3);
        assert_eq!(req.headers()[AUTHORIZATION], "token access-token");
        assert!(!req.headers()[USER_AGENT].is_empty());
        assert!(req.headers().get(CONTENT_TYPE).is_none());
        assert!(req.body_bytes().is_none());
    }

    #[test]
    fn anonymous_request_has_no_authorization() {
        let ctx = Context::background();
        let req = Client::new("")
            .unwrap()
            .new_request(Some(&ctx), Method::GET, "/user", None)
            .unwrap();
        assert!(req.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn bodies_set_content_type() {
        let ctx = Context::background();
        let c = client();
        let json = c
            .new_request(
                Some(&ctx),
                Method::POST,
                "/user",
                Some(Body::json(&serde_json::json!({"name": "x"})).unwrap()),
            )
            .unwrap();
        assert_eq!(json.headers()[CONTENT_TYPE], MEDIA_JSON);
        assert_eq!(json.body_bytes(), Some(br#"{"name":"x"}"#.as_slice()));

        let raw = c
            .new_request(Some(&ctx), Method::POST, "/user", Some(Body::Raw(b"request body".to_vec())))
            .unwrap();
        assert_eq!(raw.body_bytes(), Some(b"request body".as_slice()));
    }

    #[test]
    fn preflight_failures() {
        let ctx = Context::background();
        let c = client();

        let err = c
            .new_request(Some(&ctx), Method::GET, "http://[::1", None)
            .unwrap_err();
        assert!(matches!(err, Error::Url(_)));

        let mut unserializable = HashMap::new();
        unserializable.insert((1, 2), 3);
        assert!(matches!(Body::json(&unserializable), Err(Error::Json(_))));

        let err = c.new_request(None, Method::GET, "/user", None).unwrap_err();
        assert!(matches!(err, Error::NilContext));
        assert_eq!(err.to_string(), "nil context");
    }

    #[test]
    fn page_params_only_when_positive() {
        let ctx = Context::background();
        let c = client();
        let req = c
            .new_page_request(Some(&ctx), Method::GET, "/user/repos", 20, 2, None)
            .unwrap();
        assert_eq!(req.url().query(), Some("per_page=20&page=2"));

        let req = c
            .new_page_request(Some(&ctx), Method::GET, "/user/repos", 0, 3, None)
            .unwrap();
        assert_eq!(req.url().query(), Some("page=3"));

        let req = c
            .new_page_request(Some(&ctx), Method::GET, "/user/repos", 0, 0, None)
            .unwrap();
        assert_eq!(req.url().query(), None);

        let err = c
            .new_page_request(None, Method::GET, "/user/repos", 20, 2, None)
            .unwrap_err();
        assert!(matches!(err, Error::NilContext));
    }

    #[test]
    fn download_request_is_bare() {
        let ctx = Context::background();
        let req = client()
            .new_download_request(Some(&ctx), "/octocat/Hello-World/releases/download/v0.1.0/app.zip")
            .unwrap();
        assert_eq!(req.method(), Method::GET);
        assert_eq!(
            req.url().as_str(),
            "https://github.com/octocat/Hello-World/releases/download/v0.1.0/app.zip"
        );
        assert_eq!(req.headers()[AUTHORIZATION], "token access-token");
        assert!(req.headers().get(USER_AGENT).is_some());
        assert!(req.headers().get(ACCEPT).is_none());
        assert!(req.headers().get(CONTENT_TYPE).is_none());

        let err = client().new_download_request(None, "/x").unwrap_err();
        assert!(matches!(err, Error::NilContext));
    }
}
