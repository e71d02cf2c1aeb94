//! Request pipeline for the GitHub REST API v3: request building, the
//! transport executor, response classification and rate bookkeeping.

mod request;
mod response;
pub mod sniff;

pub use request::{Body, Request, MEDIA_JSON, MEDIA_TYPE_V3};
pub use response::{Pages, Response};

use crate::config::Config;
use crate::error::{map_status_to_error, RateLimitError, Result};
use crate::rate::{Epoch, RateGroup, RateTracker};
use log::{debug, warn};
use reqwest::header::HeaderValue;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use url::Url;

pub const PUBLIC_API_URL: &str = "https://api.github.com";
pub const PUBLIC_UPLOAD_URL: &str = "https://uploads.github.com";
pub const PUBLIC_DOWNLOAD_URL: &str = "https://github.com";

/// See <https://docs.github.com/rest/overview/resources-in-the-rest-api#user-agent-required>
pub const DEFAULT_USER_AGENT: &str = concat!("github-rest/", env!("CARGO_PKG_VERSION"));

/// A value a JSON response body can be decoded into.
pub trait JsonSink {
    fn decode_json(&mut self, body: &[u8]) -> serde_json::Result<()>;
}

impl<T: DeserializeOwned> JsonSink for T {
    fn decode_json(&mut self, body: &[u8]) -> serde_json::Result<()> {
        *self = serde_json::from_slice(body)?;
        Ok(())
    }
}

/// Where a successful response body goes.
pub enum Sink<'a> {
    /// Read and dropped.
    Discard,
    /// JSON-decoded in place. An empty body leaves the target untouched.
    Json(&'a mut (dyn JsonSink + Send)),
    /// Copied verbatim.
    Raw(&'a mut (dyn AsyncWrite + Send + Unpin)),
}

/// Client for GitHub API v3. Cloning shares the rate tracker.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    rates: Arc<RateTracker>,
    pub(crate) api_url: Url,
    pub(crate) upload_url: Url,
    pub(crate) download_url: Url,
    pub(crate) user_agent: HeaderValue,
    pub(crate) authorization: Option<HeaderValue>,
}

pub fn build_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().use_rustls_tls().build()
}

fn is_success(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT
    )
}

impl Client {
    /// Client for public GitHub. An empty token makes anonymous calls.
    pub fn new(access_token: &str) -> Result<Self> {
        Self::from_config(&Config {
            access_token: access_token.to_string(),
            ..Config::default()
        })
    }

    /// Client for a GitHub Enterprise deployment.
    pub fn enterprise(
        api_url: &str,
        upload_url: &str,
        download_url: &str,
        access_token: &str,
    ) -> Result<Self> {
        Self::from_config(&Config {
            access_token: access_token.to_string(),
            api_url: api_url.to_string(),
            upload_url: upload_url.to_string(),
            download_url: download_url.to_string(),
            ..Config::default()
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let api_url = Url::parse(&cfg.api_url)?;
        let upload_url = Url::parse(&cfg.upload_url)?;
        let download_url = Url::parse(&cfg.download_url)?;

        let user_agent = HeaderValue::from_str(&cfg.user_agent)?;
        let authorization = match cfg.access_token.as_str() {
            "" => None,
            token => {
                let mut value = HeaderValue::from_str(&format!("token {}", token))?;
                value.set_sensitive(true);
                Some(value)
            }
        };

        Ok(Self {
            http: build_client()?,
            rates: Arc::new(RateTracker::new()),
            api_url,
            upload_url,
            download_url,
            user_agent,
            authorization,
        })
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    pub fn upload_url(&self) -> &Url {
        &self.upload_url
    }

    pub fn download_url(&self) -> &Url {
        &self.download_url
    }

    pub fn rate_tracker(&self) -> &RateTracker {
        &self.rates
    }

    /// Executes `req` and returns the response envelope.
    ///
    /// A call whose rate group is known to be exhausted fails with
    /// [`crate::Error::RateLimit`] without touching the network. Otherwise the
    /// tracker is refreshed from the response headers, non-success statuses
    /// are mapped to typed errors, and the body is drained into `sink`.
    /// The whole exchange is abandoned as soon as the request's context is
    /// done. Nothing is retried.
    pub async fn execute(&self, req: Request, sink: Sink<'_>) -> Result<Response> {
        let Request { ctx, inner } = req;
        let method = inner.method().clone();
        let path = inner.url().path().to_string();
        let group = RateGroup::from_path(&path);

        if let Some(rate) = self.rates.blocking(group, Epoch::now()) {
            warn!(
                "{} {}: {} rate limit exhausted until {}",
                method, path, group, rate.reset
            );
            return Err(RateLimitError {
                err: None,
                method,
                path,
                rate,
            }
            .into());
        }

        if let Some(err) = ctx.err() {
            return Err(err);
        }

        tokio::select! {
            biased;
            err = ctx.done() => Err(err),
            res = self.round_trip(inner, group, &method, &path, sink) => res,
        }
    }

    async fn round_trip(
        &self,
        req: reqwest::Request,
        group: RateGroup,
        method: &Method,
        path: &str,
        sink: Sink<'_>,
    ) -> Result<Response> {
        debug!("{} {}", method, req.url());
        let res = self.http.execute(req).await?;

        let status = res.status();
        let envelope = Response::classify(status, res.headers(), res.url());
        self.rates.update(group, envelope.rate);

        if !is_success(status) {
            // Best effort: an unreadable body just leaves the message empty.
            let body = res.bytes().await.unwrap_or_default();
            return Err(map_status_to_error(
                method,
                path,
                status,
                &envelope.headers,
                &body,
                envelope.rate,
            ));
        }

        read_body(res, sink).await?;
        Ok(envelope)
    }
}

/// Drains the response body into `sink`. The response is consumed, so the
/// connection goes back to the pool on every path.
async fn read_body(mut res: reqwest::Response, sink: Sink<'_>) -> Result<()> {
    match sink {
        Sink::Discard => {
            let _ = res.bytes().await;
        }
        Sink::Json(target) => {
            let body = res.bytes().await?;
            if !body.iter().all(u8::is_ascii_whitespace) {
                target.decode_json(&body)?;
            }
        }
        Sink::Raw(writer) => {
            while let Some(chunk) = res.chunk().await? {
                writer.write_all(&chunk).await?;
            }
            writer.flush().await?;
        }
    }
    Ok(())
}
