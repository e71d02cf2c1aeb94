//! Typed errors for GitHub API calls and the status-to-error mapping.

use crate::rate::{Rate, HEADER_RATE_REMAINING};
use crate::scope::Scope;
use log::warn;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Documentation anchors GitHub links from abuse (secondary) rate limit responses.
const ABUSE_MARKERS: [&str; 2] = ["#abuse-rate-limits", "#secondary-rate-limits"];

#[derive(Debug, Error)]
pub enum Error {
    #[error("nil context")]
    NilContext,
    #[error("context canceled")]
    Canceled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
    #[error(transparent)]
    Url(#[from] url::ParseError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Response(#[from] ResponseError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    RateLimit(#[from] RateLimitError),
    #[error(transparent)]
    RateLimitAbuse(#[from] RateLimitAbuseError),
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    #[error("access token does not have the scope: {0}")]
    MissingScope(Scope),
}

impl Error {
    /// The generic server error underneath any of the typed server errors.
    pub fn response(&self) -> Option<&ResponseError> {
        match self {
            Error::Response(e) => Some(e),
            Error::Auth(e) => e.response(),
            Error::RateLimit(e) => e.response(),
            Error::RateLimitAbuse(e) => e.response(),
            Error::NotFound(e) => e.response(),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.response().map(|e| e.status)
    }
}

/// Generic error for a non-success response.
/// See <https://docs.github.com/rest/overview/resources-in-the-rest-api#client-errors>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseError {
    pub method: Method,
    pub path: String,
    pub status: StatusCode,
    pub message: String,
    pub documentation_url: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    documentation_url: Option<String>,
}

impl ResponseError {
    /// Builds the error from a response body; a body that is not the usual
    /// `{message, documentation_url}` document leaves both fields empty.
    pub fn from_body(method: Method, path: impl Into<String>, status: StatusCode, body: &[u8]) -> Self {
        let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();
        Self {
            method,
            path: path.into(),
            status,
            message: parsed.message.unwrap_or_default(),
            documentation_url: parsed.documentation_url.unwrap_or_default(),
        }
    }
}

impl fmt::Display for ResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {} {}",
            self.method,
            self.path,
            self.status.as_u16(),
            self.message
        )
    }
}

impl std::error::Error for ResponseError {}

fn source_of(err: &Option<Box<ResponseError>>) -> Option<&(dyn std::error::Error + 'static)> {
    err.as_deref().map(|e| e as &(dyn std::error::Error + 'static))
}

/// Authentication failed (401).
#[derive(Debug, Clone, Default)]
pub struct AuthError {
    pub err: Option<Box<ResponseError>>,
}

impl AuthError {
    pub fn response(&self) -> Option<&ResponseError> {
        self.err.as_deref()
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.err {
            Some(e) => fmt::Display::fmt(e, f),
            None => f.write_str("requires authentication"),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        source_of(&self.err)
    }
}

/// No calls left in the current window for the rate group.
/// See <https://docs.github.com/rest/overview/resources-in-the-rest-api#rate-limiting>
#[derive(Debug, Clone)]
pub struct RateLimitError {
    pub err: Option<Box<ResponseError>>,
    pub method: Method,
    pub path: String,
    pub rate: Rate,
}

impl RateLimitError {
    pub fn response(&self) -> Option<&ResponseError> {
        self.err.as_deref()
    }
}

impl fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: rate limit {} used: rate limit will reset at {}",
            self.method, self.path, self.rate.limit, self.rate.reset
        )
    }
}

impl std::error::Error for RateLimitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        source_of(&self.err)
    }
}

/// Secondary (abuse) rate limit triggered.
/// See <https://docs.github.com/rest/overview/resources-in-the-rest-api#secondary-rate-limits>
#[derive(Debug, Clone, Default)]
pub struct RateLimitAbuseError {
    pub err: Option<Box<ResponseError>>,
    pub rate: Rate,
    pub retry_after: Duration,
}

impl RateLimitAbuseError {
    pub fn response(&self) -> Option<&ResponseError> {
        self.err.as_deref()
    }
}

impl fmt::Display for RateLimitAbuseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.err {
            Some(e) => fmt::Display::fmt(e, f),
            None => f.write_str("rate limit is abused"),
        }
    }
}

impl std::error::Error for RateLimitAbuseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        source_of(&self.err)
    }
}

#[derive(Debug, Clone, Default)]
pub struct NotFoundError {
    pub err: Option<Box<ResponseError>>,
}

impl NotFoundError {
    pub fn response(&self) -> Option<&ResponseError> {
        self.err.as_deref()
    }
}

impl fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.err {
            Some(e) => fmt::Display::fmt(e, f),
            None => f.write_str("resource not found"),
        }
    }
}

impl std::error::Error for NotFoundError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        source_of(&self.err)
    }
}

/// Maps a non-success response onto the typed error taxonomy.
///
/// `rate` is the quota classified from this same response.
pub fn map_status_to_error(
    method: &Method,
    path: &str,
    status: StatusCode,
    headers: &HeaderMap,
    body: &[u8],
    rate: Rate,
) -> Error {
    let resp_err = ResponseError::from_body(method.clone(), path, status, body);
    warn!("{}", resp_err);

    match status {
        StatusCode::UNAUTHORIZED => AuthError {
            err: Some(Box::new(resp_err)),
        }
        .into(),
        StatusCode::FORBIDDEN if rate_remaining_is_zero(headers) => RateLimitError {
            err: Some(Box::new(resp_err)),
            method: method.clone(),
            path: path.to_string(),
            rate,
        }
        .into(),
        StatusCode::FORBIDDEN if is_abuse(&resp_err) => RateLimitAbuseError {
            err: Some(Box::new(resp_err)),
            rate,
            retry_after: retry_after(headers),
        }
        .into(),
        StatusCode::NOT_FOUND => NotFoundError {
            err: Some(Box::new(resp_err)),
        }
        .into(),
        _ => Error::Response(resp_err),
    }
}

fn rate_remaining_is_zero(headers: &HeaderMap) -> bool {
    headers
        .get(HEADER_RATE_REMAINING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "0")
}

fn is_abuse(err: &ResponseError) -> bool {
    ABUSE_MARKERS
        .iter()
        .any(|marker| err.documentation_url.ends_with(marker))
}

/// `Retry-After` in seconds; anything else reads as zero.
fn retry_after(headers: &HeaderMap) -> Duration {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate::Epoch;
    use std::error::Error as _;

    fn response_error(method: Method, path: &str, status: u16, message: &str) -> ResponseError {
        ResponseError {
            method,
            path: path.into(),
            status: StatusCode::from_u16(status).unwrap(),
            message: message.into(),
            documentation_url: String::new(),
        }
    }

    #[test]
    fn response_error_display() {
        let e = response_error(Method::PATCH, "/user", 400, "Problems parsing JSON");
        assert_eq!(e.to_string(), "PATCH /user: 400 Problems parsing JSON");
    }

    #[test]
    fn wrapped_errors_display_and_source() {
        assert_eq!(AuthError::default().to_string(), "requires authentication");
        assert_eq!(NotFoundError::default().to_string(), "resource not found");
        assert_eq!(RateLimitAbuseError::default().to_string(), "rate limit is abused");

        let inner = response_error(Method::GET, "/user", 401, "Requires authentication");
        let auth = AuthError {
            err: Some(Box::new(inner.clone())),
        };
        assert_eq!(auth.to_string(), "GET /user: 401 Requires authentication");
        assert_eq!(auth.response(), Some(&inner));
        assert_eq!(
            auth.source().map(|s| s.to_string()),
            Some("GET /user: 401 Requires authentication".to_string())
        );
    }

    #[test]
    fn rate_limit_error_display() {
        let e = RateLimitError {
            err: None,
            method: Method::GET,
            path: "/user".into(),
            rate: Rate {
                limit: 5000,
                used: 5000,
                remaining: 0,
                reset: Epoch(1605125898),
            },
        };
        assert_eq!(
            e.to_string(),
            format!(
                "GET /user: rate limit 5000 used: rate limit will reset at {}",
                Epoch(1605125898)
            )
        );
        assert!(e.source().is_none());
    }

    #[test]
    fn error_mapping_matrix() {
        let body = br#"{"message":"m","documentation_url":"https://docs.github.com/rest"}"#;
        let none = HeaderMap::new();
        let map = |status: u16, headers: &HeaderMap, body: &[u8]| {
            map_status_to_error(
                &Method::GET,
                "/user",
                StatusCode::from_u16(status).unwrap(),
                headers,
                body,
                Rate::default(),
            )
        };

        assert!(matches!(map(400, &none, body), Error::Response(_)));
        assert!(matches!(map(401, &none, body), Error::Auth(_)));
        assert!(matches!(map(404, &none, body), Error::NotFound(_)));
        assert!(matches!(map(422, &none, body), Error::Response(_)));
        assert!(matches!(map(500, &none, b"oops"), Error::Response(_)));
        // A plain 403 falls back to the generic error.
        assert!(matches!(map(403, &none, body), Error::Response(_)));

        let mut exhausted = HeaderMap::new();
        exhausted.insert("x-ratelimit-remaining", "0".parse().unwrap());
        assert!(matches!(map(403, &exhausted, body), Error::RateLimit(_)));

        let mut retry = HeaderMap::new();
        retry.insert("retry-after", "30".parse().unwrap());
        let abuse = br#"{"message":"slow down","documentation_url":"https://developer.github.com/v3/#abuse-rate-limits"}"#;
        match map(403, &retry, abuse) {
            Error::RateLimitAbuse(e) => {
                assert_eq!(e.retry_after, Duration::from_secs(30));
                assert_eq!(e.to_string(), "GET /user: 403 slow down");
            }
            other => panic!("unexpected {other:?}"),
        }
        let secondary = br#"{"documentation_url":"https://docs.github.com/rest#secondary-rate-limits"}"#;
        match map(403, &none, secondary) {
            Error::RateLimitAbuse(e) => assert_eq!(e.retry_after, Duration::ZERO),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unparseable_body_leaves_fields_empty() {
        let e = ResponseError::from_body(
            Method::GET,
            "/user",
            StatusCode::INTERNAL_SERVER_ERROR,
            b"Internal server error",
        );
        assert_eq!(e.message, "");
        assert_eq!(e.documentation_url, "");
        assert_eq!(e.to_string(), "GET /user: 500 ");
    }

    #[test]
    fn unwrap_chain_reaches_response_error() {
        let err = map_status_to_error(
            &Method::GET,
            "/users/octocat",
            StatusCode::NOT_FOUND,
            &HeaderMap::new(),
            br#"{"message":"Not Found"}"#,
            Rate::default(),
        );
        assert_eq!(err.to_string(), "GET /users/octocat: 404 Not Found");
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(err.response().map(|e| e.message.as_str()), Some("Not Found"));
    }
}
