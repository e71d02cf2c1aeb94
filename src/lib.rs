//! Typed client for the GitHub REST API v3.
//!
//! ```no_run
//! # async fn run() -> github_rest::Result<()> {
//! use github_rest::{Client, Context};
//!
//! let client = Client::new("access-token")?;
//! let ctx = Context::background();
//! let (commits, resp) = client.repo("octocat", "Hello-World").commits(&ctx, 50, 1).await?;
//! println!("{} commits, next page {}", commits.len(), resp.pages.next);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod rate;
pub mod repo;
pub mod scope;
pub mod types;
pub mod users;

pub use config::Config;
pub use context::Context;
pub use error::{
    AuthError, Error, NotFoundError, RateLimitAbuseError, RateLimitError, ResponseError, Result,
};
pub use http::{Body, Client, JsonSink, Pages, Request, Response, Sink};
pub use rate::{Epoch, Rate, RateGroup, RateTracker};
pub use repo::{IssuesParams, PullsParams, RepoService};
pub use scope::Scope;
pub use users::UsersService;
