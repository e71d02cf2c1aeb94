use chrono::{DateTime, Local, Utc};
use log::debug;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

pub(crate) const HEADER_RATE_LIMIT: &str = "x-ratelimit-limit";
pub(crate) const HEADER_RATE_USED: &str = "x-ratelimit-used";
pub(crate) const HEADER_RATE_REMAINING: &str = "x-ratelimit-remaining";
pub(crate) const HEADER_RATE_RESET: &str = "x-ratelimit-reset";

/// Unix timestamp in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Epoch(pub i64);

impl Epoch {
    pub fn now() -> Self {
        Epoch(Utc::now().timestamp())
    }

    pub fn to_utc(self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp(self.0, 0)
    }
}

/// Renders the wall-clock time of day in the local time zone, `HH:MM:SS`.
impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_utc() {
            Some(t) => write!(f, "{}", t.with_timezone(&Local).format("%H:%M:%S")),
            None => write!(f, "{}", self.0),
        }
    }
}

/// Last observed quota for one rate group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rate {
    /// Requests allowed per window.
    pub limit: u32,
    /// Requests used in the current window.
    #[serde(default)]
    pub used: u32,
    /// Requests remaining in the current window.
    pub remaining: u32,
    /// When the current window resets.
    pub reset: Epoch,
}

impl Rate {
    /// Best-effort parse of the `X-RateLimit-*` headers. Missing or
    /// non-numeric values leave the field at zero.
    pub fn from_headers(headers: &HeaderMap) -> Rate {
        Rate {
            limit: header_number(headers, HEADER_RATE_LIMIT).unwrap_or(0),
            used: header_number(headers, HEADER_RATE_USED).unwrap_or(0),
            remaining: header_number(headers, HEADER_RATE_REMAINING).unwrap_or(0),
            reset: Epoch(header_number(headers, HEADER_RATE_RESET).unwrap_or(0)),
        }
    }

    /// True when the quota is spent and the window has not reset yet.
    pub fn is_exhausted_at(&self, now: Epoch) -> bool {
        self.remaining == 0 && now < self.reset
    }
}

fn header_number<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<T>().ok())
}

/// Quota bucket a request path is charged against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateGroup {
    Core,
    Search,
    Graphql,
}

impl RateGroup {
    pub fn from_path(path: &str) -> RateGroup {
        if path.starts_with("/search") {
            RateGroup::Search
        } else if path.starts_with("/graphql") {
            RateGroup::Graphql
        } else {
            RateGroup::Core
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RateGroup::Core => "core",
            RateGroup::Search => "search",
            RateGroup::Graphql => "graphql",
        }
    }
}

impl fmt::Display for RateGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-client cache of the last quota seen for each rate group.
///
/// The lock is only held for a single read or write, never across a
/// network call.
#[derive(Debug, Default)]
pub struct RateTracker {
    rates: Mutex<HashMap<RateGroup, Rate>>,
}

impl RateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&self, group: RateGroup) -> Option<Rate> {
        let rates = self.rates.lock().unwrap_or_else(PoisonError::into_inner);
        rates.get(&group).copied()
    }

    pub fn update(&self, group: RateGroup, rate: Rate) {
        debug!(
            "rate {}: {}/{} remaining, resets at {}",
            group, rate.remaining, rate.limit, rate.reset.0
        );
        let mut rates = self.rates.lock().unwrap_or_else(PoisonError::into_inner);
        rates.insert(group, rate);
    }

    /// The cached rate when it guarantees the next call in `group` would be
    /// rejected by the server.
    pub fn blocking(&self, group: RateGroup, now: Epoch) -> Option<Rate> {
        self.check(group).filter(|rate| rate.is_exhausted_at(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_group_from_path_prefix() {
        assert_eq!(RateGroup::from_path("/search/repositories"), RateGroup::Search);
        assert_eq!(RateGroup::from_path("/graphql"), RateGroup::Graphql);
        assert_eq!(RateGroup::from_path("/user"), RateGroup::Core);
        assert_eq!(RateGroup::from_path("/repos/o/search"), RateGroup::Core);
    }

    #[test]
    fn rate_headers_best_effort() {
        let mut h = HeaderMap::new();
        h.insert("x-ratelimit-limit", "5000".parse().unwrap());
        h.insert("x-ratelimit-used", "abc".parse().unwrap());
        h.insert("x-ratelimit-remaining", "4990".parse().unwrap());
        let rate = Rate::from_headers(&h);
        assert_eq!(
            rate,
            Rate {
                limit: 5000,
                used: 0,
                remaining: 4990,
                reset: Epoch(0),
            }
        );
        assert_eq!(Rate::from_headers(&HeaderMap::new()), Rate::default());
    }

    #[test]
    fn tracker_blocks_only_exhausted_future_windows() {
        let tracker = RateTracker::new();
        let now = Epoch(1_000);
        assert!(tracker.blocking(RateGroup::Core, now).is_none());

        let exhausted = Rate {
            limit: 60,
            used: 60,
            remaining: 0,
            reset: Epoch(2_000),
        };
        tracker.update(RateGroup::Core, exhausted);
        assert_eq!(tracker.blocking(RateGroup::Core, now), Some(exhausted));
        assert!(tracker.blocking(RateGroup::Search, now).is_none());
        // Past the reset time the server is authoritative again.
        assert!(tracker.blocking(RateGroup::Core, Epoch(2_000)).is_none());

        tracker.update(
            RateGroup::Core,
            Rate {
                remaining: 1,
                ..exhausted
            },
        );
        assert!(tracker.blocking(RateGroup::Core, now).is_none());
    }
}
