use crate::rate::Rate;
use reqwest::header::{HeaderMap, LINK};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

/// Page numbers advertised by a `Link` header; zero means no such link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pages {
    pub first: u32,
    pub prev: u32,
    pub next: u32,
    pub last: u32,
}

impl Pages {
    pub fn from_headers(headers: &HeaderMap) -> Pages {
        headers
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .map(Pages::from_link)
            .unwrap_or_default()
    }

    /// Parses an RFC 5988 `Link` value such as
    /// `<https://api.github.com/x?page=2>; rel="next", <...?page=5>; rel="last"`.
    /// Entries that do not parse, or carry no `page` parameter, are skipped.
    pub fn from_link(link: &str) -> Pages {
        let mut pages = Pages::default();
        for (target, params) in link_entries(link) {
            let Some(page) = page_param(target) else {
                continue;
            };
            for rel in rel_values(params) {
                match rel {
                    "first" => pages.first = page,
                    "prev" => pages.prev = page,
                    "next" => pages.next = page,
                    "last" => pages.last = page,
                    _ => {}
                }
            }
        }
        pages
    }

    pub fn has_next(&self) -> bool {
        self.next > 0
    }
}

/// Splits a `Link` value into `(target, params)` pairs.
fn link_entries(link: &str) -> impl Iterator<Item = (&str, &str)> {
    let mut rest = link;
    std::iter::from_fn(move || {
        let start = rest.find('<')?;
        let end = start + rest[start..].find('>')?;
        let target = &rest[start + 1..end];
        let tail = &rest[end + 1..];
        let next = tail.find('<').unwrap_or(tail.len());
        let params = tail[..next].trim().trim_end_matches(',');
        rest = &tail[next..];
        Some((target, params))
    })
}

fn rel_values(params: &str) -> impl Iterator<Item = &str> {
    params
        .split(';')
        .filter_map(|param| {
            let (key, value) = param.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("rel")
                .then(|| value.trim().trim_matches('"'))
        })
        .flat_map(str::split_whitespace)
}

fn page_param(target: &str) -> Option<u32> {
    // Relative targets resolve against a placeholder; only the query matters.
    let base = Url::parse("http://link.invalid/").ok()?;
    let url = base.join(target).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse().ok())
}

/// Envelope around a completed HTTP exchange. The body has already been
/// consumed by the executor; only metadata is kept.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub url: Url,
    pub pages: Pages,
    pub rate: Rate,
}

impl Response {
    pub fn classify(status: StatusCode, headers: &HeaderMap, url: &Url) -> Response {
        Response {
            status,
            headers: headers.clone(),
            url: url.clone(),
            pages: Pages::from_headers(headers),
            rate: Rate::from_headers(headers),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_RELS: [&str; 4] = [
        r#"<https://api.github.com/repositories/100/issues?page=1>; rel="first""#,
        r#"<https://api.github.com/repositories/100/issues?page=2>; rel="prev""#,
        r#"<https://api.github.com/repositories/100/issues?page=4>; rel="next""#,
        r#"<https://api.github.com/repositories/100/issues?page=6>; rel="last""#,
    ];

    fn expected() -> Pages {
        Pages {
            first: 1,
            prev: 2,
            next: 4,
            last: 6,
        }
    }

    #[test]
    fn link_order_does_not_matter() {
        let orders: [[usize; 4]; 4] = [[0, 1, 2, 3], [2, 3, 0, 1], [3, 2, 1, 0], [1, 3, 2, 0]];
        for order in orders {
            let link = order.iter().map(|i| ALL_RELS[*i]).collect::<Vec<_>>().join(", ");
            assert_eq!(Pages::from_link(&link), expected(), "link: {link}");
            // Parsing twice yields the same result.
            assert_eq!(Pages::from_link(&link), Pages::from_link(&link));
        }
    }

    #[test]
    fn missing_relations_stay_zero() {
        let pages = Pages::from_link(
            r#"<https://api.github.com/user/repos?per_page=50&page=3>; rel="next""#,
        );
        assert_eq!(
            pages,
            Pages {
                next: 3,
                ..Pages::default()
            }
        );
        assert!(pages.has_next());
    }

    #[test]
    fn per_page_is_not_mistaken_for_page() {
        let pages = Pages::from_link(
            r#"<https://api.github.com/user/repos?page=2&per_page=50>; rel="next""#,
        );
        assert_eq!(pages.next, 2);
    }

    #[test]
    fn malformed_entries_are_ignored() {
        assert_eq!(Pages::from_link(""), Pages::default());
        assert_eq!(Pages::from_link("garbage"), Pages::default());
        assert_eq!(
            Pages::from_link(r#"<https://x/y?page=abc>; rel="next", <https://x/y?page=9; rel="last""#),
            Pages::default()
        );
        let pages = Pages::from_link(r#"<https://x/y>; rel="next", <https://x/y?page=7>; rel="last""#);
        assert_eq!(pages.next, 0);
        assert_eq!(pages.last, 7);
    }

    #[test]
    fn classify_reads_link_and_rate_headers() {
        let mut h = HeaderMap::new();
        h.insert(LINK, ALL_RELS.join(", ").parse().unwrap());
        h.insert("x-ratelimit-limit", "5000".parse().unwrap());
        h.insert("x-ratelimit-used", "10".parse().unwrap());
        h.insert("x-ratelimit-remaining", "4990".parse().unwrap());
        h.insert("x-ratelimit-reset", "1605083281".parse().unwrap());
        let url = Url::parse("https://api.github.com/user").unwrap();
        let resp = Response::classify(StatusCode::OK, &h, &url);
        assert_eq!(resp.pages, expected());
        assert_eq!(resp.rate.limit, 5000);
        assert_eq!(resp.rate.used, 10);
        assert_eq!(resp.rate.remaining, 4990);
        assert_eq!(resp.rate.reset.0, 1605083281);
    }
}
