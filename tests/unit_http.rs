use github_rest::error::map_status_to_error;
use github_rest::http::sniff::{detect_content_type, OCTET_STREAM};
use github_rest::{Epoch, Error, Pages, Rate, RateGroup, RateTracker};
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};

#[test]
fn rest_rate_headers() {
    let mut h = HeaderMap::new();
    h.insert("x-ratelimit-limit", "5000".parse().unwrap());
    h.insert("x-ratelimit-remaining", "4999".parse().unwrap());
    h.insert("x-ratelimit-used", "1".parse().unwrap());
    h.insert("x-ratelimit-reset", "0".parse().unwrap());
    let rate = Rate::from_headers(&h);
    assert_eq!(rate.limit, 5000);
    assert_eq!(rate.remaining, 4999);
    assert_eq!(rate.used, 1);
    assert_eq!(rate.reset, Epoch(0));
}

#[test]
fn rate_groups_by_path_prefix() {
    assert_eq!(RateGroup::from_path("/search/code"), RateGroup::Search);
    assert_eq!(RateGroup::from_path("/graphql"), RateGroup::Graphql);
    assert_eq!(RateGroup::from_path("/repos/o/r/commits"), RateGroup::Core);
}

#[test]
fn tracker_blocks_until_reset() {
    let tracker = RateTracker::new();
    let rate = Rate {
        limit: 60,
        used: 60,
        remaining: 0,
        reset: Epoch(1_000),
    };
    tracker.update(RateGroup::Core, rate);
    assert_eq!(tracker.blocking(RateGroup::Core, Epoch(999)), Some(rate));
    assert_eq!(tracker.blocking(RateGroup::Core, Epoch(1_001)), None);
    assert_eq!(tracker.blocking(RateGroup::Search, Epoch(999)), None);
}

#[test]
fn link_header_pages() {
    let pages = Pages::from_link(
        "<https://api.github.com/user/repos?per_page=100&page=3>; rel=\"next\", \
         <https://api.github.com/user/repos?per_page=100&page=9>; rel=\"last\"",
    );
    assert_eq!(pages.next, 3);
    assert_eq!(pages.last, 9);
    assert_eq!(pages.prev, 0);
    assert!(pages.has_next());
}

#[test]
fn status_error_mapping() {
    let mut h = HeaderMap::new();
    h.insert("x-ratelimit-remaining", "0".parse().unwrap());
    let e = map_status_to_error(
        &Method::GET,
        "/user",
        StatusCode::FORBIDDEN,
        &h,
        br#"{"message":"API rate limit exceeded"}"#,
        Rate::from_headers(&h),
    );
    assert!(matches!(e, Error::RateLimit(_)));
    assert_eq!(e.status(), Some(StatusCode::FORBIDDEN));

    let e = map_status_to_error(
        &Method::POST,
        "/user",
        StatusCode::UNPROCESSABLE_ENTITY,
        &HeaderMap::new(),
        b"<html>not json</html>",
        Rate::default(),
    );
    assert_eq!(e.to_string(), "POST /user: 422 ");
}

#[test]
fn upload_content_sniffing() {
    assert_eq!(detect_content_type(b"\x89PNG\r\n\x1a\n...."), "image/png");
    assert_eq!(detect_content_type(b"plain words"), "text/plain; charset=utf-8");
    assert_eq!(detect_content_type(b"\x02\x03opaque"), OCTET_STREAM);
}
