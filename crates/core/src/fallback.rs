//! Synthesized responses returned when neither cache nor network can answer.
//!
//! The offline page has no external references (the logo would itself need
//! the network), so it renders from this single response.

use crate::request::Response;

pub const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";
pub const TEXT_HTML_UTF8: &str = "text/html; charset=utf-8";

/// Body of the network-first fallback ("offline - no network connection").
pub const OFFLINE_MESSAGE: &str = "অফলাইন - নেটওয়ার্ক সংযোগ নেই";

/// Body of the cache-first fallback ("resource not found").
pub const NOT_FOUND_MESSAGE: &str = "রিসোর্স পাওয়া যায়নি";

const OFFLINE_PAGE: &str = include_str!("../assets/offline.html");

/// 503 returned by network-first when the network fails and nothing is cached.
pub fn offline_unavailable() -> Response {
    Response::new(503, "Service Unavailable", OFFLINE_MESSAGE).with_header("Content-Type", TEXT_PLAIN_UTF8)
}

/// 404 returned by cache-first when the cache misses and the network fails.
pub fn not_found() -> Response {
    Response::new(404, "Not Found", NOT_FOUND_MESSAGE).with_header("Content-Type", TEXT_PLAIN_UTF8)
}

/// Offline document returned by stale-while-revalidate on total failure.
pub fn offline_page() -> Response {
    Response::new(200, "OK", OFFLINE_PAGE).with_header("Content-Type", TEXT_HTML_UTF8)
}
