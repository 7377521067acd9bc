//! Cookie-backed session value threaded through every portal call.

use std::fmt;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderValue, SET_COOKIE};
use url::Url;

/// Cookies plus the "handshake completed" flag for one scrape run.
///
/// Cookies are keyed by (domain, path, name) inside the jar. The value lives
/// for one run and is never persisted. Only the bootstrapper and the page
/// fetcher take it mutably.
///
/// Cookie values are redacted in Debug output.
#[derive(Default)]
pub struct SessionState {
    jar: Jar,
    established: bool,
}

impl SessionState {
    /// Creates an empty, not-yet-established session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once the full handshake has succeeded and no keep-alive
    /// has reported the session as rejected since.
    #[must_use]
    pub fn is_established(&self) -> bool {
        self.established
    }

    pub(crate) fn mark_established(&mut self) {
        self.established = true;
    }

    pub(crate) fn mark_expired(&mut self) {
        self.established = false;
    }

    /// Returns the `Cookie` header value that applies to `url`, if any.
    ///
    /// The value is sensitive; avoid logging it.
    #[must_use]
    pub fn cookie_header(&self, url: &Url) -> Option<HeaderValue> {
        self.jar.cookies(url)
    }

    /// Returns true when a cookie named `name` would be sent to `url`.
    #[must_use]
    pub fn has_cookie(&self, url: &Url, name: &str) -> bool {
        self.cookie_header(url)
            .and_then(|value| value.to_str().ok().map(str::to_owned))
            .is_some_and(|header| {
                header
                    .split(';')
                    .filter_map(|pair| pair.trim().split_once('='))
                    .any(|(cookie_name, _)| cookie_name == name)
            })
    }

    /// Records every `Set-Cookie` header of a response received from `url`.
    pub(crate) fn store_response_cookies(&mut self, headers: &HeaderMap, url: &Url) {
        let mut set_cookies = headers.get_all(SET_COOKIE).iter();
        self.jar.set_cookies(&mut set_cookies, url);
    }

    /// Adds a single `name=value; attributes` cookie string scoped to `url`.
    pub fn add_cookie_str(&mut self, cookie: &str, url: &Url) {
        self.jar.add_cookie_str(cookie, url);
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("established", &self.established)
            .field("cookies", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn portal() -> Url {
        Url::parse("https://records.example.gov/web/user/disclaimer").unwrap()
    }

    #[test]
    fn test_new_session_is_not_established_and_empty() {
        let session = SessionState::new();
        assert!(!session.is_established());
        assert!(session.cookie_header(&portal()).is_none());
        assert!(!session.has_cookie(&portal(), "JSESSIONID"));
    }

    #[test]
    fn test_store_response_cookies_from_set_cookie_headers() {
        let mut session = SessionState::new();
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("JSESSIONID=ABC123; Path=/"));
        headers.append(
            SET_COOKIE,
            HeaderValue::from_static("disclaimerAccepted=true; Path=/web"),
        );
        session.store_response_cookies(&headers, &portal());

        assert!(session.has_cookie(&portal(), "JSESSIONID"));
        assert!(session.has_cookie(&portal(), "disclaimerAccepted"));
    }

    #[test]
    fn test_has_cookie_respects_path_scope() {
        let mut session = SessionState::new();
        let web = Url::parse("https://records.example.gov/web/search").unwrap();
        let other = Url::parse("https://records.example.gov/static/app.js").unwrap();
        session.add_cookie_str("disclaimerAccepted=true; Path=/web", &web);

        assert!(session.has_cookie(&web, "disclaimerAccepted"));
        assert!(!session.has_cookie(&other, "disclaimerAccepted"));
    }

    #[test]
    fn test_has_cookie_does_not_match_name_prefix() {
        let mut session = SessionState::new();
        session.add_cookie_str("JSESSIONID_OLD=1; Path=/", &portal());
        assert!(!session.has_cookie(&portal(), "JSESSIONID"));
    }

    #[test]
    fn test_established_flag_transitions() {
        let mut session = SessionState::new();
        session.mark_established();
        assert!(session.is_established());
        session.mark_expired();
        assert!(!session.is_established());
    }

    #[test]
    fn test_debug_output_redacts_cookie_values() {
        let mut session = SessionState::new();
        session.add_cookie_str("JSESSIONID=SECRET-VALUE; Path=/", &portal());
        let debug = format!("{session:?}");
        assert!(!debug.contains("SECRET-VALUE"), "cookie leaked: {debug}");
        assert!(debug.contains("[REDACTED]"));
    }
}
