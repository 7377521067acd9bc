//! HTTP client wrapper that speaks the portal's three request dialects.
//!
//! - Navigation GET: what a browser sends when the user opens a page.
//! - AJAX GET/POST: XHR-marked requests with a cache-busting `_` parameter.
//! - Form POST: the url-encoded search submission.
//!
//! Cookies are not kept inside the reqwest client. Every request reads them
//! from, and writes `Set-Cookie` responses back into, the caller's
//! [`SessionState`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, CONTENT_TYPE, COOKIE, HeaderMap, HeaderValue, ORIGIN,
    PRAGMA, REFERER, UPGRADE_INSECURE_REQUESTS,
};
use reqwest::{Client, RequestBuilder, StatusCode, redirect};
use tracing::{debug, instrument};
use url::Url;

use super::endpoints::PortalEndpoints;
use super::error::PortalError;
use crate::session::SessionState;
use crate::user_agent::{ACCEPT_LANGUAGE as BROWSER_ACCEPT_LANGUAGE, BROWSER_USER_AGENT, NAVIGATION_ACCEPT};

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on the TCP connect phase, independent of the request timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

const X_REQUESTED_WITH: &str = "X-Requested-With";
const XML_HTTP_REQUEST: &str = "XMLHttpRequest";
const AJAX_REQUEST_HEADER: &str = "ajaxRequest";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";

/// Name of the cache-busting query parameter.
pub const CACHE_BUST_PARAM: &str = "_";

/// Status and body of a portal response.
#[derive(Debug, Clone)]
pub struct PortalResponse {
    /// The URL that was requested, including query parameters.
    pub url: Url,
    /// HTTP status returned by the server.
    pub status: StatusCode,
    /// Response body decoded as text (possibly empty).
    pub body: String,
}

impl PortalResponse {
    /// True for any status below 400, which is what the portal treats as OK.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status.as_u16() < 400
    }
}

/// Monotonic millisecond token for the `_` query parameter.
///
/// Tokens follow wall-clock time but never repeat or go backwards within a
/// process, even when two requests land in the same millisecond.
#[derive(Debug, Default)]
pub struct CacheBuster {
    last: AtomicU64,
}

impl CacheBuster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next token.
    pub fn next_token(&self) -> u64 {
        let now = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0);
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last.saturating_add(1)))
            })
            .unwrap_or_else(|last| last);
        now.max(previous.saturating_add(1))
    }
}

/// HTTP client for the records portal.
///
/// Created once per run and reused for every request so the connection pool
/// is shared. Redirects are not followed: a 3xx is reported to the caller
/// like any other status below 400.
#[derive(Debug)]
pub struct PortalClient {
    client: Client,
    endpoints: PortalEndpoints,
    cache_buster: CacheBuster,
}

impl PortalClient {
    /// Creates a client for `endpoints` with the given per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::Build`] if the underlying reqwest client cannot
    /// be constructed.
    #[instrument(level = "debug", skip(endpoints), fields(base = %endpoints.base()))]
    pub fn new(endpoints: PortalEndpoints, request_timeout: Duration) -> Result<Self, PortalError> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static(BROWSER_ACCEPT_LANGUAGE),
        );

        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(request_timeout))
            .timeout(request_timeout)
            .gzip(true)
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(default_headers)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(PortalError::Build)?;

        Ok(Self {
            client,
            endpoints,
            cache_buster: CacheBuster::new(),
        })
    }

    /// Returns the endpoints this client talks to.
    #[must_use]
    pub fn endpoints(&self) -> &PortalEndpoints {
        &self.endpoints
    }

    /// Plain browser navigation to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError`] on timeout or transport failure.
    #[instrument(level = "debug", skip(self, session), fields(url = %url))]
    pub async fn navigate(
        &self,
        session: &mut SessionState,
        url: &Url,
    ) -> Result<PortalResponse, PortalError> {
        let request = self
            .client
            .get(url.clone())
            .header(ACCEPT, NAVIGATION_ACCEPT)
            .header(UPGRADE_INSECURE_REQUESTS, "1")
            .header("Sec-Fetch-Site", "none")
            .header("Sec-Fetch-Mode", "navigate")
            .header("Sec-Fetch-User", "?1")
            .header("Sec-Fetch-Dest", "document");
        self.send(session, url.clone(), request).await
    }

    /// XHR-marked GET with `params` followed by a cache-busting token.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError`] on timeout or transport failure.
    pub async fn ajax_get(
        &self,
        session: &mut SessionState,
        url: &Url,
        referer: &Url,
        accept: &str,
        params: &[(&str, &str)],
    ) -> Result<PortalResponse, PortalError> {
        self.ajax_get_with_timeout(session, url, referer, accept, params, None)
            .await
    }

    /// Same as [`ajax_get`](Self::ajax_get) with an optional timeout override.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError`] on timeout or transport failure.
    #[instrument(level = "debug", skip(self, session, referer, accept), fields(url = %url))]
    pub async fn ajax_get_with_timeout(
        &self,
        session: &mut SessionState,
        url: &Url,
        referer: &Url,
        accept: &str,
        params: &[(&str, &str)],
        timeout: Option<Duration>,
    ) -> Result<PortalResponse, PortalError> {
        let target = self.cache_busted(url, params);
        let mut request = self
            .client
            .get(target.clone())
            .header(X_REQUESTED_WITH, XML_HTTP_REQUEST)
            .header(ACCEPT, accept)
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .header(REFERER, referer.as_str());
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        self.send(session, target, request).await
    }

    /// XHR-marked POST with an empty body.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError`] on timeout or transport failure.
    #[instrument(level = "debug", skip(self, session, referer, accept), fields(url = %url))]
    pub async fn ajax_post(
        &self,
        session: &mut SessionState,
        url: &Url,
        referer: &Url,
        accept: &str,
    ) -> Result<PortalResponse, PortalError> {
        let request = self
            .client
            .post(url.clone())
            .header(X_REQUESTED_WITH, XML_HTTP_REQUEST)
            .header(ACCEPT, accept)
            .header(ORIGIN, self.endpoints.origin())
            .header(REFERER, referer.as_str())
            .body(Vec::<u8>::new());
        self.send(session, url.clone(), request).await
    }

    /// Url-encoded form POST. Field order and repeated names are preserved.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError`] on timeout or transport failure.
    #[instrument(level = "debug", skip(self, session, referer, accept, fields), fields(url = %url, field_count = fields.len()))]
    pub async fn form_post(
        &self,
        session: &mut SessionState,
        url: &Url,
        referer: &Url,
        accept: &str,
        fields: &[(String, String)],
    ) -> Result<PortalResponse, PortalError> {
        let body = encode_form(fields);
        let request = self
            .client
            .post(url.clone())
            .header(ACCEPT, accept)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .header(X_REQUESTED_WITH, XML_HTTP_REQUEST)
            .header(AJAX_REQUEST_HEADER, "true")
            .header(ORIGIN, self.endpoints.origin())
            .header(REFERER, referer.as_str())
            .body(body);
        self.send(session, url.clone(), request).await
    }

    fn cache_busted(&self, url: &Url, params: &[(&str, &str)]) -> Url {
        let mut target = url.clone();
        {
            let mut query = target.query_pairs_mut();
            for (name, value) in params {
                query.append_pair(name, value);
            }
            query.append_pair(CACHE_BUST_PARAM, &self.cache_buster.next_token().to_string());
        }
        target
    }

    async fn send(
        &self,
        session: &mut SessionState,
        url: Url,
        mut request: RequestBuilder,
    ) -> Result<PortalResponse, PortalError> {
        if let Some(cookies) = session.cookie_header(&url) {
            request = request.header(COOKIE, cookies);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PortalError::from_transport(url.as_str(), e))?;

        let status = response.status();
        session.store_response_cookies(response.headers(), &url);

        let body = response
            .text()
            .await
            .map_err(|e| PortalError::from_transport(url.as_str(), e))?;

        debug!(status = status.as_u16(), bytes = body.len(), "portal response");
        Ok(PortalResponse { url, status, body })
    }
}

/// Encodes `fields` as `application/x-www-form-urlencoded`.
#[must_use]
pub fn encode_form(fields: &[(String, String)]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (name, value) in fields {
        serializer.append_pair(name, value);
    }
    serializer.finish()
}
