//! Fixed resource paths of the records portal.

use url::Url;

/// Production portal host.
pub const DEFAULT_BASE_URL: &str = "https://pimacountyaz-web.tylerhost.net";

/// Name of the cookie that carries the server-side session.
pub const SESSION_COOKIE: &str = "JSESSIONID";

const DISCLAIMER_PATH: &str = "/web/user/disclaimer";
const WEB_ROOT_PATH: &str = "/web/";
const HOME_ACTIONS_PATH: &str = "/web/homeActions";
const ACTION_GROUP_PATH: &str = "/web/action/ACTIONGROUP55S1";
const SEARCH_PAGE_PATH: &str = "/web/search/DOCSEARCH55S8";
const SEARCH_POST_PATH: &str = "/web/searchPost/DOCSEARCH55S8";
const SEARCH_RESULTS_PATH: &str = "/web/searchResults/DOCSEARCH55S8";
const PING_SESSION_PATH: &str = "/web/session/pingSession";

/// Absolute URLs for every portal resource the scraper touches.
///
/// All URLs are resolved once against the base URL so request code never has
/// to deal with join failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalEndpoints {
    base: Url,
    origin: String,
    disclaimer: Url,
    web_root: Url,
    home_actions: Url,
    action_group: Url,
    search_page: Url,
    search_post: Url,
    search_results: Url,
    ping_session: Url,
}

impl PortalEndpoints {
    /// Resolves all portal endpoints against `base`.
    ///
    /// # Errors
    ///
    /// Returns [`url::ParseError`] if `base` is not an absolute URL.
    pub fn new(base: &str) -> Result<Self, url::ParseError> {
        let base = Url::parse(base)?;
        let origin = base.origin().ascii_serialization();
        Ok(Self {
            disclaimer: base.join(DISCLAIMER_PATH)?,
            web_root: base.join(WEB_ROOT_PATH)?,
            home_actions: base.join(HOME_ACTIONS_PATH)?,
            action_group: base.join(ACTION_GROUP_PATH)?,
            search_page: base.join(SEARCH_PAGE_PATH)?,
            search_post: base.join(SEARCH_POST_PATH)?,
            search_results: base.join(SEARCH_RESULTS_PATH)?,
            ping_session: base.join(PING_SESSION_PATH)?,
            origin,
            base,
        })
    }

    #[must_use]
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Scheme/host/port serialization used for the `Origin` header.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    #[must_use]
    pub fn disclaimer(&self) -> &Url {
        &self.disclaimer
    }

    #[must_use]
    pub fn web_root(&self) -> &Url {
        &self.web_root
    }

    #[must_use]
    pub fn home_actions(&self) -> &Url {
        &self.home_actions
    }

    #[must_use]
    pub fn action_group(&self) -> &Url {
        &self.action_group
    }

    #[must_use]
    pub fn search_page(&self) -> &Url {
        &self.search_page
    }

    #[must_use]
    pub fn search_post(&self) -> &Url {
        &self.search_post
    }

    #[must_use]
    pub fn search_results(&self) -> &Url {
        &self.search_results
    }

    #[must_use]
    pub fn ping_session(&self) -> &Url {
        &self.ping_session
    }
}

impl Default for PortalEndpoints {
    #[allow(clippy::expect_used)]
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL).expect("default portal base URL is valid")
    }
}
