//! Browser identity presented to the records portal.
//!
//! The portal serves its search UI to browsers only; requests that do not look
//! like a desktop browser session are answered with the disclaimer page again.

/// Desktop Chrome User-Agent sent on every portal request.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/140.0.0.0 Safari/537.36";

/// Accept-Language sent with every request.
pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Accept header for top-level document navigation.
pub const NAVIGATION_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,\
    image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7";

/// Accept header for AJAX requests that expect an HTML fragment.
pub const FRAGMENT_ACCEPT: &str = "text/html, */*; q=0.01";

/// Accept header for AJAX requests that expect JSON.
pub const JSON_ACCEPT: &str = "application/json, text/javascript, */*; q=0.01";

/// Accept header for requests that take whatever the server sends.
pub const ANY_ACCEPT: &str = "*/*";
