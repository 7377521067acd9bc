//! Mock records portal shared by the integration tests.

#![allow(dead_code)]

use std::time::Duration;

use recorder_core::{PortalClient, PortalEndpoints, SearchCriteria};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const DISCLAIMER: &str = "/web/user/disclaimer";
pub const WEB_ROOT: &str = "/web/";
pub const HOME_ACTIONS: &str = "/web/homeActions";
pub const ACTION_GROUP: &str = "/web/action/ACTIONGROUP55S1";
pub const SEARCH_PAGE: &str = "/web/search/DOCSEARCH55S8";
pub const SEARCH_POST: &str = "/web/searchPost/DOCSEARCH55S8";
pub const SEARCH_RESULTS: &str = "/web/searchResults/DOCSEARCH55S8";
pub const PING_SESSION: &str = "/web/session/pingSession";

pub const SESSION_COOKIE: &str = "JSESSIONID=TESTSESSION42; Path=/";

/// Client pointed at the mock server with a short timeout.
pub fn client(server: &MockServer) -> PortalClient {
    let endpoints = PortalEndpoints::new(&server.uri()).expect("mock URI is a valid base");
    PortalClient::new(endpoints, Duration::from_secs(5)).expect("client builds")
}

/// The scenario criteria: July 1 to October 21 2025, NTSALE and CNLNT.
pub fn criteria() -> SearchCriteria {
    SearchCriteria::parse("07/01/2025", "10/21/2025", &["NTSALE", "CNLNT"])
        .expect("criteria are valid")
}

/// Mounts all six handshake steps; the first one sets the session cookie.
pub async fn mount_handshake(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(DISCLAIMER))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Set-Cookie", SESSION_COOKIE)
                .set_body_string("<html>disclaimer</html>"),
        )
        .mount(server)
        .await;
    mount_ok(server, "POST", DISCLAIMER, r#"{"accepted":true}"#).await;
    mount_ok(server, "GET", WEB_ROOT, "<div>home</div>").await;
    mount_ok(server, "POST", HOME_ACTIONS, "{}").await;
    mount_ok(server, "GET", ACTION_GROUP, "<div>actions</div>").await;
    mount_ok(server, "GET", SEARCH_PAGE, "<form>search</form>").await;
}

pub async fn mount_ok(server: &MockServer, http_method: &str, route: &str, body: &str) {
    Mock::given(method(http_method))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Mounts the search endpoint answering with `body`.
pub async fn mount_search(server: &MockServer, body: &str) {
    Mock::given(method("POST"))
        .and(path(SEARCH_POST))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "application/json")
                .set_body_string(body),
        )
        .mount(server)
        .await;
}

/// Mounts an always-alive keep-alive endpoint.
pub async fn mount_ping(server: &MockServer) {
    mount_ok(server, "GET", PING_SESSION, "").await;
}

/// Mounts `body` as result page `page`.
pub async fn mount_page(server: &MockServer, page: u32, body: String) {
    Mock::given(method("GET"))
        .and(path(SEARCH_RESULTS))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Mounts handshake, search (`total_pages`), ping and pages of two rows each.
pub async fn mount_portal(server: &MockServer, total_pages: u32) {
    mount_handshake(server).await;
    mount_search(server, &format!(r#"{{"totalPages": {total_pages}}}"#)).await;
    mount_ping(server).await;
    for page in 1..=total_pages {
        mount_page(server, page, results_page(page, 2)).await;
    }
}

/// Document id of row `row` on page `page`.
pub fn document_id(page: u32, row: usize) -> String {
    format!("P{page}R{row}")
}

/// One well-formed result row.
pub fn result_row(page: u32, row: usize) -> String {
    let id = document_id(page, row);
    format!(
        r#"<li class="ss-search-row" data-documentid="{id}" data-href="/web/document/{id}?search=DOCSEARCH55S8">
             <div class="ss-facet-avatar">NS</div>
             <h1>2025{page:03}{row:04} • NOTICE SALE</h1>
             <div class="searchResultThreeColumn"><ul>
               <li>Recording Date</li><li>07/{row:02}/2025 09:00 AM</li>
             </ul></div>
             <div class="searchResultThreeColumn"><ul>
               <li>Grantor</li><li>TRUSTEE {id}</li>
             </ul></div>
             <div class="searchResultThreeColumn"><ul>
               <li>Grantee</li><li>OWNER {id}</li><li>CO-OWNER {id}</li>
             </ul></div>
           </li>"#
    )
}

/// A row with no identifying content.
pub fn blank_row() -> String {
    r#"<li class="ss-search-row"><div class="searchResultThreeColumn"><ul><li>Consideration</li><li></li></ul></div></li>"#
        .to_string()
}

/// A results fragment with `rows` well-formed rows.
pub fn results_page(page: u32, rows: usize) -> String {
    let body: String = (1..=rows).map(|row| result_row(page, row)).collect();
    wrap_rows(&body)
}

/// Wraps row markup in the result-list container.
pub fn wrap_rows(rows: &str) -> String {
    format!(r#"<div class="searchResults"><ul class="selfServiceSearchResultList">{rows}</ul></div>"#)
}
