//! Integration tests for search submission.

mod support;

use std::time::Duration;

use recorder_core::{SearchSubmitter, SessionBootstrapper, SessionState, SubmissionError};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::{SEARCH_POST, client, criteria, mount_handshake, mount_search};

#[tokio::test]
async fn test_submit_posts_form_and_reads_total_pages() {
    let server = MockServer::start().await;
    mount_handshake(&server).await;
    Mock::given(method("POST"))
        .and(path(SEARCH_POST))
        .and(header("content-type", "application/x-www-form-urlencoded; charset=UTF-8"))
        .and(header("ajaxrequest", "true"))
        .and(body_string_contains(
            "field_RecordingDateID_DOT_StartDate=07%2F01%2F2025",
        ))
        .and(body_string_contains(
            "field_selfservice_documentTypes-holderInput=NTSALE",
        ))
        .and(body_string_contains(
            "field_selfservice_documentTypes-holderInput=CNLNT",
        ))
        .and(body_string_contains(
            "field_selfservice_documentTypes-containsInput=Contains+Any",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"totalPages": 3}"#))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let mut session = SessionBootstrapper::new(&client, Duration::ZERO)
        .establish()
        .await
        .unwrap();
    let result = SearchSubmitter::new(&client, Duration::ZERO)
        .submit(&criteria(), &mut session)
        .await
        .unwrap();

    assert_eq!(result.total_pages, 3);
}

#[tokio::test]
async fn test_submit_defaults_to_one_page_for_non_json_body() {
    let server = MockServer::start().await;
    mount_handshake(&server).await;
    mount_search(&server, r#"<ul class="selfServiceSearchResultList"></ul>"#).await;

    let client = client(&server);
    let mut session = SessionBootstrapper::new(&client, Duration::ZERO)
        .establish()
        .await
        .unwrap();
    let result = SearchSubmitter::new(&client, Duration::ZERO)
        .submit(&criteria(), &mut session)
        .await
        .unwrap();

    assert_eq!(result.total_pages, 1);
}

#[tokio::test]
async fn test_submit_rejects_error_status() {
    let server = MockServer::start().await;
    mount_handshake(&server).await;
    Mock::given(method("POST"))
        .and(path(SEARCH_POST))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client(&server);
    let mut session = SessionBootstrapper::new(&client, Duration::ZERO)
        .establish()
        .await
        .unwrap();
    let err = SearchSubmitter::new(&client, Duration::ZERO)
        .submit(&criteria(), &mut session)
        .await
        .unwrap_err();

    assert!(matches!(err, SubmissionError::UnexpectedStatus { status: 500 }));
}

#[tokio::test]
async fn test_submit_requires_established_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_POST))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client(&server);
    let mut session = SessionState::new();
    let err = SearchSubmitter::new(&client, Duration::ZERO)
        .submit(&criteria(), &mut session)
        .await
        .unwrap_err();

    assert!(matches!(err, SubmissionError::SessionNotEstablished));
}
