//! Client behaviour against a fake backend: bearer headers, the 401
//! refresh interceptor, session restore and failure notices.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use exeloka_client::api::models::{
    Feedback, KnowledgeEntry, ListQuery, RecommendationQuery, SearchFilters, SourceType, UploadFile,
};
use exeloka_client::client::{
    ApiClient, ApiError, ClientEvent, NETWORK_MESSAGE, NetworkKind, TIMEOUT_MESSAGE,
};
use exeloka_client::session::storage::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use exeloka_client::session::{FileStorage, MemoryStorage, Storage};

// ── helpers ───────────────────────────────────────────────────────────────────

fn client_for(server: &MockServer, storage: Arc<MemoryStorage>) -> ApiClient {
    ApiClient::new(format!("{}/api", server.uri()), Duration::from_secs(5), storage).unwrap()
}

fn ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": data }))
}

fn unauthorized() -> ResponseTemplate {
    ResponseTemplate::new(401).set_body_json(json!({ "success": false, "message": "Token expired" }))
}

fn user_json() -> Value {
    json!({
        "id": 7,
        "email": "sari@exeloka.com",
        "full_name": "Sari Wulandari",
        "company_name": "Exeloka",
        "role": "admin"
    })
}

async fn mount_refresh(server: &MockServer, refresh_token: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .and(body_json(json!({ "refreshToken": refresh_token })))
        .respond_with(ok(json!({ "token": "xyz", "refreshToken": "r2" })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn authorization_of(req: &wiremock::Request) -> Option<String> {
    req.headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

// ── bearer header ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn bearer_header_sent_when_signed_in() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects"))
        .and(header("authorization", "Bearer abc"))
        .respond_with(ok(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Arc::new(MemoryStorage::new()));
    client.session().set_tokens("abc", "r1").unwrap();

    let items: Vec<Value> = client.get("/projects").await.unwrap();
    assert!(items.is_empty());
    server.verify().await;
}

#[tokio::test]
async fn no_authorization_header_without_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects"))
        .respond_with(ok(json!([])))
        .mount(&server)
        .await;

    let client = client_for(&server, Arc::new(MemoryStorage::new()));
    let items: Vec<Value> = client.get("/projects").await.unwrap();
    assert!(items.is_empty());

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(authorization_of(&received[0]), None);
}

#[tokio::test]
async fn project_list_decodes_empty_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/recommendations/projects"))
        .respond_with(ok(json!([])))
        .mount(&server)
        .await;

    let client = client_for(&server, Arc::new(MemoryStorage::new()));
    let page = client.projects().list(&ListQuery::default()).await.unwrap();
    assert!(page.items.is_empty());
}

// ── refresh interceptor ───────────────────────────────────────────────────────

#[tokio::test]
async fn expired_token_is_refreshed_and_request_replayed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(unauthorized())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/projects"))
        .and(header("authorization", "Bearer xyz"))
        .respond_with(ok(json!([{ "id": 1 }])))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, "r1", 1).await;

    let client = client_for(&server, Arc::new(MemoryStorage::new()));
    client.session().set_tokens("stale", "r1").unwrap();
    let mut events = client.subscribe();

    let items: Vec<Value> = client.get("/projects").await.unwrap();
    assert_eq!(items[0]["id"], 1);
    assert_eq!(client.session().current_access_token().as_deref(), Some("xyz"));
    assert_eq!(client.session().refresh_token().as_deref(), Some("r2"));
    assert_eq!(events.recv().await.unwrap(), ClientEvent::TokensRefreshed);

    // The refresh call itself carries no bearer header.
    let received = server.received_requests().await.unwrap();
    let refresh = received
        .iter()
        .find(|r| r.url.path() == "/api/auth/refresh")
        .unwrap();
    assert_eq!(authorization_of(refresh), None);
    server.verify().await;
}

#[tokio::test]
async fn missing_refresh_token_tears_session_down() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects"))
        .respond_with(unauthorized())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ok(json!({ "token": "never", "refreshToken": "never" })))
        .expect(0)
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryStorage::with_entries([(ACCESS_TOKEN_KEY, "stale")]));
    let client = client_for(&server, storage.clone());
    client.session().hydrate().unwrap();
    let mut events = client.subscribe();

    let err = client.get::<Vec<Value>>("/projects").await.unwrap_err();
    assert!(matches!(err, ApiError::AuthRequired));
    assert!(!client.session().is_authenticated());
    assert_eq!(storage.get(ACCESS_TOKEN_KEY).unwrap(), None);

    assert_eq!(events.recv().await.unwrap(), ClientEvent::LoginRequired);
    assert!(events.try_recv().is_err(), "auth failures raise no notice");
    server.verify().await;
}

#[tokio::test]
async fn failed_refresh_tears_session_down() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects"))
        .respond_with(unauthorized())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "success": false, "message": "Invalid refresh token" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryStorage::new());
    let client = client_for(&server, storage.clone());
    client.session().set_tokens("stale", "revoked").unwrap();
    let mut events = client.subscribe();

    let err = client.get::<Vec<Value>>("/projects").await.unwrap_err();
    assert!(matches!(err, ApiError::AuthRequired));
    assert_eq!(storage.get(REFRESH_TOKEN_KEY).unwrap(), None);
    assert_eq!(events.recv().await.unwrap(), ClientEvent::LoginRequired);
    server.verify().await;
}

#[tokio::test]
async fn unauthorized_replay_is_not_refreshed_again() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects"))
        .respond_with(unauthorized())
        .expect(2)
        .mount(&server)
        .await;
    mount_refresh(&server, "r1", 1).await;

    let client = client_for(&server, Arc::new(MemoryStorage::new()));
    client.session().set_tokens("stale", "r1").unwrap();

    let err = client.get::<Vec<Value>>("/projects").await.unwrap_err();
    assert!(matches!(err, ApiError::AuthRequired));
    // The fresh pair is kept; only the replayed request failed.
    assert_eq!(client.session().current_access_token().as_deref(), Some("xyz"));
    server.verify().await;
}

#[tokio::test]
async fn concurrent_unauthorized_requests_share_one_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(unauthorized())
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer xyz"))
        .respond_with(ok(json!([])))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(
            ok(json!({ "token": "xyz", "refreshToken": "r2" })).set_delay(Duration::from_millis(150)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Arc::new(MemoryStorage::new()));
    client.session().set_tokens("stale", "r1").unwrap();

    let (a, b, c) = tokio::join!(
        client.get::<Vec<Value>>("/projects"),
        client.get::<Vec<Value>>("/knowledge/sources"),
        client.get::<Vec<Value>>("/documents"),
    );
    assert!(a.is_ok() && b.is_ok() && c.is_ok());
    server.verify().await;
}

#[tokio::test]
async fn login_failure_is_not_intercepted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "success": false, "message": "Invalid credentials" })),
        )
        .mount(&server)
        .await;
    mount_refresh(&server, "r1", 0).await;

    let client = client_for(&server, Arc::new(MemoryStorage::new()));
    client.session().set_tokens("old", "r1").unwrap();
    let mut events = client.subscribe();

    let err = client.auth().login("sari@exeloka.com", "wrong").await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert_eq!(events.recv().await.unwrap(), ClientEvent::Notice("Invalid credentials".into()));
    server.verify().await;
}

// ── auth flow ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn login_stores_tokens_and_announces_user() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({ "email": "sari@exeloka.com", "password": "secret1" })))
        .respond_with(ok(json!({ "user": user_json(), "token": "t1", "refreshToken": "r1" })))
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryStorage::new());
    let client = client_for(&server, storage.clone());
    let mut events = client.subscribe();

    let user = client.auth().login("sari@exeloka.com", "secret1").await.unwrap();
    assert_eq!(user.display_name(), "Sari Wulandari");
    assert_eq!(storage.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("t1"));
    assert_eq!(storage.get(REFRESH_TOKEN_KEY).unwrap().as_deref(), Some("r1"));
    assert_eq!(events.recv().await.unwrap(), ClientEvent::SignedIn(user));
}

#[tokio::test]
async fn logout_clears_session_even_when_server_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryStorage::new());
    let client = client_for(&server, storage.clone());
    client.session().set_tokens("t1", "r1").unwrap();

    client.auth().logout().await.unwrap();
    assert!(!client.session().is_authenticated());
    assert_eq!(storage.get(ACCESS_TOKEN_KEY).unwrap(), None);
}

// ── restore ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn restore_validates_stored_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .and(header("authorization", "Bearer t1"))
        .respond_with(ok(json!({ "user": user_json() })))
        .expect(1)
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryStorage::with_entries([
        (ACCESS_TOKEN_KEY, "t1"),
        (REFRESH_TOKEN_KEY, "r1"),
    ]));
    let client = client_for(&server, storage);

    let user = client.restore().await.unwrap().unwrap();
    assert_eq!(user.id, 7);
    assert_eq!(client.session().current_user(), Some(user));
    server.verify().await;
}

#[tokio::test]
async fn restore_clears_rejected_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(unauthorized())
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryStorage::with_entries([(ACCESS_TOKEN_KEY, "dead")]));
    let client = client_for(&server, storage.clone());

    assert_eq!(client.restore().await.unwrap(), None);
    assert!(!client.session().is_authenticated());
    assert_eq!(storage.get(ACCESS_TOKEN_KEY).unwrap(), None);
}

// ── notices ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn http_error_publishes_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/recommendations/projects/9"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({ "success": false, "message": "Project not found" })),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, Arc::new(MemoryStorage::new()));
    let mut events = client.subscribe();

    let err = client.projects().get(9).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(events.recv().await.unwrap(), ClientEvent::Notice("Project not found".into()));
}

#[tokio::test]
async fn rejected_envelope_publishes_error_field() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/knowledge/categories"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": false, "error": "Categories unavailable" })),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, Arc::new(MemoryStorage::new()));
    let mut events = client.subscribe();

    let err = client.knowledge().categories().await.unwrap_err();
    assert!(matches!(err, ApiError::Rejected { ref message } if message == "Categories unavailable"));
    assert_eq!(
        events.recv().await.unwrap(),
        ClientEvent::Notice("Categories unavailable".into())
    );
}

#[tokio::test]
async fn unreachable_backend_publishes_network_notice() {
    let client = ApiClient::new(
        "http://127.0.0.1:9/api",
        Duration::from_secs(2),
        Arc::new(MemoryStorage::new()),
    )
    .unwrap();
    let mut events = client.subscribe();

    let err = client.get::<Value>("/projects").await.unwrap_err();
    assert!(err.is_network());
    assert_eq!(events.recv().await.unwrap(), ClientEvent::Notice(NETWORK_MESSAGE.into()));
}

#[tokio::test]
async fn slow_backend_times_out_with_timeout_notice() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects"))
        .respond_with(ok(json!([])).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let client = ApiClient::new(
        format!("{}/api", server.uri()),
        Duration::from_millis(200),
        Arc::new(MemoryStorage::new()),
    )
    .unwrap();
    let mut events = client.subscribe();

    let err = client.get::<Value>("/projects").await.unwrap_err();
    assert!(matches!(err, ApiError::Network { kind: NetworkKind::Timeout, .. }), "{err:?}");
    assert_eq!(events.recv().await.unwrap(), ClientEvent::Notice(TIMEOUT_MESSAGE.into()));
}

#[tokio::test]
async fn rejected_input_publishes_a_notice() {
    let server = MockServer::start().await;
    let client = client_for(&server, Arc::new(MemoryStorage::new()));
    let mut events = client.subscribe();

    let err = client.documents().download("a/b").await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidRequest(_)));
    assert_eq!(
        events.recv().await.unwrap(),
        ClientEvent::Notice(err.user_message().unwrap())
    );
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn corrupt_session_file_is_reported_on_restore() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let session_path = dir.path().join("session.json");
    std::fs::write(&session_path, "not json").unwrap();

    let client = ApiClient::new(
        format!("{}/api", server.uri()),
        Duration::from_secs(5),
        Arc::new(FileStorage::new(&session_path)),
    )
    .unwrap();
    let mut events = client.subscribe();

    let err = client.restore().await.unwrap_err();
    assert!(matches!(err, ApiError::Storage(_)), "{err:?}");
    match events.recv().await.unwrap() {
        ClientEvent::Notice(message) => assert!(message.contains("malformed"), "{message}"),
        other => panic!("unexpected event {other:?}"),
    }
    assert!(server.received_requests().await.unwrap().is_empty());
}

// ── documents ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn download_saves_file_named_by_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/documents/download/rec-12.docx"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-disposition", "attachment; filename=\"Recommendation 12.docx\"")
                .set_body_bytes(b"PK\x03\x04docx".to_vec()),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, Arc::new(MemoryStorage::new()));
    let file = client.documents().download("rec-12.docx").await.unwrap();
    assert_eq!(file.filename, "Recommendation 12.docx");

    let dir = TempDir::new().unwrap();
    let saved = file.save_to(dir.path()).await.unwrap();
    assert_eq!(std::fs::read(saved).unwrap(), b"PK\x03\x04docx");
}

// ── facades ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn recommendation_filter_is_sent_as_project_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/recommendations"))
        .and(query_param("project_id", "4"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": [{ "id": 11, "title": "Engage the Kyai", "confidence_score": "0.85" }],
                "meta": { "page": 1, "total": 1 }
            })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Arc::new(MemoryStorage::new()));
    let query = RecommendationQuery { project_id: Some(4), ..RecommendationQuery::default() };
    let page = client.recommendations().list(&query).await.unwrap();
    assert_eq!(page.items[0].confidence_score, Some(0.85));
    assert_eq!(page.meta.unwrap().total, Some(1));
    server.verify().await;
}

#[tokio::test]
async fn invalid_input_never_reaches_the_server() {
    let server = MockServer::start().await;
    let client = client_for(&server, Arc::new(MemoryStorage::new()));

    let feedback = Feedback { rating: 6, ..Feedback::default() };
    let err = client.recommendations().submit_feedback(1, &feedback).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidRequest(_)));

    let err = client.knowledge().search("   ", &SearchFilters::default()).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidRequest(_)));

    let err = client.documents().download("../secrets").await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidRequest(_)));

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn multipart_upload_is_rebuilt_for_replay() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/knowledge/direct"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(unauthorized())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/knowledge/direct"))
        .and(header("authorization", "Bearer xyz"))
        .respond_with(ok(json!({ "id": 31, "processing_status": "completed" })))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, "r1", 1).await;

    let client = client_for(&server, Arc::new(MemoryStorage::new()));
    client.session().set_tokens("stale", "r1").unwrap();

    let entry = KnowledgeEntry {
        title: "Sampang field notes".into(),
        source_type: SourceType::Document,
        source_url: None,
        content_text: None,
        category_id: None,
        tags: vec!["sampang".into()],
        cultural_context: None,
        importance_score: None,
    };
    let file = UploadFile {
        filename: "notes.txt".into(),
        mime: Some("text/plain".into()),
        bytes: b"kerapan sapi schedule".to_vec(),
    };
    let added = client.knowledge().upload(&entry, file).await.unwrap();
    assert_eq!(added.id, 31);

    let uploads: Vec<_> = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == "/api/knowledge/direct")
        .collect();
    assert_eq!(uploads.len(), 2);
    for upload in &uploads {
        let body = String::from_utf8_lossy(&upload.body);
        assert!(body.contains("kerapan sapi schedule"));
        assert!(body.contains("Sampang field notes"));
    }
    server.verify().await;
}
