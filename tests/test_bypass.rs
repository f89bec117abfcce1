//! Startup with the testing bypass token: the stored fixture user is trusted
//! and `/auth/me` is never called.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use exeloka_client::client::ApiClient;
use exeloka_client::session::storage::{ACCESS_TOKEN_KEY, USER_FIXTURE_KEY};
use exeloka_client::session::{MemoryStorage, TESTING_BYPASS_TOKEN};

async fn mount_me(server: &MockServer, calls: u64) {
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "user": { "id": 99, "email": "server@exeloka.com" } }
        })))
        .expect(calls)
        .mount(server)
        .await;
}

fn client_for(server: &MockServer, storage: Arc<MemoryStorage>) -> ApiClient {
    ApiClient::new(format!("{}/api", server.uri()), Duration::from_secs(5), storage).unwrap()
}

#[tokio::test]
async fn bypass_token_restores_fixture_user_without_validation() {
    let server = MockServer::start().await;
    mount_me(&server, 0).await;

    let storage = Arc::new(MemoryStorage::with_entries([
        (ACCESS_TOKEN_KEY, TESTING_BYPASS_TOKEN),
        (USER_FIXTURE_KEY, r#"{"id":1,"email":"demo@exeloka.com","full_name":"Demo"}"#),
    ]));
    let client = client_for(&server, storage);

    let user = client.restore().await.unwrap().unwrap();
    assert_eq!(user.id, 1);
    assert_eq!(user.email, "demo@exeloka.com");
    assert_eq!(client.session().current_user(), Some(user));
    assert!(client.session().is_authenticated());
    server.verify().await;
}

#[tokio::test]
async fn bypass_token_without_fixture_is_validated_normally() {
    let server = MockServer::start().await;
    mount_me(&server, 1).await;

    let storage = Arc::new(MemoryStorage::with_entries([(ACCESS_TOKEN_KEY, TESTING_BYPASS_TOKEN)]));
    let client = client_for(&server, storage);

    let user = client.restore().await.unwrap().unwrap();
    assert_eq!(user.id, 99);
    server.verify().await;
}
