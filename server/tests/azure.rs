//! Azure adapters against `wiremock` doubles of Blob Storage, Key Vault and
//! the App Service identity endpoint.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use todo_api::azure::{
    AzureBlobStore, ManagedIdentityCredential, StaticTokenCredential, TokenCredential, Transport,
};
use todo_api::routes::Health;
use todo_api::{app, AppState, BlobStore, Config};
use todo_core::{BackendError, BlobContainer, ManagedIdentityEndpoint, Todo};
use tower::ServiceExt;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "test-token";

fn transport() -> Transport {
    Transport::new(Duration::from_secs(5)).unwrap()
}

fn credential() -> Arc<dyn TokenCredential> {
    Arc::new(StaticTokenCredential::new(TOKEN))
}

fn blob_store(server: &MockServer) -> AzureBlobStore {
    let container = BlobContainer::new(&server.uri(), "data").unwrap();
    AzureBlobStore::new(container, credential(), transport())
}

fn config(args: &[&str]) -> Config {
    let mut argv = vec!["todo-api"];
    argv.extend_from_slice(args);
    Config::try_parse_from(argv).unwrap()
}

// --- blob store ---

#[tokio::test]
async fn put_json_uploads_block_blob() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/data/todos/1.json"))
        .and(header("authorization", "Bearer test-token"))
        .and(header("x-ms-blob-type", "BlockBlob"))
        .and(header("x-ms-version", "2021-08-06"))
        .and(header("content-type", "application/json"))
        .and(body_json(serde_json::json!({ "id": 1 })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    blob_store(&server)
        .put_json("todos/1.json", r#"{"id":1}"#.to_string())
        .await
        .unwrap();

    let received = server.received_requests().await.unwrap();
    assert!(received[0].headers.contains_key("x-ms-client-request-id"));
    assert!(received[0].headers.contains_key("x-ms-date"));
}

#[tokio::test]
async fn put_json_surfaces_permission_errors() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-ms-error-code", "AuthorizationPermissionMismatch"),
        )
        .mount(&server)
        .await;

    let err = blob_store(&server)
        .put_json("todos/1.json", "{}".to_string())
        .await
        .unwrap_err();
    match err {
        BackendError::UnexpectedStatus { status, code, .. } => {
            assert_eq!(status, 403);
            assert_eq!(code.as_deref(), Some("AuthorizationPermissionMismatch"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn delete_if_exists_treats_404_as_absent() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/data/todos/1.json"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/data/todos/2.json"))
        .respond_with(ResponseTemplate::new(404).insert_header("x-ms-error-code", "BlobNotFound"))
        .mount(&server)
        .await;

    let store = blob_store(&server);
    assert!(store.delete_if_exists("todos/1.json").await.unwrap());
    assert!(!store.delete_if_exists("todos/2.json").await.unwrap());
}

#[tokio::test]
async fn ensure_container_accepts_existing_container() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/data"))
        .and(query_param("restype", "container"))
        .respond_with(ResponseTemplate::new(409).insert_header("x-ms-error-code", "ContainerAlreadyExists"))
        .expect(1)
        .mount(&server)
        .await;

    assert!(!blob_store(&server).ensure_container().await.unwrap());
}

#[tokio::test]
async fn slow_backend_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let container = BlobContainer::new(&server.uri(), "data").unwrap();
    let store = AzureBlobStore::new(
        container,
        credential(),
        Transport::new(Duration::from_millis(200)).unwrap(),
    );
    let err = store
        .put_json("todos/1.json", "{}".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Timeout(_)), "{err}");
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    // Bind and drop to get a port nobody listens on.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let container = BlobContainer::new(&format!("http://127.0.0.1:{port}"), "data").unwrap();
    let store = AzureBlobStore::new(container, credential(), transport());

    let err = store.delete_if_exists("todos/1.json").await.unwrap_err();
    assert!(matches!(err, BackendError::Transport(_)), "{err}");
}

// --- managed identity ---

#[tokio::test]
async fn managed_identity_tokens_are_cached_per_resource() {
    let server = MockServer::start().await;
    let expires_on = (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp();
    Mock::given(method("GET"))
        .and(path("/msi/token"))
        .and(header("x-identity-header", "secret-header"))
        .and(query_param("resource", "https://storage.azure.com/"))
        .and(query_param("api-version", "2019-08-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "mi-token",
            "expires_on": expires_on.to_string(),
        })))
        .expect(1)
        .mount(&server)
        .await;

    let credential = ManagedIdentityCredential::new(
        ManagedIdentityEndpoint::AppService {
            endpoint: format!("{}/msi/token", server.uri()),
            header: "secret-header".to_string(),
        },
        transport(),
    );

    assert_eq!(credential.token("https://storage.azure.com/").await.unwrap(), "mi-token");
    assert_eq!(credential.token("https://storage.azure.com/").await.unwrap(), "mi-token");
}

#[tokio::test]
async fn managed_identity_refreshes_tokens_near_expiry() {
    let server = MockServer::start().await;
    let expires_on = (chrono::Utc::now() + chrono::Duration::minutes(1)).timestamp();
    Mock::given(method("GET"))
        .and(path("/msi/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "short-lived",
            "expires_on": expires_on,
        })))
        .expect(2)
        .mount(&server)
        .await;

    let credential = ManagedIdentityCredential::new(
        ManagedIdentityEndpoint::AppService {
            endpoint: format!("{}/msi/token", server.uri()),
            header: "h".to_string(),
        },
        transport(),
    );

    credential.token("https://vault.azure.net").await.unwrap();
    credential.token("https://vault.azure.net").await.unwrap();
}

#[tokio::test]
async fn managed_identity_failure_is_a_credential_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(400).set_body_string("no identity assigned"))
        .mount(&server)
        .await;

    let credential = ManagedIdentityCredential::new(
        ManagedIdentityEndpoint::AppService {
            endpoint: format!("{}/msi/token", server.uri()),
            header: "h".to_string(),
        },
        transport(),
    );
    let err = credential.token("https://vault.azure.net").await.unwrap_err();
    assert!(matches!(err, BackendError::Credential(_)), "{err}");
}

// --- startup wiring ---

#[tokio::test]
async fn startup_loads_secrets_and_mirrors_through_the_router() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/secrets/sql-connection-string"))
        .and(query_param("api-version", "7.4"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": "Server=tcp:db;Password=hunter2",
            "attributes": { "enabled": true, "exp": 1_790_000_000 }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/secrets/api-key-external"))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "error": { "code": "Forbidden", "message": "denied" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/data"))
        .and(query_param("restype", "container"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/data/todos/1.json"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let config = config(&[
        "--storage-endpoint",
        uri.as_str(),
        "--key-vault-endpoint",
        uri.as_str(),
        "--create-container",
    ]);
    let state = AppState::connect_with(&config, transport(), credential()).await;

    let secrets = state.secrets().unwrap();
    assert!(secrets.is_loaded("sql-connection-string"));
    assert!(!secrets.is_loaded("api-key-external"));

    let router = app(state);
    let resp = router
        .clone()
        .oneshot(
            axum::http::Request::builder()
                .uri("/health")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    let bytes = http_body_util::BodyExt::collect(resp.into_body())
        .await
        .unwrap()
        .to_bytes();
    let health: Health = serde_json::from_slice(&bytes).unwrap();
    assert!(health.connections.storage);
    assert!(health.connections.key_vault);
    let flags = health.connections.secrets.unwrap();
    assert_eq!(flags.get("sql-connection-string"), Some(&true));
    assert_eq!(flags.get("api-key-external"), Some(&false));
    assert!(!String::from_utf8_lossy(&bytes).contains("hunter2"));

    let resp = router
        .oneshot(
            axum::http::Request::builder()
                .method("POST")
                .uri("/todos")
                .header("content-type", "application/json")
                .body(r#"{"title":"Buy milk"}"#.to_string())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), axum::http::StatusCode::CREATED);
    let bytes = http_body_util::BodyExt::collect(resp.into_body())
        .await
        .unwrap()
        .to_bytes();
    let todo: Todo = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(todo.stored_in_blob, Some(true));
}

#[tokio::test]
async fn invalid_storage_endpoint_degrades_to_in_memory() {
    let config = config(&["--storage-endpoint", "not a url"]);
    let state = AppState::connect_with(&config, transport(), credential()).await;
    assert!(!state.mirror().is_configured());
    assert!(state.secrets().is_none());
}
