use crate::helpers::{
    expired_jwt, issue_refresh_token, jwt_valid_for, seed_store, session_slots_empty, settings_for,
    TestClient,
};
use fleetdesk_auth_test_helper::{spawn_app, spawn_app_with, MockBehaviour};
use fleetdesk_client_core::{FileStore, HistoryNavigator, KeyValueStore, MemoryStore, SessionManager};
use fleetdesk_time::Seconds;
use std::{sync::Arc, time::Duration};

#[tokio::test]
async fn valid_stored_session_restored_without_network() {
    // Arrange
    let app = spawn_app().await;
    let store = MemoryStore::new();
    let (access, refresh) = app.api.issue_session();
    seed_store(&store, Some(access.as_str()), Some(refresh.as_str()), Some(&app.test_user.info));
    let expected_user = app.test_user.info.clone();

    // Act
    let client = TestClient::from_app(app, store);

    // Assert
    assert!(client.session.is_authenticated());
    assert_eq!(client.session.current_user().as_deref(), Some(&expected_user));
    assert!(client.app.api.requests().is_empty());
}

#[tokio::test]
async fn expired_stored_token_is_cleared() {
    // Arrange
    let app = spawn_app().await;
    let store = MemoryStore::new();
    seed_store(
        &store,
        Some(expired_jwt().as_str()),
        Some(issue_refresh_token().as_str()),
        Some(&app.test_user.info),
    );

    // Act
    let client = TestClient::from_app(app, store);

    // Assert
    assert!(!client.session.is_authenticated());
    assert!(session_slots_empty(&client.store));
    assert!(client.app.api.requests().is_empty());
}

#[tokio::test]
async fn token_without_cached_user_is_cleared() {
    // Arrange - as left by a write interrupted after the token
    let app = spawn_app().await;
    let store = MemoryStore::new();
    seed_store(&store, Some(jwt_valid_for(Seconds::new(600)).as_str()), Some("r"), None);

    // Act
    let client = TestClient::from_app(app, store);

    // Assert
    assert!(!client.session.is_authenticated());
    assert!(session_slots_empty(&client.store));
}

#[tokio::test]
async fn cached_user_without_token_is_cleared() {
    // Arrange - as left by a write interrupted before the token
    let app = spawn_app().await;
    let store = MemoryStore::new();
    seed_store(&store, None, Some("r"), Some(&app.test_user.info));

    // Act
    let client = TestClient::from_app(app, store);

    // Assert
    assert!(!client.session.is_authenticated());
    assert!(session_slots_empty(&client.store));
}

#[tokio::test]
async fn token_without_readable_expiry_is_cleared() {
    // Arrange
    let app = spawn_app().await;
    let store = MemoryStore::new();
    seed_store(&store, Some("opaque-token"), Some("r"), Some(&app.test_user.info));

    // Act
    let client = TestClient::from_app(app, store);

    // Assert
    assert!(!client.session.is_authenticated());
    assert!(session_slots_empty(&client.store));
}

#[tokio::test]
async fn revalidate_local_drops_session_once_token_expires() {
    // Arrange
    let client = TestClient::spawn_with(MockBehaviour {
        access_token_lifetime: Seconds::new(1),
        ..Default::default()
    })
    .await;
    client.login().await;
    assert!(client.session.revalidate_local());

    // Act
    tokio::time::sleep(Duration::from_millis(2100)).await;
    let still_valid = client.session.revalidate_local();

    // Assert
    assert!(!still_valid);
    assert!(!client.session.is_authenticated());
    assert!(session_slots_empty(&client.store));
}

#[tokio::test]
async fn session_survives_restart_with_file_store() {
    // Arrange
    let app = spawn_app_with(MockBehaviour::default()).await;
    let dir = std::env::temp_dir().join(format!("fleetdesk-restart-{}", unique_suffix()));
    let path = dir.join("session.json");
    let build = |store: Arc<dyn KeyValueStore>| {
        SessionManager::new(
            settings_for(&app.address),
            store,
            Arc::new(HistoryNavigator::new()),
        )
        .unwrap()
    };
    let first = build(Arc::new(FileStore::open(path.clone())));
    first.login(app.test_user.login_args()).await.unwrap();

    // Act
    let second = build(Arc::new(FileStore::open(path.clone())));

    // Assert
    assert!(second.is_authenticated());
    assert_eq!(second.current_user(), first.current_user());
    let _ = std::fs::remove_dir_all(dir);
}

fn unique_suffix() -> String {
    format!(
        "{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    )
}
