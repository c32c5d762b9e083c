use crate::helpers::{settings_for, TestClient};
use fleetdesk_auth_test_helper::MockBehaviour;
use fleetdesk_client_core::{HistoryNavigator, MemoryStore, SessionError, SessionManager};
use std::{sync::Arc, time::Duration};

#[tokio::test]
async fn login_round_trip_exposes_user_from_response() {
    // Arrange
    let client = TestClient::spawn().await;
    assert!(!client.session.is_authenticated());

    // Act
    let session = client.login().await;

    // Assert
    let user = client.session.current_user().expect("user should be set");
    assert_eq!(*user, client.app.test_user.info);
    assert_eq!(*session.user, client.app.test_user.info);
    assert!(client.session.is_authenticated());
    assert_eq!(
        client.stored_access_token().as_deref(),
        Some(session.access_token.expose_secret())
    );
    assert!(session.expires_at.is_some());
    assert!(!client.session.snapshot().is_loading());
}

#[tokio::test]
async fn role_and_permission_predicates_read_cached_user() {
    // Arrange
    let client = TestClient::spawn().await;
    assert!(!client.session.has_role("manager"));

    // Act
    client.login().await;

    // Assert
    assert!(client.session.has_role("manager"));
    assert!(client.session.has_role("MANAGER"));
    assert!(!client.session.has_role("admin"));
    assert!(client.session.has_any_role(&["admin", "manager"]));
    assert!(!client.session.has_any_role(&["admin", "staff"]));
    assert!(client.session.has_permission("vehicles.view"));
    assert!(!client.session.has_permission("admins.manage"));
}

#[tokio::test]
async fn wrong_password_is_invalid_credentials() {
    // Arrange
    let client = TestClient::spawn().await;

    // Act
    let outcome = client
        .session
        .login(client.app.test_user.wrong_password_args())
        .await;

    // Assert
    assert_eq!(
        outcome.unwrap_err(),
        SessionError::InvalidCredentials("Invalid email or password".to_string())
    );
    assert!(!client.session.is_authenticated());
    assert!(!client.session.snapshot().is_loading());
}

#[tokio::test]
async fn failed_login_leaves_existing_session_untouched() {
    // Arrange
    let client = TestClient::spawn().await;
    let first = client.login().await;

    // Act
    let outcome = client
        .session
        .login(client.app.test_user.wrong_password_args())
        .await;

    // Assert
    assert!(outcome.unwrap_err().is_invalid_credentials());
    assert!(client.session.is_authenticated());
    assert_eq!(
        client.stored_access_token().as_deref(),
        Some(first.access_token.expose_secret())
    );
}

#[tokio::test]
async fn unreachable_server_is_network_error() {
    // Arrange
    let session = SessionManager::new(
        settings_for("http://127.0.0.1:9"),
        Arc::new(MemoryStore::new()),
        Arc::new(HistoryNavigator::new()),
    )
    .unwrap();
    let args = fleetdesk_shared::req_args::LoginReqArgs::new(
        "ops@fleet.example",
        "pw".to_string().into(),
    );

    // Act
    let outcome = session.login(args).await;

    // Assert
    assert!(outcome.unwrap_err().is_network());
    assert!(!session.snapshot().is_loading());
}

#[tokio::test]
async fn login_stores_preferred_language_only_when_unset() {
    // Arrange
    let client = TestClient::spawn().await;
    assert_eq!(client.session.language(), "en");

    // Act
    client.login().await;

    // Assert
    assert_eq!(client.session.language(), "ar");

    // Arrange - explicit preference wins over the profile
    client.session.set_language("fr").unwrap();

    // Act
    client.login().await;

    // Assert
    assert_eq!(client.session.language(), "fr");
}

#[tokio::test]
async fn loading_flag_raised_while_login_in_flight() {
    // Arrange
    let client = TestClient::spawn_with(MockBehaviour {
        login_delay: Duration::from_millis(300),
        ..Default::default()
    })
    .await;
    let mut rx = client.session.subscribe();
    let session = client.session.clone();
    let args = client.app.test_user.login_args();

    // Act
    let handle = tokio::spawn(async move { session.login(args).await });
    rx.wait_for(|x| x.is_loading()).await.unwrap();
    let outcome = handle.await.unwrap();

    // Assert
    assert!(outcome.is_ok());
    let snapshot = client.session.snapshot();
    assert!(!snapshot.is_loading());
    assert!(snapshot.is_authenticated());
}

#[tokio::test]
async fn abandoned_login_lowers_loading_flag_and_keeps_issued_session() {
    // Arrange
    let client = TestClient::spawn_with(MockBehaviour {
        login_delay: Duration::from_millis(300),
        ..Default::default()
    })
    .await;

    // Act
    let outcome = tokio::time::timeout(
        Duration::from_millis(50),
        client.session.login(client.app.test_user.login_args()),
    )
    .await;
    let loading_after_abandon = client.session.snapshot().is_loading();
    tokio::time::sleep(Duration::from_millis(600)).await;

    // Assert
    assert!(outcome.is_err(), "login should not have finished yet");
    assert!(!loading_after_abandon);
    assert_eq!(client.app.api.login_calls(), 1);
    assert!(client.session.is_authenticated());
    assert!(client.stored_access_token().is_some());
}
