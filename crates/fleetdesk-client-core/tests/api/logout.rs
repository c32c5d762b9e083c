use crate::helpers::{session_slots_empty, TestClient};

#[tokio::test]
async fn logout_clears_session_and_goes_to_login() {
    // Arrange
    let client = TestClient::spawn().await;
    client.login().await;

    // Act
    client.session.logout();

    // Assert
    assert!(!client.session.is_authenticated());
    assert!(client.session.current_user().is_none());
    assert!(session_slots_empty(&client.store));
    assert_eq!(client.current_location().as_deref(), Some("/auth/login"));
}

#[tokio::test]
async fn logout_twice_same_as_once() {
    // Arrange
    let client = TestClient::spawn().await;
    client.login().await;

    // Act
    client.session.logout();
    let after_first = (client.session.snapshot(), client.store.len(), client.navigator.history());
    client.session.logout();
    let after_second = (client.session.snapshot(), client.store.len(), client.navigator.history());

    // Assert
    assert_eq!(after_first, after_second);
}

#[tokio::test]
async fn logout_keeps_language_preference() {
    // Arrange
    let client = TestClient::spawn().await;
    client.login().await;
    client.session.set_language("fr").unwrap();

    // Act
    client.session.logout();

    // Assert
    assert_eq!(client.session.language(), "fr");
}

#[tokio::test]
async fn server_notified_of_logout() {
    // Arrange
    let client = TestClient::spawn().await;
    let session = client.login().await;

    // Act
    client.session.logout_and_notify_server().await;

    // Assert
    assert!(!client.session.is_authenticated());
    assert_eq!(client.app.api.logout_calls(), 1);
    assert!(!client
        .app
        .api
        .is_refresh_token_valid(session.refresh_token.expose_secret()));
}

#[tokio::test]
async fn logout_without_session_does_not_call_server() {
    // Arrange
    let client = TestClient::spawn().await;

    // Act
    client.session.logout_and_notify_server().await;

    // Assert
    assert_eq!(client.app.api.logout_calls(), 0);
    assert_eq!(client.current_location().as_deref(), Some("/auth/login"));
}
