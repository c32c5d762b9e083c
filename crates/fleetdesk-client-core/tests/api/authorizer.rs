use crate::helpers::TestClient;
use fleetdesk_auth_test_helper::MockBehaviour;
use fleetdesk_client_core::{ApiRequest, RequestError, SessionError};
use std::time::Duration;

#[tokio::test]
async fn login_endpoint_never_gets_authorization_header() {
    // Arrange - a token is in storage
    let client = TestClient::spawn().await;
    client.login().await;
    let request = ApiRequest::post("/auth/login")
        .json(&serde_json::json!({"email": "someone@fleet.example", "password": "nope"}))
        .unwrap();

    // Act
    let outcome = client.authorizer.send(request).await;

    // Assert - 401 on an anonymous endpoint is not retried
    assert!(outcome.unwrap_err().is_unauthorized());
    assert_eq!(client.app.api.refresh_calls(), 0);
    let logins = client.app.api.requests_to("/auth/login");
    assert_eq!(logins.len(), 2);
    assert!(logins.iter().all(|x| x.authorization.is_none()));
}

#[tokio::test]
async fn public_paths_bypass_authorization() {
    // Arrange
    let client = TestClient::spawn().await;
    client.login().await;

    // Act
    let branches: Vec<String> = client
        .authorizer
        .send_json(ApiRequest::get("/public/branches"))
        .await
        .unwrap();

    // Assert
    assert_eq!(branches, vec!["Downtown", "Airport"]);
    let recorded = client.app.api.requests_to("/public/branches");
    assert_eq!(recorded[0].authorization, None);
    assert_eq!(recorded[0].accept_language, None);
}

#[tokio::test]
async fn protected_request_carries_bearer_language_and_json_content_type() {
    // Arrange
    let client = TestClient::spawn().await;
    let session = client.login().await;

    // Act
    let vehicles: Vec<serde_json::Value> = client
        .authorizer
        .send_json(ApiRequest::get("/vehicles"))
        .await
        .unwrap();

    // Assert
    assert_eq!(vehicles.len(), 2);
    let recorded = &client.app.api.requests_to("/vehicles")[0];
    assert_eq!(
        recorded.authorization,
        Some(format!("Bearer {}", session.access_token.expose_secret()))
    );
    assert_eq!(recorded.accept_language.as_deref(), Some("ar"));
    assert_eq!(recorded.content_type.as_deref(), Some("application/json"));
}

#[tokio::test]
async fn language_header_follows_preference() {
    // Arrange
    let client = TestClient::spawn().await;
    client.login().await;
    client.session.set_language("fr").unwrap();

    // Act
    client
        .authorizer
        .send(ApiRequest::get("/vehicles"))
        .await
        .unwrap();

    // Assert
    let recorded = &client.app.api.requests_to("/vehicles")[0];
    assert_eq!(recorded.accept_language.as_deref(), Some("fr"));
}

#[tokio::test]
async fn without_session_401_is_returned_without_refresh() {
    // Arrange
    let client = TestClient::spawn().await;

    // Act
    let outcome = client.authorizer.send(ApiRequest::get("/vehicles")).await;

    // Assert
    assert!(outcome.unwrap_err().is_unauthorized());
    assert_eq!(client.app.api.refresh_calls(), 0);
    assert_eq!(client.app.api.requests_to("/vehicles")[0].authorization, None);
}

#[tokio::test]
async fn rejected_token_refreshed_and_request_retried_once() {
    // Arrange
    let client = TestClient::spawn().await;
    let original = client.login().await;
    client.app.api.invalidate_access_tokens();

    // Act
    let outcome = client.authorizer.send(ApiRequest::get("/vehicles")).await;

    // Assert
    assert!(outcome.is_ok());
    assert_eq!(client.app.api.refresh_calls(), 1);
    let recorded = client.app.api.requests_to("/vehicles");
    assert_eq!(recorded.len(), 2);
    let new_token = client.stored_access_token().unwrap();
    assert_ne!(new_token, original.access_token.expose_secret());
    assert_eq!(recorded[1].authorization, Some(format!("Bearer {new_token}")));
}

#[tokio::test]
async fn second_401_returned_to_caller() {
    // Arrange
    let client = TestClient::spawn_with(MockBehaviour {
        always_unauthorized: true,
        ..Default::default()
    })
    .await;
    client.login().await;

    // Act
    let outcome = client.authorizer.send(ApiRequest::get("/vehicles")).await;

    // Assert
    assert!(matches!(outcome, Err(RequestError::Unauthorized(_))));
    assert_eq!(client.app.api.refresh_calls(), 1);
    assert_eq!(client.app.api.requests_to("/vehicles").len(), 2);
    assert!(client.session.is_authenticated());
}

#[tokio::test]
async fn concurrent_401s_share_one_refresh_and_retry_with_same_token() {
    // Arrange
    let client = TestClient::spawn_with(MockBehaviour {
        refresh_delay: Duration::from_millis(200),
        ..Default::default()
    })
    .await;
    client.login().await;
    client.app.api.invalidate_access_tokens();
    let request_count = 5;

    // Act
    let outcomes = futures::future::join_all(
        (0..request_count).map(|_| client.authorizer.send(ApiRequest::get("/vehicles"))),
    )
    .await;

    // Assert
    assert!(outcomes.iter().all(|x| x.is_ok()));
    assert_eq!(client.app.api.refresh_calls(), 1);
    let expected = Some(format!(
        "Bearer {}",
        client.stored_access_token().unwrap()
    ));
    let recorded = client.app.api.requests_to("/vehicles");
    assert_eq!(recorded.len(), request_count * 2);
    let retries = &recorded[request_count..];
    assert!(retries.iter().all(|x| x.authorization == expected));
}

#[tokio::test]
async fn failed_refresh_logs_out_and_surfaces_refresh_error() {
    // Arrange
    let client = TestClient::spawn_with(MockBehaviour {
        reject_refresh: true,
        ..Default::default()
    })
    .await;
    client.login().await;
    client.app.api.invalidate_access_tokens();

    // Act
    let outcome = client.authorizer.send(ApiRequest::get("/vehicles")).await;

    // Assert
    assert!(matches!(
        outcome,
        Err(RequestError::Refresh(SessionError::RefreshRejected(_)))
    ));
    assert!(!client.session.is_authenticated());
    assert_eq!(client.current_location().as_deref(), Some("/auth/login"));
    assert_eq!(client.app.api.requests_to("/vehicles").len(), 1);
}

#[tokio::test]
async fn forbidden_redirects_without_refresh() {
    // Arrange
    let client = TestClient::spawn().await;
    client.login().await;

    // Act
    let outcome = client.authorizer.send(ApiRequest::get("/admin/reports")).await;

    // Assert
    let err = outcome.unwrap_err();
    assert!(matches!(err, RequestError::Forbidden(_)));
    assert_eq!(err.status(), Some(403));
    assert_eq!(client.app.api.refresh_calls(), 0);
    assert_eq!(client.current_location().as_deref(), Some("/unauthorized"));
    assert!(client.session.is_authenticated());
}

#[tokio::test]
async fn multipart_body_gets_transport_content_type() {
    // Arrange
    let client = TestClient::spawn().await;
    client.login().await;
    let request = ApiRequest::post("/uploads")
        .text_part("vehicleId", "7")
        .file_part("photo", "front.png", Some("image/png"), vec![0x89, 0x50, 0x4e, 0x47]);

    // Act
    let outcome = client.authorizer.send(request).await;

    // Assert
    assert!(outcome.is_ok());
    let recorded = &client.app.api.requests_to("/uploads")[0];
    let content_type = recorded.content_type.as_deref().unwrap();
    assert!(
        content_type.starts_with("multipart/form-data; boundary="),
        "unexpected content type: {content_type}"
    );
    assert!(recorded.authorization.is_some());
}

#[tokio::test]
async fn multipart_body_resent_after_refresh() {
    // Arrange
    let client = TestClient::spawn().await;
    client.login().await;
    client.app.api.invalidate_access_tokens();
    let request = ApiRequest::post("/uploads").file_part("photo", "side.png", None, vec![1, 2]);

    // Act
    let outcome = client.authorizer.send(request).await;

    // Assert
    assert!(outcome.is_ok());
    assert_eq!(client.app.api.requests_to("/uploads").len(), 2);
}

#[tokio::test]
async fn unsuccessful_envelope_on_http_ok_is_application_error() {
    // Arrange
    let client = TestClient::spawn().await;
    client.login().await;

    // Act
    let outcome = client
        .authorizer
        .send_json::<serde_json::Value>(ApiRequest::post("/bookings/conflict"))
        .await;

    // Assert
    let failure = match outcome {
        Err(RequestError::Application(failure)) => failure,
        other => panic!("expected an application failure, got: {other:?}"),
    };
    assert_eq!(failure.message, "Vehicle is already booked for these dates");
    assert_eq!(failure.errors, vec!["Vehicle is already booked"]);
    assert_eq!(failure.status_code, Some(409));
}

#[tokio::test]
async fn slow_response_times_out_as_network_error() {
    // Arrange
    let client = TestClient::spawn_with(MockBehaviour {
        slow_delay: Duration::from_secs(3),
        ..Default::default()
    })
    .await;

    // Act
    let outcome = client.authorizer.send(ApiRequest::get("/slow")).await;

    // Assert
    assert!(
        matches!(outcome, Err(RequestError::Network(_))),
        "unexpected outcome: {outcome:?}"
    );
}
