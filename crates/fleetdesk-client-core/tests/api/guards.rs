use crate::helpers::TestClient;
use fleetdesk_client_core::{GuardOutcome, NavigationTarget, Navigator, RouteData};
use fleetdesk_shared::uac::Permission;

#[tokio::test]
async fn anonymous_user_redirected_to_login_with_return_url() {
    // Arrange
    let client = TestClient::spawn().await;

    // Act
    let outcome = client.guards.auth_guard("/dashboard");

    // Assert
    assert!(!outcome.is_allowed());
    let location = client.current_location().unwrap();
    let target = NavigationTarget::parse(&location);
    assert_eq!(target.path, "/auth/login");
    assert_eq!(target.query_param("returnUrl"), Some("/dashboard"));
}

#[tokio::test]
async fn auth_redirect_replaces_history() {
    // Arrange
    let client = TestClient::spawn().await;
    client.navigator.navigate(NavigationTarget::push("/vehicles"));

    // Act
    client.guards.auth_guard("/dashboard");

    // Assert
    assert_eq!(client.navigator.history().len(), 1);
}

#[tokio::test]
async fn manager_allowed_on_admin_or_manager_route() {
    // Arrange
    let client = TestClient::spawn().await;
    client.login().await;

    // Act
    let outcome = client.guards.role_guard(&["admin", "manager"], "/fleet");

    // Assert
    assert_eq!(outcome, GuardOutcome::Allow);
    assert!(client.navigator.history().is_empty());
}

#[tokio::test]
async fn manager_sent_to_unauthorized_on_admin_route() {
    // Arrange
    let client = TestClient::spawn().await;
    client.login().await;

    // Act
    let outcome = client.guards.role_guard(&["admin"], "/admin/users");

    // Assert
    assert!(!outcome.is_allowed());
    assert_eq!(client.current_location().as_deref(), Some("/unauthorized"));
}

#[tokio::test]
async fn authenticated_user_kept_off_login_page() {
    // Arrange
    let client = TestClient::spawn().await;
    assert!(client.guards.guest_guard().is_allowed());
    client.login().await;

    // Act
    let outcome = client.guards.guest_guard();

    // Assert
    assert!(!outcome.is_allowed());
    assert_eq!(client.current_location().as_deref(), Some("/dashboard"));
}

#[tokio::test]
async fn permission_guard_needs_every_permission() {
    // Arrange
    let client = TestClient::spawn().await;
    client.login().await;
    let held = [Permission::from("vehicles.view"), Permission::from("bookings.edit")];
    let partly_held = [Permission::from("vehicles.view"), Permission::from("admins.manage")];

    // Act
    let allowed = client.guards.permission_guard(&held, "/bookings");
    let denied = client.guards.permission_guard(&partly_held, "/admins");

    // Assert
    assert!(allowed.is_allowed());
    assert!(!denied.is_allowed());
    assert_eq!(client.current_location().as_deref(), Some("/unauthorized"));
}

#[tokio::test]
async fn route_data_guard_checks_in_order() {
    // Arrange
    let client = TestClient::spawn().await;
    let data = RouteData::new()
        .roles(["manager"])
        .permissions(["vehicles.view"]);

    // Act
    let before_login = client.guards.route_data_guard(&data, "/vehicles");
    client.login().await;
    let after_login = client.guards.route_data_guard(&data, "/vehicles");

    // Assert
    assert!(!before_login.is_allowed());
    assert!(after_login.is_allowed());
    let first_redirect = NavigationTarget::parse(&client.navigator.history()[0]);
    assert_eq!(first_redirect.path, "/auth/login");
}

#[tokio::test]
async fn guards_follow_logout() {
    // Arrange
    let client = TestClient::spawn().await;
    client.login().await;
    assert!(client.guards.auth_guard("/dashboard").is_allowed());

    // Act
    client.session.logout();
    let outcome = client.guards.auth_guard("/dashboard");

    // Assert
    assert!(!outcome.is_allowed());
}

#[tokio::test]
async fn post_login_target_uses_return_url() {
    // Arrange
    let client = TestClient::spawn().await;
    client.guards.auth_guard("/bookings?status=open");
    let login_url = client.current_location().unwrap();

    // Act
    client.login().await;
    let target = client.guards.post_login_target(&login_url);

    // Assert
    assert_eq!(target.to_url(), "/bookings?status=open");
    assert!(target.replace_url);
}
