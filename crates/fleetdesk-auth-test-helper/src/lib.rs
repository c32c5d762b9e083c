//! Supporting code for the session pipeline integration tests
//!
//! [`spawn_app`] starts a mock of the Auth API (plus a few protected and
//! public resources) on a random local port. The mock counts calls and
//! records the headers of every request so tests can assert on them

#![warn(unused_crate_dependencies)]

use anyhow::Context as _;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use fleetdesk_shared::{
    req_args::LoginReqArgs,
    telemetry::{self, get_subscriber, init_subscriber},
    uac::{DisplayName, Email, RoleName, UserId, UserInfo},
};
use fleetdesk_time::{Seconds, Timestamp};
use std::{fmt::Debug, ops::Deref, sync::Arc, sync::LazyLock};
use uuid::Uuid;

mod mock_api;

pub use mock_api::{MockAuthApi, MockBehaviour, RecordedRequest};

/// Lifetime of access tokens issued by the mock unless changed through
/// [`MockBehaviour`]
pub const DEFAULT_ACCESS_TOKEN_LIFETIME: Seconds = Seconds::new(15 * 60);

// Ensure that the `tracing` stack is only initialised once
pub static TRACING: LazyLock<String> = LazyLock::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();
    if std::env::var("TEST_LOG").is_ok() {
        let log_file_name = format!("client_tests{}", Uuid::new_v4());
        let (file, path) = telemetry::create_trace_file(&log_file_name).unwrap();
        let subscriber = get_subscriber(subscriber_name, default_filter_level, file);
        init_subscriber(subscriber).unwrap();
        format!("Traces for tests being written to: {path:?}")
    } else {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_subscriber(subscriber).unwrap();
        "Traces set to std::io::sink".to_string()
    }
});

pub struct TestApp {
    /// Base url of the mock, use as the API base url
    pub address: String,
    pub api: Arc<MockAuthApi>,
    pub test_user: TestUser,
}

impl Debug for TestApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestApp")
            .field("address", &self.address)
            .field("test_user", &self.test_user)
            .finish()
    }
}

/// Starts tracing (once) and the mock server on a random port
pub async fn spawn_app() -> TestApp {
    spawn_app_with(MockBehaviour::default()).await
}

pub async fn spawn_app_with(behaviour: MockBehaviour) -> TestApp {
    start_tracing();
    let test_user = TestUser::generate();
    let api = Arc::new(MockAuthApi::new(test_user.clone(), behaviour));
    let (server, port) = mock_api::build_server(Arc::clone(&api))
        .context("failed to build mock server")
        .unwrap();
    tokio::spawn(server);
    TestApp {
        address: port_to_test_address(port),
        api,
        test_user,
    }
}

pub fn port_to_test_address(application_port: u16) -> String {
    format!("http://127.0.0.1:{application_port}")
}

fn start_tracing() {
    // Accessing TRACING also forces the LazyLock to initialize
    let logging_msg = TRACING.deref();
    println!("{logging_msg}");
}

#[derive(Debug, Clone)]
pub struct TestUser {
    pub email: String,
    pub password: String,
    pub info: UserInfo,
}

impl TestUser {
    pub fn generate() -> Self {
        let email = format!("ops-{}@fleet.example", &Uuid::new_v4().to_string()[..8]);
        Self {
            info: sample_user(&email, "manager", &["vehicles.view", "bookings.edit"]),
            email,
            password: Uuid::new_v4().to_string(),
        }
    }

    pub fn login_args(&self) -> LoginReqArgs {
        LoginReqArgs::new(self.email.clone(), self.password.clone().into())
    }

    pub fn wrong_password_args(&self) -> LoginReqArgs {
        LoginReqArgs::new(self.email.clone(), Uuid::new_v4().to_string().into())
    }
}

pub fn sample_user(email: &str, role: &str, permissions: &[&str]) -> UserInfo {
    UserInfo {
        id: UserId::new("42"),
        email: Email::try_from(email).unwrap(),
        display_name: DisplayName::try_from("Fleet Operator").unwrap(),
        role: RoleName::try_from(role).unwrap(),
        preferred_language: Some("ar".to_string()),
        permissions: permissions.iter().copied().collect(),
    }
}

/// Builds an unsigned JWT that only the client's expiry check will accept
pub fn issue_jwt(subject: &str, expires_at: Timestamp) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = serde_json::json!({
        "sub": subject,
        "exp": expires_at.as_secs_since_unix_epoch(),
        "jti": Uuid::new_v4().to_string(),
    });
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    let signature = URL_SAFE_NO_PAD.encode("mock-signature");
    format!("{header}.{payload}.{signature}")
}

pub fn issue_refresh_token() -> String {
    format!("refresh-{}", Uuid::new_v4())
}

/// A token that is still valid by the local clock for `lifetime`
pub fn jwt_valid_for(lifetime: Seconds) -> String {
    issue_jwt("42", Timestamp::now() + lifetime)
}

/// A token whose `exp` is already in the past
pub fn expired_jwt() -> String {
    issue_jwt("42", Timestamp::now() - Seconds::new(3600))
}
