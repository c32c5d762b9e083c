use actix_web::{
    body::MessageBody,
    dev::{Server, ServiceRequest, ServiceResponse},
    http::{header, StatusCode},
    middleware::{from_fn, Next},
    web, App, HttpRequest, HttpResponse, HttpServer,
};
use anyhow::Context as _;
use fleetdesk_shared::req_args::LoginReqArgs;
use fleetdesk_time::{Seconds, Timestamp};
use secrecy::ExposeSecret as _;
use std::{
    collections::HashSet,
    net::TcpListener,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tracing::info;
use tracing_actix_web::TracingLogger;

use crate::{issue_jwt, issue_refresh_token, TestUser, DEFAULT_ACCESS_TOKEN_LIFETIME};

/// Knobs tests turn to provoke the paths they want to exercise
#[derive(Debug, Clone)]
pub struct MockBehaviour {
    pub login_delay: Duration,
    pub refresh_delay: Duration,
    /// How long `GET /slow` takes to answer
    pub slow_delay: Duration,
    pub reject_refresh: bool,
    /// Protected resources answer 401 no matter which token is sent
    pub always_unauthorized: bool,
    pub access_token_lifetime: Seconds,
}

impl Default for MockBehaviour {
    fn default() -> Self {
        Self {
            login_delay: Duration::ZERO,
            refresh_delay: Duration::ZERO,
            slow_delay: Duration::from_secs(5),
            reject_refresh: false,
            always_unauthorized: false,
            access_token_lifetime: DEFAULT_ACCESS_TOKEN_LIFETIME,
        }
    }
}

/// The headers the client sent with one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub accept_language: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Debug)]
pub struct MockAuthApi {
    user: TestUser,
    behaviour: Mutex<MockBehaviour>,
    login_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    logout_calls: AtomicUsize,
    access_tokens: Mutex<HashSet<String>>,
    refresh_tokens: Mutex<HashSet<String>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshBody {
    refresh_token: String,
}

impl MockAuthApi {
    pub(crate) fn new(user: TestUser, behaviour: MockBehaviour) -> Self {
        Self {
            user,
            behaviour: Mutex::new(behaviour),
            login_calls: Default::default(),
            refresh_calls: Default::default(),
            logout_calls: Default::default(),
            access_tokens: Default::default(),
            refresh_tokens: Default::default(),
            requests: Default::default(),
        }
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("mutex poisoned").clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|x| x.path == path)
            .collect()
    }

    pub fn set_behaviour<F: FnOnce(&mut MockBehaviour)>(&self, f: F) {
        f(&mut self.behaviour.lock().expect("mutex poisoned"));
    }

    /// Makes the server reject every access token issued so far while the
    /// client still believes they are valid
    pub fn invalidate_access_tokens(&self) {
        self.access_tokens.lock().expect("mutex poisoned").clear();
    }

    pub fn is_refresh_token_valid(&self, token: &str) -> bool {
        self.refresh_tokens
            .lock()
            .expect("mutex poisoned")
            .contains(token)
    }

    /// Issues and registers a token pair as if the user had logged in
    pub fn issue_session(&self) -> (String, String) {
        let lifetime = self.behaviour().access_token_lifetime;
        let access = issue_jwt(self.user.info.id.as_ref(), Timestamp::now() + lifetime);
        let refresh = issue_refresh_token();
        self.access_tokens
            .lock()
            .expect("mutex poisoned")
            .insert(access.clone());
        self.refresh_tokens
            .lock()
            .expect("mutex poisoned")
            .insert(refresh.clone());
        (access, refresh)
    }

    fn behaviour(&self) -> MockBehaviour {
        self.behaviour.lock().expect("mutex poisoned").clone()
    }

    fn record(&self, request: RecordedRequest) {
        self.requests.lock().expect("mutex poisoned").push(request);
    }

    fn is_authorized(&self, req: &HttpRequest) -> bool {
        if self.behaviour().always_unauthorized {
            return false;
        }
        let Some(token) = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|x| x.to_str().ok())
            .and_then(|x| x.strip_prefix("Bearer "))
        else {
            return false;
        };
        self.access_tokens
            .lock()
            .expect("mutex poisoned")
            .contains(token)
    }

    fn auth_payload(&self) -> serde_json::Value {
        let (access, refresh) = self.issue_session();
        let expires_at = Timestamp::now() + self.behaviour().access_token_lifetime;
        serde_json::json!({
            "token": access,
            "refreshToken": refresh,
            "user": self.user.info,
            "expiresAt": expires_at.to_string(),
        })
    }
}

pub(crate) fn build_server(api: Arc<MockAuthApi>) -> anyhow::Result<(Server, u16)> {
    let listener =
        TcpListener::bind("127.0.0.1:0").context("failed to bind to a random local port")?;
    let port = listener
        .local_addr()
        .context("failed to get local address of listener")?
        .port();
    info!(?port, "Port assigned to the mock server is {port}");
    let api = web::Data::from(api);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(from_fn(record_request))
            .wrap(TracingLogger::default())
            .service(
                web::scope("/auth")
                    .route("/login", web::post().to(login))
                    .route("/refresh", web::post().to(refresh))
                    .route("/logout", web::post().to(logout)),
            )
            .route("/vehicles", web::get().to(vehicles))
            .route("/admin/reports", web::get().to(reports))
            .route("/bookings/conflict", web::post().to(booking_conflict))
            .route("/uploads", web::post().to(uploads))
            .route("/public/branches", web::get().to(public_branches))
            .route("/slow", web::get().to(slow))
            .app_data(api.clone())
    })
    .workers(1)
    .listen(listener)
    .context("Failed to bind HTTP Server to listener")?
    .run();
    Ok((server, port))
}

async fn record_request(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    if let Some(api) = req.app_data::<web::Data<MockAuthApi>>() {
        let header_value = |name: header::HeaderName| {
            req.headers()
                .get(name)
                .and_then(|x| x.to_str().ok())
                .map(str::to_string)
        };
        api.record(RecordedRequest {
            method: req.method().to_string(),
            path: req.path().to_string(),
            authorization: header_value(header::AUTHORIZATION),
            accept_language: header_value(header::ACCEPT_LANGUAGE),
            content_type: header_value(header::CONTENT_TYPE),
        });
    }
    next.call(req).await
}

fn envelope_ok(data: serde_json::Value) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "data": data,
        "succeeded": true,
        "message": null,
        "statusCode": "OK",
        "statusCodeValue": 200,
    }))
}

fn envelope_failure(status: StatusCode, message: &str) -> HttpResponse {
    HttpResponse::build(status).json(serde_json::json!({
        "data": null,
        "succeeded": false,
        "message": message,
        "statusCode": status.canonical_reason(),
        "statusCodeValue": status.as_u16(),
    }))
}

async fn login(
    api: web::Data<MockAuthApi>,
    web::Json(args): web::Json<LoginReqArgs>,
) -> HttpResponse {
    api.login_calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(api.behaviour().login_delay).await;
    if args.email == api.user.email && args.password.expose_secret() == api.user.password {
        envelope_ok(api.auth_payload())
    } else {
        envelope_failure(StatusCode::UNAUTHORIZED, "Invalid email or password")
    }
}

async fn refresh(
    api: web::Data<MockAuthApi>,
    web::Json(body): web::Json<RefreshBody>,
) -> HttpResponse {
    api.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let behaviour = api.behaviour();
    tokio::time::sleep(behaviour.refresh_delay).await;
    let was_valid = api
        .refresh_tokens
        .lock()
        .expect("mutex poisoned")
        .remove(&body.refresh_token);
    if behaviour.reject_refresh || !was_valid {
        return envelope_failure(StatusCode::UNAUTHORIZED, "Invalid or expired refresh token");
    }
    // Rotation: every earlier access token stops working
    api.invalidate_access_tokens();
    envelope_ok(api.auth_payload())
}

async fn logout(
    api: web::Data<MockAuthApi>,
    web::Json(body): web::Json<RefreshBody>,
) -> HttpResponse {
    api.logout_calls.fetch_add(1, Ordering::SeqCst);
    api.refresh_tokens
        .lock()
        .expect("mutex poisoned")
        .remove(&body.refresh_token);
    envelope_ok(serde_json::Value::Null)
}

async fn vehicles(req: HttpRequest, api: web::Data<MockAuthApi>) -> HttpResponse {
    if !api.is_authorized(&req) {
        return envelope_failure(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    envelope_ok(serde_json::json!([
        {"id": 1, "plate": "ABC-123", "model": "Corolla"},
        {"id": 2, "plate": "XYZ-789", "model": "Tucson"},
    ]))
}

async fn reports(req: HttpRequest, api: web::Data<MockAuthApi>) -> HttpResponse {
    if !api.is_authorized(&req) {
        return envelope_failure(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    envelope_failure(StatusCode::FORBIDDEN, "Reports are restricted to admins")
}

/// Application level failure reported with HTTP 200
async fn booking_conflict(req: HttpRequest, api: web::Data<MockAuthApi>) -> HttpResponse {
    if !api.is_authorized(&req) {
        return envelope_failure(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    HttpResponse::Ok().json(serde_json::json!({
        "data": null,
        "succeeded": false,
        "message": "Vehicle is already booked for these dates",
        "errors": {"VehicleId": ["Vehicle is already booked"]},
        "statusCode": "Conflict",
        "statusCodeValue": 409,
    }))
}

async fn uploads(
    req: HttpRequest,
    api: web::Data<MockAuthApi>,
    _body: web::Bytes,
) -> HttpResponse {
    if !api.is_authorized(&req) {
        return envelope_failure(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    envelope_ok(serde_json::json!({"stored": true}))
}

async fn public_branches() -> HttpResponse {
    envelope_ok(serde_json::json!(["Downtown", "Airport"]))
}

async fn slow(api: web::Data<MockAuthApi>) -> HttpResponse {
    tokio::time::sleep(api.behaviour().slow_delay).await;
    envelope_ok(serde_json::Value::Null)
}
