use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use parking_lot::Mutex;
use serde_json::{Value as JsonValue, json};
use url::Url;

use super::*;
use crate::error_message::{CONNECTION_FAILED, crate_error_message, response_error_message};
use crate::storage::MemoryStore;
use crate::types::LoginResponse;

/// How the fake API decides whether a protected call is authorized.
#[derive(Clone, Copy)]
enum Access {
    Open,
    Closed,
    AfterRefresh,
    Bearer(&'static str),
}

struct FakeApi {
    access: Access,
    refresh_status: StatusCode,
    refresh_body: &'static str,
    logout_status: StatusCode,
    protected_hits: AtomicUsize,
    refresh_hits: AtomicUsize,
    logout_hits: AtomicUsize,
    last_authorization: Mutex<Option<String>>,
    last_refresh_body: Mutex<Option<JsonValue>>,
    last_logout_body: Mutex<Option<JsonValue>>,
}

impl FakeApi {
    fn new(access: Access) -> Self {
        Self {
            access,
            refresh_status: StatusCode::OK,
            refresh_body: r#"{"mensaje":"Token refrescado"}"#,
            logout_status: StatusCode::OK,
            protected_hits: AtomicUsize::new(0),
            refresh_hits: AtomicUsize::new(0),
            logout_hits: AtomicUsize::new(0),
            last_authorization: Mutex::new(None),
            last_refresh_body: Mutex::new(None),
            last_logout_body: Mutex::new(None),
        }
    }

    fn refresh_answers(mut self, status: StatusCode, body: &'static str) -> Self {
        self.refresh_status = status;
        self.refresh_body = body;
        self
    }

    fn logout_answers(mut self, status: StatusCode) -> Self {
        self.logout_status = status;
        self
    }

    fn protected_hits(&self) -> usize {
        self.protected_hits.load(Ordering::SeqCst)
    }

    fn refresh_hits(&self) -> usize {
        self.refresh_hits.load(Ordering::SeqCst)
    }

    fn authorize(&self, headers: &HeaderMap) -> bool {
        self.protected_hits.fetch_add(1, Ordering::SeqCst);
        let authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        *self.last_authorization.lock() = authorization.clone();
        match self.access {
            Access::Open => true,
            Access::Closed => false,
            Access::AfterRefresh => self.refresh_hits() > 0,
            Access::Bearer(expected) => authorization.as_deref() == Some(expected),
        }
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"message": "Session expired", "code": "TOKEN_EXPIRED"})),
    )
        .into_response()
}

async fn budgets(State(api): State<Arc<FakeApi>>, headers: HeaderMap) -> Response {
    if !api.authorize(&headers) {
        return unauthorized();
    }
    Json(json!([{"id": 1, "nombre": "Marzo", "monto": 250000}])).into_response()
}

async fn create_income(
    State(api): State<Arc<FakeApi>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if !api.authorize(&headers) {
        return unauthorized();
    }
    (StatusCode::CREATED, body).into_response()
}

async fn refresh(State(api): State<Arc<FakeApi>>, body: String) -> Response {
    api.refresh_hits.fetch_add(1, Ordering::SeqCst);
    *api.last_refresh_body.lock() = serde_json::from_str(&body).ok();
    (api.refresh_status, api.refresh_body).into_response()
}

async fn logout(State(api): State<Arc<FakeApi>>, body: String) -> Response {
    api.logout_hits.fetch_add(1, Ordering::SeqCst);
    *api.last_logout_body.lock() = serde_json::from_str(&body).ok();
    api.logout_status.into_response()
}

async fn serve(api: FakeApi) -> (Url, Arc<FakeApi>) {
    let api = Arc::new(api);
    let router = Router::new()
        .route("/api/presupuestos", get(budgets))
        .route("/api/ingresos", post(create_income))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/logout", post(logout))
        .with_state(api.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{addr}").parse().unwrap(), api)
}

/// Base URL of a port nothing listens on.
async fn dead_base_url() -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}").parse().unwrap()
}

fn gateway(base: Url, mode: CredentialMode) -> AuthGateway<MemoryStore> {
    gateway_over(base, mode, MemoryStore::new())
}

// Proxy env vars must not reroute loopback traffic.
fn gateway_over<K: KeyValueStore>(base: Url, mode: CredentialMode, storage: K) -> AuthGateway<K> {
    let config = ApiConfig::new(base).with_credential_mode(mode);
    let http = reqwest::Client::builder()
        .cookie_store(true)
        .no_proxy()
        .build()
        .unwrap();
    AuthGateway::from_parts(&config, SessionStore::new(storage, mode), http)
}

/// Memory store whose writes can be switched off; removals keep working.
#[derive(Default)]
struct WriteLockedStore {
    inner: MemoryStore,
    locked: AtomicBool,
}

impl WriteLockedStore {
    fn lock_writes(&self) {
        self.locked.store(true, Ordering::SeqCst);
    }
}

impl KeyValueStore for WriteLockedStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: String) -> Result<(), Error> {
        if self.locked.load(Ordering::SeqCst) {
            return Err(Error::Storage(format!("write-locked: {key}")));
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        self.inner.remove(key)
    }
}

#[test]
fn new_uses_configured_credential_mode() {
    let config = ApiConfig::new("https://api.miroma.com".parse().unwrap())
        .with_credential_mode(CredentialMode::Bearer);
    let gateway = AuthGateway::new(&config, MemoryStore::new()).unwrap();

    assert_eq!(gateway.session().mode(), CredentialMode::Bearer);
    assert_eq!(
        gateway.endpoints().refresh().as_str(),
        "https://api.miroma.com/api/auth/refresh"
    );
}

fn login(token: Option<&str>, refresh_token: Option<&str>) -> LoginResponse {
    serde_json::from_value(json!({
        "token": token,
        "refreshToken": refresh_token,
        "id": 9,
        "nombre": "Pareja Demo",
        "email": "demo@miroma.com"
    }))
    .unwrap()
}

#[tokio::test]
async fn non_401_is_returned_without_other_calls() {
    let (base, api) = serve(FakeApi::new(Access::Open)).await;
    let gateway = gateway(base, CredentialMode::Cookie);

    let request = AuthRequest::get(gateway.endpoints().budgets().clone());
    let response = gateway.fetch(&request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(api.protected_hits(), 1);
    assert_eq!(api.refresh_hits(), 0);
}

#[tokio::test]
async fn expired_session_is_refreshed_and_retried_once() {
    let (base, api) = serve(FakeApi::new(Access::AfterRefresh)).await;
    let gateway = gateway(base, CredentialMode::Cookie);
    gateway.session().establish(&login(None, None)).unwrap();

    let request = AuthRequest::get(gateway.endpoints().budgets().clone());
    let response = gateway.fetch(&request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let budgets: JsonValue = response.json().await.unwrap();
    assert_eq!(budgets[0]["nombre"], "Marzo");

    assert_eq!(api.protected_hits(), 2);
    assert_eq!(api.refresh_hits(), 1);
    assert_eq!(*api.last_refresh_body.lock(), Some(json!({})));
    assert!(gateway.session().is_authenticated());
}

#[tokio::test]
async fn retried_response_is_returned_whatever_its_status() {
    let (base, api) = serve(FakeApi::new(Access::Closed)).await;
    let gateway = gateway(base, CredentialMode::Cookie);
    gateway.session().establish(&login(None, None)).unwrap();

    let request = AuthRequest::get(gateway.endpoints().budgets().clone());
    let response = gateway.fetch(&request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(api.protected_hits(), 2);
    assert_eq!(api.refresh_hits(), 1);
    assert!(gateway.session().is_authenticated());
}

#[tokio::test]
async fn retry_disabled_returns_401_immediately() {
    let (base, api) = serve(FakeApi::new(Access::Closed)).await;
    let gateway = gateway(base, CredentialMode::Cookie);
    gateway.session().establish(&login(None, None)).unwrap();

    let request = AuthRequest::get(gateway.endpoints().budgets().clone()).without_retry();
    let response = gateway.fetch(&request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(api.protected_hits(), 1);
    assert_eq!(api.refresh_hits(), 0);
    assert!(gateway.session().is_authenticated());
}

#[tokio::test]
async fn rejected_refresh_clears_session_and_returns_original_401() {
    let api = FakeApi::new(Access::Closed)
        .refresh_answers(StatusCode::UNAUTHORIZED, r#"{"message":"Refresh token revoked","code":"REVOKED"}"#);
    let (base, api) = serve(api).await;
    let gateway = gateway(base, CredentialMode::Cookie);
    gateway.session().establish(&login(None, None)).unwrap();
    gateway
        .session()
        .storage()
        .set("rememberedEmail", "demo@miroma.com".into())
        .unwrap();

    let request = AuthRequest::get(gateway.endpoints().budgets().clone());
    let response = gateway.fetch(&request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: JsonValue = response.json().await.unwrap();
    assert_eq!(body["code"], "TOKEN_EXPIRED");

    assert_eq!(api.protected_hits(), 1);
    assert_eq!(api.refresh_hits(), 1);
    assert!(!gateway.session().is_authenticated());
    assert!(gateway.session().storage().is_empty());
}

#[tokio::test]
async fn unreadable_refresh_body_counts_as_failure() {
    let api = FakeApi::new(Access::AfterRefresh).refresh_answers(StatusCode::OK, "<html>ok</html>");
    let (base, api) = serve(api).await;
    let gateway = gateway(base, CredentialMode::Cookie);
    gateway.session().establish(&login(None, None)).unwrap();

    let request = AuthRequest::get(gateway.endpoints().budgets().clone());
    let response = gateway.fetch(&request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(api.protected_hits(), 1);
    assert!(!gateway.session().is_authenticated());
}

#[tokio::test]
async fn request_body_is_resent_on_retry() {
    let (base, api) = serve(FakeApi::new(Access::AfterRefresh)).await;
    let gateway = gateway(base, CredentialMode::Cookie);

    let income = json!({"monto": 1500000, "descripcion": "Sueldo", "fecha": "2024-01-31"});
    let request = AuthRequest::post(gateway.endpoints().incomes().clone())
        .with_json(&income)
        .unwrap();
    let response = gateway.fetch(&request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let echoed: JsonValue = response.json().await.unwrap();
    assert_eq!(echoed, income);
    assert_eq!(api.protected_hits(), 2);
}

#[tokio::test]
async fn bearer_tokens_are_sent_and_rotated() {
    let api = FakeApi::new(Access::Bearer("Bearer access-2"))
        .refresh_answers(StatusCode::OK, r#"{"token":"access-2","refreshToken":"refresh-2","type":"Bearer"}"#);
    let (base, api) = serve(api).await;
    let gateway = gateway(base, CredentialMode::Bearer);
    gateway
        .session()
        .establish(&login(Some("access-1"), Some("refresh-1")))
        .unwrap();

    let request = AuthRequest::get(gateway.endpoints().budgets().clone());
    let response = gateway.fetch(&request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        *api.last_refresh_body.lock(),
        Some(json!({"refreshToken": "refresh-1"}))
    );
    assert_eq!(
        api.last_authorization.lock().as_deref(),
        Some("Bearer access-2")
    );
    let session = gateway.session().read();
    assert_eq!(session.access_token.as_deref(), Some("access-2"));
    assert_eq!(session.refresh_token.as_deref(), Some("refresh-2"));
}

#[tokio::test]
async fn cookie_mode_sends_no_authorization_header() {
    let (base, api) = serve(FakeApi::new(Access::Open)).await;
    let gateway = gateway(base, CredentialMode::Cookie);
    gateway
        .session()
        .establish(&login(Some("ignored"), Some("ignored")))
        .unwrap();

    let request = AuthRequest::get(gateway.endpoints().budgets().clone());
    gateway.fetch(&request).await.unwrap();

    assert_eq!(*api.last_authorization.lock(), None);
}

#[tokio::test]
async fn refresh_without_rotation_keeps_tokens() {
    let (base, _api) = serve(FakeApi::new(Access::Open)).await;
    let gateway = gateway(base, CredentialMode::Bearer);
    gateway
        .session()
        .establish(&login(Some("access-1"), Some("refresh-1")))
        .unwrap();

    let outcome = gateway.refresh_session().await;

    assert_eq!(outcome, RefreshOutcome::Succeeded(RotatedCredentials::default()));
    assert_eq!(gateway.session().access_token().as_deref(), Some("access-1"));
    assert_eq!(gateway.session().refresh_token().as_deref(), Some("refresh-1"));
}

#[tokio::test]
async fn transport_errors_propagate_without_refresh() {
    let gateway = gateway(dead_base_url().await, CredentialMode::Cookie);
    gateway.session().establish(&login(None, None)).unwrap();

    let request = AuthRequest::get(gateway.endpoints().budgets().clone());
    let result = gateway.fetch(&request).await;

    assert!(matches!(result, Err(Error::Http(_))));
    assert!(gateway.session().is_authenticated());
}

#[tokio::test]
async fn transport_error_maps_to_connection_message() {
    let gateway = gateway(dead_base_url().await, CredentialMode::Cookie);

    let request = AuthRequest::get(gateway.endpoints().budgets().clone());
    let err = gateway.fetch(&request).await.unwrap_err();

    assert_eq!(crate_error_message(&err), CONNECTION_FAILED);
}

#[tokio::test]
async fn unpersisted_rotation_fails_refresh_and_returns_original_401() {
    let api = FakeApi::new(Access::Bearer("Bearer access-2"))
        .refresh_answers(StatusCode::OK, r#"{"token":"access-2","refreshToken":"refresh-2"}"#);
    let (base, api) = serve(api).await;
    let gateway = gateway_over(base, CredentialMode::Bearer, WriteLockedStore::default());
    gateway
        .session()
        .establish(&login(Some("access-1"), Some("refresh-1")))
        .unwrap();
    gateway.session().storage().lock_writes();

    match gateway.refresh_session().await {
        RefreshOutcome::Failed(RefreshFailure::Storage(_)) => {}
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(gateway.session().access_token().as_deref(), Some("access-1"));

    let request = AuthRequest::get(gateway.endpoints().budgets().clone());
    let response = gateway.fetch(&request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: JsonValue = response.json().await.unwrap();
    assert_eq!(body["code"], "TOKEN_EXPIRED");
    assert_eq!(api.protected_hits(), 1);
    assert_eq!(api.refresh_hits(), 2);
    assert!(!gateway.session().is_authenticated());
}

#[tokio::test]
async fn unreachable_refresh_is_a_failure() {
    let gateway = gateway(dead_base_url().await, CredentialMode::Cookie);

    match gateway.refresh_session().await {
        RefreshOutcome::Failed(RefreshFailure::Transport(_)) => {}
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn error_message_from_unrecovered_response() {
    let (base, _api) = serve(FakeApi::new(Access::Closed)).await;
    let gateway = gateway(base, CredentialMode::Cookie);

    let request = AuthRequest::get(gateway.endpoints().budgets().clone()).without_retry();
    let response = gateway.fetch(&request).await.unwrap();

    assert_eq!(response_error_message(response).await, "Session expired");
}

#[tokio::test]
async fn logout_notifies_server_and_clears() {
    let (base, api) = serve(FakeApi::new(Access::Open)).await;
    let gateway = gateway(base, CredentialMode::Bearer);
    gateway
        .session()
        .establish(&login(Some("access-1"), Some("refresh-1")))
        .unwrap();

    let report = gateway.logout(LogoutOptions::default()).await.unwrap();

    assert_eq!(report.server, ServerNotice::Acknowledged);
    assert_eq!(api.logout_hits.load(Ordering::SeqCst), 1);
    assert_eq!(
        *api.last_logout_body.lock(),
        Some(json!({"refreshToken": "refresh-1"}))
    );
    assert!(!gateway.session().is_authenticated());
    assert!(gateway.session().storage().is_empty());
}

#[tokio::test]
async fn logout_survives_server_rejection() {
    let api = FakeApi::new(Access::Open).logout_answers(StatusCode::INTERNAL_SERVER_ERROR);
    let (base, _api) = serve(api).await;
    let gateway = gateway(base, CredentialMode::Cookie);
    gateway.session().establish(&login(None, None)).unwrap();

    let report = gateway.logout(LogoutOptions::default()).await.unwrap();

    assert_eq!(report.server, ServerNotice::Rejected(500));
    assert!(!gateway.session().is_authenticated());
}

#[tokio::test]
async fn logout_survives_unreachable_server() {
    let gateway = gateway(dead_base_url().await, CredentialMode::Cookie);
    gateway.session().establish(&login(None, None)).unwrap();

    let report = gateway.logout(LogoutOptions::default()).await.unwrap();

    assert!(matches!(report.server, ServerNotice::Unreachable(_)));
    assert!(!gateway.session().is_authenticated());
}

#[tokio::test]
async fn logout_without_notification() {
    let (base, api) = serve(FakeApi::new(Access::Open)).await;
    let gateway = gateway(base, CredentialMode::Cookie);
    gateway.session().establish(&login(None, None)).unwrap();

    let report = gateway
        .logout(LogoutOptions {
            notify_server: false,
        })
        .await
        .unwrap();

    assert_eq!(report.server, ServerNotice::Skipped);
    assert_eq!(api.logout_hits.load(Ordering::SeqCst), 0);
    assert!(!gateway.session().is_authenticated());
}
