//! BackendClient against a scripted local HTTP server.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::routing::any;
use axum::Router;
use chrono::NaiveDate;
use tokio::net::TcpListener;

use routecache_core::api::cancellable;
use routecache_core::clock::{Clock, ManualClock};
use routecache_core::models::{Credentials, DeliveryStatus, PackageSource, SelectedCompany, StatusUpdate};
use routecache_core::{
    load_companies, sign_in, ApiError, AppState, BackendClient, ClientConfig,
    CompanyDirectoryCache, FallbackPolicy, MemoryStore, SessionCache,
};

#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    path: String,
    headers: HashMap<String, String>,
    body: String,
}

impl Recorded {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("request body is JSON")
    }
}

type RequestLog = Arc<Mutex<Vec<Recorded>>>;

fn record(log: &RequestLog, method: Method, uri: &Uri, headers: &HeaderMap, body: String) {
    let headers = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                value.to_str().unwrap_or_default().to_string(),
            )
        })
        .collect();
    log.lock().expect("request log lock").push(Recorded {
        method: method.to_string(),
        path: uri.path().to_string(),
        headers,
        body,
    });
}

/// Answers each scripted path with a fixed status and JSON body and records
/// every request it sees. Unscripted paths get an empty 404.
struct ScriptedServer {
    base_url: String,
    requests: RequestLog,
}

impl ScriptedServer {
    async fn start(routes: &[(&str, u16, &str)]) -> Self {
        let requests = RequestLog::default();

        let mut app = Router::new();
        for (path, status, body) in routes {
            let status = StatusCode::from_u16(*status).expect("valid status code");
            let body = body.to_string();
            let log = requests.clone();
            app = app.route(
                path,
                any(
                    move |method: Method, uri: Uri, headers: HeaderMap, request_body: String| {
                        let log = log.clone();
                        let body = body.clone();
                        async move {
                            record(&log, method, &uri, &headers, request_body);
                            (status, [(header::CONTENT_TYPE, "application/json")], body)
                        }
                    },
                ),
            );
        }
        let log = requests.clone();
        app = app.fallback(
            move |method: Method, uri: Uri, headers: HeaderMap, request_body: String| {
                let log = log.clone();
                async move {
                    record(&log, method, &uri, &headers, request_body);
                    StatusCode::NOT_FOUND
                }
            },
        );

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind scripted server");
        let addr = listener.local_addr().expect("resolve scripted server address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{}", addr),
            requests,
        }
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().expect("request log lock").clone()
    }

    fn last_request(&self) -> Recorded {
        self.requests().pop().expect("at least one request")
    }

    fn client(&self, fallback: FallbackPolicy) -> BackendClient {
        let config = ClientConfig::new(self.base_url.clone())
            .with_fallback(fallback)
            .with_timeout(Duration::from_secs(5));
        BackendClient::new(config).expect("client")
    }
}

/// A base URL nothing listens on.
async fn refused_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{}", addr)
}

const LOGIN_OK: &str =
    r#"{"success":true,"authentication":{"matricule":"PCP0010699_A187518","token":"tok-1"}}"#;
const LOGIN_REJECTED: &str =
    r#"{"success":false,"authentication":null,"error":{"message":"bad creds","code":"AUTH_FAILED"}}"#;
const COMPANIES_OK: &str = r#"{"success":true,"companies":[{"code":"PCP0010699","name":"INTI"},{"code":"ACM","name":"Acme","description":"Acme Logistics"}]}"#;
const PACKAGES_ONE: &str = r#"{"success":true,"message":"1 package","packages":[{"id":"42","tracking_number":"LIVE0001","recipient_name":"Paul","address":"1 Rue X, 75002 Paris","status":"Pendiente"}]}"#;
const PACKAGES_EMPTY: &str = r#"{"success":true,"packages":[]}"#;

// ============================================================================
// Headers and request bodies
// ============================================================================

#[tokio::test]
async fn test_fixed_headers_are_sent() {
    let server = ScriptedServer::start(&[("/api/colis-prive/auth", 200, LOGIN_OK)]).await;
    let client = server.client(FallbackPolicy::Strict);

    client.login("A187518", "secret", "PCP0010699").await.expect("login");

    let request = server.last_request();
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/api/colis-prive/auth");
    assert_eq!(request.header("accept-charset"), Some("UTF-8"));
    assert_eq!(request.header("content-type"), Some("application/json; charset=UTF-8"));
    assert_eq!(request.header("connection"), Some("Keep-Alive"));
    assert_eq!(request.header("accept-encoding"), Some("gzip"));
    assert_eq!(request.header("user-agent"), Some("okhttp/3.4.1"));
    assert_eq!(request.header("authorization"), None);
}

#[tokio::test]
async fn test_login_body_uses_societe() {
    let server = ScriptedServer::start(&[("/api/colis-prive/auth", 200, LOGIN_OK)]).await;
    let client = server.client(FallbackPolicy::Strict);

    client.login("A187518", "secret", "PCP0010699").await.expect("login");

    assert_eq!(
        server.last_request().json(),
        serde_json::json!({"username": "A187518", "password": "secret", "societe": "PCP0010699"})
    );
}

#[tokio::test]
async fn test_token_is_sent_as_bearer() {
    let server = ScriptedServer::start(&[(
        "/api/mobile/stats",
        200,
        r#"{"success":true,"data":{"totalPaquetes":9,"paquetesEntregados":4,"paquetesPendientes":5}}"#,
    )])
    .await;
    let client = server.client(FallbackPolicy::Strict).with_token("tok-1");

    let stats = client.get_mobile_stats().await.expect("stats");
    assert_eq!(stats.total_packages, 9);
    assert_eq!(stats.pending_packages, 5);

    let request = server.last_request();
    assert_eq!(request.method, "GET");
    assert_eq!(request.header("authorization"), Some("Bearer tok-1"));
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_login_success() {
    let server = ScriptedServer::start(&[("/api/colis-prive/auth", 200, LOGIN_OK)]).await;
    let client = server.client(FallbackPolicy::Strict);

    let outcome = client.login("A187518", "secret", "PCP0010699").await.expect("login");
    assert!(outcome.success);
    assert_eq!(outcome.matricule, "PCP0010699_A187518");
    assert_eq!(outcome.token, "tok-1");
}

#[tokio::test]
async fn test_rejected_login_is_an_outcome_not_an_error() {
    let server = ScriptedServer::start(&[("/api/colis-prive/auth", 200, LOGIN_REJECTED)]).await;
    let client = server.client(FallbackPolicy::Strict);

    let outcome = client.login("A187518", "wrong", "PCP0010699").await.expect("login");
    assert!(!outcome.success);
    assert_eq!(outcome.error_message.as_deref(), Some("bad creds"));
    assert_eq!(outcome.error_code.as_deref(), Some("AUTH_FAILED"));
}

#[tokio::test]
async fn test_authenticate_rejected_is_domain_error() {
    let server = ScriptedServer::start(&[("/api/colis-prive/auth", 200, LOGIN_REJECTED)]).await;
    let client = server.client(FallbackPolicy::Strict);

    let err = client
        .authenticate(&Credentials::new("A187518", "wrong", "PCP0010699"))
        .await
        .expect_err("rejected");
    match err {
        ApiError::Domain { message, code } => {
            assert_eq!(message, "bad creds");
            assert_eq!(code.as_deref(), Some("AUTH_FAILED"));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_login_http_error_keeps_raw_body() {
    let server =
        ScriptedServer::start(&[("/api/colis-prive/auth", 503, r#"{"detail":"maintenance"}"#)]).await;
    let client = server.client(FallbackPolicy::DemoOnFailure);

    let err = client
        .login("A187518", "secret", "PCP0010699")
        .await
        .expect_err("503");
    match err {
        ApiError::Http { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, r#"{"detail":"maintenance"}"#);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_success_body_is_unknown_error() {
    let server = ScriptedServer::start(&[("/api/colis-prive/auth", 200, "")]).await;
    let client = server.client(FallbackPolicy::Strict);

    let err = client
        .login("A187518", "secret", "PCP0010699")
        .await
        .expect_err("empty body");
    assert_eq!(err.status(), Some(200));
    assert_eq!(err.to_string(), "HTTP 200: Unknown error");
}

#[tokio::test]
async fn test_login_transport_failure() {
    let config = ClientConfig::new(refused_base_url().await).with_timeout(Duration::from_secs(5));
    let client = BackendClient::new(config).expect("client");

    let err = client
        .login("A187518", "secret", "PCP0010699")
        .await
        .expect_err("refused");
    assert!(matches!(err, ApiError::Transport(_)), "{:?}", err);
}

// ============================================================================
// Companies
// ============================================================================

#[tokio::test]
async fn test_get_companies() {
    let server = ScriptedServer::start(&[("/api/colis-prive/companies", 200, COMPANIES_OK)]).await;
    let clock = ManualClock::at_millis(1_750_000_000_000);
    let config = ClientConfig::new(server.base_url.clone()).with_timeout(Duration::from_secs(5));
    let client = BackendClient::with_clock(config, Arc::new(clock.clone())).expect("client");

    let directory = client.get_companies().await.expect("companies");
    assert_eq!(directory.len(), 2);
    assert_eq!(directory.find("ACM").map(|c| c.name.as_str()), Some("Acme"));
    assert_eq!(directory.fetched_at, clock.now());
    assert_eq!(server.last_request().method, "GET");
}

#[tokio::test]
async fn test_get_companies_unsuccessful_is_domain_error() {
    let server = ScriptedServer::start(&[(
        "/api/colis-prive/companies",
        200,
        r#"{"success":false,"companies":[],"message":"directory offline"}"#,
    )])
    .await;
    let client = server.client(FallbackPolicy::DemoOnFailure);

    let err = client.get_companies().await.expect_err("domain");
    assert_eq!(err.to_string(), "Backend error: directory offline");
}

#[tokio::test]
async fn test_get_companies_not_found() {
    let server = ScriptedServer::start(&[]).await;
    let client = server.client(FallbackPolicy::DemoOnFailure);

    let err = client.get_companies().await.expect_err("404");
    assert_eq!(err.status(), Some(404));
}

// ============================================================================
// Packages and demo fallback
// ============================================================================

#[tokio::test]
async fn test_get_packages_live() {
    let server = ScriptedServer::start(&[("/api/colis-prive/packages", 200, PACKAGES_ONE)]).await;
    let client = server.client(FallbackPolicy::DemoOnFailure);

    let outcome = client
        .get_packages("PCP0010699_A187518", "PCP0010699", NaiveDate::from_ymd_opt(2025, 8, 28))
        .await
        .expect("packages");
    assert!(outcome.success);
    assert_eq!(outcome.source, PackageSource::Live);
    assert_eq!(outcome.packages.len(), 1);
    assert_eq!(outcome.packages[0].tracking_number, "LIVE0001");
    assert_eq!(outcome.packages[0].priority, "Normal");

    assert_eq!(
        server.last_request().json(),
        serde_json::json!({
            "matricule": "PCP0010699_A187518",
            "societe": "PCP0010699",
            "date": "2025-08-28"
        })
    );
}

#[tokio::test]
async fn test_get_packages_empty_list_falls_back_to_demo() {
    let server = ScriptedServer::start(&[("/api/colis-prive/packages", 200, PACKAGES_EMPTY)]).await;
    let client = server.client(FallbackPolicy::DemoOnFailure);

    let outcome = client
        .get_packages("PCP0010699_A187518", "PCP0010699", None)
        .await
        .expect("packages");
    assert!(outcome.success);
    assert!(outcome.is_demo());
    assert_eq!(outcome.packages.len(), 9);
    assert_eq!(outcome.packages[0].tracking_number, "PU0000867901");
    assert!(server.last_request().json().get("date").is_none());
}

#[tokio::test]
async fn test_get_packages_empty_list_strict() {
    let server = ScriptedServer::start(&[("/api/colis-prive/packages", 200, PACKAGES_EMPTY)]).await;
    let client = server.client(FallbackPolicy::Strict);

    let outcome = client
        .get_packages("PCP0010699_A187518", "PCP0010699", None)
        .await
        .expect("packages");
    assert_eq!(outcome.source, PackageSource::Live);
    assert!(outcome.packages.is_empty());
}

#[tokio::test]
async fn test_get_packages_server_error_falls_back_to_demo() {
    let server = ScriptedServer::start(&[("/api/colis-prive/packages", 500, "boom")]).await;
    let client = server.client(FallbackPolicy::DemoOnFailure);

    let outcome = client
        .get_packages("PCP0010699_A187518", "PCP0010699", None)
        .await
        .expect("demo");
    assert!(outcome.is_demo());
    assert_eq!(outcome.packages.len(), 9);
}

#[tokio::test]
async fn test_get_packages_server_error_strict() {
    let server = ScriptedServer::start(&[("/api/colis-prive/packages", 500, "boom")]).await;
    let client = server.client(FallbackPolicy::Strict);

    let err = client
        .get_packages("PCP0010699_A187518", "PCP0010699", None)
        .await
        .expect_err("strict");
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.to_string(), "HTTP 500: boom");
}

#[tokio::test]
async fn test_get_packages_unsuccessful_body() {
    let body = r#"{"success":false,"error":{"message":"unknown matricule","code":"E42"}}"#;
    let server = ScriptedServer::start(&[("/api/colis-prive/packages", 200, body)]).await;

    let outcome = server
        .client(FallbackPolicy::DemoOnFailure)
        .get_packages("X", "PCP0010699", None)
        .await
        .expect("demo");
    assert!(outcome.is_demo());

    let err = server
        .client(FallbackPolicy::Strict)
        .get_packages("X", "PCP0010699", None)
        .await
        .expect_err("strict");
    assert!(matches!(
        err,
        ApiError::Domain { ref message, ref code } if message == "unknown matricule" && code.as_deref() == Some("E42")
    ));
}

#[tokio::test]
async fn test_get_packages_transport_failure() {
    let base_url = refused_base_url().await;
    let demo = BackendClient::new(ClientConfig::new(base_url.clone())).expect("client");
    let outcome = demo
        .get_packages("PCP0010699_A187518", "PCP0010699", None)
        .await
        .expect("demo");
    assert!(outcome.is_demo());
    assert_eq!(outcome.packages[8].tracking_number, "S79401757793");

    let strict = BackendClient::new(ClientConfig::new(base_url).with_fallback(FallbackPolicy::Strict))
        .expect("client");
    let err = strict
        .get_packages("PCP0010699_A187518", "PCP0010699", None)
        .await
        .expect_err("strict");
    assert!(matches!(err, ApiError::Transport(_)), "{:?}", err);
}

// ============================================================================
// Mobile tour
// ============================================================================

#[tokio::test]
async fn test_get_tour() {
    let body = r#"{"success":true,"data":{"paquetes":[{"id":"p1","refColis":"PU0000867901","coordenadas":{"latitud":48.8667,"longitud":2.3333},"direccion":"15 Rue de la Paix","estado":"Pendiente","prioridad":"1","tipoEntrega":"Domicile"}],"estadisticas":{"totalPaquetes":1,"paquetesEntregados":0,"paquetesPendientes":1}}}"#;
    let server = ScriptedServer::start(&[("/api/mobile/tournee", 200, body)]).await;
    let client = server.client(FallbackPolicy::Strict);

    let date = NaiveDate::from_ymd_opt(2025, 8, 28).expect("date");
    let tour = client.get_tour("driver-1", date).await.expect("tour");
    assert_eq!(tour.packages.len(), 1);
    assert_eq!(tour.optimized_route, None);

    assert_eq!(
        server.last_request().json(),
        serde_json::json!({"driverId": "driver-1", "date": "2025-08-28"})
    );
}

#[tokio::test]
async fn test_get_tour_without_data_is_domain_error() {
    let server = ScriptedServer::start(&[(
        "/api/mobile/tournee",
        200,
        r#"{"success":false,"message":"no tour today"}"#,
    )])
    .await;
    let client = server.client(FallbackPolicy::DemoOnFailure);

    let date = NaiveDate::from_ymd_opt(2025, 8, 28).expect("date");
    let err = client.get_tour("driver-1", date).await.expect_err("domain");
    assert_eq!(err.to_string(), "Backend error: no tour today");
}

#[tokio::test]
async fn test_update_package_status() {
    let server = ScriptedServer::start(&[(
        "/api/mobile/package/update-status",
        200,
        r#"{"success":true,"message":"updated"}"#,
    )])
    .await;
    let client = server.client(FallbackPolicy::Strict);

    let update = StatusUpdate::new("p1", DeliveryStatus::Delivered).with_notes("front door");
    let message = client.update_package_status(&update).await.expect("update");
    assert_eq!(message.as_deref(), Some("updated"));
    assert_eq!(
        server.last_request().json(),
        serde_json::json!({"packageId": "p1", "status": "Entregado", "notes": "front door"})
    );
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn test_cancelled_request() {
    let server = ScriptedServer::start(&[("/api/colis-prive/companies", 200, COMPANIES_OK)]).await;
    let client = server.client(FallbackPolicy::Strict);

    let (request, handle) = cancellable(client.get_companies());
    handle.abort();
    assert!(matches!(request.await, Err(ApiError::Cancelled)));
}

// ============================================================================
// Flows
// ============================================================================

fn caches() -> (SessionCache, CompanyDirectoryCache) {
    let store = Arc::new(MemoryStore::new());
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::at_millis(1_750_000_000_000));
    (
        SessionCache::new(store.clone(), clock.clone()),
        CompanyDirectoryCache::new(store, clock),
    )
}

#[tokio::test]
async fn test_sign_in_persists_session_without_token() {
    let server = ScriptedServer::start(&[("/api/colis-prive/auth", 200, LOGIN_OK)]).await;
    let client = server.client(FallbackPolicy::Strict);
    let (sessions, companies) = caches();

    let company = SelectedCompany::new("INTI", "PCP0010699");
    let identity = sign_in(
        &client,
        &sessions,
        &Credentials::new("A187518", "secret", "PCP0010699"),
        Some(&company),
    )
    .await
    .expect("sign in");
    assert_eq!(identity.full_username, "PCP0010699_A187518");
    assert_eq!(identity.bearer_token(), Some("tok-1"));

    let state = AppState::restore(&sessions, &companies, 24);
    let session = state.session.expect("restored session");
    assert_eq!(session.matricule, "PCP0010699_A187518");
    assert_eq!(session.company_code, "PCP0010699");
    assert_eq!(session.bearer_token(), None);
    assert_eq!(state.selected_company, Some(company));
}

#[tokio::test]
async fn test_rejected_sign_in_leaves_cache_empty() {
    let server = ScriptedServer::start(&[("/api/colis-prive/auth", 200, LOGIN_REJECTED)]).await;
    let client = server.client(FallbackPolicy::Strict);
    let (sessions, _) = caches();

    let result = sign_in(
        &client,
        &sessions,
        &Credentials::new("A187518", "wrong", "PCP0010699"),
        None,
    )
    .await;
    assert!(matches!(result, Err(ApiError::Domain { .. })));
    assert!(!sessions.is_logged_in());
}

#[tokio::test]
async fn test_load_companies_uses_cache_until_refresh() {
    let server = ScriptedServer::start(&[("/api/colis-prive/companies", 200, COMPANIES_OK)]).await;
    let client = server.client(FallbackPolicy::Strict);
    let (_, cache) = caches();

    let first = load_companies(&client, &cache, false).await.expect("first load");
    assert!(!first.from_cache);
    assert_eq!(first.directory.len(), 2);

    let second = load_companies(&client, &cache, false).await.expect("second load");
    assert!(second.from_cache);
    assert_eq!(second.directory, first.directory);
    assert_eq!(server.requests().len(), 1);

    let refreshed = load_companies(&client, &cache, true).await.expect("refresh");
    assert!(!refreshed.from_cache);
    assert_eq!(server.requests().len(), 2);
}

#[tokio::test]
async fn test_refresh_packages_applies_demo_banner() {
    let server = ScriptedServer::start(&[("/api/colis-prive/packages", 200, PACKAGES_EMPTY)]).await;
    let client = server.client(FallbackPolicy::DemoOnFailure);
    let (sessions, companies) = caches();
    sessions.save_session(&routecache_core::models::SessionIdentity::new(
        "PCP0010699",
        "A187518",
        "PCP0010699_A187518",
        "",
    ));

    let mut state = AppState::restore(&sessions, &companies, 24);
    state.refresh_packages(&client, None).await.expect("refresh");
    assert_eq!(state.package_source, Some(PackageSource::Demo));
    assert_eq!(state.packages.len(), 9);
    assert!(state.banner.is_some());

    let request = server.last_request();
    assert_eq!(request.json()["matricule"], "PCP0010699_A187518");
    assert_eq!(request.json()["societe"], "PCP0010699");
}
