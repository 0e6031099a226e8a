//! End-to-end tests of the demo routes against a mocked Salla provider.

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use salla_demo_app::{
    AppState, app,
    config::MerchantApiConfig,
    merchant::MerchantApi,
    session::{SESSION_COOKIE, SessionStore},
};
use salla_identity_oauth2::{InMemoryStateStore, SallaConfig, SallaProvider};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use url::Url;
use wiremock::matchers::{body_string_contains, header as header_eq, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_app(server: &MockServer) -> Router {
    test_app_with_sessions(server, SessionStore::new())
}

fn test_app_with_sessions(server: &MockServer, sessions: SessionStore) -> Router {
    let config = SallaConfig::new("client", "secret", "http://localhost:8081/oauth/callback")
        .with_authorization_url(format!("{}/oauth2/auth", server.uri()))
        .with_token_url(format!("{}/oauth2/token", server.uri()))
        .with_user_profile_url(format!("{}/oauth2/user/info", server.uri()))
        .with_scopes(["offline_access"]);

    let provider = SallaProvider::new(config, Arc::new(InMemoryStateStore::new())).unwrap();
    let merchant = MerchantApi::new(&MerchantApiConfig {
        base_url: format!("{}/admin/v2", server.uri()),
        http_timeout_seconds: 5,
    })
    .unwrap();

    app(AppState {
        provider: Arc::new(provider),
        sessions,
        merchant,
    })
}

async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> Response {
    let mut request = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }

    app.clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Hit /oauth/redirect and return the session cookie and the issued state
async fn start_login(app: &Router, uri: &str) -> (String, String, Url) {
    let response = get(app, uri, None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let cookie = session_cookie(&response);
    assert!(cookie.starts_with(SESSION_COOKIE));

    let url = Url::parse(&location(&response)).unwrap();
    let state = url
        .query_pairs()
        .find(|(key, _)| key == "state")
        .map(|(_, value)| value.into_owned())
        .unwrap();

    (cookie, state, url)
}

fn session_cookie(response: &Response) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string()
}

/// Complete the callback and return the cookie of the logged-in session
async fn complete_login(app: &Router, cookie: &str, state: &str) -> String {
    let response = get(
        app,
        &format!("/oauth/callback?code=abc&state={}", state),
        Some(cookie),
    )
    .await;
    assert_eq!(location(&response), "/");
    session_cookie(&response)
}

async fn mock_provider(server: &MockServer, token_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "at",
            "refresh_token": "rt",
            "expires_in": 1209600,
            "token_type": "bearer"
        })))
        .expect(token_calls)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/oauth2/user/info"))
        .and(header_eq("Authorization", "Bearer at"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 200,
            "success": true,
            "data": {
                "id": 42,
                "name": "Sara",
                "email": "sara@example.com",
                "merchant": {"id": 7, "name": "Sara Store"}
            }
        })))
        .expect(token_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_login_flow() {
    let server = MockServer::start().await;
    mock_provider(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/admin/v2/orders"))
        .and(header_eq("Authorization", "Bearer at"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 1, "reference_id": 1001, "status": {"name": "Completed"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = test_app(&server);
    let (cookie, state, url) = start_login(&app, "/oauth/redirect").await;

    assert_eq!(url.path(), "/oauth2/auth");
    let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert!(query.contains(&("client_id".to_string(), "client".to_string())));
    assert!(query.contains(&("response_type".to_string(), "code".to_string())));
    assert!(query.contains(&("scope".to_string(), "offline_access".to_string())));

    let response = get(
        &app,
        &format!("/oauth/callback?code=abc&state={}", state),
        Some(&cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    // Logging in issues a new session id; the pre-login one is dropped
    let anonymous_cookie = cookie;
    let cookie = session_cookie(&response);
    assert_ne!(cookie, anonymous_cookie);
    let response = get(&app, "/account", Some(&anonymous_cookie)).await;
    assert_eq!(location(&response), "/login");

    let response = get(&app, "/", Some(&cookie)).await;
    assert!(body_text(response).await.contains("Sara"));

    let response = get(&app, "/account", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("sara@example.com"));
    assert!(body.contains("Sara Store"));

    let response = get(&app, "/orders", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("1001"));

    let response = get(&app, "/logout", Some(&cookie)).await;
    assert_eq!(location(&response), "/");

    let response = get(&app, "/account", Some(&cookie)).await;
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_state_mismatch_redirects_to_login() {
    let server = MockServer::start().await;
    mock_provider(&server, 0).await;

    let app = test_app(&server);
    let (cookie, state, _) = start_login(&app, "/oauth/redirect").await;

    let forged = if state.ends_with('a') { "b" } else { "a" };
    let forged_state = format!("{}{}", &state[..state.len() - 1], forged);

    let response = get(
        &app,
        &format!("/oauth/callback?code=abc&state={}", forged_state),
        Some(&cookie),
    )
    .await;
    assert_eq!(location(&response), "/login");

    // The pending state was consumed by the failed attempt
    let response = get(
        &app,
        &format!("/oauth/callback?code=abc&state={}", state),
        Some(&cookie),
    )
    .await;
    assert_eq!(location(&response), "/login");

    let response = get(&app, "/account", Some(&cookie)).await;
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_callback_without_session() {
    let server = MockServer::start().await;
    mock_provider(&server, 0).await;

    let app = test_app(&server);
    let (_, state, _) = start_login(&app, "/oauth/redirect").await;

    let response = get(
        &app,
        &format!("/oauth/callback?code=abc&state={}", state),
        None,
    )
    .await;
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_denied_authorization_redirects_to_login() {
    let server = MockServer::start().await;
    mock_provider(&server, 0).await;

    let app = test_app(&server);
    let (cookie, state, _) = start_login(&app, "/oauth/redirect").await;

    let response = get(
        &app,
        &format!("/oauth/callback?error=access_denied&state={}", state),
        Some(&cookie),
    )
    .await;
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_show_dialog_forwarded() {
    let server = MockServer::start().await;
    let app = test_app(&server);

    let (_, _, url) = start_login(&app, "/oauth/redirect?show_dialog=true").await;
    assert!(
        url.query_pairs()
            .any(|(key, value)| key == "show_dialog" && value == "true")
    );

    let (_, _, url) = start_login(&app, "/oauth/redirect").await;
    assert!(!url.query_pairs().any(|(key, _)| key == "show_dialog"));
}

#[tokio::test]
async fn test_protected_routes_require_login() {
    let server = MockServer::start().await;
    let app = test_app(&server);

    for route in ["/account", "/refreshToken", "/orders", "/customers"] {
        let response = get(&app, route, None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{}", route);
        assert_eq!(location(&response), "/login", "{}", route);

        let response = get(&app, route, Some("salla_session=unknown")).await;
        assert_eq!(location(&response), "/login", "{}", route);
    }

    let response = get(&app, "/login", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_token_keeps_previous_refresh_token() {
    let server = MockServer::start().await;
    mock_provider(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=rt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "at2",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = test_app(&server);
    let (cookie, state, _) = start_login(&app, "/oauth/redirect").await;
    let cookie = complete_login(&app, &cookie, &state).await;

    let response = get(&app, "/refreshToken", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("at2"));
    assert!(body.contains(r#"<div class="token">rt</div>"#));
    assert!(body.contains("3600 seconds"));
}

#[tokio::test]
async fn test_refresh_failure_renders_error() {
    let server = MockServer::start().await;
    mock_provider(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant"
        })))
        .mount(&server)
        .await;

    let app = test_app(&server);
    let (cookie, state, _) = start_login(&app, "/oauth/redirect").await;
    let cookie = complete_login(&app, &cookie, &state).await;

    let response = get(&app, "/refreshToken", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_idle_anonymous_sessions_are_swept() {
    let server = MockServer::start().await;
    let sessions = SessionStore::with_timeouts(Duration::ZERO, Duration::from_secs(3600));
    let app = test_app_with_sessions(&server, sessions.clone());

    for _ in 0..100 {
        start_login(&app, "/oauth/redirect").await;
    }
    assert_eq!(sessions.len(), 100);

    assert_eq!(sessions.cleanup_expired(), 100);
    assert!(sessions.is_empty());
}
