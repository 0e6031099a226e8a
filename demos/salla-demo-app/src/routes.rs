//! HTTP routes of the demo application.

use axum::{
    Router,
    extract::{FromRequestParts, Query, State},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::cookie::CookieJar;
use salla_identity_oauth2::{AuthorizationOptions, CallbackParams, SallaProvider};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::merchant::MerchantApi;
use crate::session::{SessionStore, SessionUser};
use crate::views::{
    AccountPage, CustomersPage, ErrorPage, IndexPage, LoginPage, OrdersPage, TokenPage, render,
    render_with_status,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<SallaProvider>,
    pub sessions: SessionStore,
    pub merchant: MerchantApi,
}

/// Logged-in user of the current request.
///
/// Requests without an authenticated session are redirected to `/login`.
pub struct CurrentUser {
    pub session_id: String,
    pub user: SessionUser,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Redirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);

        state
            .sessions
            .session_id(&jar)
            .and_then(|session_id| {
                let user = state.sessions.user(&session_id)?;
                Some(CurrentUser { session_id, user })
            })
            .ok_or_else(|| Redirect::to("/login"))
    }
}

#[derive(Debug, Deserialize)]
pub struct RedirectQuery {
    show_dialog: Option<String>,
}

impl RedirectQuery {
    fn options(&self) -> AuthorizationOptions {
        AuthorizationOptions {
            show_dialog: matches!(self.show_dialog.as_deref(), Some("true" | "1")),
        }
    }
}

/// Build the application router
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/login", get(login_handler))
        .route("/oauth/redirect", get(oauth_redirect_handler))
        .route("/oauth/callback", get(oauth_callback_handler))
        .route("/account", get(account_handler))
        .route("/refreshToken", get(refresh_token_handler))
        .route("/orders", get(orders_handler))
        .route("/customers", get(customers_handler))
        .route("/logout", get(logout_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index_handler(State(state): State<AppState>, jar: CookieJar) -> Response {
    let user = state
        .sessions
        .session_id(&jar)
        .and_then(|session_id| state.sessions.user(&session_id));

    render(IndexPage::new(user.as_ref()))
}

async fn login_handler() -> Response {
    render(LoginPage)
}

/// Start the OAuth2 flow for this browser session
async fn oauth_redirect_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<RedirectQuery>,
) -> Response {
    let (jar, session_id) = state.sessions.get_or_create(jar);

    match state
        .provider
        .begin_authorization(&session_id, &query.options())
        .await
    {
        Ok(redirect) => (jar, Redirect::to(redirect.url.as_str())).into_response(),
        Err(e) => {
            error!("Failed to start OAuth2 flow: {}", e);
            (
                jar,
                render_with_status(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorPage::new("Login failed", e.to_string()),
                ),
            )
                .into_response()
        }
    }
}

/// Complete the OAuth2 flow and log the session in
async fn oauth_callback_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    let Some(session_id) = state.sessions.session_id(&jar) else {
        warn!("OAuth2 callback without a known session");
        return Redirect::to("/login").into_response();
    };

    match state
        .provider
        .complete_authorization(&session_id, params)
        .await
    {
        Ok(identity) => {
            info!(
                "Session authenticated for user {}",
                identity.profile.id().unwrap_or_default()
            );
            let (jar, _) = state.sessions.login(jar, &session_id, identity.into());
            (jar, Redirect::to("/")).into_response()
        }
        Err(e) => {
            warn!("OAuth2 callback failed: {}", e);
            Redirect::to("/login").into_response()
        }
    }
}

async fn account_handler(current: CurrentUser) -> Response {
    render(AccountPage::from(&current.user))
}

/// Exchange the stored refresh token for a new access token
async fn refresh_token_handler(State(state): State<AppState>, current: CurrentUser) -> Response {
    let previous = current.user.tokens.refresh_token.clone();

    let Some(refresh_token) = previous.as_deref() else {
        return render_with_status(
            StatusCode::BAD_REQUEST,
            ErrorPage::new(
                "Refresh failed",
                "No refresh token was issued for this session",
            ),
        );
    };

    match state.provider.refresh_access_token(refresh_token).await {
        Ok(tokens) => {
            let tokens = tokens.or_refresh_token(previous);
            state
                .sessions
                .update_tokens(&current.session_id, tokens.clone());

            render(TokenPage {
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token.unwrap_or_default(),
                expires_in: tokens
                    .expires_in
                    .map(|seconds| format!("{} seconds", seconds))
                    .unwrap_or_else(|| "unknown".to_string()),
            })
        }
        Err(e) => {
            error!("Token refresh failed: {}", e);
            render_with_status(
                StatusCode::BAD_GATEWAY,
                ErrorPage::new("Refresh failed", e.to_string()),
            )
        }
    }
}

async fn orders_handler(State(state): State<AppState>, current: CurrentUser) -> Response {
    match state
        .merchant
        .orders(&current.user.tokens.access_token)
        .await
    {
        Ok(orders) => render(OrdersPage { orders }),
        Err(e) => {
            error!("Failed to fetch orders: {:#}", e);
            render_with_status(
                StatusCode::BAD_GATEWAY,
                ErrorPage::new("Could not load orders", format!("{:#}", e)),
            )
        }
    }
}

async fn customers_handler(State(state): State<AppState>, current: CurrentUser) -> Response {
    match state
        .merchant
        .customers(&current.user.tokens.access_token)
        .await
    {
        Ok(customers) => render(CustomersPage { customers }),
        Err(e) => {
            error!("Failed to fetch customers: {:#}", e);
            render_with_status(
                StatusCode::BAD_GATEWAY,
                ErrorPage::new("Could not load customers", format!("{:#}", e)),
            )
        }
    }
}

async fn logout_handler(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    (state.sessions.logout(jar), Redirect::to("/"))
}
