//! HTML pages rendered with askama.

use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use tracing::error;

use crate::merchant::{CustomerSummary, OrderSummary};
use crate::session::SessionUser;

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexPage {
    pub logged_in: bool,
    pub name: String,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginPage;

#[derive(Template)]
#[template(path = "account.html")]
pub struct AccountPage {
    pub id: String,
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub role: String,
    pub merchant_name: String,
    pub authenticated_at: String,
    pub profile_json: String,
}

#[derive(Template)]
#[template(path = "token.html")]
pub struct TokenPage {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: String,
}

#[derive(Template)]
#[template(path = "orders.html")]
pub struct OrdersPage {
    pub orders: Vec<OrderSummary>,
}

#[derive(Template)]
#[template(path = "customers.html")]
pub struct CustomersPage {
    pub customers: Vec<CustomerSummary>,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorPage {
    pub title: String,
    pub message: String,
}

impl IndexPage {
    pub fn new(user: Option<&SessionUser>) -> Self {
        Self {
            logged_in: user.is_some(),
            name: user
                .and_then(|user| user.profile.name())
                .unwrap_or_default()
                .to_string(),
        }
    }
}

impl From<&SessionUser> for AccountPage {
    fn from(user: &SessionUser) -> Self {
        let profile = &user.profile;
        let text = |value: Option<&str>| value.unwrap_or("-").to_string();

        Self {
            id: profile.id().unwrap_or_else(|| "-".to_string()),
            name: text(profile.name()),
            email: text(profile.email()),
            mobile: text(profile.mobile()),
            role: text(profile.role()),
            merchant_name: text(
                profile
                    .merchant()
                    .and_then(|merchant| merchant.get("name"))
                    .and_then(|name| name.as_str()),
            ),
            authenticated_at: user.authenticated_at.to_rfc3339(),
            profile_json: serde_json::to_string_pretty(&profile.as_value()).unwrap_or_default(),
        }
    }
}

impl ErrorPage {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Render a page, answering 500 when the template fails
pub fn render<T: Template>(page: T) -> Response {
    render_with_status(StatusCode::OK, page)
}

pub fn render_with_status<T: Template>(status: StatusCode, page: T) -> Response {
    match page.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            error!("Template rendering failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Template rendering failed").into_response()
        }
    }
}
