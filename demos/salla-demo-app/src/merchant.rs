//! Minimal client for the Salla merchant API.

use anyhow::{Context, Result, bail};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::config::MerchantApiConfig;

/// Row shown on the orders page
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSummary {
    pub id: String,
    pub reference: String,
    pub status: String,
    pub total: String,
}

/// Row shown on the customers page
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub mobile: String,
}

#[derive(Clone)]
pub struct MerchantApi {
    http_client: Client,
    base_url: String,
}

impl MerchantApi {
    pub fn new(config: &MerchantApiConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_seconds))
            .build()
            .context("Failed to create merchant API client")?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn orders(&self, access_token: &str) -> Result<Vec<OrderSummary>> {
        let items = self.list(access_token, "orders").await?;
        Ok(items.iter().map(OrderSummary::from_json).collect())
    }

    pub async fn customers(&self, access_token: &str) -> Result<Vec<CustomerSummary>> {
        let items = self.list(access_token, "customers").await?;
        Ok(items.iter().map(CustomerSummary::from_json).collect())
    }

    /// GET `{base_url}/{resource}` and return its `data` array
    async fn list(&self, access_token: &str, resource: &str) -> Result<Vec<Value>> {
        let url = format!("{}/{}", self.base_url, resource);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read response from {}", url))?;

        if !status.is_success() {
            bail!("{} returned {}: {}", url, status, body);
        }

        let json: Value = serde_json::from_str(&body)
            .with_context(|| format!("{} returned invalid JSON", url))?;

        let items = match json.get("data") {
            Some(Value::Array(items)) => items.clone(),
            None | Some(Value::Null) => Vec::new(),
            Some(_) => bail!("{} returned a non-list data field", url),
        };

        debug!("Fetched {} {} from merchant API", items.len(), resource);
        Ok(items)
    }
}

impl OrderSummary {
    fn from_json(order: &Value) -> Self {
        let total = match order.pointer("/total/amount") {
            Some(amount) => format!(
                "{} {}",
                display(Some(amount)),
                display(order.pointer("/total/currency"))
            )
            .trim()
            .to_string(),
            None => String::new(),
        };

        Self {
            id: display(order.get("id")),
            reference: display(order.get("reference_id")),
            status: display(
                order
                    .pointer("/status/name")
                    .or_else(|| order.get("status")),
            ),
            total,
        }
    }
}

impl CustomerSummary {
    fn from_json(customer: &Value) -> Self {
        let name = match (customer.get("first_name"), customer.get("last_name")) {
            (None, None) => display(customer.get("name")),
            (first, last) => format!("{} {}", display(first), display(last))
                .trim()
                .to_string(),
        };

        let mobile = format!(
            "{}{}",
            display(customer.get("mobile_code")),
            display(customer.get("mobile"))
        );

        Self {
            id: display(customer.get("id")),
            name,
            email: display(customer.get("email")),
            mobile,
        }
    }
}

fn display(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn api(server: &MockServer) -> MerchantApi {
        MerchantApi::new(&MerchantApiConfig {
            base_url: format!("{}/admin/v2/", server.uri()),
            http_timeout_seconds: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_order_summary() {
        let order = OrderSummary::from_json(&json!({
            "id": 2025,
            "reference_id": 1001,
            "status": {"name": "Completed"},
            "total": {"amount": 150.5, "currency": "SAR"}
        }));

        assert_eq!(order.id, "2025");
        assert_eq!(order.reference, "1001");
        assert_eq!(order.status, "Completed");
        assert_eq!(order.total, "150.5 SAR");
    }

    #[test]
    fn test_customer_summary() {
        let customer = CustomerSummary::from_json(&json!({
            "id": 7,
            "first_name": "Sara",
            "last_name": "Ali",
            "email": "sara@example.com",
            "mobile_code": "+966",
            "mobile": 500000000
        }));

        assert_eq!(customer.name, "Sara Ali");
        assert_eq!(customer.mobile, "+966500000000");
    }

    #[tokio::test]
    async fn test_orders_request() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/admin/v2/orders"))
            .and(header("Authorization", "Bearer at"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": 200,
                "success": true,
                "data": [{"id": 1, "reference_id": 10, "status": {"name": "Pending"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let orders = api(&server).await.orders("at").await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status, "Pending");
    }

    #[tokio::test]
    async fn test_api_error_is_reported() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/admin/v2/customers"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .mount(&server)
            .await;

        let result = api(&server).await.customers("expired").await;
        assert!(result.is_err());
    }
}
