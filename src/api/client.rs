use crate::error::{Error, Result};
use crate::manager::GatewayManager;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Request timeout for API calls. Generous compared to health probes; some
/// portfolio endpoints are slow on first touch.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Thin client for the Client Portal REST API.
///
/// Every call goes through the manager's `ensure_ready` and re-reads the
/// port: the gateway can move ports across a reinitialization, and readiness
/// is eventually consistent, so nothing here is cached. A call can still hit
/// a gateway that died a moment after the readiness check; that surfaces as
/// an ordinary HTTP error for the caller to retry.
///
/// This is deliberately not a typed binding of the IB API: responses come
/// back as loose JSON for the caller to interpret.
pub struct IbApiClient {
    manager: GatewayManager,
    client: Client,
}

impl IbApiClient {
    pub fn new(manager: GatewayManager) -> Result<Self> {
        // Self-signed gateway certificate; session auth rides on cookies.
        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .cookie_store(true)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { manager, client })
    }

    /// API base URL for the gateway as currently reachable.
    async fn api_base(&self) -> Result<String> {
        self.manager.ensure_ready().await?;
        Ok(format!("{}/v1/api", self.manager.gateway_url()))
    }

    async fn get(&self, path: &str) -> Result<Value> {
        let url = format!("{}{}", self.api_base().await?, path);
        let response = self.client.get(&url).send().await?;
        Self::into_json(path, response).await
    }

    async fn post(&self, path: &str, body: Option<&Value>) -> Result<Value> {
        let url = format!("{}{}", self.api_base().await?, path);
        let mut request = self.client.post(&url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        Self::into_json(path, response).await
    }

    async fn into_json(path: &str, response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Http(format!(
                "{} returned {}: {}",
                path,
                status,
                body.trim()
            )));
        }
        Ok(response.json().await?)
    }

    /// Keep the brokerage session alive.
    pub async fn tickle(&self) -> Result<Value> {
        self.post("/tickle", None).await
    }

    /// Current authentication status of the brokerage session.
    pub async fn auth_status(&self) -> Result<Value> {
        self.post("/iserver/auth/status", None).await
    }

    /// Accounts the logged-in user can trade.
    pub async fn accounts(&self) -> Result<Value> {
        self.get("/iserver/accounts").await
    }

    /// One page of positions for an account.
    pub async fn positions(&self, account_id: &str, page: u32) -> Result<Value> {
        self.get(&format!("/portfolio/{}/positions/{}", account_id, page))
            .await
    }

    /// Live orders for the current session.
    pub async fn live_orders(&self) -> Result<Value> {
        self.get("/iserver/account/orders").await
    }

    /// Market data snapshot for contract ids.
    pub async fn market_snapshot(&self, conids: &[i64], fields: &[i32]) -> Result<Value> {
        let conids = conids
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let fields = fields
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.get(&format!(
            "/iserver/marketdata/snapshot?conids={}&fields={}",
            conids, fields
        ))
        .await
    }

    /// Search contracts by symbol or company name.
    pub async fn search_contracts(&self, symbol: &str) -> Result<Value> {
        self.get(&format!("/iserver/secdef/search?symbol={}", symbol))
            .await
    }
}
