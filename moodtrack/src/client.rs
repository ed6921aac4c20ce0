use crate::error::{Error, Result};
use crate::models::{
    AuthResponse, DashboardSummary, EmotionEntry, EmotionStats, EntryRecord, EntryUpdate,
    LoginRequest, RegisterRequest, RiskAssessment, UserProfile,
};
use crate::session::{SessionKey, SessionStore};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{header, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

pub const DEFAULT_API_BASE: &str = "http://localhost:8000/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Look-back window used when the caller doesn't pick one
pub const DEFAULT_DAYS: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Including the `/api` prefix, eg `http://localhost:8000/api`
    pub base_url: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        ClientConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Default::default()
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: DEFAULT_API_BASE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Told when the server rejects our credentials (HTTP 401).
///
/// Registered by the application shell; the client itself keeps no session logic beyond
/// reading the current access token.
#[async_trait]
pub trait SessionInvalidationListener: Send + Sync {
    async fn session_invalidated(&self, status: StatusCode) -> anyhow::Result<()>;
}

/// Wipes the stored session, which sends the user back to the login flow on next start
pub struct ClearSessionOnUnauthorized {
    store: Arc<dyn SessionStore>,
}

impl ClearSessionOnUnauthorized {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        ClearSessionOnUnauthorized { store }
    }
}

#[async_trait]
impl SessionInvalidationListener for ClearSessionOnUnauthorized {
    async fn session_invalidated(&self, status: StatusCode) -> anyhow::Result<()> {
        debug!("clearing stored session after {}", status);
        self.store.clear_all().await
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http_client: reqwest::Client,
    base_url: String,
    store: Arc<dyn SessionStore>,
    listeners: Vec<Arc<dyn SessionInvalidationListener>>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(config: &ClientConfig, store: Arc<dyn SessionStore>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(Error::Network)?;

        Ok(ApiClient {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            store,
            listeners: vec![],
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn add_invalidation_listener(&mut self, listener: Arc<dyn SessionInvalidationListener>) {
        self.listeners.push(listener);
    }

    /// Bearer header for the stored access token, or nothing when logged out
    async fn auth_headers(&self) -> header::HeaderMap {
        let mut headers = header::HeaderMap::new();
        let token = self
            .store
            .get(SessionKey::AccessToken)
            .await
            .filter(|t| !t.trim().is_empty());
        if let Some(token) = token {
            match header::HeaderValue::from_str(&format!("Bearer {token}")) {
                Ok(mut auth_value) => {
                    auth_value.set_sensitive(true);
                    headers.insert(header::AUTHORIZATION, auth_value);
                }
                Err(_) => warn!("stored access token is not a valid header value; sending without it"),
            }
        };
        headers
    }

    async fn notify_invalidated(&self, status: StatusCode) {
        for listener in self.listeners.iter() {
            if let Err(e) = listener.session_invalidated(status).await {
                warn!("session invalidation listener failed: {:#}", e);
            }
        }
    }

    async fn send<B>(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, String)]>,
        body: Option<&B>,
    ) -> Result<reqwest::Response>
    where
        B: Serialize + ?Sized,
    {
        debug!("API {} {} query={:?}", method, path, query);
        // token lookup finishes before the request is built and dispatched
        let headers = self.auth_headers().await;
        let mut req = self
            .http_client
            .request(method, format!("{}{}", self.base_url, path))
            .headers(headers);
        if let Some(q) = query {
            req = req.query(q);
        }
        if let Some(b) = body {
            req = req.json(b);
        }
        let res = req.send().await.map_err(Error::Network)?;

        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        if status == StatusCode::UNAUTHORIZED {
            self.notify_invalidated(status).await;
        }
        let raw = match res.bytes().await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("failed to read error body for {} {}: {}", status, path, e);
                Default::default()
            }
        };
        let payload = serde_json::from_slice(&raw).unwrap_or_else(|_| {
            let text = String::from_utf8_lossy(&raw).trim().to_string();
            if text.is_empty() {
                Value::Null
            } else {
                Value::String(text)
            }
        });
        debug!("API {} failed: {} {}", path, status, payload);
        Err(Error::Api { status, payload })
    }

    async fn decode<T: DeserializeOwned>(res: reqwest::Response) -> Result<T> {
        let raw = res.bytes().await.map_err(Error::Network)?;
        serde_json::from_slice(&raw).map_err(Error::Decode)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Option<&[(&str, String)]>,
    ) -> Result<T> {
        let res = self.send::<()>(Method::GET, path, query, None).await?;
        Self::decode(res).await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let res = self.send(Method::POST, path, None, Some(body)).await?;
        Self::decode(res).await
    }

    async fn put<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let res = self.send(Method::PUT, path, None, Some(body)).await?;
        Self::decode(res).await
    }

    fn days_param(days: u32) -> Vec<(&'static str, String)> {
        vec![("days", days.to_string())]
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<AuthResponse> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        self.post("/auth/login/", &body).await
    }

    pub async fn register(&self, user_data: &RegisterRequest) -> Result<AuthResponse> {
        self.post("/auth/register/", user_data).await
    }

    pub async fn get_profile(&self) -> Result<UserProfile> {
        self.get("/auth/profile/", None).await
    }

    /// `user_data` is a JSON object of the profile fields to change
    pub async fn update_profile(&self, user_data: &Value) -> Result<UserProfile> {
        self.put("/auth/profile/", user_data).await
    }

    pub async fn get_entries(&self, days: u32) -> Result<Vec<EntryRecord>> {
        let query = Self::days_param(days);
        self.get("/emotions/entries/", Some(query.as_slice())).await
    }

    pub async fn create_entry(&self, entry_data: &EmotionEntry) -> Result<EntryRecord> {
        self.post("/emotions/entries/", entry_data).await
    }

    pub async fn update_entry(&self, id: i64, entry_data: &EntryUpdate) -> Result<EntryRecord> {
        self.put(&format!("/emotions/entries/{id}/"), entry_data)
            .await
    }

    pub async fn delete_entry(&self, id: i64) -> Result<()> {
        self.send::<()>(
            Method::DELETE,
            &format!("/emotions/entries/{id}/"),
            None,
            None,
        )
        .await?;
        Ok(())
    }

    pub async fn get_stats(&self, days: u32) -> Result<EmotionStats> {
        let query = Self::days_param(days);
        self.get("/emotions/stats/", Some(query.as_slice())).await
    }

    pub async fn get_risk_assessments(&self, days: u32) -> Result<Vec<RiskAssessment>> {
        let query = Self::days_param(days);
        self.get("/emotions/risk-assessments/", Some(query.as_slice())).await
    }

    pub async fn get_dashboard_summary(&self) -> Result<DashboardSummary> {
        self.get("/emotions/dashboard/", None).await
    }
}

#[test]
fn test_client_config() {
    assert_eq!(ClientConfig::default().base_url, "http://localhost:8000/api");
    assert_eq!(ClientConfig::default().timeout, Duration::from_secs(10));
    assert_eq!(DEFAULT_DAYS, 30);
    assert_eq!(
        ClientConfig::new("https://mood.example.org/api/").base_url,
        "https://mood.example.org/api"
    );
}
