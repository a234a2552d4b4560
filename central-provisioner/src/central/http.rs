use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, COOKIE};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::central_core::{ApiResponse, ApSettings, CentralApi};
use crate::config::CentralConfig;
use crate::error::FatalError;

const CONNECT_TIMEOUT: u64 = 5;
const READ_TIMEOUT: u64 = 60;

/// Authenticated Central REST client. Built once per run; read-only after that.
pub struct HttpCentral {
    client: Client,
    base_url: String,
    access_token: String,
}

#[derive(Deserialize)]
struct AuthCode {
    auth_code: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl HttpCentral {
    /// Runs the OAuth login / authorize / token exchange.
    pub async fn connect(cfg: &CentralConfig) -> Result<Self, FatalError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT))
            .timeout(Duration::from_secs(READ_TIMEOUT))
            .build()
            .map_err(|e| FatalError::Auth(format!("cannot build http client: {e}")))?;

        let access_token = login(&client, cfg)
            .await
            .map_err(|e| FatalError::Auth(format!("{e:#}")))?;
        tracing::info!(base_url = %cfg.base_url, "logged into Central");

        Ok(Self {
            client,
            base_url: cfg.base_url.clone(),
            access_token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, req: RequestBuilder) -> Result<ApiResponse> {
        let resp = req
            .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
            .send()
            .await
            .map_err(|e| anyhow!("send error: {e}"))?;
        let code = resp.status().as_u16();
        let text = resp.text().await.context("reading response body")?;
        let msg = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));
        Ok(ApiResponse::new(code, msg))
    }
}

async fn login(client: &Client, cfg: &CentralConfig) -> Result<String> {
    let base = &cfg.base_url;

    // 1) username/password -> csrf + session cookies
    let resp = client
        .post(format!("{base}/oauth2/authorize/central/api/login"))
        .query(&[("client_id", cfg.client_id.as_str())])
        .json(&json!({ "username": cfg.username, "password": cfg.password }))
        .send()
        .await
        .context("login request")?;
    if !resp.status().is_success() {
        return Err(anyhow!("login rejected with HTTP {}", resp.status()));
    }
    let mut csrf = None;
    let mut session = None;
    for c in resp.cookies() {
        match c.name() {
            "csrftoken" => csrf = Some(c.value().to_string()),
            "session" => session = Some(c.value().to_string()),
            _ => {}
        }
    }
    let csrf = csrf.ok_or_else(|| anyhow!("login response carried no csrftoken cookie"))?;
    let session = session.ok_or_else(|| anyhow!("login response carried no session cookie"))?;

    // 2) session -> auth code
    let resp = client
        .post(format!("{base}/oauth2/authorize/central/api"))
        .query(&[
            ("client_id", cfg.client_id.as_str()),
            ("response_type", "code"),
            ("scope", "all"),
        ])
        .header("X-CSRF-Token", csrf)
        .header(COOKIE, format!("session={session}"))
        .json(&json!({ "customer_id": cfg.customer_id }))
        .send()
        .await
        .context("authorize request")?;
    if !resp.status().is_success() {
        return Err(anyhow!("authorize rejected with HTTP {}", resp.status()));
    }
    let code: AuthCode = resp.json().await.context("authorize response")?;

    // 3) auth code -> access token
    let resp = client
        .post(format!("{base}/oauth2/token"))
        .query(&[
            ("client_id", cfg.client_id.as_str()),
            ("client_secret", cfg.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code.auth_code.as_str()),
        ])
        .send()
        .await
        .context("token request")?;
    if !resp.status().is_success() {
        return Err(anyhow!("token exchange rejected with HTTP {}", resp.status()));
    }
    let token: TokenResponse = resp.json().await.context("token response")?;
    Ok(token.access_token)
}

/// Central reports site ids as integers; send them back the same way.
pub(crate) fn site_id_value(site_id: &str) -> Value {
    match site_id.parse::<i64>() {
        Ok(n) => json!(n),
        Err(_) => json!(site_id),
    }
}

#[async_trait]
impl CentralApi for HttpCentral {
    fn name(&self) -> &'static str {
        "central"
    }

    async fn list_sites(&self, offset: usize, limit: usize) -> Result<ApiResponse> {
        let req = self.client.get(self.url("/central/v2/sites")).query(&[
            ("calculate_total", "true".to_string()),
            ("offset", offset.to_string()),
            ("limit", limit.to_string()),
        ]);
        self.send(req).await
    }

    async fn list_groups(&self, offset: usize, limit: usize) -> Result<ApiResponse> {
        let req = self
            .client
            .get(self.url("/configuration/v2/groups"))
            .query(&[("offset", offset), ("limit", limit)]);
        self.send(req).await
    }

    async fn associate_devices(
        &self,
        site_id: &str,
        device_type: &str,
        serials: &[String],
    ) -> Result<ApiResponse> {
        let body = json!({
            "site_id": site_id_value(site_id),
            "device_type": device_type,
            "device_ids": serials,
        });
        let req = self.client.post(self.url("/central/v2/sites/associations")).json(&body);
        self.send(req).await
    }

    async fn move_devices(&self, group: &str, serials: &[String]) -> Result<ApiResponse> {
        let body = json!({ "group": group, "serials": serials });
        let req = self.client.post(self.url("/configuration/v1/devices/move")).json(&body);
        self.send(req).await
    }

    async fn update_ap_settings(&self, serial: &str, settings: &ApSettings) -> Result<ApiResponse> {
        let req = self
            .client
            .post(self.url(&format!("/configuration/v1/ap_settings/{serial}")))
            .json(settings);
        self.send(req).await
    }
}
