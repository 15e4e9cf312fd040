//! Thin client for the bruteguard admin API.

use std::time::Duration;

use anyhow::{Context, bail};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;

/// Which list a subcommand targets; maps to the route path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum List {
    White,
    Black,
}

impl List {
    fn path(self) -> &'static str {
        match self {
            Self::White => "whitelist",
            Self::Black => "blacklist",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    detail: Option<String>,
}

pub struct AdminClient {
    http: reqwest::Client,
    base: String,
    token: Option<String>,
}

impl AdminClient {
    pub fn new(base: &str, timeout: Duration, token: Option<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            http,
            base: base.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub async fn auth(&self, login: &str, password: &str, ip: &str) -> anyhow::Result<bool> {
        let body = serde_json::json!({"login": login, "password": password, "ip": ip});
        let resp = self.send(Method::POST, "auth", Some(body)).await?;
        verdict(&resp)
    }

    pub async fn reset(&self, login: &str, ip: &str, password: Option<&str>) -> anyhow::Result<()> {
        let body = serde_json::json!({"login": login, "ip": ip, "password": password});
        self.send(Method::POST, "reset", Some(body)).await?;
        Ok(())
    }

    pub async fn add(&self, list: List, ip: &str, mask: Option<&str>) -> anyhow::Result<()> {
        let body = serde_json::json!({"ip": ip, "mask": mask});
        self.send(Method::POST, list.path(), Some(body)).await?;
        Ok(())
    }

    pub async fn remove(&self, list: List, ip: &str, mask: Option<&str>) -> anyhow::Result<()> {
        let body = serde_json::json!({"ip": ip, "mask": mask});
        self.send(Method::DELETE, list.path(), Some(body)).await?;
        Ok(())
    }

    pub async fn list(&self, list: List) -> anyhow::Result<Vec<String>> {
        let resp = self.send(Method::GET, list.path(), None).await?;
        let subnets = resp["subnets"]
            .as_array()
            .context("response has no subnets array")?
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect();
        Ok(subnets)
    }

    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> anyhow::Result<Value> {
        let url = format!("{}/{path}", self.base);
        let mut req = self.http.request(method, &url);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }

        let resp = req.send().await.with_context(|| format!("request to {url} failed"))?;
        let status = resp.status();
        let text = resp.text().await.context("reading response body")?;

        if !status.is_success() {
            bail!("{}", describe_failure(status, &text));
        }
        serde_json::from_str(&text).with_context(|| format!("unexpected response from {url}"))
    }
}

/// The `ok` flag of an `/auth` response. A missing flag is an error, not a denial.
fn verdict(resp: &Value) -> anyhow::Result<bool> {
    resp["ok"].as_bool().context("response has no ok flag")
}

fn describe_failure(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            error,
            detail: Some(detail),
        }) => format!("{status}: {error}: {detail}"),
        Ok(ErrorBody { error, detail: None }) => format!("{status}: {error}"),
        Err(_) if body.is_empty() => status.to_string(),
        Err(_) => format!("{status}: {body}"),
    }
}
