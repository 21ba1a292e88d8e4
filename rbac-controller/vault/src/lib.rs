//! A Vault API client covering the policy and auth role endpoints the
//! controller writes to.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod token;


pub use self::token::Token;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace};
use vault_rbac_controller_core::{Authority, Error, Parameters, Result};

const TOKEN_HEADER: &str = "X-Vault-Token";
const NAMESPACE_HEADER: &str = "X-Vault-Namespace";

#[derive(Clone, Debug)]
pub struct Config {
    /// Base address, e.g. `https://vault.example.com:8200`.
    pub addr: String,
    pub token: Token,
    /// Enterprise namespace, sent with every request when set.
    pub namespace: Option<String>,
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct Client {
    http: reqwest::Client,
    addr: String,
    token: Token,
    namespace: Option<String>,
}

/// The status reported by `sys/health`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Health {
    pub initialized: bool,
    pub sealed: bool,
    pub standby: bool,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, thiserror::Error)]
enum ClientError {
    #[error("failed to read token: {0}")]
    Token(#[source] std::io::Error),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{path} returned {status}: {message}")]
    Status {
        path: String,
        status: StatusCode,
        message: String,
    },
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<String>,
}

#[derive(Serialize)]
struct PolicyBody<'a> {
    policy: &'a str,
}

// === impl Config ===

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: "https://127.0.0.1:8200".to_string(),
            token: Token::None,
            namespace: None,
            timeout: Duration::from_secs(30),
        }
    }
}

// === impl Client ===

impl Client {
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            http,
            addr: config.addr.trim_end_matches('/').to_string(),
            token: config.token,
            namespace: config.namespace,
        })
    }

    /// Queries `sys/health`. Standby nodes are reported as healthy; sealed or
    /// uninitialized servers are unavailable.
    pub async fn health(&self) -> Result<Health> {
        let path = "sys/health?standbyok=true&perfstandbyok=true";
        let rsp = self.send(Method::GET, path, None::<&()>).await?;
        rsp.json()
            .await
            .map_err(|e| Error::AuthorityUnavailable(ClientError::Http(e).into()))
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response> {
        let url = format!("{}/v1/{}", self.addr, path);
        trace!(%method, %url);
        let mut req = self.http.request(method, &url);
        if let Some(token) = self
            .token
            .load()
            .await
            .map_err(|e| Error::AuthorityUnavailable(ClientError::Token(e).into()))?
        {
            req = req.header(TOKEN_HEADER, token);
        }
        if let Some(ns) = &self.namespace {
            req = req.header(NAMESPACE_HEADER, ns);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let rsp = req
            .send()
            .await
            .map_err(|e| Error::AuthorityUnavailable(ClientError::Http(e).into()))?;
        let status = rsp.status();
        if status.is_success() {
            return Ok(rsp);
        }

        let message = match rsp.json::<ErrorBody>().await {
            Ok(body) if !body.errors.is_empty() => body.errors.join("; "),
            _ => status.canonical_reason().unwrap_or_default().to_string(),
        };
        debug!(%path, %status, %message, "Vault request failed");
        Err(status_error(path, status, message))
    }

    /// Issues a delete, treating an absent object as already deleted.
    async fn remove(&self, path: &str) -> Result<()> {
        match self.send(Method::DELETE, path, None::<&()>).await {
            Ok(_) => Ok(()),
            Err(Error::AuthorityRejected { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                debug!(%path, "Already deleted");
                Ok(())
            }
            Err(error) => Err(error),
        }
    }
}

fn status_error(path: &str, status: StatusCode, message: String) -> Error {
    if status.is_server_error() {
        return Error::AuthorityUnavailable(
            ClientError::Status {
                path: path.to_string(),
                status,
                message,
            }
            .into(),
        );
    }
    Error::AuthorityRejected {
        path: path.to_string(),
        status: status.as_u16(),
        message,
    }
}

fn policy_path(name: &str) -> String {
    format!("sys/policies/acl/{name}")
}

#[async_trait::async_trait]
impl Authority for Client {
    async fn put_policy(&self, name: &str, policy: &str) -> Result<()> {
        self.send(Method::PUT, &policy_path(name), Some(&PolicyBody { policy }))
            .await?;
        Ok(())
    }

    async fn delete_policy(&self, name: &str) -> Result<()> {
        self.remove(&policy_path(name)).await
    }

    async fn write(&self, path: &str, params: &Parameters) -> Result<()> {
        self.send(Method::PUT, path, Some(params)).await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.remove(path).await
    }
}
