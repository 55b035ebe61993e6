//! Remote object store client.
//!
//! # Responsibilities
//! - Execute GET/HEAD/PUT/DELETE round trips against the configured store
//! - Classify each HTTP status into the three-valued outcome
//! - Run the conditional PUT protocol (pre-flight HEAD unless overwriting)
//! - Cap the number of concurrent transfers
//!
//! Connection pooling, TLS and redirect handling are reqwest's concern; this
//! module only decides what to send and what a status code means for a
//! cache. HTTP/2 over TLS is negotiated via ALPN with HTTP/1.1 fallback.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::config::{Config, UrlLayout};
use crate::storage::url::object_url;

/// Remote transfers in flight at any moment, shared across all local
/// connections.
const MAX_CONCURRENT_TRANSFERS: usize = 16;

/// Idle pooled connections kept per host.
const MAX_IDLE_PER_HOST: usize = 16;

/// Redirect chain depth before giving up.
const MAX_REDIRECTS: usize = 5;

/// Error type for client construction.
#[derive(Debug, Error)]
pub enum StorageInitError {
    #[error("invalid static header name: {0}")]
    HeaderName(#[from] reqwest::header::InvalidHeaderName),

    #[error("invalid static header value: {0}")]
    HeaderValue(#[from] reqwest::header::InvalidHeaderValue),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Three-valued result of one storage operation.
///
/// `Noop` is an expected precondition failure (object missing, or an
/// overwrite the store refused); it is distinct from both success and error,
/// and a transport failure is never mapped to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The operation succeeded. Carries the body for GET, empty otherwise.
    Ok(Vec<u8>),
    /// The precondition failed in an expected way.
    Noop,
    /// Transport failure or unexpected HTTP status, with a diagnostic.
    Err(String),
}

/// Client for the remote HTTP(S) object store.
pub struct StorageClient {
    http: reqwest::Client,
    base_url: String,
    layout: UrlLayout,
    transfers: Semaphore,
}

impl StorageClient {
    /// Build the client from the startup configuration.
    ///
    /// The bearer token and every static header become default headers sent
    /// on each request, Authorization first, then the static headers in
    /// declaration order.
    pub fn new(config: &Config) -> Result<Self, StorageInitError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.bearer_token {
            headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?);
        }
        for (name, value) in &config.headers {
            headers.append(
                reqwest::header::HeaderName::from_bytes(name.as_bytes())?,
                HeaderValue::from_str(value)?,
            );
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .tcp_keepalive(Duration::from_secs(60))
            .pool_max_idle_per_host(MAX_IDLE_PER_HOST)
            .build()?;

        Ok(Self {
            http,
            base_url: config.url.clone(),
            layout: config.layout,
            transfers: Semaphore::new(MAX_CONCURRENT_TRANSFERS),
        })
    }

    /// Fetch the object stored under `hex_key`.
    pub async fn get(&self, hex_key: &str) -> Outcome {
        let url = self.url_for(hex_key);
        tracing::info!("GET {url}");
        let _permit = self.transfer_slot().await;

        let response = match self.http.get(&url).send().await {
            Ok(response) => response,
            Err(e) => return transport_error(e),
        };
        let status = response.status();
        let outcome = match status {
            StatusCode::OK => match response.bytes().await {
                Ok(body) => Outcome::Ok(body.to_vec()),
                Err(e) => transport_error(e),
            },
            StatusCode::NOT_FOUND => Outcome::Noop,
            other => http_error(other),
        };
        log_completion(&url, status);
        outcome
    }

    /// Store `value` under `hex_key`.
    ///
    /// With `overwrite` clear, a HEAD probe runs first: an existing object
    /// turns the whole operation into a NOOP without issuing the PUT, a 404
    /// lets the PUT proceed, and anything else surfaces as an error.
    pub async fn put(&self, hex_key: &str, value: Vec<u8>, overwrite: bool) -> Outcome {
        tracing::info!(
            "PUT {hex_key} ({} bytes, overwrite={overwrite})",
            value.len()
        );

        if !overwrite {
            match self.head(hex_key).await {
                Outcome::Ok(_) => {
                    tracing::info!("HEAD check: object exists, not overwriting");
                    return Outcome::Noop;
                }
                Outcome::Noop => {
                    tracing::info!("HEAD check: object absent, proceeding with PUT");
                }
                err @ Outcome::Err(_) => return err,
            }
        }

        self.do_put(hex_key, value).await
    }

    /// Delete the object stored under `hex_key`.
    pub async fn remove(&self, hex_key: &str) -> Outcome {
        let url = self.url_for(hex_key);
        tracing::info!("DELETE {url}");
        let _permit = self.transfer_slot().await;

        let response = match self.http.delete(&url).send().await {
            Ok(response) => response,
            Err(e) => return transport_error(e),
        };
        let status = response.status();
        log_completion(&url, status);
        if status.is_success() {
            Outcome::Ok(Vec::new())
        } else if status == StatusCode::NOT_FOUND {
            Outcome::Noop
        } else {
            http_error(status)
        }
    }

    /// Existence probe: OK when the object is there, NOOP when it is not.
    async fn head(&self, hex_key: &str) -> Outcome {
        let url = self.url_for(hex_key);
        let _permit = self.transfer_slot().await;

        let response = match self.http.head(&url).send().await {
            Ok(response) => response,
            Err(e) => return transport_error(e),
        };
        let status = response.status();
        log_completion(&url, status);
        match status {
            StatusCode::OK => Outcome::Ok(Vec::new()),
            StatusCode::NOT_FOUND => Outcome::Noop,
            other => http_error(other),
        }
    }

    async fn do_put(&self, hex_key: &str, value: Vec<u8>) -> Outcome {
        let url = self.url_for(hex_key);
        let _permit = self.transfer_slot().await;

        // The Vec body declares its size up front via Content-Length.
        let response = match self.http.put(&url).body(value).send().await {
            Ok(response) => response,
            Err(e) => return transport_error(e),
        };
        let status = response.status();
        log_completion(&url, status);
        if status.is_success() {
            Outcome::Ok(Vec::new())
        } else if status == StatusCode::CONFLICT || status == StatusCode::PRECONDITION_FAILED {
            // The store itself refused to replace the object.
            Outcome::Noop
        } else {
            http_error(status)
        }
    }

    fn url_for(&self, hex_key: &str) -> String {
        object_url(&self.base_url, self.layout, hex_key)
    }

    async fn transfer_slot(&self) -> tokio::sync::SemaphorePermit<'_> {
        self.transfers
            .acquire()
            .await
            .expect("Semaphore closed unexpectedly")
    }
}

fn transport_error(e: reqwest::Error) -> Outcome {
    let msg = e.to_string();
    tracing::warn!("Transfer error: {msg}");
    Outcome::Err(msg)
}

fn http_error(status: StatusCode) -> Outcome {
    Outcome::Err(format!("HTTP {}", status.as_u16()))
}

fn log_completion(url: &str, status: StatusCode) {
    tracing::info!("Request completed: {url} HTTP {}", status.as_u16());
}
