mod decode;

use crate::error::FetchError;
use crate::model::{MonitorConfig, RunCollection};
use anyhow::{Context, Result};
use reqwest::header::ACCEPT;
use std::future::Future;
use std::time::Duration;

/// Source of run collections. One call is one round trip; implementations never retry.
pub trait FetchRuns: Send + Sync + 'static {
    fn fetch(&self) -> impl Future<Output = Result<RunCollection, FetchError>> + Send;
}

/// HTTP fetcher for the runs endpoint.
pub struct RunFetcher {
    http: reqwest::Client,
    endpoint_url: String,
    timeout: Duration,
}

impl RunFetcher {
    pub fn new(cfg: &MonitorConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.timeout)
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            http,
            endpoint_url: cfg.endpoint_url.clone(),
            timeout: cfg.timeout,
        })
    }

    fn transport_error(&self, source: reqwest::Error) -> FetchError {
        if source.is_timeout() {
            FetchError::Timeout {
                url: self.endpoint_url.clone(),
                after: self.timeout,
            }
        } else {
            FetchError::Transport {
                url: self.endpoint_url.clone(),
                source,
            }
        }
    }
}

impl FetchRuns for RunFetcher {
    async fn fetch(&self) -> Result<RunCollection, FetchError> {
        let resp = self
            .http
            .get(&self.endpoint_url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status { status });
        }

        // The body read is covered by the client timeout too.
        let body = resp.bytes().await.map_err(|e| self.transport_error(e))?;
        decode::decode_runs(&body)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use axum::Router;

    /// Serve `router` on an ephemeral local port and return the runs endpoint URL.
    pub(crate) async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/api/runs")
    }
}
