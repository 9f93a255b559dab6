//! Endpoint health discovery
//!
//! Candidates are probed strictly in priority order and the first healthy one
//! wins. The list is walked once; if nothing answers, the run stops.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use super::{BalanceReading, NodeApi, NodeStatus};
use crate::error::{Error, Result};

/// A node endpoint that passed the health probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: String,
    pub liveness_verified: bool,
}

/// The endpoint chosen for this run plus the client bound to it
pub struct SelectedEndpoint<N> {
    pub endpoint: Endpoint,
    pub status: NodeStatus,
    pub client: Arc<N>,
}

/// Outcome of probing one candidate (used by the `health` command)
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub url: String,
    pub latency_ms: u64,
    pub result: std::result::Result<NodeStatus, String>,
}

impl ProbeReport {
    pub fn is_healthy(&self) -> bool {
        self.result.is_ok()
    }
}

/// Picks the first healthy node from a prioritized list
#[derive(Debug, Clone)]
pub struct EndpointSelector {
    candidates: Vec<String>,
    probe_address: String,
    denom: String,
}

impl EndpointSelector {
    pub fn new(candidates: Vec<String>, probe_address: impl Into<String>, denom: impl Into<String>) -> Result<Self> {
        if candidates.is_empty() {
            return Err(Error::Config("no node endpoints configured".into()));
        }

        Ok(Self {
            candidates,
            probe_address: probe_address.into(),
            denom: denom.into(),
        })
    }

    /// Healthy = liveness answers AND a sample balance read comes back as
    /// either an amount or a well-formed "no account".
    pub async fn probe<N: NodeApi + ?Sized>(&self, client: &N) -> Result<NodeStatus> {
        let status = client.node_status().await?;
        debug!(
            "{} is live (network {}, version {})",
            client.url(),
            status.network,
            status.version
        );

        match client.balance(&self.probe_address, &self.denom).await? {
            BalanceReading::Amount(amount) => {
                debug!("{} sample read ok ({} {})", client.url(), amount, self.denom)
            }
            BalanceReading::NoAccount => {
                debug!("{} sample read ok (no account)", client.url())
            }
        }

        Ok(status)
    }

    /// Return the first healthy candidate. `connect` builds a client for a URL.
    pub async fn select<N, F>(&self, connect: F) -> Result<SelectedEndpoint<N>>
    where
        N: NodeApi,
        F: Fn(&str) -> Result<N>,
    {
        for url in &self.candidates {
            let client = match connect(url) {
                Ok(client) => client,
                Err(e) => {
                    warn!("Skipping endpoint {}: {}", url, e);
                    continue;
                }
            };

            match self.probe(&client).await {
                Ok(status) => {
                    info!("Selected endpoint {} ({})", url, status.network);
                    return Ok(SelectedEndpoint {
                        endpoint: Endpoint {
                            url: url.clone(),
                            liveness_verified: true,
                        },
                        status,
                        client: Arc::new(client),
                    });
                }
                Err(e) => warn!("Endpoint {} unhealthy: {}", url, e),
            }
        }

        Err(Error::NoHealthyEndpoint {
            tried: self.candidates.len(),
        })
    }

    /// Probe every candidate without stopping at the first healthy one
    pub async fn probe_all<N, F>(&self, connect: F) -> Vec<ProbeReport>
    where
        N: NodeApi,
        F: Fn(&str) -> Result<N>,
    {
        let mut reports = Vec::with_capacity(self.candidates.len());

        for url in &self.candidates {
            let start = Instant::now();
            let result = match connect(url) {
                Ok(client) => self.probe(&client).await.map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };

            reports.push(ProbeReport {
                url: url.clone(),
                latency_ms: start.elapsed().as_millis() as u64,
                result,
            });
        }

        reports
    }
}
