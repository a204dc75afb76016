//! Environment health report.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use webacquire_fetch::{Capabilities, probe_network};
use webacquire_shared::FetchMethod;

use crate::engine::Engine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyStatus {
    Available,
    Unavailable,
}

/// External tools found on this machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToolStatus {
    pub pdftotext: bool,
    pub mutool: bool,
    pub pdfinfo: bool,
    pub chrome: bool,
}

/// Which strategies can run, which tools exist, and whether the network answers.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub strategies: BTreeMap<FetchMethod, StrategyStatus>,
    pub tools: ToolStatus,
    pub network: bool,
    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    pub fn from_capabilities(caps: &Capabilities, network: bool) -> Self {
        let strategies = FetchMethod::ALL
            .into_iter()
            .map(|m| {
                let status = if caps.is_available(m) {
                    StrategyStatus::Available
                } else {
                    StrategyStatus::Unavailable
                };
                (m, status)
            })
            .collect();

        Self {
            strategies,
            tools: ToolStatus {
                pdftotext: caps.pdftotext,
                mutool: caps.mutool,
                pdfinfo: caps.pdfinfo,
                chrome: caps.chrome_executable.is_some(),
            },
            network,
            checked_at: Utc::now(),
        }
    }

    /// Static fetch works and the network answers.
    pub fn is_healthy(&self) -> bool {
        self.network
            && self.strategies.get(&FetchMethod::Static) == Some(&StrategyStatus::Available)
    }
}

impl Engine {
    /// Re-probe the environment and report.
    #[instrument(skip_all)]
    pub async fn health_check(&self) -> HealthReport {
        let config = self.config();
        let (caps, network) = tokio::join!(
            Capabilities::detect(config),
            probe_network(&config.http.probe_url)
        );
        HealthReport::from_capabilities(&caps, network)
    }
}
