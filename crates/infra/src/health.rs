//! Dependency health probes for detailed health checks.
//!
//! A probe never fails: a dependency that cannot be reached is reported as
//! `down` with the error text.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::transport::{HttpTransport, OutboundRequest};

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyStatus {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyHealth {
    pub status: DependencyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct HealthProbe {
    transport: Arc<dyn HttpTransport>,
    timeout: Duration,
}

impl HealthProbe {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `GET <base_url>/health`; any status below 400 counts as up.
    pub async fn check(&self, base_url: &str) -> DependencyHealth {
        let mut request = OutboundRequest::get(format!("{}/health", base_url.trim_end_matches('/')));
        request.timeout = Some(self.timeout);

        match self.transport.execute(request).await {
            Ok(response) if response.status < 400 => DependencyHealth {
                status: DependencyStatus::Up,
                error: None,
            },
            Ok(response) => DependencyHealth {
                status: DependencyStatus::Down,
                error: Some(format!("HTTP {}", response.status)),
            },
            Err(error) => DependencyHealth {
                status: DependencyStatus::Down,
                error: Some(error.to_string()),
            },
        }
    }
}
