//! Infrastructure layer: upstream HTTP clients, endpoint discovery, retry
//! and configuration.

pub mod config;
pub mod discovery;
pub mod health;
pub mod policy_client;
pub mod retry;
pub mod session;
pub mod transport;
pub mod verifier;

pub use config::{ConfigError, ServiceConfig};
pub use discovery::{
    AllFailed, AuthHeaders, CandidateTable, CandidateTableError, EndpointCandidate, EndpointDiscovery, Operation,
    OperationPayload, RequestShape, Resolved,
};
pub use health::{DependencyHealth, DependencyStatus, HealthProbe};
pub use policy_client::HttpPolicyResolver;
pub use retry::{Backoff, RetryPolicy, retry};
pub use session::{SessionFailure, SessionStatus, SessionValidator};
pub use transport::{CandidateError, HttpMethod, HttpTransport, OutboundRequest, ReqwestTransport, TransportResponse};
pub use verifier::{HttpCredentialVerifier, UnavailablePolicy, mock_principal};
