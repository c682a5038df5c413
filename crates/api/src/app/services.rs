//! Service wiring: upstream clients, decision engine and session validator.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use accessgate_auth::{AuthorizationEngine, CredentialVerifier, LocalPolicyTable, PolicyResolver};
use accessgate_infra::{
    CandidateTable, ConfigError, EndpointDiscovery, HealthProbe, HttpCredentialVerifier, HttpPolicyResolver,
    HttpTransport, ReqwestTransport, ServiceConfig, SessionValidator,
};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Upstream base URLs, kept for health probes and the service banner.
#[derive(Debug, Clone)]
pub struct Upstreams {
    pub auth: String,
    pub rbac: String,
    pub user_management: String,
}

pub struct AppServices {
    pub engine: AuthorizationEngine,
    pub sessions: SessionValidator,
    pub health: HealthProbe,
    pub upstreams: Upstreams,
    pub started_at: Instant,
}

impl AppServices {
    pub fn policy(&self) -> &LocalPolicyTable {
        self.engine.policy()
    }
}

/// Wire services from configuration using the reqwest transport.
pub fn build_services(config: &ServiceConfig) -> Result<AppServices, ServiceError> {
    let transport = ReqwestTransport::new(config.upstream_timeout)
        .map_err(|e| ServiceError::HttpClient(e.to_string()))?;
    let policy = config.load_policy_table()?;
    Ok(build_services_with(config, Arc::new(transport), policy))
}

/// Wire services over an arbitrary transport and role table.
pub fn build_services_with(
    config: &ServiceConfig,
    transport: Arc<dyn HttpTransport>,
    policy: LocalPolicyTable,
) -> AppServices {
    let discovery = EndpointDiscovery::new(transport.clone());
    let secret = config.inter_service_secret.clone();

    let verifier: Arc<dyn CredentialVerifier> = Arc::new(
        HttpCredentialVerifier::new(
            discovery.clone(),
            CandidateTable::validate_token(config.auth_service_url.as_str()),
            config.on_unavailable,
        )
        .with_service_secret(secret.clone())
        .with_retry(config.token_retry),
    );

    let resolver: Arc<dyn PolicyResolver> = Arc::new(
        HttpPolicyResolver::new(
            discovery.clone(),
            CandidateTable::check_policy(config.rbac_service_url.as_str()),
        )
        .with_service_secret(secret.clone()),
    );

    let sessions = SessionValidator::new(
        discovery,
        CandidateTable::validate_session(config.user_management_url.as_str()),
        config.session_retry,
        config.on_unavailable,
    )
    .with_service_secret(secret);

    tracing::info!(
        roles = policy.roles().count(),
        on_unavailable = %config.on_unavailable,
        "services wired"
    );

    AppServices {
        engine: AuthorizationEngine::new(verifier, resolver, Arc::new(policy)),
        sessions,
        health: HealthProbe::new(transport),
        upstreams: Upstreams {
            auth: config.auth_service_url.clone(),
            rbac: config.rbac_service_url.clone(),
            user_management: config.user_management_url.clone(),
        },
        started_at: Instant::now(),
    }
}
