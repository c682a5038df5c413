//! HTTP client for the remote fine-grained policy engine.

use async_trait::async_trait;
use serde::Deserialize;

use accessgate_auth::{PolicyResolver, Role};
use accessgate_core::RoleId;

use crate::discovery::{AuthHeaders, CandidateTable, EndpointDiscovery, OperationPayload};

#[derive(Debug, Deserialize)]
struct CheckPolicyResponse {
    allowed: bool,
}

pub struct HttpPolicyResolver {
    discovery: EndpointDiscovery,
    table: CandidateTable,
    service_secret: Option<String>,
}

impl HttpPolicyResolver {
    pub fn new(discovery: EndpointDiscovery, table: CandidateTable) -> Self {
        Self {
            discovery,
            table,
            service_secret: None,
        }
    }

    pub fn with_service_secret(mut self, secret: Option<String>) -> Self {
        self.service_secret = secret;
        self
    }
}

#[async_trait]
impl PolicyResolver for HttpPolicyResolver {
    async fn check_policy(
        &self,
        role_id: &RoleId,
        role: &Role,
        action: &str,
        resource: &str,
    ) -> Option<bool> {
        let payload = OperationPayload::Policy {
            role_id: role_id.as_str(),
            role: role.as_str(),
            action,
            resource,
        };
        let auth = AuthHeaders::new().service_secret(self.service_secret.as_deref());

        match self
            .discovery
            .resolve::<CheckPolicyResponse>(&self.table, &payload, &auth)
            .await
        {
            Ok(resolved) => {
                tracing::debug!(url = %resolved.url, allowed = resolved.value.allowed, "policy engine answered");
                Some(resolved.value.allowed)
            }
            Err(error) => {
                tracing::warn!(%error, "policy engine unreachable");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::discovery::{EndpointCandidate, Operation, RequestShape};
    use crate::discovery::testing::ScriptedTransport;

    fn resolver(transport: Arc<ScriptedTransport>) -> HttpPolicyResolver {
        HttpPolicyResolver::new(
            EndpointDiscovery::new(transport),
            CandidateTable::check_policy("http://rbac"),
        )
    }

    async fn check(r: &HttpPolicyResolver) -> Option<bool> {
        r.check_policy(&RoleId::new("rid-9"), &Role::new("editor"), "update", "documents")
            .await
    }

    #[tokio::test]
    async fn explicit_deny_is_some_false() {
        let transport = Arc::new(
            ScriptedTransport::new().json("http://rbac/api/v1/check", 200, json!({ "allowed": false })),
        );
        assert_eq!(check(&resolver(transport)).await, Some(false));
    }

    #[tokio::test]
    async fn forbidden_status_is_not_a_deny() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .json("http://rbac/api/v1/check", 403, json!({ "allowed": false }))
                .json("http://rbac/check", 200, json!({ "allowed": true })),
        );

        assert_eq!(check(&resolver(transport.clone())).await, Some(true));
        assert_eq!(
            transport.called_urls(),
            vec!["http://rbac/api/v1/check", "http://rbac/check"]
        );
    }

    #[tokio::test]
    async fn role_name_shape_uses_principal_role() {
        // The third candidate shares the first URL, so queue its answer behind the 422.
        let transport = Arc::new(
            ScriptedTransport::new()
                .json("http://rbac/api/v1/check", 422, json!({ "detail": "role_id not found" }))
                .json("http://rbac/check", 404, json!({ "detail": "Not Found" }))
                .json("http://rbac/api/v1/check", 200, json!({ "allowed": true })),
        );

        assert_eq!(check(&resolver(transport.clone())).await, Some(true));

        let calls = transport.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].query[0], ("role_id".to_string(), "rid-9".to_string()));
        assert_eq!(calls[2].query[0], ("role".to_string(), "editor".to_string()));
    }

    #[tokio::test]
    async fn unreachable_on_all_candidates_is_none() {
        let transport = Arc::new(ScriptedTransport::new());
        let table = CandidateTable::new(
            Operation::CheckPolicy,
            "http://rbac",
            vec![
                EndpointCandidate::get("/api/v1/check", RequestShape::RoleIdQuery),
                EndpointCandidate::get("/check", RequestShape::RoleIdQuery),
            ],
        )
        .unwrap();
        let r = HttpPolicyResolver::new(EndpointDiscovery::new(transport.clone()), table);

        assert_eq!(check(&r).await, None);
        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test]
    async fn sends_service_secret_only() {
        let transport = Arc::new(
            ScriptedTransport::new().json("http://rbac/api/v1/check", 200, json!({ "allowed": true })),
        );
        let r = resolver(transport.clone()).with_service_secret(Some("shared".into()));
        check(&r).await;

        let call = &transport.calls()[0];
        assert_eq!(call.header("X-Service-Secret"), Some("shared"));
        assert_eq!(call.header("Authorization"), None);
    }
}
