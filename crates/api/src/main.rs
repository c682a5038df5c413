use anyhow::Context;

use accessgate_infra::ServiceConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    accessgate_observability::init();

    let config = ServiceConfig::from_env().context("load configuration")?;
    let bind_addr = config.bind_addr;

    let app = accessgate_api::app::build_app_from_config(&config)
        .context("wire application services")?;

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("bind {bind_addr}"))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        auth = %config.auth_service_url,
        rbac = %config.rbac_service_url,
        users = %config.user_management_url,
        on_unavailable = %config.on_unavailable,
        "access gateway listening"
    );

    axum::serve(listener, app).await.context("serve")?;
    Ok(())
}
