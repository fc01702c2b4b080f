use std::sync::Arc;

use anyhow::Context;

use hosteldesk_api::app::{
    build_app,
    services::{AppServices, SeedEmployee},
};
use hosteldesk_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;
    hosteldesk_observability::init(&config.log);

    if config.uses_dev_secret() {
        tracing::warn!("identity.signing_secret not set; using insecure dev default");
    }

    let mailer = AppServices::mailer_for(&config).context("failed to build mail client")?;
    let (services, provider) = AppServices::in_memory(&config, mailer);

    if let Some(email) = &config.bootstrap.admin_email {
        let name = config.bootstrap.admin_name.as_deref().unwrap_or("Administrator");
        let id = services
            .seed_employee(&provider, SeedEmployee::admin(name, email))
            .await
            .context("failed to seed bootstrap admin")?;
        tracing::info!(account_id = %id, email = %email, "bootstrap admin ready");
        if config.bootstrap.print_token {
            let token = services
                .gateway
                .issue_token(&id)
                .await
                .context("failed to issue bootstrap admin token")?;
            eprintln!("bootstrap admin token: {token}");
        }
    }

    let app = build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(&config.http.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.http.bind))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
