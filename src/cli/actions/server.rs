use crate::cli::actions::Action;
use crate::gateway::{
    self,
    reset::{LogCredentialDirectory, LogResetNotifier},
    GatewayConfig, GatewayState,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use url::Url;

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server {
            port,
            backend_url,
            login_path,
            frontend_url,
        } => {
            // Fail fast on an unusable backend URL instead of at the first proxied request.
            Url::parse(&backend_url)
                .with_context(|| format!("Invalid backend URL: {backend_url}"))?;

            let config = GatewayConfig::new(backend_url, frontend_url).with_login_path(login_path);

            let state = Arc::new(GatewayState::new(
                config,
                Arc::new(LogCredentialDirectory),
                Arc::new(LogResetNotifier),
            )?);

            gateway::new(port, state).await?;
        }
    }

    Ok(())
}
