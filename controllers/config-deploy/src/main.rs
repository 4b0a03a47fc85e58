//! ConfigDeployment Controller
//!
//! Converges a ConfigMap holding a greeting message and a Deployment
//! serving it. The Deployment's pod template carries a fingerprint of the
//! ConfigMap content, so a message change rolls the Pods even when the
//! image and replica count stay the same.

mod controller;
mod error;
mod fingerprint;
mod reconciler;
mod resources;
mod watcher;
#[cfg(test)]
mod test_utils;

use crate::error::ControllerError;
use controller::Controller;
use controller_kit::RuntimeConfig;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if rustls::crypto::ring::default_provider().install_default().is_err() {
        warn!("rustls crypto provider already installed");
    }

    info!("Starting ConfigDeployment Controller");

    let config = RuntimeConfig::from_env()?;

    info!("Configuration:");
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Concurrency: {}", config.concurrency);
    info!("  Debounce: {:?}", config.debounce);
    info!("  Probe address: {}", config.probe_addr);

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
