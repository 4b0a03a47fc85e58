//! CheckIn Controller
//!
//! Runs two reconcilers in one process:
//! - CheckIn: keeps exactly one managed Pod per CheckIn and records the
//!   identity of every Pod it has observed
//! - LongLivingPod: periodically adds the active Pod of a designated
//!   CheckIn to a set once it has been running past a threshold

mod config;
mod controller;
mod error;
mod reconciler;
mod watcher;
#[cfg(test)]
mod test_utils;

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use controller::Controller;
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

    info!("Starting CheckIn Controller");

    let config = ControllerConfig::from_env()?;

    info!("Configuration:");
    info!("  Namespace: {}", config.runtime.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Concurrency: {}", config.runtime.concurrency);
    info!("  Debounce: {:?}", config.runtime.debounce);
    info!("  Probe address: {}", config.runtime.probe_addr);
    info!("  Longevity threshold: {}s", config.tracker.threshold.num_seconds());
    info!("  Longevity requeue: {:?}", config.tracker.requeue_interval);

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
