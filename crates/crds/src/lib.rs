//! Tracker CRD Definitions
//!
//! Kubernetes Custom Resource Definitions reconciled by the checkin and
//! config-deploy controllers.

pub mod check_in;
pub mod conditions;
pub mod config_deployment;
pub mod long_living_pod;

pub use check_in::*;
pub use conditions::*;
pub use config_deployment::*;
pub use long_living_pod::*;
