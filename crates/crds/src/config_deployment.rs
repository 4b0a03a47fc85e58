//! ConfigDeployment CRD
//!
//! Declares a greeting message served by a Deployment. The message lives in
//! a ConfigMap; the Deployment rolls whenever the message content changes.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "cfg2deploy.meng.xu",
    version = "v1",
    kind = "ConfigDeployment",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ConfigDeploymentSpec {
    /// Base name for the managed ConfigMap and Deployment
    pub deploy_name: String,

    /// Namespace the managed objects are created in
    pub deploy_namespace: String,

    /// Container image serving the greeting
    pub deploy_image: String,

    /// Content written into the ConfigMap
    #[serde(default)]
    pub greeting_message: String,

    /// Deployment replica count
    #[serde(default = "default_replica_count")]
    pub replica_count: i32,
}

fn default_replica_count() -> i32 {
    1
}

impl ConfigDeploymentSpec {
    /// Name of the managed ConfigMap.
    pub fn config_map_name(&self) -> String {
        format!("{}-config", self.deploy_name)
    }

    /// Name of the managed Deployment.
    pub fn deployment_name(&self) -> String {
        format!("{}-deploy", self.deploy_name)
    }
}
