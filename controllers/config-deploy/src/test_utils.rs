//! Test utilities for unit testing the reconciler

use crate::reconciler::Context;
use controller_kit::MockClusterStore;
use crds::{ConfigDeployment, ConfigDeploymentSpec};
use std::sync::Arc;

pub const TEST_NAMESPACE: &str = "default";

/// Context over `store`.
pub fn test_context(store: &MockClusterStore) -> Arc<Context<MockClusterStore>> {
    Arc::new(Context::new(store.clone()))
}

/// Helper to create a test ConfigDeployment in [`TEST_NAMESPACE`]
pub fn create_test_config_deployment(
    name: &str,
    deploy_name: &str,
    greeting: &str,
    replicas: i32,
    image: &str,
) -> ConfigDeployment {
    let mut config_deployment = ConfigDeployment::new(
        name,
        ConfigDeploymentSpec {
            deploy_name: deploy_name.to_string(),
            deploy_namespace: TEST_NAMESPACE.to_string(),
            deploy_image: image.to_string(),
            greeting_message: greeting.to_string(),
            replica_count: replicas,
        },
    );
    config_deployment.metadata.namespace = Some(TEST_NAMESPACE.to_string());
    config_deployment
}
