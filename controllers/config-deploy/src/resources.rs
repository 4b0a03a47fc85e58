//! Desired ConfigMap and Deployment for a ConfigDeployment.

use crate::error::ControllerError;
use crate::fingerprint::{config_fingerprint, spec_hash};
use controller_kit::controller_reference;
use crds::ConfigDeployment;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    ConfigMap, ConfigMapVolumeSource, Container, KeyToPath, PodSpec, PodTemplateSpec, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference};
use kube::ResourceExt;
use std::collections::BTreeMap;

/// ConfigMap key holding the greeting message
pub const GREETING_KEY: &str = "greetingMsg";

/// Pod-template annotation carrying the ConfigMap fingerprint
pub const CONFIG_HASH_ANNOTATION: &str = "configmap-hash";

/// Deployment annotation recording the hash of the last applied spec
pub const SPEC_HASH_ANNOTATION: &str = "cfg2deploy.meng.xu/desired-spec-hash";

const VOLUME_NAME: &str = "greeting-volume";
const SERVED_FILE: &str = "index.html";
const MOUNT_PATH: &str = "/usr/local/apache2/htdocs/index.html";

/// Everything one ConfigDeployment should own.
#[derive(Debug, Clone)]
pub struct DesiredState {
    pub config_map: ConfigMap,
    pub deployment: Deployment,
    pub fingerprint: String,
}

/// Computes the desired objects, validating the spec first.
pub fn desired_state(config_deployment: &ConfigDeployment) -> Result<DesiredState, ControllerError> {
    let spec = &config_deployment.spec;
    if spec.deploy_name.trim().is_empty() {
        return Err(ControllerError::InvalidSpec(format!(
            "{}: deployName must not be empty",
            config_deployment.name_any()
        )));
    }

    let namespace = target_namespace(config_deployment)?;
    let owner = controller_reference(config_deployment).ok_or_else(|| {
        ControllerError::OwnerReference(format!(
            "ConfigDeployment {}/{} has no UID",
            namespace,
            config_deployment.name_any()
        ))
    })?;

    let data = BTreeMap::from([(GREETING_KEY.to_string(), spec.greeting_message.clone())]);
    let fingerprint = config_fingerprint(&data);
    let config_map = desired_config_map(config_deployment, &namespace, owner.clone(), data);
    let deployment = desired_deployment(config_deployment, &namespace, owner, &fingerprint)?;

    Ok(DesiredState {
        config_map,
        deployment,
        fingerprint,
    })
}

/// Namespace the managed objects live in.
///
/// Owner references cannot cross namespaces, so `deployNamespace` must be
/// empty or equal to the ConfigDeployment's own namespace.
fn target_namespace(config_deployment: &ConfigDeployment) -> Result<String, ControllerError> {
    let own = config_deployment.namespace().unwrap_or_default();
    let requested = config_deployment.spec.deploy_namespace.trim();
    if requested.is_empty() || requested == own {
        Ok(own)
    } else {
        Err(ControllerError::InvalidSpec(format!(
            "{}: deployNamespace {:?} differs from the resource namespace {:?}",
            config_deployment.name_any(),
            requested,
            own
        )))
    }
}

fn app_labels(deploy_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([("app".to_string(), deploy_name.to_string())])
}

fn desired_config_map(
    config_deployment: &ConfigDeployment,
    namespace: &str,
    owner: OwnerReference,
    data: BTreeMap<String, String>,
) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(config_deployment.spec.config_map_name()),
            namespace: Some(namespace.to_string()),
            owner_references: Some(vec![owner]),
            ..Default::default()
        },
        data: Some(data),
        ..Default::default()
    }
}

fn desired_deployment(
    config_deployment: &ConfigDeployment,
    namespace: &str,
    owner: OwnerReference,
    fingerprint: &str,
) -> Result<Deployment, ControllerError> {
    let spec = &config_deployment.spec;
    let labels = app_labels(&spec.deploy_name);

    let deployment_spec = DeploymentSpec {
        replicas: Some(spec.replica_count),
        selector: LabelSelector {
            match_labels: Some(labels.clone()),
            ..Default::default()
        },
        template: PodTemplateSpec {
            metadata: Some(ObjectMeta {
                labels: Some(labels.clone()),
                annotations: Some(BTreeMap::from([(
                    CONFIG_HASH_ANNOTATION.to_string(),
                    fingerprint.to_string(),
                )])),
                ..Default::default()
            }),
            spec: Some(PodSpec {
                containers: vec![Container {
                    name: format!("{}-container", spec.deploy_name),
                    image: Some(spec.deploy_image.clone()),
                    volume_mounts: Some(vec![VolumeMount {
                        name: VOLUME_NAME.to_string(),
                        mount_path: MOUNT_PATH.to_string(),
                        sub_path: Some(SERVED_FILE.to_string()),
                        ..Default::default()
                    }]),
                    ..Default::default()
                }],
                volumes: Some(vec![Volume {
                    name: VOLUME_NAME.to_string(),
                    config_map: Some(ConfigMapVolumeSource {
                        name: spec.config_map_name(),
                        items: Some(vec![KeyToPath {
                            key: GREETING_KEY.to_string(),
                            path: SERVED_FILE.to_string(),
                            ..Default::default()
                        }]),
                        ..Default::default()
                    }),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
        },
        ..Default::default()
    };

    let marker = spec_hash(&deployment_spec)?;

    Ok(Deployment {
        metadata: ObjectMeta {
            name: Some(spec.deployment_name()),
            namespace: Some(namespace.to_string()),
            labels: Some(labels),
            annotations: Some(BTreeMap::from([(SPEC_HASH_ANNOTATION.to_string(), marker)])),
            owner_references: Some(vec![owner]),
            ..Default::default()
        },
        spec: Some(deployment_spec),
        ..Default::default()
    })
}

/// Value of the annotation `key` on the Deployment's pod template.
pub fn template_annotation<'a>(deployment: &'a Deployment, key: &str) -> Option<&'a str> {
    deployment
        .spec
        .as_ref()?
        .template
        .metadata
        .as_ref()?
        .annotations
        .as_ref()?
        .get(key)
        .map(String::as_str)
}

/// Image of the Deployment's first container.
pub fn first_image(deployment: &Deployment) -> Option<&str> {
    deployment
        .spec
        .as_ref()?
        .template
        .spec
        .as_ref()?
        .containers
        .first()?
        .image
        .as_deref()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_config_deployment;

    fn persisted(deploy_name: &str) -> ConfigDeployment {
        let mut config_deployment = create_test_config_deployment("greeter", deploy_name, "hi", 2, "httpd");
        config_deployment.metadata.uid = Some("cd-uid".to_string());
        config_deployment
    }

    #[test]
    fn test_desired_config_map() {
        let desired = desired_state(&persisted("web")).unwrap();
        let config_map = desired.config_map;

        assert_eq!(config_map.name_any(), "web-config");
        assert_eq!(config_map.namespace().as_deref(), Some("default"));
        assert_eq!(
            config_map.data,
            Some(BTreeMap::from([("greetingMsg".to_string(), "hi".to_string())]))
        );
        let owner = &config_map.metadata.owner_references.unwrap()[0];
        assert_eq!(owner.kind, "ConfigDeployment");
        assert_eq!(owner.uid, "cd-uid");
    }

    #[test]
    fn test_desired_deployment() {
        let desired = desired_state(&persisted("web")).unwrap();
        let deployment = &desired.deployment;

        assert_eq!(deployment.name_any(), "web-deploy");
        assert_eq!(deployment.labels().get("app").map(String::as_str), Some("web"));
        assert_eq!(first_image(deployment), Some("httpd"));
        assert_eq!(template_annotation(deployment, CONFIG_HASH_ANNOTATION), Some(desired.fingerprint.as_str()));
        assert!(deployment.annotations().contains_key(SPEC_HASH_ANNOTATION));

        let spec = deployment.spec.as_ref().unwrap();
        assert_eq!(spec.replicas, Some(2));
        assert_eq!(spec.selector.match_labels.as_ref().unwrap().get("app").map(String::as_str), Some("web"));

        let pod_spec = spec.template.spec.as_ref().unwrap();
        assert_eq!(pod_spec.containers[0].name, "web-container");
        let mount = &pod_spec.containers[0].volume_mounts.as_ref().unwrap()[0];
        assert_eq!(mount.name, "greeting-volume");
        assert_eq!(mount.mount_path, "/usr/local/apache2/htdocs/index.html");
        assert_eq!(mount.sub_path.as_deref(), Some("index.html"));

        let volume = &pod_spec.volumes.as_ref().unwrap()[0];
        let source = volume.config_map.as_ref().unwrap();
        assert_eq!(source.name, "web-config");
        let item = &source.items.as_ref().unwrap()[0];
        assert_eq!((item.key.as_str(), item.path.as_str()), ("greetingMsg", "index.html"));
    }

    #[test]
    fn test_spec_marker_tracks_content() {
        let first = desired_state(&persisted("web")).unwrap().deployment;
        let again = desired_state(&persisted("web")).unwrap().deployment;
        assert_eq!(first.annotations(), again.annotations());

        let mut changed = persisted("web");
        changed.spec.greeting_message = "hello".to_string();
        let changed = desired_state(&changed).unwrap().deployment;
        assert_ne!(
            first.annotations().get(SPEC_HASH_ANNOTATION),
            changed.annotations().get(SPEC_HASH_ANNOTATION)
        );
    }

    #[test]
    fn test_invalid_specs() {
        assert!(matches!(desired_state(&persisted("")), Err(ControllerError::InvalidSpec(_))));

        let mut elsewhere = persisted("web");
        elsewhere.spec.deploy_namespace = "other".to_string();
        assert!(matches!(desired_state(&elsewhere), Err(ControllerError::InvalidSpec(_))));

        let mut unset = persisted("web");
        unset.spec.deploy_namespace = String::new();
        assert_eq!(desired_state(&unset).unwrap().config_map.namespace().as_deref(), Some("default"));

        let mut unpersisted = persisted("web");
        unpersisted.metadata.uid = None;
        assert!(matches!(desired_state(&unpersisted), Err(ControllerError::OwnerReference(_))));
    }
}
