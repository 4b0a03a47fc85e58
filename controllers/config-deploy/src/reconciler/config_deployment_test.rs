//! Unit tests for the ConfigDeployment reconciler

#[cfg(test)]
mod tests {
    use super::super::reconcile_config_deployment;
    use crate::error::ControllerError;
    use crate::fingerprint::config_fingerprint;
    use crate::resources::{first_image, template_annotation, CONFIG_HASH_ANNOTATION};
    use crate::test_utils::*;
    use controller_kit::{
        controller_reference, is_controlled_by, set_controller_reference, MockClusterStore, ObjectKey, StoreError, Verb,
    };
    use crds::ConfigDeployment;
    use k8s_openapi::api::apps::v1::Deployment;
    use k8s_openapi::api::core::v1::ConfigMap;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use kube::ResourceExt;
    use kube_runtime::controller::Action;
    use std::collections::BTreeMap;

    fn key() -> ObjectKey {
        ObjectKey::new(TEST_NAMESPACE, "greeter")
    }

    fn seeded_store(greeting: &str) -> (MockClusterStore, ConfigDeployment) {
        let store = MockClusterStore::new();
        let config_deployment =
            store.insert(create_test_config_deployment("greeter", "web", greeting, 2, "httpd"));
        (store, config_deployment)
    }

    /// Applies `change` to the stored ConfigDeployment, as a user edit would.
    fn edit(store: &MockClusterStore, change: impl FnOnce(&mut ConfigDeployment)) {
        let mut config_deployment: ConfigDeployment = store.stored(TEST_NAMESPACE, "greeter").unwrap();
        change(&mut config_deployment);
        store.insert(config_deployment);
    }

    fn greeting_data(greeting: &str) -> BTreeMap<String, String> {
        BTreeMap::from([("greetingMsg".to_string(), greeting.to_string())])
    }

    fn config_map(store: &MockClusterStore) -> ConfigMap {
        store.stored(TEST_NAMESPACE, "web-config").expect("ConfigMap exists")
    }

    fn deployment(store: &MockClusterStore) -> Deployment {
        store.stored(TEST_NAMESPACE, "web-deploy").expect("Deployment exists")
    }

    fn unowned_meta(name: &str) -> ObjectMeta {
        ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(TEST_NAMESPACE.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_greeting_change_rolls_deployment() {
        let (store, config_deployment) = seeded_store("hi");
        let ctx = test_context(&store);

        let action = reconcile_config_deployment(key(), ctx.clone()).await.unwrap();
        assert_eq!(action, Action::await_change());

        let owner_uid = config_deployment.uid().unwrap();
        let created_map = config_map(&store);
        assert_eq!(created_map.data, Some(greeting_data("hi")));
        assert!(is_controlled_by(&created_map, &owner_uid));

        let created = deployment(&store);
        assert!(is_controlled_by(&created, &owner_uid));
        assert_eq!(created.spec.as_ref().unwrap().replicas, Some(2));
        assert_eq!(first_image(&created), Some("httpd"));
        let hi_fingerprint = config_fingerprint(&greeting_data("hi"));
        assert_eq!(
            template_annotation(&created, CONFIG_HASH_ANNOTATION),
            Some(hi_fingerprint.as_str())
        );

        edit(&store, |cd| cd.spec.greeting_message = "hello".to_string());
        reconcile_config_deployment(key(), ctx).await.unwrap();

        assert_eq!(config_map(&store).data, Some(greeting_data("hello")));
        let rolled = deployment(&store);
        let hello_fingerprint = config_fingerprint(&greeting_data("hello"));
        assert_eq!(
            template_annotation(&rolled, CONFIG_HASH_ANNOTATION),
            Some(hello_fingerprint.as_str())
        );
        assert_ne!(hello_fingerprint, hi_fingerprint);
        assert_eq!(rolled.spec.as_ref().unwrap().replicas, Some(2));
        assert_eq!(first_image(&rolled), Some("httpd"));
    }

    #[tokio::test]
    async fn test_second_reconcile_writes_nothing() {
        let (store, _) = seeded_store("hi");
        let ctx = test_context(&store);

        reconcile_config_deployment(key(), ctx.clone()).await.unwrap();
        store.clear_operations();
        reconcile_config_deployment(key(), ctx).await.unwrap();

        assert_eq!(store.write_count(), 0);
        assert_eq!(store.list::<ConfigMap>(TEST_NAMESPACE).len(), 1);
        assert_eq!(store.list::<Deployment>(TEST_NAMESPACE).len(), 1);
    }

    #[tokio::test]
    async fn test_replica_drift_is_restored() {
        let (store, _) = seeded_store("hi");
        let ctx = test_context(&store);
        reconcile_config_deployment(key(), ctx.clone()).await.unwrap();

        let mut scaled = deployment(&store);
        scaled.spec.as_mut().unwrap().replicas = Some(5);
        store.insert(scaled);

        reconcile_config_deployment(key(), ctx).await.unwrap();

        assert_eq!(deployment(&store).spec.unwrap().replicas, Some(2));
        assert_eq!(store.count(Verb::Update, "Deployment"), 1);
        assert_eq!(store.count(Verb::Update, "ConfigMap"), 0);
    }

    #[tokio::test]
    async fn test_image_and_replica_changes_are_applied() {
        let (store, _) = seeded_store("hi");
        let ctx = test_context(&store);
        reconcile_config_deployment(key(), ctx.clone()).await.unwrap();

        edit(&store, |cd| {
            cd.spec.deploy_image = "httpd:2.4".to_string();
            cd.spec.replica_count = 3;
        });
        reconcile_config_deployment(key(), ctx).await.unwrap();

        let updated = deployment(&store);
        assert_eq!(first_image(&updated), Some("httpd:2.4"));
        assert_eq!(updated.spec.as_ref().unwrap().replicas, Some(3));
        assert_eq!(store.count(Verb::Update, "ConfigMap"), 0);
    }

    #[tokio::test]
    async fn test_config_map_update_keeps_foreign_metadata() {
        let (store, _) = seeded_store("hi");
        let ctx = test_context(&store);
        reconcile_config_deployment(key(), ctx.clone()).await.unwrap();

        let mut labelled = config_map(&store);
        labelled.labels_mut().insert("team".to_string(), "web".to_string());
        store.insert(labelled);

        edit(&store, |cd| cd.spec.greeting_message = "hello".to_string());
        reconcile_config_deployment(key(), ctx).await.unwrap();

        let updated = config_map(&store);
        assert_eq!(updated.data, Some(greeting_data("hello")));
        assert_eq!(updated.labels().get("team").map(String::as_str), Some("web"));
    }

    #[tokio::test]
    async fn test_missing_config_deployment_is_a_no_op() {
        let store = MockClusterStore::new();

        let action = reconcile_config_deployment(key(), test_context(&store)).await.unwrap();

        assert_eq!(action, Action::await_change());
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_deploy_name_is_rejected() {
        let store = MockClusterStore::new();
        store.insert(create_test_config_deployment("greeter", "", "hi", 1, "httpd"));

        let err = reconcile_config_deployment(key(), test_context(&store)).await.unwrap_err();

        assert!(matches!(err, ControllerError::InvalidSpec(_)));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_config_map_read_error_stops_before_deployment() {
        let (store, _) = seeded_store("hi");
        store.fail_next(Verb::Get, "ConfigMap");

        let err = reconcile_config_deployment(key(), test_context(&store)).await.unwrap_err();

        assert!(matches!(err, ControllerError::Store(StoreError::Unavailable(_))));
        assert_eq!(store.write_count(), 0);
        assert!(store.list::<Deployment>(TEST_NAMESPACE).is_empty());
    }

    #[tokio::test]
    async fn test_unowned_objects_are_adopted() {
        let (store, config_deployment) = seeded_store("hi");
        store.insert(ConfigMap {
            metadata: unowned_meta("web-config"),
            data: Some(greeting_data("old")),
            ..Default::default()
        });
        store.insert(Deployment {
            metadata: unowned_meta("web-deploy"),
            ..Default::default()
        });
        let ctx = test_context(&store);

        reconcile_config_deployment(key(), ctx.clone()).await.unwrap();

        let owner_uid = config_deployment.uid().unwrap();
        let adopted_map = config_map(&store);
        assert!(is_controlled_by(&adopted_map, &owner_uid));
        assert_eq!(adopted_map.data, Some(greeting_data("hi")));
        let adopted = deployment(&store);
        assert!(is_controlled_by(&adopted, &owner_uid));
        assert_eq!(adopted.spec.as_ref().unwrap().replicas, Some(2));
        assert_eq!(first_image(&adopted), Some("httpd"));
        assert_eq!(store.count(Verb::Create, "ConfigMap"), 0);
        assert_eq!(store.count(Verb::Create, "Deployment"), 0);

        store.clear_operations();
        reconcile_config_deployment(key(), ctx).await.unwrap();
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_shared_deploy_name_is_not_taken_over() {
        let store = MockClusterStore::new();
        let first = store.insert(create_test_config_deployment("a", "web", "hi", 2, "httpd"));
        store.insert(create_test_config_deployment("b", "web", "hello", 4, "nginx"));
        let ctx = test_context(&store);
        let first_key = ObjectKey::new(TEST_NAMESPACE, "a");
        let second_key = ObjectKey::new(TEST_NAMESPACE, "b");

        reconcile_config_deployment(first_key.clone(), ctx.clone()).await.unwrap();
        store.clear_operations();

        for _ in 0..3 {
            let err = reconcile_config_deployment(second_key.clone(), ctx.clone()).await.unwrap_err();
            assert!(matches!(err, ControllerError::NotOwned(_)));
            reconcile_config_deployment(first_key.clone(), ctx.clone()).await.unwrap();
        }

        assert_eq!(store.write_count(), 0);
        let owner_uid = first.uid().unwrap();
        assert!(is_controlled_by(&config_map(&store), &owner_uid));
        assert_eq!(config_map(&store).data, Some(greeting_data("hi")));
        assert!(is_controlled_by(&deployment(&store), &owner_uid));
        assert_eq!(first_image(&deployment(&store)), Some("httpd"));
    }

    #[tokio::test]
    async fn test_foreign_deployment_is_rejected_after_config_map() {
        let (store, _) = seeded_store("hi");
        let mut foreign = Deployment {
            metadata: unowned_meta("web-deploy"),
            ..Default::default()
        };
        let other = store.insert(create_test_config_deployment("other", "elsewhere", "hi", 1, "httpd"));
        set_controller_reference(&mut foreign, controller_reference(&other).unwrap());
        store.insert(foreign);

        let err = reconcile_config_deployment(key(), test_context(&store)).await.unwrap_err();

        assert!(matches!(err, ControllerError::NotOwned(_)));
        assert_eq!(store.count(Verb::Create, "ConfigMap"), 1);
        assert_eq!(store.count(Verb::Update, "Deployment"), 0);
        assert!(is_controlled_by(&deployment(&store), &other.uid().unwrap()));
    }
}
