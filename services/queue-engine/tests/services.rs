mod common;

use common::Harness;
use oqs_audit::{AuditAction, EntityKind};
use oqs_queue_engine::{
    model::{Configuration, ConfigurationName, DeploymentPatch, NewDeployment, NewPod, QueueStatus},
    service::{DocumentFilter, ServiceError, ServiceErrorKind},
};
use rstest::rstest;

#[tokio::test]
async fn duplicate_deployment_name_is_rejected() {
    let h = Harness::new().await;
    h.pod("cloud1", 50).await;
    h.create(NewDeployment::new("depl-one", "cloud1")).await;

    let err = h
        .deployments
        .create(NewDeployment::new("depl-one", "cloud2"), &h.actor)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ServiceErrorKind::Validation);
    assert_eq!(
        err.to_string(),
        "Name is not valid, provided name must be unique."
    );
}

#[rstest]
#[case(0)]
#[case(1000)]
#[tokio::test]
async fn custom_timeout_out_of_range_is_rejected(#[case] minutes: u32) {
    let h = Harness::new().await;
    let err = h
        .deployments
        .create(
            NewDeployment::new("depl-one", "cloud1").custom_timeout(minutes),
            &h.actor,
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ServiceErrorKind::Validation);
}

#[tokio::test]
async fn product_outside_the_catalog_is_rejected() {
    let h = Harness::new().await;
    h.pod("cloud1", 50).await;

    let err = h
        .deployments
        .create(NewDeployment::new("depl-one", "cloud1").product("vENN"), &h.actor)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ServiceErrorKind::Validation);
    assert_eq!(
        err.to_string(),
        "product is not valid, 'vENN' is not a product of the current Configuration"
    );
    assert!(h.deployments.list().await.unwrap().is_empty());

    h.create(NewDeployment::new("depl-one", "cloud1").product("cENM"))
        .await;
    let patch = DeploymentPatch {
        product: Some("legacy".to_string()),
        ..Default::default()
    };
    let err = h
        .deployments
        .update("depl-one", patch, &h.actor)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ServiceErrorKind::Validation);
    assert_eq!(h.deployment("depl-one").await.product, "cENM");
}

#[tokio::test]
async fn creating_a_deployment_creates_its_pod() {
    let h = Harness::new().await;
    let created = h
        .deployments
        .create(NewDeployment::new("depl-one", "cloud1"), &h.actor)
        .await
        .unwrap();

    let pod = created.pod_link.pod.unwrap();
    assert_eq!(pod.deployments, vec!["depl-one"]);
    assert_eq!(pod.load_tolerance(), 50);
    assert_eq!(pod.products.len(), 3);
    assert_eq!(h.status("depl-one").await, QueueStatus::Active);
}

#[tokio::test]
async fn deployment_without_configuration_is_saved_but_not_linked() {
    let h = Harness::without_configuration();
    let created = h
        .deployments
        .create(NewDeployment::new("depl-one", "cloud1"), &h.actor)
        .await
        .unwrap();

    assert_eq!(
        created.pod_link.pod_status,
        "Error: Failed to update Pod cloud1 with depl-one details."
    );
    assert!(created.queue.is_none());
    assert_eq!(h.status("depl-one").await, QueueStatus::Queued);
}

#[rstest]
#[case(DeploymentPatch { name: Some("depl-two".to_string()), ..Default::default() }, "name")]
#[case(DeploymentPatch { associated_pod: Some("cloud2".to_string()), ..Default::default() }, "associatedPod")]
#[tokio::test]
async fn immutable_deployment_fields_are_rejected(
    #[case] patch: DeploymentPatch,
    #[case] field: &str,
) {
    let h = Harness::new().await;
    h.pod("cloud1", 50).await;
    h.create(NewDeployment::new("depl-one", "cloud1")).await;

    let err = h
        .deployments
        .update("depl-one", patch, &h.actor)
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("Deployment '{field}' field is immutable and cannot be modified.")
    );
}

#[tokio::test]
async fn update_reports_missing_parent_pod() {
    let h = Harness::new().await;
    h.pod("cloud1", 50).await;
    h.create(NewDeployment::new("depl-one", "cloud1")).await;
    h.drop_pod("cloud1").await;

    let patch = DeploymentPatch {
        custom_timeout: Some(30),
        ..Default::default()
    };
    let updated = h
        .deployments
        .update("depl-one", patch, &h.actor)
        .await
        .unwrap();
    assert_eq!(
        updated.queue_message,
        "Associated Parent-Pod could not be found for queue-handling."
    );
    assert_eq!(updated.updated_deployment.custom_timeout, Some(30));
}

#[tokio::test]
async fn delete_with_missing_pod_still_succeeds() {
    let h = Harness::new().await;
    h.pod("cloud9", 50).await;
    h.create(NewDeployment::new("depl-one", "cloud9")).await;
    h.drop_pod("cloud9").await;

    let deleted = h.deployments.delete("depl-one", &h.actor).await.unwrap();
    assert_eq!(
        deleted.message,
        "Deployment deleted successfully.\nError whilst updating Parent-Pod: cloud9 does not correspond to a known Pod."
    );
    assert!(deleted.queue_message.is_none());
    assert!(matches!(
        h.deployments.get("depl-one").await,
        Err(ServiceError::NotFound { .. })
    ));
}

#[tokio::test]
async fn delete_unlinks_and_admits_next() {
    let h = Harness::new().await;
    h.pod("cloud1", 20).await;
    h.create(NewDeployment::new("depl-one", "cloud1")).await;
    h.create(NewDeployment::new("depl-two", "cloud1")).await;

    let deleted = h.deployments.delete("depl-one", &h.actor).await.unwrap();
    assert_eq!(
        deleted.message,
        "Deployment deleted successfully.\nParent-Pod updated successfully."
    );
    assert_eq!(
        deleted.queue_message.as_deref(),
        Some("Queue-Handling for Pod cloud1.\nDeployments successfully set to Active: depl-two.")
    );
    let pod = h.stored_pod("cloud1").await.unwrap();
    assert_eq!(pod.deployments, vec!["depl-two"]);
}

#[tokio::test]
async fn delete_reports_failed_pod_update() {
    let h = Harness::new().await;
    h.pod("cloud1", 20).await;
    h.create(NewDeployment::new("depl-one", "cloud1")).await;
    h.backend.fail_writes_for("cloud1");

    let deleted = h.deployments.delete("depl-one", &h.actor).await.unwrap();
    assert!(deleted
        .message
        .starts_with("Deployment deleted successfully.\nError whilst updating Pod: "));
}

#[tokio::test]
async fn pod_with_deployments_cannot_be_deleted() {
    let h = Harness::new().await;
    h.pod("cloud1", 50).await;
    h.create(NewDeployment::new("depl-one", "cloud1")).await;

    let err = h.pods.delete("cloud1", &h.actor).await.unwrap_err();
    assert_eq!(err.kind(), ServiceErrorKind::Precondition);
    assert_eq!(
        err.to_string(),
        "This Pod has dependant Deployments so cannot be deleted"
    );

    h.deployments.delete("depl-one", &h.actor).await.unwrap();
    h.pods.delete("cloud1", &h.actor).await.unwrap();
    assert!(h.stored_pod("cloud1").await.is_none());
}

#[tokio::test]
async fn pod_requires_configuration() {
    let h = Harness::without_configuration();
    let err = h
        .pods
        .create(NewPod::new("cloud1"), &h.actor)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ServiceErrorKind::Precondition);
}

#[tokio::test]
async fn pod_name_is_immutable() {
    let h = Harness::new().await;
    h.pod("cloud1", 50).await;
    let patch = oqs_queue_engine::model::PodPatch {
        name: Some("cloud2".to_string()),
        ..Default::default()
    };
    let err = h.pods.update("cloud1", patch, &h.actor).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Pod 'name' field is immutable and cannot be modified."
    );
}

#[tokio::test]
async fn only_one_configuration_is_allowed() {
    let h = Harness::new().await;
    let err = h
        .configurations
        .create(
            Configuration::new(ConfigurationName::parse("second").unwrap()),
            &h.actor,
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ServiceErrorKind::Precondition);
    assert_eq!(
        err.to_string(),
        "Only 1 Configuration is currently supported, edit existing one"
    );
}

#[tokio::test]
async fn deleted_configuration_can_be_replaced() {
    let h = Harness::new().await;
    h.configurations.delete("default", &h.actor).await.unwrap();
    assert!(h.configurations.list().await.unwrap().is_empty());

    let err = h
        .configurations
        .delete("default", &h.actor)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { kind: "Configuration", .. }));

    let err = h
        .pods
        .create(NewPod::new("cloud1"), &h.actor)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ServiceErrorKind::Precondition);

    h.configurations
        .create(
            Configuration::new(ConfigurationName::parse("second").unwrap()),
            &h.actor,
        )
        .await
        .unwrap();
    h.pod("cloud1", 50).await;
}

#[tokio::test]
async fn search_keeps_documents_matching_every_field() {
    let h = Harness::new().await;
    h.pod("cloud1", 20).await;
    h.pod("cloud2", 50).await;
    h.create(NewDeployment::new("depl-one", "cloud1")).await;
    h.create(NewDeployment::new("depl-two", "cloud1")).await;
    h.create(NewDeployment::new("depl-three", "cloud2")).await;

    let filter: DocumentFilter = [("associatedPod", "cloud1"), ("queueStatus", "Active")]
        .into_iter()
        .collect();
    let found = h.deployments.search(&filter).await.unwrap();
    let names: Vec<_> = found.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["depl-one"]);

    let filter: DocumentFilter = [("podLoadTolerance", "50")].into_iter().collect();
    let pods = h.pods.search(&filter).await.unwrap();
    assert_eq!(pods.len(), 1);
    assert_eq!(pods[0].name.as_str(), "cloud2");

    let all = h.deployments.search(&DocumentFilter::default()).await.unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn catalog_changes_reach_pods_on_next_save() {
    let h = Harness::new().await;
    h.pod("cloud1", 50).await;

    let patch = oqs_queue_engine::model::ConfigurationPatch {
        products: Some(vec![oqs_queue_engine::model::CatalogProduct::new("vENM")]),
        ..Default::default()
    };
    h.configurations
        .update("default", patch, &h.actor)
        .await
        .unwrap();
    h.set_tolerance("cloud1", 40).await;

    let pod = h.stored_pod("cloud1").await.unwrap();
    let names: Vec<_> = pod.products.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["vENM"]);
}

#[tokio::test]
async fn mutations_are_audited_except_health_checks() {
    let h = Harness::new().await;
    h.pod("cloud1", 50).await;
    h.create(NewDeployment::new("depl-one", "cloud1")).await;
    h.create(NewDeployment::new("A_Health_check1", "cloud1"))
        .await;

    let records = h.history(EntityKind::Deployment).await;
    assert!(records.iter().all(|r| r.entity_name != "A_Health_check1"));

    let depl_one: Vec<_> = records
        .iter()
        .filter(|r| r.entity_name == "depl-one")
        .collect();
    assert_eq!(depl_one[0].action, AuditAction::Created);
    assert_eq!(depl_one[1].action, AuditAction::Updated);
    assert!(depl_one[1].changes.contains(&"queueStatus".to_string()));
    assert_eq!(depl_one[0].actor, oqs_audit::Actor::User("tester".to_string()));
    assert_eq!(depl_one[1].actor, oqs_audit::Actor::System);
}
