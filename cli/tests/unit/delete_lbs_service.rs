//! Tests for the `delete-lbs` orchestrator.

use anyhow::Result;
use envboot_cli::application::services::delete_lbs::{
    DeleteLbsDeps, DeleteLbsOutcome, DeleteLbsRequest, delete_lbs,
};
use envboot_cli::domain::DeleteLbsError;
use envboot_common::{EnvState, LB_TYPE_NONE, STATE_SCHEMA};

use crate::mocks::{
    CallLog, FakeCertificates, FakeCloudConfig, FakeInfrastructure, FakeValidator, FakeZones,
    MemoryStore, RecordingReporter, UPDATED_TF_STATE, UpdateResult, applied, director_created,
};

struct Harness {
    log: CallLog,
    validator: FakeValidator,
    zones: FakeZones,
    infrastructure: FakeInfrastructure,
    cloud_config: FakeCloudConfig,
    certificates: FakeCertificates,
    store: MemoryStore,
    reporter: RecordingReporter,
}

impl Harness {
    fn new() -> Self {
        let log = CallLog::default();
        Self {
            validator: FakeValidator {
                log: log.clone(),
                fail: false,
            },
            zones: FakeZones { log: log.clone() },
            infrastructure: FakeInfrastructure::new(&log),
            cloud_config: FakeCloudConfig::new(&log),
            certificates: FakeCertificates::new(&log),
            store: MemoryStore::default(),
            reporter: RecordingReporter::default(),
            log,
        }
    }

    async fn run(&self, skip_if_missing: bool, state: EnvState) -> Result<DeleteLbsOutcome> {
        let deps = DeleteLbsDeps {
            credentials: &self.validator,
            zones: &self.zones,
            infrastructure: &self.infrastructure,
            cloud_config: &self.cloud_config,
            certificates: &self.certificates,
            store: &self.store,
        };
        delete_lbs(&deps, DeleteLbsRequest { skip_if_missing }, state, &self.reporter).await
    }
}

/// A complete environment with a load balancer of `lb_type`.
fn environment(lb_type: &str, certificate: &str) -> EnvState {
    let mut state = director_created(applied(EnvState {
        schema_version: STATE_SCHEMA,
        env_id: "foo".to_string(),
        ..EnvState::default()
    }));
    state.credentials.profile = "ci".to_string();
    state.credentials.region = "us-east-1".to_string();
    state.key_pair.name = "keypair-foo".to_string();
    state.load_balancer.lb_type = lb_type.to_string();
    state.load_balancer.certificate_name = certificate.to_string();
    state
}

#[tokio::test]
async fn test_delete_lbs_clears_load_balancer_and_certificate() {
    let h = Harness::new();
    let outcome = h
        .run(false, environment("lb-type-x", "cert-1"))
        .await
        .expect("delete-lbs succeeds");

    assert_eq!(
        outcome,
        DeleteLbsOutcome::Deleted {
            certificate_name: "cert-1".to_string()
        }
    );
    let saved = h.store.last().expect("checkpoint written");
    assert_eq!(saved.load_balancer.lb_type, LB_TYPE_NONE);
    assert_eq!(saved.load_balancer.certificate_name, "");
    assert_eq!(saved.infrastructure.tf_state, UPDATED_TF_STATE);
    assert_eq!(
        *h.certificates.deleted.lock().expect("lock"),
        vec!["cert-1".to_string()]
    );
    assert_eq!(h.store.save_count(), 2);
}

#[tokio::test]
async fn test_stack_update_is_checkpointed_before_certificate_delete() {
    let h = Harness::new();
    h.run(false, environment("cf", "cert-1"))
        .await
        .expect("delete-lbs succeeds");

    let saved = h.store.saved.lock().expect("lock");
    assert_eq!(saved[0].infrastructure.tf_state, UPDATED_TF_STATE);
    assert_eq!(saved[0].load_balancer.lb_type, "cf");
    assert_eq!(saved[0].load_balancer.certificate_name, "cert-1");
    assert_eq!(saved[1].load_balancer.lb_type, LB_TYPE_NONE);
}

#[tokio::test]
async fn test_zone_count_is_recorded_from_deployed_subnets() {
    let h = Harness::new();
    h.run(false, environment("cf", "cert-1"))
        .await
        .expect("delete-lbs succeeds");
    assert_eq!(h.store.last().expect("saved").infrastructure.az_count, 2);
}

#[tokio::test]
async fn test_recorded_zone_count_is_kept_on_update() {
    let h = Harness::new();
    let mut state = environment("cf", "cert-1");
    state.infrastructure.az_count = 3;
    h.run(false, state).await.expect("delete-lbs succeeds");

    assert_eq!(h.infrastructure.updates.lock().expect("lock")[0].1, 3);
    assert_eq!(h.store.last().expect("saved").infrastructure.az_count, 3);
}

#[tokio::test]
async fn test_delete_lbs_strips_cloud_config_before_infrastructure_update() {
    let h = Harness::new();
    h.run(false, environment("concourse", "cert-1"))
        .await
        .expect("delete-lbs succeeds");

    assert_eq!(
        h.log.calls(),
        vec![
            "credentials.validate",
            "infrastructure.exists",
            "zones.retrieve:us-east-1",
            "infrastructure.describe",
            "cloud_config.apply",
            "infrastructure.update",
            "certificates.delete",
        ]
    );

    let pushed = h.cloud_config.applied.lock().expect("lock");
    let (input, director) = &pushed[0];
    assert!(input.lbs.is_empty(), "load balancers must be stripped");
    assert_eq!(input.zones.len(), 2);
    assert_eq!(director.address, "https://10.0.0.6:25555");
    assert_eq!(director.username, "admin");
}

#[tokio::test]
async fn test_delete_lbs_updates_stack_with_empty_lb_parameters() {
    let h = Harness::new();
    h.run(false, environment("cf", "cert-1"))
        .await
        .expect("delete-lbs succeeds");

    let updates = h.infrastructure.updates.lock().expect("lock");
    assert_eq!(
        updates[0],
        (
            "keypair-foo".to_string(),
            2,
            "foo".to_string(),
            String::new(),
            String::new(),
            "foo".to_string(),
        )
    );
}

#[tokio::test]
async fn test_skip_if_missing_makes_no_external_calls() {
    let mut h = Harness::new();
    // The credential check is local; only the remaining calls are external.
    h.validator.log = CallLog::default();
    let outcome = h
        .run(true, environment(LB_TYPE_NONE, ""))
        .await
        .expect("skip succeeds");

    assert_eq!(outcome, DeleteLbsOutcome::Skipped);
    assert!(h.log.is_empty(), "unexpected calls: {:?}", h.log.calls());
    assert_eq!(h.store.save_count(), 0);
    assert_eq!(
        *h.reporter.steps.lock().expect("lock"),
        vec!["no lb type exists, skipping...".to_string()]
    );
}

#[tokio::test]
async fn test_skip_if_missing_treats_empty_type_as_none() {
    let h = Harness::new();
    let outcome = h
        .run(true, environment("", ""))
        .await
        .expect("skip succeeds");
    assert_eq!(outcome, DeleteLbsOutcome::Skipped);
}

#[tokio::test]
async fn test_skip_if_missing_still_validates_credentials() {
    let mut h = Harness::new();
    h.validator.fail = true;
    let err = h
        .run(true, environment(LB_TYPE_NONE, ""))
        .await
        .expect_err("credentials checked first");
    assert!(
        format!("{err:#}").starts_with("validate credentials"),
        "got: {err:#}"
    );
}

#[tokio::test]
async fn test_missing_load_balancer_without_skip_is_precondition_error() {
    let h = Harness::new();
    let err = h
        .run(false, environment(LB_TYPE_NONE, ""))
        .await
        .expect_err("nothing to delete");
    assert_eq!(
        err.downcast_ref::<DeleteLbsError>(),
        Some(&DeleteLbsError::MissingLoadBalancer)
    );
    assert_eq!(h.store.save_count(), 0);
}

#[tokio::test]
async fn test_missing_stack_is_precondition_error() {
    let mut h = Harness::new();
    h.infrastructure.exists = false;
    let err = h
        .run(false, environment("cf", "cert-1"))
        .await
        .expect_err("no stack");
    assert_eq!(
        err.downcast_ref::<DeleteLbsError>(),
        Some(&DeleteLbsError::MissingStack)
    );
    assert_eq!(h.log.count("cloud_config.apply"), 0);
    assert_eq!(h.store.save_count(), 0);
}

#[tokio::test]
async fn test_empty_stack_name_fails_without_lookup() {
    let h = Harness::new();
    let mut state = environment("cf", "cert-1");
    state.infrastructure.stack_name.clear();
    let err = h.run(false, state).await.expect_err("no stack");
    assert_eq!(
        err.downcast_ref::<DeleteLbsError>(),
        Some(&DeleteLbsError::MissingStack)
    );
    assert_eq!(h.log.count("infrastructure.exists"), 0);
}

#[tokio::test]
async fn test_missing_director_is_precondition_error() {
    let h = Harness::new();
    let mut state = environment("cf", "cert-1");
    state.director = envboot_common::Director::default();
    let err = h.run(false, state).await.expect_err("no director");
    assert_eq!(
        err.downcast_ref::<DeleteLbsError>(),
        Some(&DeleteLbsError::MissingDirector)
    );
    assert!(format!("{err:#}").starts_with("check preconditions"));
}

#[tokio::test]
async fn test_stack_update_failure_keeps_certificate_and_state() {
    let mut h = Harness::new();
    h.infrastructure.update_result = UpdateResult::Failure;
    let err = h
        .run(false, environment("cf", "cert-1"))
        .await
        .expect_err("update fails");
    assert!(format!("{err:#}").starts_with("update stack"), "got: {err:#}");
    assert!(h.certificates.deleted.lock().expect("lock").is_empty());
    assert_eq!(h.store.save_count(), 0);
}

#[tokio::test]
async fn test_partial_stack_update_checkpoints_engine_state() {
    let mut h = Harness::new();
    h.infrastructure.update_result = UpdateResult::Partial;
    let err = h
        .run(false, environment("cf", "cert-1"))
        .await
        .expect_err("update fails part way");

    let msg = format!("{err:#}");
    assert!(msg.starts_with("update stack"), "got: {msg}");
    assert!(msg.contains("listener still in use"), "got: {msg}");
    assert_eq!(h.store.save_count(), 1);
    let saved = h.store.last().expect("partial state saved");
    assert_eq!(saved.infrastructure.tf_state, UPDATED_TF_STATE);
    assert_eq!(saved.load_balancer.lb_type, "cf");
    assert!(h.certificates.deleted.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn test_cloud_config_failure_stops_before_infrastructure() {
    let mut h = Harness::new();
    h.cloud_config.fail = true;
    h.run(false, environment("cf", "cert-1"))
        .await
        .expect_err("cloud config fails");
    assert_eq!(h.log.count("infrastructure.update"), 0);
    assert_eq!(h.log.count("certificates.delete"), 0);
}

#[tokio::test]
async fn test_no_certificate_skips_delete() {
    let h = Harness::new();
    let outcome = h
        .run(false, environment("concourse", ""))
        .await
        .expect("delete-lbs succeeds");
    assert_eq!(
        outcome,
        DeleteLbsOutcome::Deleted {
            certificate_name: String::new()
        }
    );
    assert_eq!(h.log.count("certificates.delete"), 0);
    assert_eq!(
        h.store.last().expect("saved").load_balancer.lb_type,
        LB_TYPE_NONE
    );
}
