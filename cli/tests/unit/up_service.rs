//! Tests for the `up` orchestrator: phase order, checkpoints, and the
//! argument and preflight guards.

use std::path::Path;

use anyhow::Result;
use envboot_cli::application::ports::{LocalFs as _, StateStore as _};
use envboot_cli::application::services::up::{
    PREVIOUS_OPS_FILE, UpDeps, UpOutcome, UpRequest, reconcile_args, up,
};
use envboot_cli::domain::{Outcome, UpError};
use envboot_cli::infra::fs::LocalFs;
use envboot_cli::infra::state::{StateBootstrap, StateManager};
use envboot_common::{EnvState, STATE_SCHEMA};

use crate::mocks::{
    CallLog, FakeCloudConfig, FakeDirector, FakeEngine, MemoryFs, MemoryStore, RecordingEnvIds,
    RecordingReporter, applied, director_created,
};

const SIDECAR: &str = "/state/previous-user-ops-file.yml";

struct Harness {
    log: CallLog,
    engine: FakeEngine,
    director: FakeDirector,
    cloud_config: FakeCloudConfig,
    env_ids: RecordingEnvIds,
    store: MemoryStore,
    fs: MemoryFs,
}

impl Harness {
    fn new() -> Self {
        let log = CallLog::default();
        Self {
            engine: FakeEngine::new(&log),
            director: FakeDirector::new(&log),
            cloud_config: FakeCloudConfig::new(&log),
            env_ids: RecordingEnvIds { log: log.clone() },
            store: MemoryStore::default(),
            fs: MemoryFs::default(),
            log,
        }
    }

    async fn run(&self, request: &UpRequest<'_>, state: EnvState) -> Result<UpOutcome> {
        let deps = UpDeps {
            engine: &self.engine,
            director: &self.director,
            cloud_config: &self.cloud_config,
            env_ids: &self.env_ids,
            store: &self.store,
            fs: &self.fs,
        };
        up(&deps, request, state, &RecordingReporter::default()).await
    }
}

fn named(name: &str) -> UpRequest<'_> {
    UpRequest {
        name: Some(name),
        ..UpRequest::default()
    }
}

fn existing(env_id: &str) -> EnvState {
    EnvState {
        schema_version: STATE_SCHEMA,
        env_id: env_id.to_string(),
        ..EnvState::default()
    }
}

fn with_director(env_id: &str) -> EnvState {
    director_created(applied(existing(env_id)))
}

// ── Full runs ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fresh_directory_up_creates_full_environment() {
    let dir = tempfile::TempDir::new().expect("tempdir");
    let log = CallLog::default();
    let engine = FakeEngine::new(&log);
    let director = FakeDirector::new(&log);
    let cloud_config = FakeCloudConfig::new(&log);
    let env_ids = RecordingEnvIds { log: log.clone() };
    let store = StateManager::new(dir.path().to_path_buf());
    let reporter = RecordingReporter::default();

    let initial = StateBootstrap::default()
        .load(dir.path(), &reporter)
        .await
        .expect("first run loads");
    let deps = UpDeps {
        engine: &engine,
        director: &director,
        cloud_config: &cloud_config,
        env_ids: &env_ids,
        store: &store,
        fs: &LocalFs,
    };
    let outcome = up(&deps, &named("foo"), initial, &reporter)
        .await
        .expect("up succeeds");

    assert_eq!(
        outcome,
        UpOutcome::DirectorReady {
            env_id: "foo".to_string(),
            director_address: "https://10.0.0.6:25555".to_string(),
        }
    );

    let persisted = StateBootstrap::default()
        .load(dir.path(), &reporter)
        .await
        .expect("reload");
    assert_eq!(persisted.env_id, "foo");
    assert!(!persisted.no_director);
    assert!(!persisted.infrastructure.is_empty());
    assert!(!persisted.director.is_empty());
    assert_eq!(persisted.schema_version, STATE_SCHEMA);
    assert!(reporter.warnings.lock().expect("lock").is_empty());
    assert!(dir.path().join(PREVIOUS_OPS_FILE).exists());

    assert_eq!(
        log.calls(),
        vec![
            "director.validate_version",
            "engine.validate_version",
            "env_ids.sync",
            "engine.init",
            "engine.apply",
            "engine.get_outputs",
            "director.initialize_jumpbox",
            "director.create_jumpbox",
            "director.initialize_director",
            "director.create_director",
            "cloud_config.update",
        ]
    );
}

#[tokio::test]
async fn test_up_checkpoints_after_every_durable_phase() {
    let h = Harness::new();
    h.run(&named("foo"), EnvState::default())
        .await
        .expect("up succeeds");

    let saved = h.store.saved.lock().expect("lock").clone();
    assert_eq!(saved.len(), 4, "env id, apply, jumpbox, director");
    assert_eq!(saved[0].env_id, "foo");
    assert!(saved[0].infrastructure.is_empty());
    assert!(!saved[1].infrastructure.is_empty());
    assert!(saved[1].jumpbox.url.is_empty());
    assert_eq!(saved[2].jumpbox.url, "10.0.0.5:22");
    assert!(saved[2].director.address.is_empty());
    assert_eq!(saved[3].director.address, "https://10.0.0.6:25555");
}

#[tokio::test]
async fn test_up_skips_init_when_engine_initialized() {
    let mut h = Harness::new();
    h.engine.initialized = true;
    h.run(&named("foo"), EnvState::default())
        .await
        .expect("up succeeds");
    assert_eq!(h.log.count("engine.init"), 0);
    assert_eq!(h.log.count("engine.apply"), 1);
}

#[tokio::test]
async fn test_up_rerun_keeps_env_id() {
    let h = Harness::new();
    h.run(&named("foo"), EnvState::default())
        .await
        .expect("first run");
    let after_first = h.store.last().expect("saved");

    h.run(&named("foo"), after_first.clone())
        .await
        .expect("second run");
    let after_second = h.store.last().expect("saved");
    assert_eq!(after_second.env_id, "foo");
    assert_eq!(after_second.env_id, after_first.env_id);
}

#[tokio::test]
async fn test_up_without_name_generates_env_id() {
    let h = Harness::new();
    let outcome = h
        .run(&UpRequest::default(), EnvState::default())
        .await
        .expect("up succeeds");
    let UpOutcome::DirectorReady { env_id, .. } = outcome else {
        panic!("expected a director");
    };
    assert!(env_id.starts_with("env-"), "got: {env_id}");
}

// ── No-director mode ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_no_director_stops_after_apply() {
    let h = Harness::new();
    let request = UpRequest {
        name: Some("foo"),
        no_director: true,
        ..UpRequest::default()
    };
    let outcome = h
        .run(&request, EnvState::default())
        .await
        .expect("up succeeds");

    assert_eq!(
        outcome,
        UpOutcome::InfrastructureOnly {
            env_id: "foo".to_string()
        }
    );
    assert!(
        h.log.calls().iter().all(|c| !c.starts_with("director.")),
        "no director calls expected: {:?}",
        h.log.calls()
    );
    assert_eq!(h.log.count("cloud_config.update"), 0);
    let saved = h.store.last().expect("saved");
    assert!(saved.no_director);
    assert!(saved.director.is_empty());
}

#[tokio::test]
async fn test_persisted_no_director_applies_without_flag() {
    let h = Harness::new();
    let mut state = existing("foo");
    state.no_director = true;
    let outcome = h
        .run(&UpRequest::default(), state)
        .await
        .expect("up succeeds");
    assert!(matches!(outcome, UpOutcome::InfrastructureOnly { .. }));
    assert_eq!(h.log.count("director.validate_version"), 0);
}

#[tokio::test]
async fn test_no_director_toggle_rejected_when_director_exists() {
    let h = Harness::new();
    let request = UpRequest {
        no_director: true,
        ..UpRequest::default()
    };
    let err = h
        .run(&request, with_director("foo"))
        .await
        .expect_err("toggle rejected");
    assert_eq!(
        err.downcast_ref::<UpError>(),
        Some(&UpError::DirectorAlreadyExists)
    );
    assert!(h.log.is_empty(), "unexpected calls: {:?}", h.log.calls());
    assert_eq!(h.store.save_count(), 0);
}

#[tokio::test]
async fn test_director_with_only_ops_file_blocks_no_director() {
    let h = Harness::new();
    let mut state = existing("foo");
    state.director.user_ops_file = "- type: remove\n".to_string();
    let request = UpRequest {
        no_director: true,
        ..UpRequest::default()
    };
    let err = h.run(&request, state).await.expect_err("toggle rejected");
    assert_eq!(
        err.downcast_ref::<UpError>(),
        Some(&UpError::DirectorAlreadyExists)
    );
}

// ── Renaming ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_rename_rejected_before_any_collaborator() {
    let h = Harness::new();
    let err = h
        .run(&named("bar"), existing("foo"))
        .await
        .expect_err("rename rejected");

    assert_eq!(
        err.downcast_ref::<UpError>(),
        Some(&UpError::NameChange {
            current: "foo".to_string()
        })
    );
    assert!(format!("{err:#}").contains("Current name is foo"));
    assert!(h.log.is_empty(), "unexpected calls: {:?}", h.log.calls());
    assert_eq!(h.store.save_count(), 0);
}

#[tokio::test]
async fn test_same_name_is_accepted() {
    let h = Harness::new();
    h.run(&named("foo"), existing("foo"))
        .await
        .expect("same name is fine");
}

#[tokio::test]
async fn test_invalid_name_fails_in_env_id_sync_without_checkpoint() {
    let h = Harness::new();
    let err = h
        .run(&named("Not_Valid"), EnvState::default())
        .await
        .expect_err("invalid name");
    assert!(format!("{err:#}").starts_with("env id sync"), "got: {err:#}");
    assert_eq!(h.store.save_count(), 0);
    assert_eq!(h.log.count("engine.apply"), 0);
}

// ── Preflight ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_engine_version_failure_aborts_without_mutation() {
    let mut h = Harness::new();
    h.engine.version_ok = false;
    let err = h
        .run(&named("foo"), EnvState::default())
        .await
        .expect_err("preflight fails");
    assert!(format!("{err:#}").starts_with("preflight"), "got: {err:#}");
    assert_eq!(
        h.log.calls(),
        vec!["director.validate_version", "engine.validate_version"]
    );
    assert_eq!(h.store.save_count(), 0);
}

#[tokio::test]
async fn test_director_version_failure_aborts_first() {
    let mut h = Harness::new();
    h.director.version_ok = false;
    let err = h
        .run(&named("foo"), EnvState::default())
        .await
        .expect_err("preflight fails");
    assert!(format!("{err:#}").contains("bosh cli 5.0.0"));
    assert_eq!(h.log.calls(), vec!["director.validate_version"]);
}

#[tokio::test]
async fn test_director_version_not_checked_without_director() {
    let mut h = Harness::new();
    h.director.version_ok = false;
    let request = UpRequest {
        no_director: true,
        ..UpRequest::default()
    };
    h.run(&request, existing("foo"))
        .await
        .expect("bosh version is irrelevant");
}

// ── Failure checkpoints ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_apply_partial_failure_persists_engine_state() {
    let mut h = Harness::new();
    h.engine.apply = Box::new(|mut state| {
        state.infrastructure.tf_state = "partial".to_string();
        Outcome::PartialFailure(state, anyhow::anyhow!("quota exceeded"))
    });
    let err = h
        .run(&named("foo"), EnvState::default())
        .await
        .expect_err("apply fails");

    let msg = format!("{err:#}");
    assert!(msg.starts_with("terraform apply"), "got: {msg}");
    assert!(msg.contains("quota exceeded"), "got: {msg}");
    let saved = h.store.last().expect("checkpoint written");
    assert_eq!(saved.infrastructure.tf_state, "partial");
    assert_eq!(saved.env_id, "foo");
    assert_eq!(h.log.count("director.initialize_jumpbox"), 0);
}

#[tokio::test]
async fn test_apply_failure_without_state_keeps_env_id_checkpoint() {
    let mut h = Harness::new();
    h.engine.apply = Box::new(|_| Outcome::Failure(anyhow::anyhow!("could not stage")));
    h.run(&named("foo"), EnvState::default())
        .await
        .expect_err("apply fails");
    assert_eq!(h.store.save_count(), 1);
    assert!(h.store.last().expect("saved").infrastructure.is_empty());
}

#[tokio::test]
async fn test_director_partial_failure_persists_half_created_record() {
    let mut h = Harness::new();
    h.director.create_director = Box::new(|mut state| {
        state.director.variables = "admin_password: s3cret\n".to_string();
        state.director.manifest_state = serde_json::json!({"current_vm_cid": "i-123"});
        Outcome::PartialFailure(state, anyhow::anyhow!("create-env timed out"))
    });

    let err = h
        .run(&named("foo"), EnvState::default())
        .await
        .expect_err("director fails");
    let msg = format!("{err:#}");
    assert!(msg.starts_with("create director"), "got: {msg}");
    assert!(msg.contains("create-env timed out"), "got: {msg}");

    let saved = h.store.last().expect("checkpoint written");
    assert_eq!(saved.jumpbox.url, "10.0.0.5:22");
    assert!(saved.director.address.is_empty());
    assert_eq!(saved.director.variables, "admin_password: s3cret\n");
    assert_eq!(saved.director.manifest_state["current_vm_cid"], "i-123");
    assert_eq!(h.log.count("cloud_config.update"), 0);
}

#[tokio::test]
async fn test_cloud_config_failure_is_fatal_after_director_checkpoint() {
    let mut h = Harness::new();
    h.cloud_config.fail = true;
    let err = h
        .run(&named("foo"), EnvState::default())
        .await
        .expect_err("cloud config fails");
    assert!(
        format!("{err:#}").starts_with("update cloud config"),
        "got: {err:#}"
    );
    let saved = h.store.last().expect("saved");
    assert_eq!(saved.director.address, "https://10.0.0.6:25555");
}

#[tokio::test]
async fn test_state_write_failure_is_fatal() {
    let mut h = Harness::new();
    h.store.fail = true;
    let err = h
        .run(&named("foo"), EnvState::default())
        .await
        .expect_err("persistence fails");
    assert_eq!(err.to_string(), "saving state after env id sync");
    assert_eq!(h.log.count("engine.apply"), 0);
}

// ── Ops-file overlay ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_ops_file_attached_and_previous_overlay_kept() {
    let mut h = Harness::new();
    h.fs = MemoryFs::with_file("/ops/new.yml", "- type: replace\n  path: /new\n");
    let mut state = with_director("foo");
    state.director.user_ops_file = "- type: replace\n  path: /old\n".to_string();

    let request = UpRequest {
        ops_file: Some(Path::new("/ops/new.yml")),
        ..UpRequest::default()
    };
    h.run(&request, state).await.expect("up succeeds");

    assert_eq!(
        h.fs.get(SIDECAR).as_deref(),
        Some("- type: replace\n  path: /old\n")
    );
    assert_eq!(
        h.director
            .seen_ops_file
            .lock()
            .expect("lock")
            .as_deref(),
        Some("- type: replace\n  path: /new\n")
    );
    let saved = h.store.last().expect("saved");
    assert_eq!(saved.director.user_ops_file, "- type: replace\n  path: /new\n");
    assert_eq!(
        saved.director.previous_user_ops_file,
        "- type: replace\n  path: /old\n"
    );
}

#[tokio::test]
async fn test_previous_overlay_is_default_ops_file() {
    let h = Harness::new();
    let mut state = with_director("foo");
    state.director.user_ops_file = "- type: remove\n  path: /x\n".to_string();
    h.run(&UpRequest::default(), state)
        .await
        .expect("up succeeds");
    let saved = h.store.last().expect("saved");
    assert_eq!(saved.director.user_ops_file, "- type: remove\n  path: /x\n");
    assert_eq!(saved.director.previous_user_ops_file, saved.director.user_ops_file);
}

#[tokio::test]
async fn test_missing_ops_file_fails_before_mutation() {
    let h = Harness::new();
    let request = UpRequest {
        ops_file: Some(Path::new("/ops/missing.yml")),
        ..UpRequest::default()
    };
    let err = h
        .run(&request, existing("foo"))
        .await
        .expect_err("missing ops file");
    assert!(format!("{err:#}").contains("missing.yml"), "got: {err:#}");
    assert_eq!(h.store.save_count(), 0);
    assert_eq!(h.log.count("env_ids.sync"), 0);
}

// ── reconcile_args ───────────────────────────────────────────────────────────

#[test]
fn test_reconcile_args_defaults_ops_file_to_sidecar() {
    let store = MemoryStore::default();
    let fs = MemoryFs::default();
    let config = reconcile_args(&store, &fs, &UpRequest::default(), &existing("foo"))
        .expect("reconcile");
    assert_eq!(config.ops_file, store.working_directory().join(PREVIOUS_OPS_FILE));
    assert!(config.name.is_empty());
    assert!(!config.no_director);
    assert_eq!(fs.read_to_string(&config.ops_file).expect("sidecar"), "");
}
