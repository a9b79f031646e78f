//! BOSH CLI adapter: jump host and director lifecycle via `bosh create-env`.
//!
//! Each deployment gets its own directory under the state directory holding
//! the manifest, the vars file derived from terraform outputs, the vars store
//! and the create-env state. The last two are mirrored into `EnvState`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use envboot_common::EnvState;
use serde_json::Value;

use crate::application::ports::{CommandRunner, DirectorManager, Invocation};
use crate::domain::{Outcome, Outputs};
use crate::infra::command_runner::ensure_success;
use crate::infra::fs::{read_optional, write_private};

/// Oldest bosh CLI release supporting the create-env flags we pass.
pub const MIN_BOSH_VERSION: semver::Version = semver::Version::new(6, 0, 0);

const JUMPBOX_DIR: &str = "jumpbox";
const DIRECTOR_DIR: &str = "director";
const JUMPBOX_MANIFEST: &str = "jumpbox.yml";
const DIRECTOR_MANIFEST: &str = "bosh.yml";
const VARS_FILE: &str = "vars-file.yml";
const VARS_STORE: &str = "creds.yml";
const CREATE_ENV_STATE: &str = "state.json";
const USER_OPS_FILE: &str = "user-ops-file.yml";

const DIRECTOR_PORT: u16 = 25555;
const DIRECTOR_USERNAME: &str = "admin";

/// Parse `bosh --version` output, e.g. `version 7.2.3-5b9c1d7-2023-04-04T10:23:58Z`.
///
/// # Errors
///
/// Returns an error if no version can be found or it is older than 6.0.0.
pub fn check_version_output(raw: &str) -> Result<semver::Version> {
    let token = raw
        .split_whitespace()
        .skip_while(|w| *w != "version")
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("unrecognised bosh version output: {}", raw.trim()))?;
    let core = token.split('-').next().unwrap_or(token);
    let version = semver::Version::parse(core)
        .with_context(|| format!("invalid bosh version '{token}'"))?;
    anyhow::ensure!(
        version >= MIN_BOSH_VERSION,
        "bosh cli {version} is not supported; version {MIN_BOSH_VERSION} or later is required"
    );
    Ok(version)
}

/// Director login details read back from a create-env vars store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectorCredentials {
    pub password: String,
    pub ca_cert: String,
}

/// Extract `admin_password` and `director_ssl.ca` from a vars store.
///
/// # Errors
///
/// Returns an error if the vars store is not valid YAML.
pub fn director_credentials(vars_store: &str) -> Result<DirectorCredentials> {
    if vars_store.trim().is_empty() {
        return Ok(DirectorCredentials::default());
    }
    let doc: serde_yaml::Value =
        serde_yaml::from_str(vars_store).context("parsing director vars store")?;
    let text = |v: Option<&serde_yaml::Value>| {
        v.and_then(serde_yaml::Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    Ok(DirectorCredentials {
        password: text(doc.get("admin_password")),
        ca_cert: text(doc.get("director_ssl").and_then(|ssl| ssl.get("ca"))),
    })
}

/// Vars file for one deployment: every terraform output plus identity fields.
///
/// # Errors
///
/// Returns an error if the outputs cannot be rendered as YAML.
pub fn render_vars_file(state: &EnvState, outputs: &Outputs, deployment: &str) -> Result<String> {
    let mut vars: serde_json::Map<String, Value> = outputs
        .as_map()
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    vars.insert("env_id".into(), Value::String(state.env_id.clone()));
    vars.insert(
        "director_name".into(),
        Value::String(format!("{deployment}-{}", state.env_id)),
    );
    vars.insert(
        "region".into(),
        Value::String(state.credentials.region.clone()),
    );
    serde_yaml::to_string(&vars).context("rendering vars file")
}

/// Drives `bosh create-env` for the jump host and the director.
pub struct BoshCli<R> {
    runner: R,
    binary: String,
    state_dir: PathBuf,
    templates: Option<PathBuf>,
}

impl<R: CommandRunner> BoshCli<R> {
    #[must_use]
    pub fn new(runner: R, binary: &str, state_dir: &Path, templates: Option<PathBuf>) -> Self {
        Self {
            runner,
            binary: binary.to_string(),
            state_dir: state_dir.to_path_buf(),
            templates,
        }
    }

    fn deployment_dir(&self, name: &str) -> PathBuf {
        self.state_dir.join(name)
    }

    /// Lay out one deployment directory. Previously captured vars store and
    /// create-env state are restored when the directory lacks them.
    fn stage(
        &self,
        dir: &Path,
        manifest: &str,
        vars_file: &str,
        variables: &str,
        manifest_state: &Value,
    ) -> Result<()> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating directory {}", dir.display()))?;

        let target = dir.join(manifest);
        if let Some(templates) = &self.templates {
            let source = templates.join(manifest);
            std::fs::copy(&source, &target)
                .with_context(|| format!("copying {}", source.display()))?;
        }
        anyhow::ensure!(
            target.exists(),
            "no {manifest} in {}; set templates.director in the envboot config",
            dir.display()
        );

        write_private(&dir.join(VARS_FILE), vars_file)?;

        let store = dir.join(VARS_STORE);
        if !variables.is_empty() && !store.exists() {
            write_private(&store, variables)?;
        }
        let env_state = dir.join(CREATE_ENV_STATE);
        if !manifest_state.is_null() && !env_state.exists() {
            let json = serde_json::to_string_pretty(manifest_state)
                .context("serializing create-env state")?;
            write_private(&env_state, &json)?;
        }
        Ok(())
    }

    async fn create_env(&self, dir: &Path, manifest: &str, ops_files: &[&str]) -> Result<()> {
        let mut args = vec![
            "create-env",
            manifest,
            "--state",
            CREATE_ENV_STATE,
            "--vars-store",
            VARS_STORE,
            "--vars-file",
            VARS_FILE,
            "--non-interactive",
            "--tty",
        ];
        for ops in ops_files {
            args.extend(["-o", *ops]);
        }
        let output = self
            .runner
            .run(&Invocation::new(&self.binary, &args).in_dir(dir))
            .await?;
        ensure_success(&output, "bosh create-env")
    }

    /// Vars store and create-env state left behind in `dir`.
    fn capture(dir: &Path) -> Result<(String, Value)> {
        let variables = read_optional(&dir.join(VARS_STORE))?;
        let raw_state = read_optional(&dir.join(CREATE_ENV_STATE))?;
        let manifest_state = if raw_state.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&raw_state).context("parsing create-env state")?
        };
        Ok((variables, manifest_state))
    }

    fn director_address(dir: &Path) -> Result<String> {
        let raw = read_optional(&dir.join(VARS_FILE))?;
        let vars: serde_yaml::Value = serde_yaml::from_str(&raw).context("parsing vars file")?;
        let ip = vars
            .get("director_internal_ip")
            .and_then(serde_yaml::Value::as_str)
            .unwrap_or_default();
        anyhow::ensure!(!ip.is_empty(), "terraform outputs lack director_internal_ip");
        Ok(format!("https://{ip}:{DIRECTOR_PORT}"))
    }

    async fn create_director_in(&self, mut state: EnvState) -> Outcome {
        let dir = self.deployment_dir(DIRECTOR_DIR);
        let ops: &[&str] = if state.director.user_ops_file.trim().is_empty() {
            &[]
        } else {
            &[USER_OPS_FILE]
        };
        let created = self.create_env(&dir, DIRECTOR_MANIFEST, ops).await;

        match Self::capture(&dir) {
            Ok((variables, manifest_state)) => {
                state.director.variables = variables;
                state.director.manifest_state = manifest_state;
            }
            Err(e) if created.is_ok() => return Outcome::Failure(e),
            Err(e) => tracing::warn!(error = %e, "could not capture director state"),
        }

        if let Err(e) = created {
            return Outcome::PartialFailure(state, e);
        }

        let finished = Self::director_address(&dir).and_then(|address| {
            let creds = director_credentials(&state.director.variables)?;
            Ok((address, creds))
        });
        match finished {
            Ok((address, creds)) => {
                state.director.name = format!("bosh-{}", state.env_id);
                state.director.address = address;
                state.director.username = DIRECTOR_USERNAME.to_string();
                state.director.password = creds.password;
                state.director.ca_cert = creds.ca_cert;
                Outcome::Success(state)
            }
            Err(e) => Outcome::PartialFailure(state, e),
        }
    }
}

impl<R: CommandRunner> DirectorManager for BoshCli<R> {
    async fn validate_version(&self) -> Result<()> {
        let output = self
            .runner
            .run(&Invocation::new(&self.binary, &["--version"]))
            .await?;
        ensure_success(&output, "bosh --version")?;
        let version = check_version_output(&String::from_utf8_lossy(&output.stdout))?;
        tracing::debug!(%version, "bosh cli version accepted");
        Ok(())
    }

    async fn initialize_jumpbox(&self, state: &EnvState, outputs: &Outputs) -> Result<()> {
        let vars = render_vars_file(state, outputs, JUMPBOX_DIR)?;
        self.stage(
            &self.deployment_dir(JUMPBOX_DIR),
            JUMPBOX_MANIFEST,
            &vars,
            &state.jumpbox.variables,
            &state.jumpbox.manifest_state,
        )
    }

    async fn create_jumpbox(&self, mut state: EnvState, jumpbox_url: &str) -> Result<EnvState> {
        let dir = self.deployment_dir(JUMPBOX_DIR);
        self.create_env(&dir, JUMPBOX_MANIFEST, &[]).await?;
        let (variables, manifest_state) = Self::capture(&dir)?;
        state.jumpbox.url = jumpbox_url.to_string();
        state.jumpbox.variables = variables;
        state.jumpbox.manifest_state = manifest_state;
        Ok(state)
    }

    async fn initialize_director(&self, state: &EnvState, outputs: &Outputs) -> Result<()> {
        let dir = self.deployment_dir(DIRECTOR_DIR);
        let vars = render_vars_file(state, outputs, "bosh")?;
        self.stage(
            &dir,
            DIRECTOR_MANIFEST,
            &vars,
            &state.director.variables,
            &state.director.manifest_state,
        )?;
        let ops_path = dir.join(USER_OPS_FILE);
        if state.director.user_ops_file.trim().is_empty() {
            if ops_path.exists() {
                std::fs::remove_file(&ops_path)
                    .with_context(|| format!("removing {}", ops_path.display()))?;
            }
        } else {
            write_private(&ops_path, &state.director.user_ops_file)?;
        }
        Ok(())
    }

    async fn create_director(&self, state: EnvState) -> Outcome {
        self.create_director_in(state).await
    }
}
