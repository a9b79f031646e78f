//! AWS adapters: zone discovery and certificate removal through the `aws`
//! CLI, plus a local credential check that makes no network calls.

use std::path::PathBuf;

use anyhow::{Context, Result};
use envboot_common::CredentialsRef;

use crate::application::ports::{
    AvailabilityZoneRetriever, CertificateManager, CommandRunner, CredentialValidator, Invocation,
};
use crate::domain::CredentialsError;
use crate::infra::command_runner::ensure_success;
use crate::infra::fs::read_optional;

/// Drives the `aws` CLI with a fixed named profile.
pub struct AwsCli<R> {
    runner: R,
    binary: String,
    profile: String,
}

impl<R: CommandRunner> AwsCli<R> {
    #[must_use]
    pub fn new(runner: R, binary: &str, profile: &str) -> Self {
        Self {
            runner,
            binary: binary.to_string(),
            profile: profile.to_string(),
        }
    }

    async fn aws(&self, args: &[&str]) -> Result<std::process::Output> {
        let mut full: Vec<&str> = args.to_vec();
        if !self.profile.is_empty() {
            full.extend(["--profile", self.profile.as_str()]);
        }
        self.runner.run(&Invocation::new(&self.binary, &full)).await
    }
}

impl<R: CommandRunner> AvailabilityZoneRetriever for AwsCli<R> {
    async fn retrieve(&self, region: &str) -> Result<Vec<String>> {
        let output = self
            .aws(&[
                "ec2",
                "describe-availability-zones",
                "--region",
                region,
                "--filters",
                "Name=state,Values=available",
                "--query",
                "AvailabilityZones[].ZoneName",
                "--output",
                "json",
            ])
            .await?;
        ensure_success(&output, "aws ec2 describe-availability-zones")?;
        let mut zones: Vec<String> = serde_json::from_slice(&output.stdout)
            .context("parsing availability zones")?;
        zones.sort();
        anyhow::ensure!(!zones.is_empty(), "region {region} reports no availability zones");
        Ok(zones)
    }
}

impl<R: CommandRunner> CertificateManager for AwsCli<R> {
    async fn delete(&self, certificate_name: &str) -> Result<()> {
        let output = self
            .aws(&[
                "iam",
                "delete-server-certificate",
                "--server-certificate-name",
                certificate_name,
            ])
            .await?;
        ensure_success(&output, "aws iam delete-server-certificate")
    }
}

/// Checks that the configured profile and region are usable locally.
///
/// Looks at the shared credentials and config files only; nothing is sent
/// to AWS.
#[derive(Debug, Clone, Default)]
pub struct AwsCredentialValidator {
    files: Vec<PathBuf>,
}

impl AwsCredentialValidator {
    #[must_use]
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self { files }
    }

    /// Resolve the shared files the way the AWS CLI does: explicit env
    /// overrides first, then `~/.aws/credentials` and `~/.aws/config`.
    #[must_use]
    pub fn from_env() -> Self {
        let home = dirs::home_dir().map(|h| h.join(".aws"));
        let credentials = std::env::var_os("AWS_SHARED_CREDENTIALS_FILE")
            .map(PathBuf::from)
            .or_else(|| home.as_ref().map(|h| h.join("credentials")));
        let config = std::env::var_os("AWS_CONFIG_FILE")
            .map(PathBuf::from)
            .or_else(|| home.as_ref().map(|h| h.join("config")));
        Self::new(credentials.into_iter().chain(config).collect())
    }

    fn profile_known(&self, profile: &str) -> Result<bool> {
        for path in &self.files {
            if profile_declared(&read_optional(path)?, profile) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl CredentialValidator for AwsCredentialValidator {
    fn validate(&self, credentials: &CredentialsRef) -> Result<()> {
        if credentials.profile.is_empty() {
            return Err(CredentialsError::MissingProfile.into());
        }
        if credentials.region.is_empty() {
            return Err(CredentialsError::MissingRegion.into());
        }
        if !self.profile_known(&credentials.profile)? {
            return Err(CredentialsError::UnknownProfile(credentials.profile.clone()).into());
        }
        Ok(())
    }
}

/// Whether an INI-style AWS file declares `profile`, either as `[name]`
/// (credentials file) or `[profile name]` (config file).
#[must_use]
pub fn profile_declared(ini: &str, profile: &str) -> bool {
    ini.lines()
        .filter_map(|line| {
            line.trim()
                .strip_prefix('[')
                .and_then(|l| l.strip_suffix(']'))
        })
        .map(|section| {
            let section = section.trim();
            section
                .strip_prefix("profile ")
                .map_or(section, str::trim)
        })
        .any(|name| name == profile)
}
