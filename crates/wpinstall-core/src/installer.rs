//! The install pipeline.
//!
//! One run walks the stages below in order. Every fatal error is caught in
//! [`Installer::install`], which picks the cleanup scope and turns the error
//! into the single response of the run:
//!
//! ```text
//! NotStarted -> ValidatingEnvironment -> Downloading -> CoreInstalling
//!            -> ConfiguringCore -> InstallingPlugins -> ConfiguringAuth0
//!            -> Finalizing -> Done
//! (any non-terminal stage) -> Failed
//! ```
//!
//! Cleanup scope:
//! - conflict (the install path already exists): nothing is touched
//! - runtime validation failure: transient files only
//! - any later failure: full rollback, install tree included
//! - success: transient files only

use std::fmt;

use serde::Serialize;

use crate::auth0::Auth0Configurator;
use crate::command::{CommandLine, CommandRunner};
use crate::composer::Composer;
use crate::config::{CoreSource, InstallConfig, InstallSettings};
use crate::error::{InstallError, Result};
use crate::fetch::{Fetch, COMPOSER_PHAR_URL, WP_CLI_PHAR_URL};
use crate::fs;
use crate::gateway::DeployNotifier;
use crate::site_files;
use crate::wp_cli::{BestEffort, WpCli};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStage {
    NotStarted,
    ValidatingEnvironment,
    Downloading,
    CoreInstalling,
    ConfiguringCore,
    InstallingPlugins,
    ConfiguringAuth0,
    Finalizing,
    Done,
    Failed,
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InstallStage::NotStarted => "not_started",
            InstallStage::ValidatingEnvironment => "validating_environment",
            InstallStage::Downloading => "downloading",
            InstallStage::CoreInstalling => "core_installing",
            InstallStage::ConfiguringCore => "configuring_core",
            InstallStage::InstallingPlugins => "installing_plugins",
            InstallStage::ConfiguringAuth0 => "configuring_auth0",
            InstallStage::Finalizing => "finalizing",
            InstallStage::Done => "done",
            InstallStage::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Success,
    Failure { message: String, code: i32 },
}

/// Wire form of the outcome: `{"responseCode":200}` or
/// `{"responseCode":500,"error":{"message":...,"code":...}}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallResponse<'a> {
    response_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ResponseError<'a>>,
}

#[derive(Debug, Serialize)]
pub struct ResponseError<'a> {
    message: &'a str,
    code: i32,
}

impl InstallOutcome {
    pub fn from_error(error: &InstallError) -> Self {
        InstallOutcome::Failure {
            message: error.to_string(),
            code: error.code(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, InstallOutcome::Success)
    }

    pub fn to_response(&self) -> InstallResponse<'_> {
        match self {
            InstallOutcome::Success => InstallResponse {
                response_code: 200,
                error: None,
            },
            InstallOutcome::Failure { message, code } => InstallResponse {
                response_code: 500,
                error: Some(ResponseError {
                    message,
                    code: *code,
                }),
            },
        }
    }

    /// Process exit status: 0 on success, the failure's code otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            InstallOutcome::Success => 0,
            InstallOutcome::Failure { code, .. } => *code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub outcome: InstallOutcome,
    pub stage: InstallStage,
    /// Stage that was running when the install failed.
    pub failed_stage: Option<InstallStage>,
    /// Best-effort steps that did not complete.
    pub warnings: Vec<String>,
}

/// Per-run arguments from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    pub domain: String,
    pub project: String,
    pub admin_email: String,
    /// Enables the gateway notification when a notifier is configured.
    pub project_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cleanup {
    Skip,
    Transient,
    Rollback,
}

pub struct Installer<'a> {
    config: InstallConfig,
    settings: InstallSettings,
    runner: &'a dyn CommandRunner,
    fetcher: &'a dyn Fetch,
    notifier: Option<&'a dyn DeployNotifier>,
    stage: InstallStage,
    warnings: Vec<String>,
}

impl<'a> Installer<'a> {
    pub fn new(
        config: InstallConfig,
        settings: InstallSettings,
        runner: &'a dyn CommandRunner,
        fetcher: &'a dyn Fetch,
    ) -> Self {
        Self {
            config,
            settings,
            runner,
            fetcher,
            notifier: None,
            stage: InstallStage::NotStarted,
            warnings: Vec::new(),
        }
    }

    pub fn with_notifier(mut self, notifier: &'a dyn DeployNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Run the whole pipeline once. Never panics on install failures; the
    /// returned report carries the outcome to print.
    pub fn install(mut self, request: &InstallRequest) -> InstallReport {
        self.enter(InstallStage::ValidatingEnvironment);
        if let Err(e) = self.validate_environment() {
            return self.fail(e, Cleanup::Transient);
        }
        if fs::exists(&self.config.wordpress_path) {
            let conflict = InstallError::Conflict("The cms directory already exists".to_string());
            return self.fail(conflict, Cleanup::Skip);
        }

        match self.run_pipeline(request) {
            Ok(()) => {
                self.cleanup(Cleanup::Transient);
                self.enter(InstallStage::Done);
                InstallReport {
                    outcome: InstallOutcome::Success,
                    stage: self.stage,
                    failed_stage: None,
                    warnings: self.warnings,
                }
            }
            Err(e) => self.fail(e, Cleanup::Rollback),
        }
    }

    fn enter(&mut self, stage: InstallStage) {
        tracing::info!(from = %self.stage, to = %stage, "install stage");
        self.stage = stage;
    }

    fn warn(&mut self, outcome: BestEffort) {
        if let BestEffort::Warned(message) = outcome {
            self.warnings.push(message);
        }
    }

    fn fail(mut self, error: InstallError, cleanup: Cleanup) -> InstallReport {
        let failed_stage = self.stage;
        tracing::error!(stage = %failed_stage, code = error.code(), "install failed: {error}");
        self.cleanup(cleanup);
        self.enter(InstallStage::Failed);
        InstallReport {
            outcome: InstallOutcome::from_error(&error),
            stage: self.stage,
            failed_stage: Some(failed_stage),
            warnings: self.warnings,
        }
    }

    /// The PHP runtime must be at least the configured minimum version.
    fn validate_environment(&self) -> Result<()> {
        let minimum = &self.settings.min_php_version;
        let cmd = CommandLine::new(self.config.php_bin.clone()).args(["-r", "echo PHP_VERSION;"]);
        let output = self.runner.run(&cmd).map_err(|e| {
            tracing::error!("{e}");
            InstallError::Validation(format!(
                "PHP version {minimum} or higher is required, the version of {} could not be read.",
                self.config.php_bin
            ))
        })?;
        let found = output.text();
        let found = found.trim();
        tracing::debug!("php version {found}");
        if !version_at_least(found, minimum) {
            return Err(InstallError::Validation(format!(
                "PHP version {minimum} or higher is required."
            )));
        }
        Ok(())
    }

    fn run_pipeline(&mut self, request: &InstallRequest) -> Result<()> {
        let runner = self.runner;
        let wp = WpCli::new(
            runner,
            self.config.php_bin.clone(),
            &self.config.phar_path,
            &self.config.wordpress_path,
        );

        self.enter(InstallStage::Downloading);
        self.fetcher
            .fetch(WP_CLI_PHAR_URL, std::slice::from_ref(&self.config.phar_path), None)?;
        match &self.settings.core_source {
            CoreSource::WordPress { version } => wp.core_download(version)?,
            CoreSource::Bedrock { repository } => {
                let composer_phar = self.config.phar_directory.join("composer.phar");
                self.fetcher
                    .fetch(COMPOSER_PHAR_URL, std::slice::from_ref(&composer_phar), None)?;
                Composer::new(runner, self.config.php_bin.clone(), composer_phar)
                    .create_bedrock(&self.config.wordpress_path, repository)?;
            }
        }

        self.enter(InstallStage::CoreInstalling);
        wp.create_config(&self.config.db_env_file_path)?;
        if self.settings.clean_database {
            let outcome = wp.clean_database();
            self.warn(outcome);
        }
        wp.core_install(
            &request.domain,
            &request.project,
            &self.settings.admin_user,
            &request.admin_email,
        )?;

        self.enter(InstallStage::ConfiguringCore);
        wp.install_language(&self.settings.locale)?;

        self.enter(InstallStage::InstallingPlugins);
        wp.install_plugins(&self.settings.plugins)?;

        self.enter(InstallStage::ConfiguringAuth0);
        let auth0 = Auth0Configurator::new(&wp, self.fetcher, &self.config.auth0_env_file_path);
        let report = auth0.configure()?;
        tracing::info!(updated = report.updated.len(), "auth0 options reconciled");
        auth0.add_zilch_options()?;

        self.enter(InstallStage::Finalizing);
        site_files::write_wp_cli_yml(&self.config.wp_cli_yml_path())?;
        if self.settings.write_htaccess {
            site_files::write_htaccess(&self.config.htaccess_path(), &request.domain)?;
        }
        wp.rewrite()?;
        let outcome = wp.remove_plugins(&self.settings.keep_list());
        self.warn(outcome);
        let outcome = self.notify_gateway(request);
        self.warn(outcome);
        Ok(())
    }

    fn notify_gateway(&self, request: &InstallRequest) -> BestEffort {
        let (Some(notifier), Some(project_id)) = (self.notifier, request.project_id.as_deref())
        else {
            return BestEffort::Completed;
        };
        match notifier.deploy_manifest(project_id, &request.domain) {
            Ok(()) => BestEffort::Completed,
            Err(e) => {
                tracing::warn!("gateway notification failed: {e}");
                BestEffort::Warned(format!("gateway notification failed: {e}"))
            }
        }
    }

    /// Idempotent: every removal tolerates a missing path.
    fn cleanup(&mut self, scope: Cleanup) {
        if scope == Cleanup::Skip {
            return;
        }
        let config = &self.config;
        let mut files = vec![
            config.db_env_file_path.clone(),
            config.wp_cli_yml_path(),
            config.auth0_env_file_path.clone(),
        ];
        let mut dirs = vec![config.phar_directory.clone()];
        if !config.run_level.is_testing() {
            files.extend(config.self_artifact.clone());
        }
        if scope == Cleanup::Rollback {
            dirs.push(config.wordpress_path.clone());
            if self.settings.write_htaccess {
                files.push(config.htaccess_path());
            }
        }

        let mut failures = Vec::new();
        for file in &files {
            if let Err(e) = fs::remove_file(file) {
                failures.push(format!("could not remove {}: {e}", file.display()));
            }
        }
        for dir in &dirs {
            if let Err(e) = fs::remove_dir_recursive(dir) {
                failures.push(format!("could not remove {}: {e}", dir.display()));
            }
        }
        for failure in failures {
            tracing::warn!("{failure}");
            self.warnings.push(failure);
        }
    }
}

/// Compare dotted version strings numerically (`8.2.0-dev` >= `8.1`).
/// An unparsable `found` never satisfies the minimum.
pub fn version_at_least(found: &str, minimum: &str) -> bool {
    let (Some(found), Some(minimum)) = (parse_version(found), parse_version(minimum)) else {
        return false;
    };
    let len = found.len().max(minimum.len());
    let pad = |v: &[u64], i: usize| v.get(i).copied().unwrap_or(0);
    for i in 0..len {
        match pad(&found, i).cmp(&pad(&minimum, i)) {
            std::cmp::Ordering::Greater => return true,
            std::cmp::Ordering::Less => return false,
            std::cmp::Ordering::Equal => {}
        }
    }
    true
}

fn parse_version(text: &str) -> Option<Vec<u64>> {
    let mut parts = Vec::new();
    for component in text.trim().split('.') {
        let digits: String = component.chars().take_while(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            break;
        }
        parts.push(digits.parse().ok()?);
        if digits.len() != component.len() {
            break;
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts)
    }
}
