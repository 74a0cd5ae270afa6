//! `wp-cli` facade: every WordPress operation the installer performs,
//! rendered as `<php> <wp-cli.phar> <subcommand> --path=<install path>`.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::command::{run_or_fail, CommandLine, CommandRunner};
use crate::config::PluginSpec;
use crate::env_file;
use crate::error::{InstallError, Result, INTERNAL_ERROR_CODE};
use crate::fs;

/// Marker wp-cli prints when the permalink structure was applied.
const REWRITE_SUCCESS_MARKER: &str = "Success: Rewrite structure set";

/// `wp rewrite structure --hard` may exit non-zero while still applying the
/// structure (it fails to flush without a web server). The step counts as
/// successful when its captured output carries the success marker.
pub fn rewrite_succeeded(captured: &str) -> bool {
    captured.contains(REWRITE_SUCCESS_MARKER)
}

/// Outcome of a step whose failure must not abort the install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BestEffort {
    Completed,
    Warned(String),
}

/// How `option get` output is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionFormat {
    /// `--format=json`, decoded into a JSON value.
    Json,
    /// The raw printed value.
    Raw,
}

pub struct WpCli<'a> {
    runner: &'a dyn CommandRunner,
    php_bin: String,
    phar: PathBuf,
    path: PathBuf,
}

impl<'a> WpCli<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        php_bin: impl Into<String>,
        phar: impl Into<PathBuf>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            php_bin: php_bin.into(),
            phar: phar.into(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn php_bin(&self) -> &str {
        &self.php_bin
    }

    pub fn runner(&self) -> &'a dyn CommandRunner {
        self.runner
    }

    pub fn plugins_dir(&self) -> PathBuf {
        self.path.join("wp-content").join("plugins")
    }

    /// `<php> <phar> <args...> --path=<install path>`
    pub fn command<I, S>(&self, args: I) -> CommandLine
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandLine::new(self.php_bin.clone())
            .arg(self.phar.to_string_lossy())
            .args(args)
            .arg(format!("--path={}", self.path.display()))
    }

    /// Run a wp-cli subcommand, failing with `message` (code 500).
    pub fn execute<I, S>(&self, args: I, message: &str) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let cmd = self.command(args);
        run_or_fail(self.runner, &cmd, message, INTERNAL_ERROR_CODE).map(|o| o.stdout)
    }

    /// Download WordPress core. The install path must exist afterwards even
    /// when wp-cli reports success.
    pub fn core_download(&self, version: &str) -> Result<()> {
        let message = InstallError::CoreDownloadFailed.to_string();
        let version_arg = format!("--version={version}");
        self.execute(["core", "download", version_arg.as_str()], &message)?;
        if !fs::exists(&self.path) {
            return Err(InstallError::CoreDownloadFailed);
        }
        Ok(())
    }

    /// `config create` from the database credentials in `db_env_path`.
    pub fn create_config(&self, db_env_path: &Path) -> Result<()> {
        let env = env_file::read(db_env_path);
        let args = vec![
            "config".to_string(),
            "create".to_string(),
            format!("--dbname={}", env.require("DB_NAME")?),
            format!("--dbuser={}", env.require("DB_USER")?),
            format!("--dbpass={}", env.require("DB_PASS")?),
            format!("--dbhost={}", env.get("DB_HOST").unwrap_or("localhost")),
        ];
        self.execute(
            args,
            "Something went wrong while creating wordpress database config",
        )?;
        Ok(())
    }

    /// Destructive `db clean --yes`. Never fails the install.
    pub fn clean_database(&self) -> BestEffort {
        match self.runner.run(&self.command(["db", "clean", "--yes"])) {
            Ok(_) => BestEffort::Completed,
            Err(e) => {
                tracing::warn!("db clean failed, continuing: {e}");
                BestEffort::Warned(format!("db clean failed: {e}"))
            }
        }
    }

    pub fn core_install(
        &self,
        domain: &str,
        project: &str,
        admin_user: &str,
        admin_email: &str,
    ) -> Result<()> {
        let args = vec![
            "core".to_string(),
            "install".to_string(),
            format!("--url={domain}"),
            format!("--title={project}"),
            format!("--admin_user={admin_user}"),
            format!("--admin_email={admin_email}"),
        ];
        let message = format!(
            "Something went wrong while installing wordpress core for the given domain name: {domain}"
        );
        self.execute(args, &message)?;
        Ok(())
    }

    /// Install and activate a core language pack.
    pub fn install_language(&self, locale: &str) -> Result<()> {
        self.execute(
            ["language", "core", "install", locale, "--activate"],
            "Something went wrong while installing and updating the language",
        )?;
        Ok(())
    }

    /// Pretty permalinks with a hard flush, run from inside the install.
    pub fn rewrite(&self) -> Result<()> {
        let cmd = self
            .command(["rewrite", "structure", "/%postname%/", "--hard"])
            .current_dir(&self.path);
        match self.runner.run(&cmd) {
            Ok(_) => Ok(()),
            Err(e) if rewrite_succeeded(&e.to_string()) => {
                tracing::debug!("rewrite reported failure but applied the structure: {e}");
                Ok(())
            }
            Err(e) => {
                tracing::error!("{e}");
                Err(InstallError::RewriteFailed)
            }
        }
    }

    pub fn install_plugin(&self, source: &str) -> Result<()> {
        let message = format!("Something went wrong while installing the plugin: {source}");
        self.execute(["plugin", "install", source, "--activate"], &message)?;
        Ok(())
    }

    pub fn activate_plugin(&self, name: &str) -> Result<()> {
        let message = format!("Something went wrong while activating the plugin: {name}");
        self.execute(["plugin", "activate", name], &message)?;
        Ok(())
    }

    /// A directory matching `*name*` must exist under `wp-content/plugins`.
    pub fn validate_plugin_installed(&self, name: &str) -> Result<()> {
        match fs::find_dir_containing(&self.plugins_dir(), name) {
            Some(dir) => {
                tracing::debug!("plugin {name} found at {}", dir.display());
                Ok(())
            }
            None => Err(InstallError::PluginNotInstalled(name.to_string())),
        }
    }

    /// Install the plan in order; the first failure stops the loop.
    pub fn install_plugins(&self, plan: &[PluginSpec]) -> Result<()> {
        for plugin in plan {
            self.install_plugin(&plugin.source)?;
            self.validate_plugin_installed(&plugin.name)?;
        }
        Ok(())
    }

    /// Uninstall every plugin not in `keep`. Never fails the install.
    pub fn remove_plugins(&self, keep: &[String]) -> BestEffort {
        let cmd = self.command([
            "plugin".to_string(),
            "uninstall".to_string(),
            "--all".to_string(),
            "--deactivate".to_string(),
            format!("--exclude={}", keep.join(",")),
        ]);
        match self.runner.run(&cmd) {
            Ok(_) => BestEffort::Completed,
            Err(e) => {
                tracing::warn!("removing unused plugins failed: {e}");
                BestEffort::Warned(format!("plugin cleanup failed: {e}"))
            }
        }
    }

    /// Current value of an option, or `None` when it is missing, unreadable or
    /// (in JSON mode) not valid JSON.
    pub fn get_option(&self, name: &str, format: OptionFormat) -> Option<Value> {
        let cmd = match format {
            OptionFormat::Json => self.command(["option", "get", name, "--format=json"]),
            OptionFormat::Raw => self.command(["option", "get", name]),
        };
        let output = match self.runner.run(&cmd) {
            Ok(output) => output,
            Err(e) => {
                tracing::debug!("option {name} not readable: {e}");
                return None;
            }
        };
        let text = output.text();
        match format {
            OptionFormat::Json => serde_json::from_str(text.trim()).ok(),
            OptionFormat::Raw => Some(Value::String(text.trim_end_matches('\n').to_string())),
        }
    }

    /// Store a structured option as JSON, autoloaded.
    pub fn update_option(&self, name: &str, value: &Value) -> Result<()> {
        let encoded = serde_json::to_string(value)?;
        let message = format!("something went wrong adding the option {name}");
        self.execute(
            [
                "option",
                "update",
                name,
                encoded.as_str(),
                "--format=json",
                "--autoload=yes",
            ],
            &message,
        )?;
        Ok(())
    }

    /// Store a plain string option.
    pub fn update_raw_option(&self, name: &str, value: &str) -> Result<()> {
        let message = format!("something went wrong adding the option {name}");
        self.execute(["option", "update", name, value, "--autoload=yes"], &message)?;
        Ok(())
    }
}
