//! `composer` facade: the Bedrock project creator and the nested
//! `require`/`install` runs used for plugins that are not on the plugin
//! directory.

use std::path::{Path, PathBuf};

use crate::command::{run_or_fail, CommandLine, CommandRunner};
use crate::error::{InstallError, Result, INTERNAL_ERROR_CODE};
use crate::fs;

pub struct Composer<'a> {
    runner: &'a dyn CommandRunner,
    php_bin: String,
    phar: PathBuf,
}

impl<'a> Composer<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        php_bin: impl Into<String>,
        phar: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            php_bin: php_bin.into(),
            phar: phar.into(),
        }
    }

    /// `<php> <composer.phar> <args...>` run from `dir`.
    pub fn command<I, S>(&self, dir: &Path, args: I) -> CommandLine
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandLine::new(self.php_bin.clone())
            .arg(self.phar.to_string_lossy())
            .args(args)
            .current_dir(dir)
    }

    /// `composer require -n <packages...> --prefer-source` inside `dir`.
    pub fn require(&self, dir: &Path, packages: &[&str]) -> Result<()> {
        let mut args = vec!["require".to_string(), "-n".to_string()];
        args.extend(packages.iter().map(|p| p.to_string()));
        args.push("--prefer-source".to_string());
        run_or_fail(
            self.runner,
            &self.command(dir, args),
            &format!("Composer could not require {}", packages.join(" ")),
            INTERNAL_ERROR_CODE,
        )?;
        Ok(())
    }

    /// `composer install --no-dev` inside `dir`; the sockets extension is
    /// not required at runtime.
    pub fn install(&self, dir: &Path) -> Result<()> {
        run_or_fail(
            self.runner,
            &self.command(
                dir,
                ["install", "--no-dev", "--ignore-platform-req=ext-sockets"],
            ),
            &format!("Composer install failed in {}", dir.display()),
            INTERNAL_ERROR_CODE,
        )?;
        Ok(())
    }

    /// Create a Bedrock project into `wordpress_path`.
    ///
    /// The project is created in `<wordpress_path>/bedrock`, its contents are
    /// moved up one level, and the web root `web/` must exist afterwards.
    pub fn create_bedrock(&self, wordpress_path: &Path, repository: &str) -> Result<()> {
        let bedrock_path = wordpress_path.join("bedrock");
        let repository_arg = format!(
            "--repository={}",
            serde_json::json!({ "type": "vcs", "url": repository })
        );
        let cmd = CommandLine::new(self.php_bin.clone())
            .arg(self.phar.to_string_lossy())
            .args([
                "create-project".to_string(),
                repository_arg,
                "roots/bedrock".to_string(),
                bedrock_path.to_string_lossy().into_owned(),
            ]);
        run_or_fail(
            self.runner,
            &cmd,
            "Bedrock was not installed successfully",
            INTERNAL_ERROR_CODE,
        )?;

        fs::move_dir_contents(&bedrock_path, wordpress_path).map_err(|e| {
            tracing::error!("moving bedrock failed: {e}");
            InstallError::Step {
                message: "Moving bedrock failed".to_string(),
                code: INTERNAL_ERROR_CODE,
            }
        })?;
        if !fs::exists(&wordpress_path.join("web")) {
            return Err(InstallError::CoreDownloadFailed);
        }
        fs::remove_dir_recursive(&bedrock_path)
    }
}
