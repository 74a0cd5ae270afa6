//! Auth0 login plugin: installed through composer (the 5.x plugin is not on
//! the plugin directory) and configured through site options.

use std::path::{Path, PathBuf};

use base64::Engine;
use serde_json::json;

use crate::composer::Composer;
use crate::env_file::{self, EnvMap};
use crate::error::{InstallError, Result};
use crate::fetch::{Fetch, COMPOSER_PHAR_URL};
use crate::fs::{self, ScratchDir};
use crate::reconcile::{reconcile, OptionSpec, ReconcileReport};
use crate::wp_cli::WpCli;

pub const PLUGIN_NAME: &str = "auth0";

const COMPOSER_PACKAGES: [&str; 3] = [
    "symfony/http-client",
    "nyholm/psr7",
    "auth0/wordpress:5.x-dev",
];

pub struct Auth0Configurator<'a> {
    wp: &'a WpCli<'a>,
    fetcher: &'a dyn Fetch,
    auth0_env_path: PathBuf,
}

impl<'a> Auth0Configurator<'a> {
    pub fn new(
        wp: &'a WpCli<'a>,
        fetcher: &'a dyn Fetch,
        auth0_env_path: &Path,
    ) -> Self {
        Self {
            wp,
            fetcher,
            auth0_env_path: auth0_env_path.to_path_buf(),
        }
    }

    fn plugin_dir(&self) -> PathBuf {
        self.wp.plugins_dir().join(PLUGIN_NAME)
    }

    fn env(&self) -> EnvMap {
        env_file::read(&self.auth0_env_path)
    }

    /// Install, activate and validate the plugin, then reconcile its options.
    pub fn configure(&self) -> Result<ReconcileReport> {
        let options = default_options(&self.env())?;
        self.install_plugin()?;
        self.wp.activate_plugin(PLUGIN_NAME)?;
        self.wp.validate_plugin_installed(PLUGIN_NAME)?;
        reconcile(self.wp, &options)
    }

    /// Nested composer install:
    ///
    /// 1. `composer.phar` is downloaded into `plugins/auth0-tmp`
    /// 2. the pinned packages are required there
    /// 3. `vendor/auth0/wordpress` is moved to `plugins/auth0`
    /// 4. the plugin's own dependencies are installed in `plugins/auth0`
    ///
    /// `auth0-tmp` is removed on every exit path.
    pub fn install_plugin(&self) -> Result<()> {
        let scratch = ScratchDir::create(self.wp.plugins_dir().join("auth0-tmp"))?;
        let composer_phar = scratch.path().join("composer.phar");
        self.fetcher
            .fetch(COMPOSER_PHAR_URL, std::slice::from_ref(&composer_phar), None)?;

        let composer = Composer::new(self.wp.runner(), self.wp.php_bin(), &composer_phar);
        composer.require(scratch.path(), &COMPOSER_PACKAGES)?;

        let source = scratch.path().join("vendor").join("auth0").join("wordpress");
        if !fs::exists(&source) {
            return Err(InstallError::PluginNotInstalled(PLUGIN_NAME.to_string()));
        }
        let plugin_dir = self.plugin_dir();
        fs::move_dir_contents(&source, &plugin_dir)?;
        composer.install(&plugin_dir)?;
        tracing::info!("auth0 plugin installed at {}", plugin_dir.display());
        Ok(())
    }

    /// Reconcile the two flat gateway options from the Auth0 env file.
    pub fn add_zilch_options(&self) -> Result<ReconcileReport> {
        let env = self.env();
        let options = [
            OptionSpec::flat("zilch_client_secret", env.require("ZILCH_AUTH0_CLIENT_SECRET")?),
            OptionSpec::flat(
                "zilch_gateway_host",
                env.require("ZILCH_AUTH0_CUSTOM_TENANT_DOMAIN")?,
            ),
        ];
        reconcile(self.wp, &options)
    }
}

/// The Auth0 option groups. The client secret is stored base64 encoded in
/// the env file.
pub fn default_options(env: &EnvMap) -> Result<Vec<OptionSpec>> {
    let encoded_secret = env.require("ZILCH_AUTH0_CLIENT_SECRET")?;
    let secret_bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded_secret.trim())
        .map_err(|e| {
            InstallError::Validation(format!("ZILCH_AUTH0_CLIENT_SECRET is not valid base64: {e}"))
        })?;
    let secret = String::from_utf8_lossy(&secret_bytes).into_owned();

    Ok(vec![
        OptionSpec::structured("auth0_state", json!({ "enable": "true" })),
        OptionSpec::structured(
            "auth0_accounts",
            json!({
                "matching": "strict",
                "missing": "create",
                "default_role": "administrator",
                "passwordless": "true",
            }),
        ),
        OptionSpec::structured(
            "auth0_client",
            json!({
                "id": env.require("ZILCH_AUTH0_CLIENT_ID")?,
                "secret": secret,
                "domain": env.require("ZILCH_AUTH0_TENANT_DOMAIN")?,
            }),
        ),
        OptionSpec::structured(
            "auth0_client_advanced",
            json!({ "custom_domain": env.require("ZILCH_AUTH0_CUSTOM_TENANT_DOMAIN")? }),
        ),
        OptionSpec::structured("auth0_tokens", json!({ "caching": "wp_object_cache" })),
        OptionSpec::structured(
            "auth0_sessions",
            json!({
                "method": "cookies",
                "session_ttl": 0,
                "rolling_sessions": "true",
                "refresh_tokens": "false",
            }),
        ),
    ])
}
