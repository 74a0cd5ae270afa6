use crate::error::{InstallError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// RunLevel
// ---------------------------------------------------------------------------

/// Environment tag passed with `-e/--environment`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RunLevel {
    #[default]
    Development,
    Testing,
    Prod,
    Other(String),
}

impl RunLevel {
    pub fn is_testing(&self) -> bool {
        matches!(self, RunLevel::Testing)
    }
}

impl fmt::Display for RunLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunLevel::Development => write!(f, "development"),
            RunLevel::Testing => write!(f, "testing"),
            RunLevel::Prod => write!(f, "prod"),
            RunLevel::Other(s) => write!(f, "{s}"),
        }
    }
}

impl std::str::FromStr for RunLevel {
    type Err = std::convert::Infallible;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "development" => RunLevel::Development,
            "testing" => RunLevel::Testing,
            "prod" => RunLevel::Prod,
            other => RunLevel::Other(other.to_string()),
        })
    }
}

// ---------------------------------------------------------------------------
// InstallConfig
// ---------------------------------------------------------------------------

/// Paths and run level for one install, fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallConfig {
    pub document_root: PathBuf,
    pub wordpress_path: PathBuf,
    pub phar_directory: PathBuf,
    pub phar_path: PathBuf,
    pub db_env_file_path: PathBuf,
    pub auth0_env_file_path: PathBuf,
    pub php_bin: String,
    pub run_level: RunLevel,
    /// The distributed executable, deleted by cleanup outside `testing`.
    pub self_artifact: Option<PathBuf>,
}

impl InstallConfig {
    /// Standard layout below `document_root`:
    ///
    /// ```text
    /// <root>/cms                      WordPress install
    /// <root>/WPResources/wp-cli.phar  downloaded tooling
    /// <root>/.db.env                  database credentials
    /// <root>/.auth0.env               Auth0 / gateway credentials
    /// ```
    pub fn new(document_root: &Path, run_level: RunLevel) -> Self {
        let phar_directory = document_root.join("WPResources");
        Self {
            document_root: document_root.to_path_buf(),
            wordpress_path: document_root.join("cms"),
            phar_path: phar_directory.join("wp-cli.phar"),
            phar_directory,
            db_env_file_path: document_root.join(".db.env"),
            auth0_env_file_path: document_root.join(".auth0.env"),
            php_bin: "php".to_string(),
            run_level,
            self_artifact: None,
        }
    }

    pub fn with_php_bin(mut self, php_bin: impl Into<String>) -> Self {
        self.php_bin = php_bin.into();
        self
    }

    pub fn with_self_artifact(mut self, artifact: Option<PathBuf>) -> Self {
        self.self_artifact = artifact;
        self
    }

    pub fn htaccess_path(&self) -> PathBuf {
        self.document_root.join(".htaccess")
    }

    pub fn wp_cli_yml_path(&self) -> PathBuf {
        self.wordpress_path.join("wp-cli.yml")
    }

    pub fn plugins_dir(&self) -> PathBuf {
        self.wordpress_path.join("wp-content").join("plugins")
    }
}

// ---------------------------------------------------------------------------
// PluginSpec
// ---------------------------------------------------------------------------

/// One entry of the install plan: the directory name to validate and the
/// slug or archive URL handed to `wp plugin install`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginSpec {
    pub name: String,
    pub source: String,
}

impl PluginSpec {
    pub fn new(name: &str, source: &str) -> Self {
        Self {
            name: name.to_string(),
            source: source.to_string(),
        }
    }
}

const GRAPHQL_PLUGIN_VERSION: &str = "1.22.0";
const GRAPHQL_GUTENBERG_PLUGIN_VERSION: &str = "0.4.1";
const CONTACT_FORM_7_VERSION: &str = "5.9";

fn default_plugins() -> Vec<PluginSpec> {
    vec![
        PluginSpec::new(
            "wp-gatsby",
            "https://downloads.wordpress.org/plugin/wp-gatsby.zip",
        ),
        PluginSpec::new(
            "wp-graphql",
            &format!("https://downloads.wordpress.org/plugin/wp-graphql.{GRAPHQL_PLUGIN_VERSION}.zip"),
        ),
        PluginSpec::new(
            "wp-graphql-gutenberg",
            &format!(
                "https://github.com/pristas-peter/wp-graphql-gutenberg/archive/refs/tags/v{GRAPHQL_GUTENBERG_PLUGIN_VERSION}.zip"
            ),
        ),
        PluginSpec::new(
            "contact-form-7",
            &format!("https://downloads.wordpress.org/plugin/contact-form-7.{CONTACT_FORM_7_VERSION}.zip"),
        ),
        PluginSpec::new(
            "zilch-assistant",
            "https://gitlab.xel.nl/chameleon/kameleon-assistant-plugin-zip/-/raw/latest/zilch-assistant.zip",
        ),
    ]
}

// ---------------------------------------------------------------------------
// CoreSource
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoreSource {
    /// `wp core download` of a pinned release.
    #[serde(rename = "wordpress")]
    WordPress {
        #[serde(default = "default_wordpress_version")]
        version: String,
    },
    /// `composer create-project` of the Bedrock template.
    Bedrock {
        #[serde(default = "default_bedrock_repository")]
        repository: String,
    },
}

fn default_wordpress_version() -> String {
    "6.5.2".to_string()
}

pub fn default_bedrock_repository() -> String {
    "https://github.com/xelmedia/bedrock-headless-zilch.git".to_string()
}

impl Default for CoreSource {
    fn default() -> Self {
        CoreSource::WordPress {
            version: default_wordpress_version(),
        }
    }
}

// ---------------------------------------------------------------------------
// InstallSettings
// ---------------------------------------------------------------------------

/// What gets installed. Defaults are the production values; a YAML file may
/// override any subset of fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallSettings {
    #[serde(default)]
    pub core_source: CoreSource,
    #[serde(default = "default_admin_user")]
    pub admin_user: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_min_php_version")]
    pub min_php_version: String,
    #[serde(default = "default_plugins")]
    pub plugins: Vec<PluginSpec>,
    /// Plugins kept by the final cleanup besides the install plan.
    #[serde(default = "default_extra_keep")]
    pub keep_plugins: Vec<String>,
    /// Run a destructive `db clean --yes` before `core install`.
    #[serde(default)]
    pub clean_database: bool,
    /// Write the `/wp-admin` and `/cms` redirect rules to `.htaccess`.
    #[serde(default)]
    pub write_htaccess: bool,
}

fn default_admin_user() -> String {
    "zilch-admin".to_string()
}

fn default_locale() -> String {
    "nl_NL".to_string()
}

fn default_min_php_version() -> String {
    "8.1".to_string()
}

fn default_extra_keep() -> Vec<String> {
    vec!["auth0".to_string()]
}

impl Default for InstallSettings {
    fn default() -> Self {
        Self {
            core_source: CoreSource::default(),
            admin_user: default_admin_user(),
            locale: default_locale(),
            min_php_version: default_min_php_version(),
            plugins: default_plugins(),
            keep_plugins: default_extra_keep(),
            clean_database: false,
            write_htaccess: false,
        }
    }
}

impl InstallSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let settings: Self = serde_yaml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.admin_user.trim().is_empty() {
            return Err(InstallError::Settings("admin_user must not be empty".into()));
        }
        if let Some(p) = self.plugins.iter().find(|p| p.name.trim().is_empty()) {
            return Err(InstallError::Settings(format!(
                "plugin with source '{}' has an empty name",
                p.source
            )));
        }
        Ok(())
    }

    /// Everything `wp plugin uninstall --all` must leave alone: the install
    /// plan followed by the extra keep-list, without duplicates.
    pub fn keep_list(&self) -> Vec<String> {
        let mut keep: Vec<String> = self.plugins.iter().map(|p| p.name.clone()).collect();
        for name in &self.keep_plugins {
            if !keep.contains(name) {
                keep.push(name.clone());
            }
        }
        keep
    }
}
