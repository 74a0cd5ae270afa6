mod distribute;
mod output;
mod prompt;
mod root;

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use wpinstall_core::command::SystemRunner;
use wpinstall_core::config::{InstallConfig, InstallSettings, RunLevel};
use wpinstall_core::fetch::HttpFetcher;
use wpinstall_core::gateway::GatewayClient;
use wpinstall_core::installer::{InstallRequest, Installer};

const USAGE: &str = "Usage: wpinstall -p <projectName> -d <domainName> -e <environment> \
    --static-content-dirs=<dir1,dir2>";

const DEFAULT_ADMIN_EMAIL: &str = "email@zilch.nl";

#[derive(Parser)]
#[command(
    name = "wpinstall",
    about = "Install a WordPress site with wp-cli, rolling everything back on failure",
    version
)]
struct Cli {
    /// Site title
    #[arg(short = 'p', long = "projectName")]
    project_name: Option<String>,

    /// Domain the site is served from
    #[arg(short = 'd', long = "domainName")]
    domain_name: Option<String>,

    /// Run level; `testing` keeps the executable after the install
    #[arg(short = 'e', long, default_value = "development")]
    environment: RunLevel,

    /// Email of the administrator account [default: email@zilch.nl]
    #[arg(long = "admin-email")]
    admin_email: Option<String>,

    /// Directories that receive a copy of the deploy script
    #[arg(long = "static-content-dirs", value_delimiter = ',')]
    static_content_dirs: Vec<PathBuf>,

    /// Project id sent to the gateway once the site is installed
    #[arg(short = 'i', long = "projectId")]
    project_id: Option<String>,

    /// Install next to this directory instead of the executable's
    #[arg(long, env = "WPINSTALL_DOCUMENT_ROOT")]
    document_root: Option<PathBuf>,

    /// PHP interpreter used to run wp-cli and composer
    #[arg(long, default_value = "php")]
    php: String,

    /// YAML file overriding the install settings
    #[arg(long)]
    settings: Option<PathBuf>,

    /// GitHub token for release downloads (skips the prompt)
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    git_token: Option<String>,

    /// Do not prompt for a GitHub token
    #[arg(long)]
    no_prompt: bool,

    /// Log progress to stderr
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            // Print the full error chain (anyhow's alternate Display)
            eprintln!("error: {e:#}");
            1
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let (Some(project), Some(domain)) = (cli.project_name.clone(), cli.domain_name.clone()) else {
        println!("{USAGE}");
        return Ok(1);
    };
    let admin_email = match cli.admin_email.as_deref() {
        Some(email) if !email.contains('@') => {
            println!("Given argument --admin-email is not a valid email address: {email}");
            return Ok(1);
        }
        Some(email) => email.to_string(),
        None => DEFAULT_ADMIN_EMAIL.to_string(),
    };

    let git_token = match cli.git_token.clone().filter(|t| !t.trim().is_empty()) {
        Some(token) => Some(token),
        None if cli.no_prompt => None,
        None => prompt::prompt_git_token(prompt::TOKEN_PROMPT_TIMEOUT),
    };

    let settings = match &cli.settings {
        Some(path) => InstallSettings::load(path)
            .with_context(|| format!("cannot load settings from {}", path.display()))?,
        None => InstallSettings::default(),
    };
    let root = root::resolve_document_root(cli.document_root.as_deref())?;
    let config = InstallConfig::new(&root.path, cli.environment.clone())
        .with_php_bin(resolve_php(&cli.php))
        .with_self_artifact(root.artifact);
    tracing::info!(
        root = %config.document_root.display(),
        run_level = %config.run_level,
        "starting install"
    );

    let runner = SystemRunner;
    let fetcher = HttpFetcher::new()?;
    let gateway = GatewayClient::new(&config.auth0_env_file_path)?;
    let request = InstallRequest {
        domain,
        project,
        admin_email,
        project_id: cli.project_id.clone(),
    };

    let report = Installer::new(config, settings, &runner, &fetcher)
        .with_notifier(&gateway)
        .install(&request);
    output::print_json_line(&report.outcome.to_response())?;
    if !report.outcome.is_success() {
        return Ok(report.outcome.exit_code());
    }

    if !cli.static_content_dirs.is_empty() {
        let destinations = distribute::script_destinations(&cli.static_content_dirs);
        if let Err(e) = distribute::distribute_deploy_script(
            &fetcher,
            &cli.static_content_dirs,
            git_token.as_deref(),
        ) {
            eprintln!(
                "Failed to write the file to: {}\n -> {e:#}",
                distribute::describe(&destinations)
            );
            return Ok(1);
        }
    }
    Ok(0)
}

/// Absolute path of the PHP interpreter, or the name as given when it is not
/// on `PATH` (the runtime check then reports it).
fn resolve_php(php: &str) -> String {
    match which::which(php) {
        Ok(path) => path.display().to_string(),
        Err(e) => {
            tracing::debug!("{php} not found on PATH: {e}");
            php.to_string()
        }
    }
}
