//! Small configuration files written next to the install.

use std::path::Path;

use crate::error::Result;
use crate::fs;

const WP_CLI_YML: &str = "apache_modules:\n    - mod_rewrite\n";

/// `wp-cli.yml` enabling `mod_rewrite`, needed for `rewrite structure --hard`
/// to write its rules.
pub fn write_wp_cli_yml(path: &Path) -> Result<()> {
    fs::write_file(path, WP_CLI_YML.as_bytes())
}

/// Redirects `/wp-admin` and `/cms` to the admin of the install under `/cms`.
pub fn htaccess_rules(domain: &str) -> String {
    format!(
        "<IfModule mod_rewrite.c>\n\
         \x20   RewriteEngine On\n\
         \x20   RewriteBase /\n\
         \n\
         \x20   # Redirect /wp-admin to /cms/wp-admin\n\
         \x20   RewriteRule ^wp-admin/?$ https://{domain}/cms/wp-admin [R=301,L]\n\
         \n\
         \x20   # Redirect /cms to /cms/wp-admin\n\
         \x20   RewriteRule ^cms/?$ https://{domain}/cms/wp-admin [R=301,L]\n\
         </IfModule>\n"
    )
}

pub fn write_htaccess(path: &Path, domain: &str) -> Result<()> {
    fs::write_file(path, htaccess_rules(domain).as_bytes())
}
