use std::path::PathBuf;
use std::time::Duration;

use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{Parser, Subcommand};
use humantime_serde::re::humantime;
use sdicheck_core::ows::OwsFamily;

use crate::config::Config;

/// Defines the styles used for the CLI help output.
const HELP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Blue.on_default().bold())
    .usage(AnsiColor::Blue.on_default().bold())
    .literal(AnsiColor::White.on_default())
    .placeholder(AnsiColor::Green.on_default());

#[derive(Parser, Debug, PartialEq)]
#[command(
    about,
    version,
    after_help = "Use RUST_LOG environment variable to control logging level, e.g. RUST_LOG=debug or RUST_LOG=sdicheck=debug, and SDICHECK_FORMAT to pick the log format (full, compact, bare, pretty, json).",
    styles = HELP_STYLES
)]
pub struct Args {
    #[command(flatten)]
    pub meta: MetaArgs,
    #[command(subcommand)]
    pub command: Command,
}

/// What to check.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Check every service reference of every dataset record of the catalog.
    Flexible,
    /// Check the datasets through the coupled resources of the services operating on them.
    Strict,
    /// Check that the layers of a WMS or WFS server link to valid catalog records.
    Ows(OwsArgs),
}

#[derive(clap::Args, Debug, Clone, PartialEq)]
#[group(required = true, multiple = false)]
pub struct OwsArgs {
    /// WMS endpoint to check.
    #[arg(long, value_name = "URL")]
    pub wms: Option<String>,
    /// WFS endpoint to check.
    #[arg(long, value_name = "URL")]
    pub wfs: Option<String>,
}

impl OwsArgs {
    /// The endpoint to check and its service family.
    #[must_use]
    pub fn target(&self) -> Option<(&str, OwsFamily)> {
        match (&self.wms, &self.wfs) {
            (Some(url), _) => Some((url, OwsFamily::Wms)),
            (None, Some(url)) => Some((url, OwsFamily::Wfs)),
            (None, None) => None,
        }
    }
}

#[derive(clap::Args, Debug, Clone, PartialEq, Default)]
pub struct MetaArgs {
    /// Path to a YAML config file. Command line values override the file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// Save resulting config to a file or use "-" to print to stdout.
    #[arg(long, global = true)]
    pub save_config: Option<PathBuf>,
    /// URL of the CSW endpoint of the catalog.
    #[arg(long, global = true, value_name = "URL")]
    pub catalog: Option<String>,
    /// Number of records requested per catalog query. [default: 100]
    #[arg(long, global = true)]
    pub page_size: Option<usize>,
    /// Timeout of each HTTP request, e.g. "30s" or "2m". [default: 30s]
    #[arg(long, global = true, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,
    /// Accept invalid TLS certificates.
    #[arg(long, global = true)]
    pub disable_ssl_verification: bool,
    /// File of `hostname username password` lines used for HTTP Basic authentication.
    #[arg(long, global = true, value_name = "FILE")]
    pub credentials: Option<PathBuf>,
    /// Only check services hosted on this server. Can be specified multiple times.
    #[arg(long, global = true, value_name = "HOSTNAME")]
    pub server: Vec<String>,
    /// Also check records harvested from other catalogs.
    #[arg(long, global = true)]
    pub include_harvested: bool,
    /// Print the report as JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,
}

impl MetaArgs {
    /// Overrides the values of `config` with those given on the command line.
    pub fn merge_into_config(self, config: &mut Config) {
        if self.catalog.is_some() {
            config.catalog = self.catalog;
        }
        if self.page_size.is_some() {
            config.page_size = self.page_size;
        }
        if self.timeout.is_some() {
            config.timeout = self.timeout;
        }
        if self.disable_ssl_verification {
            config.disable_ssl_verification = Some(true);
        }
        if self.credentials.is_some() {
            config.credentials_file = self.credentials;
        }
        if !self.server.is_empty() {
            config.servers = self.server;
        }
        if self.include_harvested {
            config.include_harvested = Some(true);
        }
    }
}
