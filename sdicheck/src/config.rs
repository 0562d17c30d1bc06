use std::collections::{BTreeSet, HashMap};
use std::ffi::OsStr;
use std::fs::File;
use std::io::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sdicheck_core::Logger;
use sdicheck_core::config::env::Env;
use sdicheck_core::credentials::Credentials;
use sdicheck_core::csw::DEFAULT_PAGE_SIZE;
use sdicheck_core::http::{DEFAULT_TIMEOUT, HttpConfig};
use serde::{Deserialize, Serialize};
use subst::VariableMap;
use tracing::{info, warn};

use crate::{SdiCheckError, SdiCheckResult};

pub type ConfigFileResult<T> = Result<T, ConfigFileError>;

pub type UnrecognizedValues = HashMap<String, serde_yaml::Value>;
pub type UnrecognizedKeys = BTreeSet<String>;

#[derive(thiserror::Error, Debug)]
pub enum ConfigFileError {
    #[error("Unable to load config file {1}: {0}")]
    ConfigLoadError(#[source] std::io::Error, PathBuf),

    #[error("Unable to parse config file {1}: {0}")]
    ConfigParseError(#[source] subst::yaml::Error, PathBuf),

    #[error("Unable to serialize the configuration: {0}")]
    ConfigSerializeError(#[source] serde_yaml::Error),

    #[error("Unable to write config file {1}: {0}")]
    ConfigWriteError(#[source] std::io::Error, PathBuf),
}

/// Settings shared by every check, as read from the YAML configuration file.
///
/// Values given on the command line take precedence, see
/// [`MetaArgs::merge_into_config`](crate::args::MetaArgs::merge_into_config).
#[serde_with::skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// URL of the CSW endpoint of the catalog.
    pub catalog: Option<String>,

    /// Number of records requested per `GetRecords` call, 100 by default.
    pub page_size: Option<usize>,

    /// Timeout of each HTTP request, e.g. "30s" or "2m".
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "humantime_serde"
    )]
    pub timeout: Option<Duration>,

    pub disable_ssl_verification: Option<bool>,

    /// Hostnames whose services are checked in strict mode. Every host when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<String>,

    /// Also check records harvested from other catalogs.
    pub include_harvested: Option<bool>,

    /// File of `hostname username password` lines.
    ///
    /// Defaults to `$SDICHECKER_CREDS_PATH`, then to `~/.sdichecker`.
    pub credentials_file: Option<PathBuf>,

    #[serde(flatten, skip_serializing)]
    pub unrecognized: UnrecognizedValues,
}

impl Config {
    /// Validates the configuration and warns about every key that was not understood.
    pub fn finalize(&self) -> SdiCheckResult<UnrecognizedKeys> {
        let keys: UnrecognizedKeys = self.unrecognized.keys().cloned().collect();
        for key in &keys {
            warn!(
                "Ignoring unrecognized configuration key '{key}'. Please check your configuration file for typos."
            );
        }
        if self.page_size == Some(0) {
            return Err(SdiCheckError::InvalidPageSize);
        }
        Ok(keys)
    }

    pub fn catalog_url(&self) -> SdiCheckResult<&str> {
        self.catalog
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or(SdiCheckError::MissingCatalog)
    }

    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    #[must_use]
    pub fn include_harvested(&self) -> bool {
        self.include_harvested.unwrap_or_default()
    }

    /// Builds the HTTP settings, loading the credentials file if there is one.
    pub fn http_config<'a>(&self, env: &impl Env<'a>, logger: &Logger) -> SdiCheckResult<HttpConfig> {
        let credentials = match self
            .credentials_file
            .clone()
            .or_else(|| env.credentials_path())
        {
            Some(path) => Credentials::load(&path, logger)?,
            None => Credentials::default(),
        };
        let verify_tls = !self.disable_ssl_verification.unwrap_or_default();
        if !verify_tls {
            warn!("TLS certificate verification is disabled");
        }
        Ok(HttpConfig {
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            verify_tls,
            credentials,
        })
    }

    /// Writes the configuration as YAML, or prints it when `file_name` is `-`.
    pub fn save_to_file(&self, file_name: &Path) -> ConfigFileResult<()> {
        let yaml = serde_yaml::to_string(&self).map_err(ConfigFileError::ConfigSerializeError)?;
        if file_name.as_os_str() == OsStr::new("-") {
            info!("Current configuration:");
            println!("\n\n{yaml}\n");
            Ok(())
        } else {
            info!(
                "Saving config to {}, use --config to load it",
                file_name.display()
            );
            File::create(file_name)
                .map_err(|e| ConfigFileError::ConfigWriteError(e, file_name.to_path_buf()))?
                .write_all(yaml.as_bytes())
                .map_err(|e| ConfigFileError::ConfigWriteError(e, file_name.to_path_buf()))?;
            Ok(())
        }
    }
}

/// Reads a YAML configuration file, substituting `${VAR}` references from `env`.
pub fn read_config<'a, M>(file_name: &Path, env: &'a M) -> ConfigFileResult<Config>
where
    M: VariableMap<'a>,
    M::Value: AsRef<str>,
{
    let mut file =
        File::open(file_name).map_err(|e| ConfigFileError::ConfigLoadError(e, file_name.into()))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| ConfigFileError::ConfigLoadError(e, file_name.into()))?;
    parse_config(&contents, env, file_name)
}

pub fn parse_config<'a, M>(contents: &str, env: &'a M, file_name: &Path) -> ConfigFileResult<Config>
where
    M: VariableMap<'a>,
    M::Value: AsRef<str>,
{
    subst::yaml::from_str(contents, env)
        .map_err(|e| ConfigFileError::ConfigParseError(e, file_name.into()))
}
