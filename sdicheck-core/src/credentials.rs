//! Basic-auth credentials keyed by hostname.

use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use url::Url;

use crate::Logger;

pub type CredentialsResult<T> = Result<T, CredentialsError>;

#[derive(thiserror::Error, Debug)]
pub enum CredentialsError {
    #[error("Unable to read credentials file {1}: {0}")]
    ReadError(#[source] std::io::Error, PathBuf),
}

/// A username and password for one host.
#[derive(Clone, PartialEq, Eq)]
pub struct HostCredentials {
    pub username: String,
    pub password: String,
}

impl Debug for HostCredentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Credentials lookup by hostname. Empty by default.
#[derive(Clone, Debug, Default)]
pub struct Credentials(HashMap<String, HostCredentials>);

impl Credentials {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) {
        self.0.insert(
            host.into(),
            HostCredentials {
                username: username.into(),
                password: password.into(),
            },
        );
    }

    #[must_use]
    pub fn get(&self, host: &str) -> Option<&HostCredentials> {
        self.0.get(host)
    }

    /// Looks up the credentials for the host part of `url`.
    #[must_use]
    pub fn for_url(&self, url: &Url) -> Option<&HostCredentials> {
        url.host_str().and_then(|host| self.get(host))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parses `hostname username password` lines. Blank lines and lines starting with
    /// `#` are ignored, malformed lines are skipped with a warning.
    #[must_use]
    pub fn parse(contents: &str, logger: &Logger) -> Self {
        let mut creds = Self::new();
        for (idx, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(host), Some(user), Some(password), None) => {
                    creds.add(host, user, password);
                }
                _ => logger.in_scope(|| {
                    tracing::warn!(
                        "Ignoring malformed credentials line {}: expected 'hostname username password'",
                        idx + 1
                    );
                }),
            }
        }
        creds
    }

    /// Loads a credentials file. A missing file yields an empty mapping.
    pub fn load(path: &Path, logger: &Logger) -> CredentialsResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                let creds = Self::parse(&contents, logger);
                logger.in_scope(|| {
                    tracing::info!(
                        "Loaded credentials for {} host(s) from {}",
                        creds.len(),
                        path.display()
                    );
                });
                Ok(creds)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                logger.in_scope(|| {
                    tracing::info!(
                        "No credentials file found at {}, skipping credentials definition",
                        path.display()
                    );
                });
                Ok(Self::new())
            }
            Err(e) => Err(CredentialsError::ReadError(e, path.to_path_buf())),
        }
    }
}
