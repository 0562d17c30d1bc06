use std::fmt::{Display, Formatter};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// OGC web service families whose layers can be checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwsFamily {
    /// Web Map Service
    Wms,
    /// Web Feature Service
    Wfs,
}

impl OwsFamily {
    /// Value of the `SERVICE` parameter of a `GetCapabilities` request.
    #[must_use]
    pub fn service_param(self) -> &'static str {
        match self {
            Self::Wms => "WMS",
            Self::Wfs => "WFS",
        }
    }

    /// Version requested when the capabilities URL does not pin one.
    #[must_use]
    pub fn default_version(self) -> &'static str {
        match self {
            Self::Wms => "1.3.0",
            Self::Wfs => "1.1.0",
        }
    }

    /// Lowercase suffix the root element of a capabilities document must end with.
    #[must_use]
    pub fn root_suffix(self) -> &'static str {
        match self {
            Self::Wms => "wms_capabilities",
            Self::Wfs => "wfs_capabilities",
        }
    }

    #[must_use]
    pub fn is_wms(self) -> bool {
        self == Self::Wms
    }
}

impl Display for OwsFamily {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.service_param())
    }
}

/// A protocol tag such as `OGC:WMS-1.3.0-http-get-map`, split into its parts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwsProtocol {
    pub family: OwsFamily,
    pub version: Option<String>,
    pub suffix: Option<String>,
}

static PROTOCOL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^OGC:(WMS|WFS)(?:-(\d+(?:\.\d+)*))?(?:-([A-Za-z0-9_-]+))?$")
        .expect("protocol grammar is a valid regex")
});

impl OwsProtocol {
    /// Classifies a free-form protocol tag.
    ///
    /// Returns `None` for tags that do not match the grammar; they are not an error,
    /// only something the checkers skip.
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        let caps = PROTOCOL_RE.captures(tag.trim())?;
        let family = if caps[1].eq_ignore_ascii_case("wms") {
            OwsFamily::Wms
        } else {
            OwsFamily::Wfs
        };
        Some(Self {
            family,
            version: caps.get(2).map(|m| m.as_str().to_string()),
            suffix: caps.get(3).map(|m| m.as_str().to_string()),
        })
    }
}
