use std::fmt::{Display, Formatter};

use itertools::Itertools as _;
use serde::ser::SerializeStruct as _;
use serde::{Serialize, Serializer};

use crate::inconsistency::Inconsistency;

/// What a check walks over.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// Catalog records
    Records,
    /// Layers or feature types of one service
    Layers,
}

impl Display for ItemKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Records => "records",
            Self::Layers => "layers",
        })
    }
}

/// An inconsistency together with the item it was found on.
#[derive(Debug)]
pub struct Finding {
    pub item: String,
    pub inconsistency: Inconsistency,
}

impl Serialize for Finding {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Finding", 4)?;
        state.serialize_field("item", &self.item)?;
        state.serialize_field("kind", self.inconsistency.kind())?;
        state.serialize_field("record_id", &self.inconsistency.record_id())?;
        state.serialize_field("message", &self.inconsistency.to_string())?;
        state.end()
    }
}

/// Outcome of one check run.
#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub item_kind: ItemKind,
    pub items_processed: usize,
    pub findings: Vec<Finding>,
}

impl CheckReport {
    #[must_use]
    pub fn new(item_kind: ItemKind) -> Self {
        Self {
            item_kind,
            items_processed: 0,
            findings: Vec::new(),
        }
    }

    pub fn push(&mut self, item: impl Into<String>, inconsistency: Inconsistency) {
        self.findings.push(Finding {
            item: item.into(),
            inconsistency,
        });
    }

    /// Adds every inconsistency found on one item.
    pub fn extend(&mut self, item: &str, inconsistencies: impl IntoIterator<Item = Inconsistency>) {
        for inconsistency in inconsistencies {
            self.push(item, inconsistency);
        }
    }

    pub fn inconsistencies(&self) -> impl Iterator<Item = &Inconsistency> {
        self.findings.iter().map(|f| &f.inconsistency)
    }

    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.findings.is_empty()
    }

    /// Number of distinct items with at least one inconsistency.
    #[must_use]
    pub fn items_in_error(&self) -> usize {
        self.findings.iter().map(|f| f.item.as_str()).unique().count()
    }

    /// Share of processed items in error, in percent. Zero when nothing was processed.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn error_rate(&self) -> f64 {
        if self.items_processed == 0 {
            0.0
        } else {
            self.items_in_error() as f64 * 100.0 / self.items_processed as f64
        }
    }

    /// One line summary, e.g. `2 records parsed, 1 inconsistent (50%)`.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} {} parsed, {} inconsistent ({}%)",
            self.items_processed,
            self.item_kind,
            self.items_in_error(),
            format_rate(self.error_rate())
        )
    }
}

/// Formats a percentage with at most one decimal, dropping a trailing `.0`.
fn format_rate(rate: f64) -> String {
    let rounded = format!("{rate:.1}");
    match rounded.strip_suffix(".0") {
        Some(whole) => whole.to_string(),
        None => rounded,
    }
}

impl Display for CheckReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.findings.is_empty() {
            writeln!(f, "No error")?;
        }
        for (idx, finding) in self.findings.iter().enumerate() {
            writeln!(f, "#{} {}", idx + 1, finding.inconsistency)?;
        }
        write!(f, "{}", self.summary())
    }
}
