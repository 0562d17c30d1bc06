//! Cross-checks between catalog records and the services they describe.

mod flexible;
pub use flexible::FlexibleChecker;

mod report;
pub use report::{CheckReport, Finding, ItemKind};

mod reverse;
pub use reverse::OwsChecker;

mod strict;
pub use strict::{ServiceIndex, StrictChecker};
