//! skillcheck: validation and trigger-quality scoring for skill packages.
//!
//! A skill package is a folder with a `SKILL.md` entry document (YAML
//! frontmatter plus instructions) and an optional `skill.spec.json` that
//! declares activation triggers, anti-triggers and acceptance tests.

pub mod checks;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod report;
pub mod skillpacks;
pub mod text;

pub use config::Config;
pub use diagnostics::{Component, Diagnostic, Location, Severity};
pub use engine::{AuditOptions, Engine};
pub use error::{Result, SkillcheckError};
pub use report::{AuditReport, ExitPolicy, ExitStatus, Report};
