//! Report aggregation and rendering.

use crate::checks::triggers::TriggerAnalysis;
use crate::diagnostics::{Component, Diagnostic, Severity};
use serde::Serialize;
use std::fmt::Write as _;

/// Process exit status derived from a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitStatus {
    /// No blocking findings
    Clean,
    /// At least one blocking finding
    Blocking,
    /// Invalid invocation (bad path, unreadable directory, bad config)
    Usage,
}

impl ExitStatus {
    pub fn code(&self) -> u8 {
        match self {
            Self::Clean => 0,
            Self::Blocking => 1,
            Self::Usage => 2,
        }
    }

    /// The worse of two statuses
    pub fn max(self, other: ExitStatus) -> ExitStatus {
        if other.code() > self.code() {
            other
        } else {
            self
        }
    }
}

/// Caller-selected policy for deriving the exit status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExitPolicy {
    /// CI mode: warning-level security findings also block
    pub escalate_security_warnings: bool,
}

impl ExitPolicy {
    pub fn ci() -> Self {
        Self {
            escalate_security_warnings: true,
        }
    }

    fn is_blocking(&self, diagnostic: &Diagnostic) -> bool {
        match diagnostic.severity {
            Severity::Error => true,
            Severity::Warning => {
                self.escalate_security_warnings && diagnostic.component == Component::Security
            }
            Severity::Info => false,
        }
    }
}

/// Diagnostic counts per severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
}

impl Counts {
    fn tally(diagnostics: &[Diagnostic]) -> Self {
        let mut counts = Counts::default();
        for d in diagnostics {
            match d.severity {
                Severity::Error => counts.errors += 1,
                Severity::Warning => counts.warnings += 1,
                Severity::Info => counts.infos += 1,
            }
        }
        counts
    }
}

/// Result of one invocation against one package
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub subject: String,
    pub diagnostics: Vec<Diagnostic>,
    pub counts: Counts,
    pub exit_status: ExitStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_analysis: Option<TriggerAnalysis>,
}

impl Report {
    /// Merge diagnostics into a report.
    ///
    /// Ordering is by component, then by emission order within a component
    /// (the sort is stable).
    pub fn build(
        subject: impl Into<String>,
        mut diagnostics: Vec<Diagnostic>,
        policy: ExitPolicy,
    ) -> Self {
        diagnostics.sort_by_key(|d| d.component);
        let counts = Counts::tally(&diagnostics);
        let exit_status = if diagnostics.iter().any(|d| policy.is_blocking(d)) {
            ExitStatus::Blocking
        } else {
            ExitStatus::Clean
        };
        Self {
            subject: subject.into(),
            diagnostics,
            counts,
            exit_status,
            trigger_analysis: None,
        }
    }

    pub fn with_trigger_analysis(mut self, analysis: TriggerAnalysis) -> Self {
        self.trigger_analysis = Some(analysis);
        self
    }

    pub fn has_errors(&self) -> bool {
        self.counts.errors > 0
    }

    /// Diagnostics with the given code
    pub fn with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.diagnostics.iter().filter(move |d| d.code == code)
    }

    pub fn render_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "== {} ==", self.subject);
        if let Some(analysis) = &self.trigger_analysis {
            out.push_str(&analysis.render_table());
            out.push('\n');
        }
        if self.diagnostics.is_empty() {
            out.push_str("No findings.\n");
        }
        for d in &self.diagnostics {
            let _ = writeln!(out, "{}", d);
        }
        let _ = writeln!(
            out,
            "{} error(s), {} warning(s), {} info",
            self.counts.errors, self.counts.warnings, self.counts.infos
        );
        out
    }
}

/// Reports for every package under a skills directory
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub skills_dir: String,
    pub packages: Vec<Report>,
    /// Packages whose report blocks
    pub failures: usize,
    pub exit_status: ExitStatus,
}

impl AuditReport {
    pub fn build(skills_dir: impl Into<String>, packages: Vec<Report>) -> Self {
        let failures = packages
            .iter()
            .filter(|r| r.exit_status == ExitStatus::Blocking)
            .count();
        let exit_status = packages
            .iter()
            .fold(ExitStatus::Clean, |acc, r| acc.max(r.exit_status));
        Self {
            skills_dir: skills_dir.into(),
            packages,
            failures,
            exit_status,
        }
    }

    pub fn render_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        if self.packages.is_empty() {
            let _ = writeln!(out, "No skill packages found in {}", self.skills_dir);
        }
        for report in &self.packages {
            out.push_str(&report.render_text());
            out.push('\n');
        }
        if self.failures > 0 {
            let _ = writeln!(
                out,
                "Audit finished with {} failing package(s) out of {}.",
                self.failures,
                self.packages.len()
            );
        } else {
            let _ = writeln!(
                out,
                "Audit finished: {} package(s), no failures.",
                self.packages.len()
            );
        }
        out
    }
}
