//! Diagnostic records shared by every check.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Severity of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    /// Error in strict mode, warning otherwise
    pub fn strict_or_warning(strict: bool) -> Self {
        if strict {
            Self::Error
        } else {
            Self::Warning
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Component that produced a diagnostic. Declaration order is report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Header,
    Structure,
    Consistency,
    Triggers,
    Security,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Header => write!(f, "header"),
            Component::Structure => write!(f, "structure"),
            Component::Consistency => write!(f, "consistency"),
            Component::Triggers => write!(f, "triggers"),
            Component::Security => write!(f, "security"),
        }
    }
}

/// Package-relative location of a finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub file: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl Location {
    pub fn file(file: impl AsRef<Path>) -> Self {
        Self {
            file: file.as_ref().to_path_buf(),
            line: None,
        }
    }

    pub fn line(file: impl AsRef<Path>, line: usize) -> Self {
        Self {
            file: file.as_ref().to_path_buf(),
            line: Some(line),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Forward slashes keep rendered reports identical across platforms
        let file = self.file.to_string_lossy().replace('\\', "/");
        match self.line {
            Some(line) => write!(f, "{}:{}", file, line),
            None => write!(f, "{}", file),
        }
    }
}

/// A single finding. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub component: Component,
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl Diagnostic {
    pub fn new(
        severity: Severity,
        component: Component,
        code: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            component,
            code,
            message: message.into(),
            location: None,
        }
    }

    pub fn error(component: Component, code: &'static str, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, component, code, message)
    }

    pub fn warning(component: Component, code: &'static str, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, component, code, message)
    }

    pub fn info(component: Component, code: &'static str, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, component, code, message)
    }

    /// Attach a location
    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<7} {}", self.severity, self.code)?;
        if let Some(location) = &self.location {
            write!(f, " [{}]", location)?;
        }
        write!(f, ": {}", self.message)
    }
}
