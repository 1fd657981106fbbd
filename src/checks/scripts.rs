//! Syntax-only checks for embedded scripts and data files.
//!
//! JSON, TOML and YAML are parsed in-process. Python and shell files are
//! handed to an external interpreter that only parses them; nothing is
//! executed.

use crate::config::Config;
use crate::diagnostics::{Component, Diagnostic, Location};
use crate::skillpacks::spec::SPEC_FILE;
use crate::skillpacks::Package;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

const PYTHON_PARSE: &str =
    "import ast,sys; ast.parse(open(sys.argv[1],encoding='utf-8').read(), sys.argv[1])";

static LINE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"line (\d+)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Language {
    Json,
    Toml,
    Yaml,
    Python,
    Shell,
}

impl Language {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            "yaml" | "yml" => Some(Self::Yaml),
            "py" => Some(Self::Python),
            "sh" | "bash" => Some(Self::Shell),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Json => "JSON",
            Self::Toml => "TOML",
            Self::Yaml => "YAML",
            Self::Python => "Python",
            Self::Shell => "shell",
        }
    }
}

/// Result of checking one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Valid,
    Syntax { message: String, line: Option<usize> },
    Unavailable(String),
    TimedOut,
}

/// External checker commands and their timeout
#[derive(Debug, Clone)]
pub struct ScriptChecker {
    python: Vec<String>,
    shell: Vec<String>,
    timeout: Duration,
}

impl ScriptChecker {
    pub fn from_config(config: &Config) -> Self {
        Self {
            python: command_words(config.python_command()),
            shell: command_words(config.shell_command()),
            timeout: Duration::from_millis(config.script_timeout_ms()),
        }
    }

    /// Check one file by language
    pub fn check_file(&self, language: Language, path: &Path) -> Outcome {
        match language {
            Language::Json | Language::Toml | Language::Yaml => match std::fs::read_to_string(path)
            {
                Ok(text) => check_data(language, &text),
                Err(e) => Outcome::Syntax {
                    message: format!("cannot read file: {}", e),
                    line: None,
                },
            },
            Language::Python => {
                let file = path.to_string_lossy();
                self.run_external(&self.python, &["-c", PYTHON_PARSE, file.as_ref()])
            }
            Language::Shell => {
                let file = path.to_string_lossy();
                self.run_external(&self.shell, &["-n", file.as_ref()])
            }
        }
    }

    fn run_external(&self, command: &[String], args: &[&str]) -> Outcome {
        let Some((program, base_args)) = command.split_first() else {
            return Outcome::Unavailable("no checker command configured".to_string());
        };
        debug!(program = %program, "Running syntax checker");
        let spawned = Command::new(program)
            .args(base_args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => return Outcome::Unavailable(format!("{}: {}", program, e)),
        };

        let stderr_thread = child.stderr.take().map(|mut stderr| {
            std::thread::spawn(move || {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf);
                buf
            })
        });

        let status = match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                return Outcome::TimedOut;
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Outcome::Unavailable(format!("{}: {}", program, e));
            }
        };
        let stderr = stderr_thread
            .and_then(|t| t.join().ok())
            .unwrap_or_default();

        if status.success() {
            return Outcome::Valid;
        }
        let message = stderr
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .unwrap_or("syntax check failed")
            .trim()
            .to_string();
        let line = LINE_NUMBER
            .captures_iter(&stderr)
            .last()
            .and_then(|c| c[1].parse().ok());
        Outcome::Syntax { message, line }
    }
}

fn first_line_number(message: &str) -> Option<usize> {
    LINE_NUMBER
        .captures(message)
        .and_then(|c| c[1].parse().ok())
}

/// Split a configured command so that extra interpreter flags are honored
fn command_words(command: &str) -> Vec<String> {
    shell_words::split(command)
        .unwrap_or_else(|_| command.split_whitespace().map(str::to_string).collect())
}

/// In-process parse of a data file
pub fn check_data(language: Language, text: &str) -> Outcome {
    let failure = match language {
        Language::Json => serde_json::from_str::<serde_json::Value>(text)
            .err()
            .map(|e| (e.to_string(), Some(e.line()))),
        Language::Toml => toml::from_str::<toml::Value>(text).err().map(|e| {
            let line = e.span().map(|span| line_of_offset(text, span.start));
            (e.message().to_string(), line)
        }),
        Language::Yaml => {
            // Multi-document streams are valid YAML files
            serde_yaml::Deserializer::from_str(text)
                .map(|doc| <serde_yaml::Value as serde::Deserialize>::deserialize(doc))
                .find_map(|r| r.err())
                .map(|e| {
                    let message = e.to_string();
                    let line = first_line_number(&message);
                    (message, line)
                })
        }
        Language::Python | Language::Shell => None,
    };
    match failure {
        Some((message, line)) => Outcome::Syntax { message, line },
        None => Outcome::Valid,
    }
}

fn line_of_offset(text: &str, offset: usize) -> usize {
    text.get(..offset)
        .map(|prefix| prefix.matches('\n').count() + 1)
        .unwrap_or(1)
}

/// Syntax-check every recognized file except skill.spec.json
pub fn check_scripts(package: &Package, checker: &ScriptChecker) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut unavailable: BTreeSet<Language> = BTreeSet::new();

    for file in package.files() {
        if file == Path::new(SPEC_FILE) {
            continue;
        }
        let Some(language) = Language::from_path(file) else {
            continue;
        };
        if unavailable.contains(&language) {
            continue;
        }
        match checker.check_file(language, &package.absolute(file)) {
            Outcome::Valid => {}
            Outcome::Syntax { message, line } => {
                let location = match line {
                    Some(line) => Location::line(file, line),
                    None => Location::file(file),
                };
                diagnostics.push(
                    Diagnostic::error(
                        Component::Structure,
                        "script.syntax",
                        format!("{} syntax error: {}", language.label(), message),
                    )
                    .at(location),
                );
            }
            Outcome::Unavailable(reason) => {
                warn!(language = language.label(), %reason, "Syntax checker unavailable");
                unavailable.insert(language);
                diagnostics.push(Diagnostic::info(
                    Component::Structure,
                    "script.checker-unavailable",
                    format!(
                        "{} syntax checker unavailable ({}); {} files not checked",
                        language.label(),
                        reason,
                        language.label()
                    ),
                ));
            }
            Outcome::TimedOut => diagnostics.push(
                Diagnostic::warning(
                    Component::Structure,
                    "script.check-timeout",
                    format!("{} syntax check timed out", language.label()),
                )
                .at(Location::file(file)),
            ),
        }
    }
    diagnostics
}
