//! skill.spec.json loader.
//!
//! The spec is optional. It is read as untyped JSON so that every shape
//! problem can be reported individually instead of failing on the first one.

use crate::diagnostics::{Component, Diagnostic, Location, Severity};
use crate::skillpacks::parser::parse_tool_list;
use crate::text::{StemSet, SynonymExpander, TokenEngine};
use once_cell::unsync::OnceCell;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

pub const SPEC_FILE: &str = "skill.spec.json";

const REQUIRED_KEYS: &[&str] = &[
    "name",
    "title",
    "description",
    "archetype",
    "risk_level",
    "entry_point",
    "triggers",
    "anti_triggers",
    "acceptance_tests",
];
const STRING_KEYS: &[&str] = &[
    "name",
    "title",
    "description",
    "archetype",
    "risk_level",
    "entry_point",
];
const PHRASE_LIST_KEYS: &[&str] = &["triggers", "anti_triggers", "acceptance_tests"];
const OPTIONAL_LIST_KEYS: &[&str] = &["goals", "inputs", "outputs", "non_goals"];

/// Execution pattern of a skill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Archetype {
    /// Local-only instructions and scripts
    Basic,
    /// Calls an external API
    ApiWrapper,
    /// Bridges to an MCP server
    McpBridge,
}

impl Archetype {
    pub const ALL: [Archetype; 3] = [Self::Basic, Self::ApiWrapper, Self::McpBridge];

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == s)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::ApiWrapper => "api-wrapper",
            Self::McpBridge => "mcp-bridge",
        }
    }

    /// Archetypes with third-party dependencies
    pub fn needs_requirements(&self) -> bool {
        matches!(self, Self::ApiWrapper | Self::McpBridge)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [Self::Low, Self::Medium, Self::High];

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == s)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// A trigger or anti-trigger phrase with its cached stem set
#[derive(Debug, Clone)]
pub struct TriggerPhrase {
    text: String,
    stems: OnceCell<StemSet>,
}

impl TriggerPhrase {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            stems: OnceCell::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Expanded stems, computed on first use
    pub fn stems(&self, engine: &TokenEngine<'_>, expander: &SynonymExpander) -> &StemSet {
        self.stems
            .get_or_init(|| expander.expand(&engine.normalize(&self.text)))
    }
}

/// Parsed skill.spec.json
#[derive(Debug, Clone, Default)]
pub struct Spec {
    pub name: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Raw archetype; validated against [`Archetype`] by the consistency checker
    pub archetype: Option<String>,
    pub risk_level: Option<String>,
    pub entry_point: Option<String>,
    pub triggers: Vec<TriggerPhrase>,
    pub anti_triggers: Vec<TriggerPhrase>,
    pub acceptance_tests: Vec<String>,
    pub allowed_tools: Option<Vec<String>>,
}

/// Outcome of looking for skill.spec.json
#[derive(Debug)]
pub enum SpecLoad {
    Absent,
    /// Unreadable, not JSON, or not a JSON object
    Invalid(String),
    Loaded {
        spec: Spec,
        /// Shape problems found while reading
        diagnostics: Vec<Diagnostic>,
    },
}

impl SpecLoad {
    pub fn spec(&self) -> Option<&Spec> {
        match self {
            SpecLoad::Loaded { spec, .. } => Some(spec),
            _ => None,
        }
    }
}

/// Read `skill.spec.json` from a package root
pub fn load_spec(root: &Path, strict: bool) -> SpecLoad {
    let path = root.join(SPEC_FILE);
    if !path.is_file() {
        return SpecLoad::Absent;
    }
    let content = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) => return SpecLoad::Invalid(e.to_string()),
    };
    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(map)) => {
            let (spec, diagnostics) = spec_from_object(&map, strict);
            SpecLoad::Loaded { spec, diagnostics }
        }
        Ok(_) => SpecLoad::Invalid("top level must be a JSON object".to_string()),
        Err(e) => SpecLoad::Invalid(e.to_string()),
    }
}

/// Build a [`Spec`] and collect shape diagnostics.
///
/// Shape problems are errors in strict mode and warnings otherwise.
pub fn spec_from_object(map: &Map<String, Value>, strict: bool) -> (Spec, Vec<Diagnostic>) {
    let severity = Severity::strict_or_warning(strict);
    let mut diagnostics = Vec::new();
    let mut report = |code: &'static str, message: String| {
        diagnostics.push(
            Diagnostic::new(severity, Component::Consistency, code, message)
                .at(Location::file(SPEC_FILE)),
        );
    };

    for key in REQUIRED_KEYS {
        if !map.contains_key(*key) {
            report("spec.missing-key", format!("{} missing '{}'", SPEC_FILE, key));
        }
    }

    for key in STRING_KEYS {
        if let Some(value) = map.get(*key) {
            if non_empty_str(value).is_none() {
                report(
                    "spec.invalid-value",
                    format!("{} '{}' must be a non-empty string", SPEC_FILE, key),
                );
            }
        }
    }

    for key in PHRASE_LIST_KEYS {
        match map.get(*key) {
            Some(Value::Array(items)) if !items.is_empty() => {
                if !is_string_list(items) {
                    report(
                        "spec.invalid-value",
                        format!("{} '{}' must be a list of non-empty strings", SPEC_FILE, key),
                    );
                }
            }
            Some(_) => report(
                "spec.invalid-value",
                format!("{} '{}' must be a non-empty list", SPEC_FILE, key),
            ),
            None => {}
        }
    }

    for key in OPTIONAL_LIST_KEYS {
        if let Some(value) = map.get(*key) {
            let ok = matches!(value, Value::Array(items) if is_string_list(items));
            if !ok {
                report(
                    "spec.invalid-value",
                    format!("{} '{}' must be a list of non-empty strings", SPEC_FILE, key),
                );
            }
        }
    }

    if map.contains_key("allowed_tools") && map.contains_key("allowed-tools") {
        report(
            "spec.duplicate-key",
            format!(
                "{} should not include both 'allowed_tools' and 'allowed-tools'",
                SPEC_FILE
            ),
        );
    }
    let allowed_tools = match map.get("allowed_tools").or_else(|| map.get("allowed-tools")) {
        None => None,
        Some(Value::String(s)) => {
            diagnostics.push(
                Diagnostic::warning(
                    Component::Consistency,
                    "spec.invalid-value",
                    format!("{} 'allowed_tools' should be a list of strings", SPEC_FILE),
                )
                .at(Location::file(SPEC_FILE)),
            );
            Some(parse_tool_list(s))
        }
        Some(Value::Array(items)) => {
            if !is_string_list(items) {
                report_now(
                    &mut diagnostics,
                    severity,
                    format!("{} 'allowed_tools' must be a list of non-empty strings", SPEC_FILE),
                );
            }
            Some(string_items(items))
        }
        Some(_) => {
            report_now(
                &mut diagnostics,
                severity,
                format!("{} 'allowed_tools' must be a list of strings", SPEC_FILE),
            );
            None
        }
    };

    if let Some(integration) = map.get("integration") {
        let ok = matches!(integration, Value::Object(o) if o.values().all(Value::is_string));
        if !ok {
            report_now(
                &mut diagnostics,
                severity,
                format!("{} 'integration' must map string keys to string values", SPEC_FILE),
            );
        }
    }

    let text = |key: &str| map.get(key).and_then(non_empty_str).map(str::to_string);
    let list = |key: &str| match map.get(key) {
        Some(Value::Array(items)) => string_items(items),
        _ => Vec::new(),
    };

    let spec = Spec {
        name: text("name"),
        title: text("title"),
        description: text("description"),
        archetype: text("archetype"),
        risk_level: text("risk_level"),
        entry_point: text("entry_point"),
        triggers: list("triggers").into_iter().map(TriggerPhrase::new).collect(),
        anti_triggers: list("anti_triggers")
            .into_iter()
            .map(TriggerPhrase::new)
            .collect(),
        acceptance_tests: list("acceptance_tests"),
        allowed_tools,
    };
    (spec, diagnostics)
}

fn report_now(diagnostics: &mut Vec<Diagnostic>, severity: Severity, message: String) {
    diagnostics.push(
        Diagnostic::new(severity, Component::Consistency, "spec.invalid-value", message)
            .at(Location::file(SPEC_FILE)),
    );
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty())
}

fn is_string_list(items: &[Value]) -> bool {
    items.iter().all(|v| non_empty_str(v).is_some())
}

/// Trimmed non-empty strings, other items dropped
fn string_items(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(non_empty_str)
        .map(str::to_string)
        .collect()
}
