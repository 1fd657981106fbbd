//! Header schema, body and tree structure checks.

use crate::diagnostics::{Component, Diagnostic, Location, Severity};
use crate::skillpacks::package::resolve_relative;
use crate::skillpacks::parser::{
    parse_tool_list, FieldValue, Header, MAX_DESCRIPTION_LEN, MAX_NAME_LEN, SKILL_FILE,
};
use crate::skillpacks::spec::{SpecLoad, SPEC_FILE};
use crate::skillpacks::Package;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

const RESERVED_WORDS: &[&str] = &["anthropic", "claude"];
const TRIGGER_TERMS: &[&str] = &[
    "use when",
    "use if",
    "use for",
    "use with",
    "when the user",
    "when working with",
];
const VERBOSE_DESCRIPTION_LEN: usize = 200;
const MAX_COMPATIBILITY_LEN: usize = 500;
const MAX_BODY_LINES: usize = 500;

static NAME_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap());
static XML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?[A-Za-z][^<>]*>").unwrap());
static TODO_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bTODO\b").unwrap());
static TOOL_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9:._-]*(?:\(.+\))?$").unwrap());
static WINDOWS_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\b[A-Za-z]:\\|\b[\w.-]+\\[\w.-]+\.[A-Za-z0-9]+\b|\b[\w.-]+\\[\w.-]+\\)").unwrap()
});

fn schema_error(code: &'static str, message: String, location: Location) -> Diagnostic {
    Diagnostic::error(Component::Structure, code, message).at(location)
}

/// Required fields, naming rules and optional-field typing
pub fn check_header(header: &Header, dir_name: &str, strict: bool) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    check_name(header, dir_name, &mut diagnostics);
    check_description(header, strict, &mut diagnostics);
    check_optional_fields(header, &mut diagnostics);
    diagnostics
}

fn check_name(header: &Header, dir_name: &str, out: &mut Vec<Diagnostic>) {
    let location = header.location_of("name");
    let Some(name) = header.name() else {
        out.push(schema_error(
            "schema.missing-field",
            "Missing required field 'name' (must be a non-empty string)".to_string(),
            location,
        ));
        return;
    };

    if name.chars().count() > MAX_NAME_LEN {
        out.push(schema_error(
            "schema.name-too-long",
            format!("name exceeds {} characters", MAX_NAME_LEN),
            location.clone(),
        ));
    }
    if !NAME_FORMAT.is_match(name) {
        out.push(schema_error(
            "schema.name-format",
            format!(
                "name '{}' must be lowercase letters, digits and single hyphens",
                name
            ),
            location.clone(),
        ));
    }
    let lowered = name.to_lowercase();
    for word in RESERVED_WORDS {
        if lowered.contains(word) {
            out.push(schema_error(
                "schema.name-reserved",
                format!("name must not contain reserved word '{}'", word),
                location.clone(),
            ));
        }
    }
    if XML_TAG.is_match(name) {
        out.push(schema_error(
            "schema.name-xml",
            "name must not contain XML tags".to_string(),
            location.clone(),
        ));
    }
    if name != dir_name {
        out.push(schema_error(
            "schema.name-mismatch",
            format!(
                "name '{}' does not match directory name '{}'",
                name, dir_name
            ),
            location,
        ));
    }
}

fn check_description(header: &Header, strict: bool, out: &mut Vec<Diagnostic>) {
    let location = header.location_of("description");
    let Some(description) = header.description() else {
        out.push(schema_error(
            "schema.missing-field",
            "Missing required field 'description' (must be a non-empty string)".to_string(),
            location,
        ));
        return;
    };

    let len = description.chars().count();
    if len > MAX_DESCRIPTION_LEN {
        out.push(schema_error(
            "schema.description-too-long",
            format!(
                "description is {} characters (max {})",
                len, MAX_DESCRIPTION_LEN
            ),
            location.clone(),
        ));
    }
    if XML_TAG.is_match(description) {
        out.push(schema_error(
            "schema.description-xml",
            "description must not contain XML tags".to_string(),
            location.clone(),
        ));
    }

    let lowered = description.to_lowercase();
    if !TRIGGER_TERMS.iter().any(|t| lowered.contains(t)) {
        out.push(
            Diagnostic::warning(
                Component::Structure,
                "schema.description-no-trigger-terms",
                "description should say when to use the skill (e.g. \"Use when ...\")",
            )
            .at(location.clone()),
        );
    }
    if len > VERBOSE_DESCRIPTION_LEN {
        out.push(
            Diagnostic::warning(
                Component::Structure,
                "schema.description-verbose",
                format!(
                    "description is {} characters; keep it under {}",
                    len, VERBOSE_DESCRIPTION_LEN
                ),
            )
            .at(location.clone()),
        );
    }
    if TODO_MARKER.is_match(description) {
        out.push(
            Diagnostic::new(
                Severity::strict_or_warning(strict),
                Component::Structure,
                "schema.description-todo",
                "description contains a TODO placeholder",
            )
            .at(location),
        );
    }
}

fn check_optional_fields(header: &Header, out: &mut Vec<Diagnostic>) {
    let invalid = |key: &str, message: String| {
        schema_error("schema.invalid-field", message, header.location_of(key))
    };

    if let Some(value) = header.get("compatibility") {
        match value.as_str().map(|s| s.trim().chars().count()) {
            Some(len) if (1..=MAX_COMPATIBILITY_LEN).contains(&len) => {}
            Some(_) => out.push(invalid(
                "compatibility",
                format!(
                    "compatibility must be 1-{} characters",
                    MAX_COMPATIBILITY_LEN
                ),
            )),
            None => out.push(invalid(
                "compatibility",
                format!("compatibility must be a string, got {}", value.kind()),
            )),
        }
    }

    if let Some(value) = header.get("metadata") {
        match value {
            FieldValue::Map(entries) => {
                if let Some((key, _)) = entries.iter().find(|(k, _)| k.as_str().is_none()) {
                    out.push(invalid(
                        "metadata",
                        format!("metadata keys must be strings, got a {} key", key.kind()),
                    ));
                } else if let Some((key, v)) = entries
                    .iter()
                    .find(|(_, v)| !matches!(v, FieldValue::Text(_)))
                {
                    out.push(invalid(
                        "metadata",
                        format!(
                            "metadata values must be strings ('{}' is {})",
                            key.as_str().unwrap_or_default(),
                            v.kind()
                        ),
                    ));
                }
            }
            FieldValue::Text(_) => out.push(
                Diagnostic::warning(
                    Component::Structure,
                    "schema.invalid-field",
                    "metadata should be a mapping, not an inline string",
                )
                .at(header.location_of("metadata")),
            ),
            other => out.push(invalid(
                "metadata",
                format!("metadata must be a mapping, got {}", other.kind()),
            )),
        }
    }

    for key in ["license", "version", "model"] {
        if let Some(value) = header.get(key) {
            if value.as_str().is_none() {
                out.push(invalid(
                    key,
                    format!("{} must be a string, got {}", key, value.kind()),
                ));
            }
        }
    }

    for key in ["allowed-tools", "dependencies"] {
        let Some(value) = header.get(key) else {
            continue;
        };
        let entries = match value {
            FieldValue::Text(s) => Some(parse_tool_list(s)),
            FieldValue::List(items) if items.iter().all(|i| i.as_str().is_some()) => Some(
                items
                    .iter()
                    .filter_map(FieldValue::as_str)
                    .map(|s| s.trim().to_string())
                    .collect(),
            ),
            _ => None,
        };
        let Some(entries) = entries else {
            out.push(invalid(
                key,
                format!("{} must be a string or a list of strings", key),
            ));
            continue;
        };
        if key == "allowed-tools" {
            for tool in entries.iter().filter(|t| !TOOL_NAME.is_match(t)) {
                out.push(schema_error(
                    "schema.invalid-tool",
                    format!("invalid tool entry '{}'", tool),
                    header.location_of(key),
                ));
            }
        }
    }
}

/// Body length and Windows-style paths
pub fn check_body(body: &str, first_line: usize) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let line_count = body.lines().count();
    if line_count > MAX_BODY_LINES {
        diagnostics.push(
            Diagnostic::warning(
                Component::Structure,
                "structure.body-too-long",
                format!(
                    "SKILL.md body is {} lines; move detail into reference files (max {})",
                    line_count, MAX_BODY_LINES
                ),
            )
            .at(Location::file(SKILL_FILE)),
        );
    }
    for (idx, line) in body.lines().enumerate() {
        if let Some(m) = WINDOWS_PATH.find(line) {
            diagnostics.push(
                Diagnostic::warning(
                    Component::Structure,
                    "structure.windows-path",
                    format!("Windows-style path '{}'; use forward slashes", m.as_str()),
                )
                .at(Location::line(SKILL_FILE, first_line + idx)),
            );
        }
    }
    diagnostics
}

/// Symlinks and entries the tree walk could not read
pub fn check_tree(package: &Package, strict: bool) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for link in package.symlinks() {
        let absolute = package.absolute(link);
        let detail = if !absolute.exists() {
            "broken symlink"
        } else if !package.is_inside(&absolute) {
            "symlink points outside the package"
        } else {
            "symlinks are not portable across archives"
        };
        diagnostics.push(
            Diagnostic::new(
                Severity::strict_or_warning(strict),
                Component::Structure,
                "structure.symlink",
                format!("{}: {}", link.display(), detail),
            )
            .at(Location::file(link)),
        );
    }
    for (path, reason) in package.unreadable() {
        diagnostics.push(
            Diagnostic::warning(
                Component::Structure,
                "structure.unreadable-file",
                format!("Cannot read entry: {}", reason),
            )
            .at(Location::file(path)),
        );
    }
    diagnostics
}

/// skill.spec.json presence and its entry point
pub fn check_spec_presence(package: &Package, spec: &SpecLoad, strict: bool) -> Vec<Diagnostic> {
    let missing_severity = if strict {
        Severity::Error
    } else {
        Severity::Info
    };
    let spec = match spec {
        SpecLoad::Absent => {
            return vec![Diagnostic::new(
                missing_severity,
                Component::Structure,
                "spec.missing",
                format!("No {} found", SPEC_FILE),
            )];
        }
        SpecLoad::Invalid(reason) => {
            return vec![Diagnostic::error(
                Component::Structure,
                "spec.invalid-json",
                format!("{} is not a valid JSON object: {}", SPEC_FILE, reason),
            )
            .at(Location::file(SPEC_FILE))];
        }
        SpecLoad::Loaded { spec, .. } => spec,
    };

    let Some(entry_point) = spec.entry_point.as_deref() else {
        return vec![Diagnostic::new(
            missing_severity,
            Component::Structure,
            "spec.entry-point-missing",
            format!("{} declares no entry_point", SPEC_FILE),
        )
        .at(Location::file(SPEC_FILE))];
    };

    let outside = || {
        Diagnostic::error(
            Component::Structure,
            "spec.entry-point-outside",
            format!("entry_point '{}' resolves outside the package", entry_point),
        )
        .at(Location::file(SPEC_FILE))
    };
    let Some(rel) = resolve_relative(Path::new(""), entry_point) else {
        return vec![outside()];
    };
    let absolute = package.absolute(&rel);
    if !absolute.is_file() {
        return vec![Diagnostic::new(
            missing_severity,
            Component::Structure,
            "spec.entry-point-missing",
            format!("entry_point '{}' does not exist", entry_point),
        )
        .at(Location::file(SPEC_FILE))];
    }
    if !package.is_inside(&absolute) {
        return vec![outside()];
    }
    Vec::new()
}
