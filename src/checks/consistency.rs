//! Cross-checks between SKILL.md and skill.spec.json.

use crate::config::TriggerThresholds;
use crate::diagnostics::{Component, Diagnostic, Location, Severity};
use crate::skillpacks::parser::{Header, SKILL_FILE};
use crate::skillpacks::spec::{Archetype, RiskLevel, Spec, SPEC_FILE};
use crate::skillpacks::Package;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

const REQUIREMENTS_FILES: &[&str] = &["requirements.txt", "scripts/requirements.txt"];

/// Third-party modules that scripts commonly import, with a requirement hint
const COMMON_THIRD_PARTY: &[(&str, &str)] = &[
    ("requests", "requests>=2.31.0"),
    ("httpx", "httpx"),
    ("mcp", "mcp"),
];

static TODO_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bTODO\b").unwrap());
/// `Bash`, `Bash(*)` or `Bash(<command>...)`
static BASH_TOOL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Bash(?:\((.*)\))?$").unwrap());
static IMPORT_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*import\s+([^#;]+)").unwrap());
static FROM_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*from\s+([A-Za-z_]\w*)[\w.]*\s+import\b").unwrap());
static REQUIREMENT_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([A-Za-z0-9][A-Za-z0-9._-]*)").unwrap());

fn at_spec(diagnostic: Diagnostic) -> Diagnostic {
    diagnostic.at(Location::file(SPEC_FILE))
}

/// Run every cross-check. `header` is `None` when strict parsing rejected it.
pub fn check_consistency(
    header: Option<&Header>,
    spec: &Spec,
    package: &Package,
    strict: bool,
    thresholds: &TriggerThresholds,
) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    if let Some(header) = header {
        check_tools(header, spec, strict, &mut out);
        check_entry_invocable(header, spec, &mut out);
        check_identity(header, spec, strict, &mut out);
    }
    check_enums(spec, strict, &mut out);
    check_trigger_conflicts(spec, &mut out);
    check_placeholders(spec, strict, &mut out);
    check_requirements(spec, package, &mut out);
    check_counts(spec, strict, thresholds, &mut out);
    out
}

fn check_tools(header: &Header, spec: &Spec, strict: bool, out: &mut Vec<Diagnostic>) {
    let Some(spec_tools) = spec.allowed_tools.as_ref().filter(|t| !t.is_empty()) else {
        return;
    };
    match header.allowed_tools() {
        Some(header_tools) => {
            let a: BTreeSet<&str> = header_tools.iter().map(String::as_str).collect();
            let b: BTreeSet<&str> = spec_tools.iter().map(String::as_str).collect();
            if a != b {
                let only_header: Vec<_> = a.difference(&b).copied().collect();
                let only_spec: Vec<_> = b.difference(&a).copied().collect();
                out.push(at_spec(Diagnostic::error(
                    Component::Consistency,
                    "spec.tools-mismatch",
                    format!(
                        "allowed tools differ: only in {}: [{}]; only in {}: [{}]",
                        SKILL_FILE,
                        only_header.join(", "),
                        SPEC_FILE,
                        only_spec.join(", ")
                    ),
                )));
            }
        }
        None => out.push(at_spec(Diagnostic::new(
            Severity::strict_or_warning(strict),
            Component::Consistency,
            "spec.tools-header-missing",
            format!(
                "{} declares allowed_tools but {} has no 'allowed-tools'",
                SPEC_FILE, SKILL_FILE
            ),
        ))),
    }
}

/// Interpreters that may run an entry point, by extension
fn interpreters(entry: &Path) -> &'static [&'static str] {
    match entry.extension().and_then(|e| e.to_str()) {
        Some("py") => &["python", "python3", "uv", "uvx"],
        Some("sh") | Some("bash") => &["bash", "sh"],
        Some("js") | Some("mjs") => &["node", "npx", "bun", "deno"],
        Some("ts") => &["node", "npx", "bun", "deno", "tsx"],
        Some("rb") => &["ruby"],
        _ => &[],
    }
}

/// Whether a header tool entry lets Bash run `entry`
pub fn tool_runs_entry(tool: &str, entry: &str) -> bool {
    let Some(cap) = BASH_TOOL.captures(tool.trim()) else {
        return false;
    };
    let Some(scope) = cap.get(1).map(|m| m.as_str().trim()) else {
        return true;
    };
    if scope == "*" || scope.is_empty() {
        return true;
    }
    let command = scope
        .split(|c: char| c == ':' || c.is_whitespace())
        .next()
        .unwrap_or_default();
    let entry = entry.trim_start_matches("./");
    let command_path = command.trim_start_matches("./");
    command_path == entry || interpreters(Path::new(entry)).contains(&command)
}

fn check_entry_invocable(header: &Header, spec: &Spec, out: &mut Vec<Diagnostic>) {
    let (Some(entry), Some(tools)) = (spec.entry_point.as_deref(), header.allowed_tools()) else {
        return;
    };
    if !tools.iter().any(|t| tool_runs_entry(t, entry)) {
        out.push(at_spec(Diagnostic::warning(
            Component::Consistency,
            "spec.entry-point-not-invocable",
            format!(
                "entry_point '{}' cannot be run with the allowed tools [{}]",
                entry,
                tools.join(", ")
            ),
        )));
    }
}

fn check_identity(header: &Header, spec: &Spec, strict: bool, out: &mut Vec<Diagnostic>) {
    if let (Some(a), Some(b)) = (header.name(), spec.name.as_deref()) {
        if a != b {
            out.push(at_spec(Diagnostic::new(
                Severity::strict_or_warning(strict),
                Component::Consistency,
                "spec.name-mismatch",
                format!("spec name '{}' differs from SKILL.md name '{}'", b, a),
            )));
        }
    }
    if let (Some(a), Some(b)) = (header.description(), spec.description.as_deref()) {
        if a.trim() != b.trim() {
            out.push(at_spec(Diagnostic::warning(
                Component::Consistency,
                "spec.description-mismatch",
                "spec description differs from SKILL.md description",
            )));
        }
    }
}

fn check_enums(spec: &Spec, strict: bool, out: &mut Vec<Diagnostic>) {
    if let Some(raw) = spec.archetype.as_deref() {
        if Archetype::parse(raw).is_none() {
            let allowed: Vec<_> = Archetype::ALL.iter().map(Archetype::as_str).collect();
            out.push(at_spec(Diagnostic::error(
                Component::Consistency,
                "spec.invalid-archetype",
                format!(
                    "archetype '{}' is not one of: {}",
                    raw,
                    allowed.join(", ")
                ),
            )));
        }
    }
    if let Some(raw) = spec.risk_level.as_deref() {
        match RiskLevel::parse(raw) {
            None => {
                let allowed: Vec<_> = RiskLevel::ALL.iter().map(RiskLevel::as_str).collect();
                out.push(at_spec(Diagnostic::error(
                    Component::Consistency,
                    "spec.invalid-risk-level",
                    format!(
                        "risk_level '{}' is not one of: {}",
                        raw,
                        allowed.join(", ")
                    ),
                )));
            }
            Some(RiskLevel::High) if !strict => out.push(at_spec(Diagnostic::info(
                Component::Consistency,
                "spec.high-risk",
                "risk_level is high; validate with --strict before distributing",
            ))),
            Some(_) => {}
        }
    }
}

fn check_trigger_conflicts(spec: &Spec, out: &mut Vec<Diagnostic>) {
    let anti: BTreeSet<String> = spec
        .anti_triggers
        .iter()
        .map(|p| p.text().trim().to_lowercase())
        .collect();
    for trigger in &spec.triggers {
        if anti.contains(&trigger.text().trim().to_lowercase()) {
            out.push(at_spec(Diagnostic::error(
                Component::Consistency,
                "spec.trigger-conflict",
                format!(
                    "'{}' is listed as both a trigger and an anti-trigger",
                    trigger.text()
                ),
            )));
        }
    }
}

fn check_placeholders(spec: &Spec, strict: bool, out: &mut Vec<Diagnostic>) {
    let mut keys = Vec::new();
    let singles = [
        ("name", spec.name.as_deref()),
        ("title", spec.title.as_deref()),
        ("description", spec.description.as_deref()),
        ("entry_point", spec.entry_point.as_deref()),
    ];
    for (key, value) in singles {
        if value.is_some_and(|v| TODO_MARKER.is_match(v)) {
            keys.push(key);
        }
    }
    if spec.triggers.iter().any(|p| TODO_MARKER.is_match(p.text())) {
        keys.push("triggers");
    }
    if spec
        .anti_triggers
        .iter()
        .any(|p| TODO_MARKER.is_match(p.text()))
    {
        keys.push("anti_triggers");
    }
    if spec.acceptance_tests.iter().any(|t| TODO_MARKER.is_match(t)) {
        keys.push("acceptance_tests");
    }
    if !keys.is_empty() {
        out.push(at_spec(Diagnostic::new(
            Severity::strict_or_warning(strict),
            Component::Consistency,
            "spec.todo-placeholder",
            format!("TODO placeholders remain in: {}", keys.join(", ")),
        )));
    }
}

fn check_requirements(spec: &Spec, package: &Package, out: &mut Vec<Diagnostic>) {
    let Some(archetype) = spec.archetype.as_deref().and_then(Archetype::parse) else {
        return;
    };
    if !archetype.needs_requirements() {
        return;
    }
    let found = REQUIREMENTS_FILES
        .iter()
        .any(|f| package.absolute(Path::new(f)).is_file());
    if !found {
        out.push(at_spec(Diagnostic::warning(
            Component::Consistency,
            "spec.missing-requirements",
            format!(
                "archetype '{}' usually needs a requirements.txt for its dependencies",
                archetype.as_str()
            ),
        )));
    }
}

/// Top-level module names imported by Python source
pub fn imported_top_levels(source: &str) -> BTreeSet<String> {
    let mut modules = BTreeSet::new();
    for line in source.lines() {
        if let Some(cap) = FROM_LINE.captures(line) {
            modules.insert(cap[1].to_string());
        } else if let Some(cap) = IMPORT_LINE.captures(line) {
            for item in cap[1].split(',') {
                let Some(path) = item.split_whitespace().next() else {
                    continue;
                };
                if let Some(top) = path.split('.').next().filter(|t| !t.is_empty()) {
                    modules.insert(top.to_string());
                }
            }
        }
    }
    modules
}

/// Lowercased project names listed in requirements text
fn requirement_names(text: &str) -> BTreeSet<String> {
    text.lines()
        .map(|line| line.split('#').next().unwrap_or_default())
        .filter_map(|line| REQUIREMENT_NAME.captures(line))
        .map(|cap| cap[1].to_ascii_lowercase().replace('_', "-"))
        .collect()
}

/// Scripts under `scripts/` that import a common third-party module not
/// listed in any requirements file. Runs with or without a spec.
pub fn check_dependencies(package: &Package) -> Vec<Diagnostic> {
    let mut imports = BTreeSet::new();
    for rel in package.files() {
        let is_script = rel.starts_with("scripts")
            && rel.extension().and_then(|e| e.to_str()) == Some("py");
        if !is_script {
            continue;
        }
        match std::fs::read_to_string(package.absolute(rel)) {
            Ok(source) => imports.extend(imported_top_levels(&source)),
            Err(e) => debug!(file = %rel.display(), error = %e, "Skipping import analysis"),
        }
    }
    if imports.is_empty() {
        return Vec::new();
    }

    let listed: BTreeSet<String> = REQUIREMENTS_FILES
        .iter()
        .filter_map(|f| std::fs::read_to_string(package.absolute(Path::new(f))).ok())
        .flat_map(|text| requirement_names(&text))
        .collect();

    COMMON_THIRD_PARTY
        .iter()
        .filter(|(module, _)| imports.contains(*module) && !listed.contains(*module))
        .map(|(module, hint)| {
            Diagnostic::warning(
                Component::Consistency,
                "spec.unlisted-dependency",
                format!(
                    "scripts import '{}' but requirements.txt does not list it (expected like: {})",
                    module, hint
                ),
            )
            .at(Location::file("requirements.txt"))
        })
        .collect()
}

fn check_counts(
    spec: &Spec,
    strict: bool,
    thresholds: &TriggerThresholds,
    out: &mut Vec<Diagnostic>,
) {
    if spec.triggers.len() < thresholds.min_triggers {
        out.push(at_spec(Diagnostic::new(
            Severity::strict_or_warning(strict),
            Component::Consistency,
            "spec.too-few-triggers",
            format!(
                "{} trigger(s); at least {} recommended",
                spec.triggers.len(),
                thresholds.min_triggers
            ),
        )));
    }
    if spec.anti_triggers.len() < thresholds.min_anti_triggers {
        out.push(at_spec(Diagnostic::warning(
            Component::Consistency,
            "spec.too-few-anti-triggers",
            format!(
                "{} anti-trigger(s); at least {} recommended",
                spec.anti_triggers.len(),
                thresholds.min_anti_triggers
            ),
        )));
    }
    if spec.acceptance_tests.len() < thresholds.min_acceptance_tests {
        out.push(at_spec(Diagnostic::warning(
            Component::Consistency,
            "spec.too-few-acceptance-tests",
            format!(
                "{} acceptance test(s); at least {} recommended",
                spec.acceptance_tests.len(),
                thresholds.min_acceptance_tests
            ),
        )));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skillpacks::parser::{parse_header, ParseMode};
    use crate::skillpacks::{ExcludeSet, TriggerPhrase};

    fn header(yaml: &str) -> Header {
        let text = format!("---\n{}---\n", yaml);
        parse_header(&text, ParseMode::Lenient)
            .unwrap()
            .header()
            .cloned()
            .unwrap()
    }

    fn full_spec() -> Spec {
        let phrases = |items: &[&str]| -> Vec<TriggerPhrase> {
            items.iter().map(|s| TriggerPhrase::new(*s)).collect()
        };
        Spec {
            name: Some("demo".to_string()),
            title: Some("Demo".to_string()),
            description: Some("Does demo things. Use when demoing.".to_string()),
            archetype: Some("basic".to_string()),
            risk_level: Some("low".to_string()),
            entry_point: Some("scripts/main.py".to_string()),
            triggers: phrases(&["a one", "b two", "c three", "d four", "e five"]),
            anti_triggers: phrases(&["x", "y", "z"]),
            acceptance_tests: vec!["t1".into(), "t2".into(), "t3".into()],
            allowed_tools: None,
        }
    }

    fn run(header_yaml: &str, spec: &Spec, strict: bool) -> Vec<Diagnostic> {
        let dir = tempfile::tempdir().unwrap();
        let package = Package::load(dir.path(), &ExcludeSet::default()).unwrap();
        check_consistency(
            Some(&header(header_yaml)),
            spec,
            &package,
            strict,
            &TriggerThresholds::default(),
        )
    }

    const HEADER: &str = "name: demo\ndescription: Does demo things. Use when demoing.\n";

    #[test]
    fn test_consistent_pair_is_clean() {
        assert!(run(HEADER, &full_spec(), true).is_empty());
    }

    #[test]
    fn test_tool_sets_compare_order_insensitively() {
        let mut spec = full_spec();
        spec.allowed_tools = Some(vec!["Read".into(), "Bash".into()]);
        let yaml = format!("{}allowed-tools: Bash, Read\n", HEADER);
        assert!(run(&yaml, &spec, true).is_empty());

        let yaml = format!("{}allowed-tools: Bash Grep\n", HEADER);
        let diagnostics = run(&yaml, &spec, false);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, "spec.tools-mismatch");
        assert!(diagnostics[0].is_error());

        let diagnostics = run(HEADER, &spec, false);
        assert_eq!(diagnostics[0].code, "spec.tools-header-missing");
        assert_eq!(diagnostics[0].severity, Severity::Warning);
    }

    #[test]
    fn test_entry_point_invocation() {
        assert!(tool_runs_entry("Bash", "scripts/main.py"));
        assert!(tool_runs_entry("Bash(*)", "scripts/main.py"));
        assert!(tool_runs_entry("Bash(python3:*)", "scripts/main.py"));
        assert!(tool_runs_entry("Bash(./scripts/run.sh)", "scripts/run.sh"));
        assert!(!tool_runs_entry("Bash(git:*)", "scripts/main.py"));
        assert!(!tool_runs_entry("Read", "scripts/main.py"));

        let yaml = format!("{}allowed-tools: Read Grep\n", HEADER);
        let diagnostics = run(&yaml, &full_spec(), false);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, "spec.entry-point-not-invocable");
    }

    #[test]
    fn test_enum_and_identity_checks() {
        let mut spec = full_spec();
        spec.archetype = Some("cli".into());
        spec.risk_level = Some("extreme".into());
        spec.name = Some("other".into());
        spec.description = Some("Something else".into());
        let codes: Vec<_> = run(HEADER, &spec, false).iter().map(|d| d.code).collect();
        assert_eq!(
            codes,
            vec![
                "spec.name-mismatch",
                "spec.description-mismatch",
                "spec.invalid-archetype",
                "spec.invalid-risk-level",
            ]
        );
    }

    #[test]
    fn test_conflicts_placeholders_and_counts() {
        let mut spec = full_spec();
        spec.anti_triggers.push(TriggerPhrase::new("  A ONE "));
        spec.title = Some("TODO".into());
        spec.triggers.truncate(4);
        spec.acceptance_tests.clear();
        spec.risk_level = Some("high".into());

        let diagnostics = run(HEADER, &spec, false);
        let found: Vec<_> = diagnostics.iter().map(|d| (d.code, d.severity)).collect();
        assert_eq!(
            found,
            vec![
                ("spec.high-risk", Severity::Info),
                ("spec.trigger-conflict", Severity::Error),
                ("spec.todo-placeholder", Severity::Warning),
                ("spec.too-few-triggers", Severity::Warning),
                ("spec.too-few-acceptance-tests", Severity::Warning),
            ]
        );

        let strict = run(HEADER, &spec, true);
        assert!(strict.iter().all(|d| d.code != "spec.high-risk"));
        let too_few = strict
            .iter()
            .find(|d| d.code == "spec.too-few-triggers")
            .unwrap();
        assert_eq!(too_few.severity, Severity::Error);
    }

    #[test]
    fn test_networked_archetype_needs_requirements() {
        let mut spec = full_spec();
        spec.archetype = Some("api-wrapper".into());
        let codes: Vec<_> = run(HEADER, &spec, false).iter().map(|d| d.code).collect();
        assert_eq!(codes, vec!["spec.missing-requirements"]);
    }

    #[test]
    fn test_imported_top_levels() {
        let source = "import os, sys as system\nimport requests.adapters\nfrom httpx import Client\nfrom . import local\n    from mcp.server import Server\n# import fake\n";
        let modules: Vec<_> = imported_top_levels(source).into_iter().collect();
        assert_eq!(modules, vec!["httpx", "mcp", "os", "requests", "sys"]);
    }

    #[test]
    fn test_unlisted_third_party_imports() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("scripts/lib")).unwrap();
        std::fs::write(dir.path().join("scripts/main.py"), "import requests\nimport json\n").unwrap();
        std::fs::write(dir.path().join("scripts/lib/client.py"), "from httpx import Client\n").unwrap();
        std::fs::write(dir.path().join("requirements.txt"), "# pinned\nrequests>=2.31.0\n").unwrap();

        let package = Package::load(dir.path(), &ExcludeSet::default()).unwrap();
        let diagnostics = check_dependencies(&package);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, "spec.unlisted-dependency");
        assert_eq!(diagnostics[0].severity, Severity::Warning);
        assert!(diagnostics[0].message.contains("'httpx'"));

        std::fs::write(dir.path().join("requirements.txt"), "requests\nhttpx==0.27\n").unwrap();
        let package = Package::load(dir.path(), &ExcludeSet::default()).unwrap();
        assert!(check_dependencies(&package).is_empty());
    }
}
