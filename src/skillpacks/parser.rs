//! SKILL.md header parser.
//!
//! The header is the YAML frontmatter between the leading `---` line and the
//! next `---` line. It is parsed with `serde_yaml` first; when that fails the
//! lenient mode falls back to a line-oriented parser that understands the
//! small YAML subset skill headers use, while strict mode rejects the header.

use crate::diagnostics::{Component, Diagnostic, Location};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::{Mapping, Value};
use thiserror::Error;

pub const SKILL_FILE: &str = "SKILL.md";
pub const MAX_NAME_LEN: usize = 64;
pub const MAX_DESCRIPTION_LEN: usize = 1024;

/// Fields defined by the skill format, plus common extensions
pub const KNOWN_FIELDS: &[&str] = &[
    "name",
    "description",
    "license",
    "compatibility",
    "metadata",
    "allowed-tools",
    "model",
    "dependencies",
    "version",
];

static KEY_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z0-9_.-]+)\s*:(?:\s+(.*)|\s*)$").unwrap());

/// Header block missing or unterminated; nothing else can be checked
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FatalParseError {
    #[error("SKILL.md must start with YAML frontmatter delimited by --- lines")]
    MissingOpen,
    #[error("Missing closing --- for frontmatter")]
    MissingClose,
}

/// Parse mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Malformed lines are skipped with warnings
    #[default]
    Lenient,
    /// Malformed lines are errors and the header is rejected
    Strict,
}

impl ParseMode {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            Self::Strict
        } else {
            Self::Lenient
        }
    }
}

/// A raw header value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<FieldValue>),
    /// Keys keep their YAML type so that `{1: a}` can be told apart from `{"1": a}`
    Map(Vec<(FieldValue, FieldValue)>),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Type name used in messages
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "boolean",
            FieldValue::Integer(_) | FieldValue::Float(_) => "number",
            FieldValue::Text(_) => "string",
            FieldValue::List(_) => "list",
            FieldValue::Map(_) => "mapping",
        }
    }

    fn from_yaml(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(*b),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => FieldValue::Integer(i),
                (None, Some(f)) => FieldValue::Float(f),
                _ => FieldValue::Text(n.to_string()),
            },
            Value::String(s) => FieldValue::Text(s.clone()),
            Value::Sequence(items) => {
                FieldValue::List(items.iter().map(FieldValue::from_yaml).collect())
            }
            Value::Mapping(map) => FieldValue::Map(
                map.iter()
                    .map(|(k, v)| (FieldValue::from_yaml(k), FieldValue::from_yaml(v)))
                    .collect(),
            ),
            Value::Tagged(tagged) => FieldValue::from_yaml(&tagged.value),
        }
    }

    fn to_yaml(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Integer(i) => Value::Number((*i).into()),
            FieldValue::Float(f) => Value::Number((*f).into()),
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::List(items) => Value::Sequence(items.iter().map(|v| v.to_yaml()).collect()),
            FieldValue::Map(entries) => {
                let mut map = Mapping::new();
                for (k, v) in entries {
                    map.insert(k.to_yaml(), v.to_yaml());
                }
                Value::Mapping(map)
            }
        }
    }
}

/// One declared field and the SKILL.md line it starts on
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub key: String,
    pub value: FieldValue,
    pub line: usize,
}

/// Ordered header fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    fields: Vec<Field>,
}

impl Header {
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.field(key).map(|f| &f.value)
    }

    /// SKILL.md line of a field, for diagnostics
    pub fn line_of(&self, key: &str) -> Option<usize> {
        self.field(key).map(|f| f.line)
    }

    pub fn location_of(&self, key: &str) -> Location {
        match self.line_of(key) {
            Some(line) => Location::line(SKILL_FILE, line),
            None => Location::file(SKILL_FILE),
        }
    }

    /// Trimmed `name`, when it is a non-empty string
    pub fn name(&self) -> Option<&str> {
        non_empty_text(self.get("name"))
    }

    /// Trimmed `description`, when it is a non-empty string
    pub fn description(&self) -> Option<&str> {
        non_empty_text(self.get("description"))
    }

    /// Declared tool allowlist; `None` when `allowed-tools` is absent or empty
    pub fn allowed_tools(&self) -> Option<Vec<String>> {
        let tools = match self.get("allowed-tools")? {
            FieldValue::Text(s) => parse_tool_list(s),
            FieldValue::List(items) => items
                .iter()
                .filter_map(FieldValue::as_str)
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
            _ => return None,
        };
        (!tools.is_empty()).then_some(tools)
    }

    /// Serialize back into a `---` delimited block
    pub fn to_block(&self) -> Result<String, serde_yaml::Error> {
        let mut map = Mapping::new();
        for field in &self.fields {
            map.insert(Value::String(field.key.clone()), field.value.to_yaml());
        }
        let yaml = serde_yaml::to_string(&Value::Mapping(map))?;
        let yaml = yaml.strip_prefix("---\n").unwrap_or(&yaml);
        Ok(format!("---\n{}---\n", yaml))
    }
}

fn non_empty_text(value: Option<&FieldValue>) -> Option<&str> {
    value
        .and_then(FieldValue::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Split an `allowed-tools` string on commas and whitespace outside parentheses.
///
/// `Read, Bash(git diff:*) Grep` → `["Read", "Bash(git diff:*)", "Grep"]`
pub fn parse_tool_list(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    let raw = raw
        .strip_prefix('[')
        .and_then(|r| r.strip_suffix(']'))
        .unwrap_or(raw);
    let mut tools = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for c in raw.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => flush_tool(&mut current, &mut tools),
            c if c.is_whitespace() && depth == 0 => flush_tool(&mut current, &mut tools),
            c => current.push(c),
        }
    }
    flush_tool(&mut current, &mut tools);
    tools
}

fn flush_tool(current: &mut String, tools: &mut Vec<String>) {
    let tool = current.trim().trim_matches(|c| c == '"' || c == '\'');
    if !tool.is_empty() {
        tools.push(tool.to_string());
    }
    current.clear();
}

/// SKILL.md split into header block and body
#[derive(Debug, Clone, Copy)]
pub struct Document<'a> {
    /// Lines between the markers
    pub header: &'a str,
    /// 1-based line number of the first header line
    pub header_first_line: usize,
    pub body: &'a str,
}

impl Document<'_> {
    /// 1-based line number of the first body line
    pub fn body_first_line(&self) -> usize {
        self.header_first_line + self.header.lines().count() + 1
    }
}

/// Locate the header block. Pure function of the text.
pub fn split_document(text: &str) -> Result<Document<'_>, FatalParseError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text.split_inclusive('\n');
    let first = lines.next().ok_or(FatalParseError::MissingOpen)?;
    if first.trim_end() != "---" {
        return Err(FatalParseError::MissingOpen);
    }
    let header_start = first.len();
    let mut offset = header_start;
    for line in lines {
        if line.trim_end() == "---" {
            return Ok(Document {
                header: &text[header_start..offset],
                header_first_line: 2,
                body: &text[offset + line.len()..],
            });
        }
        offset += line.len();
    }
    Err(FatalParseError::MissingClose)
}

/// Outcome of a non-fatal header parse
#[derive(Debug, Clone)]
pub enum HeaderParse {
    Parsed {
        header: Header,
        diagnostics: Vec<Diagnostic>,
    },
    /// Strict mode only: the header was malformed and is not trusted
    Rejected { diagnostics: Vec<Diagnostic> },
}

impl HeaderParse {
    pub fn header(&self) -> Option<&Header> {
        match self {
            HeaderParse::Parsed { header, .. } => Some(header),
            HeaderParse::Rejected { .. } => None,
        }
    }

    pub fn into_parts(self) -> (Option<Header>, Vec<Diagnostic>) {
        match self {
            HeaderParse::Parsed {
                header,
                diagnostics,
            } => (Some(header), diagnostics),
            HeaderParse::Rejected { diagnostics } => (None, diagnostics),
        }
    }
}

/// Parse the header of a SKILL.md document
pub fn parse_header(text: &str, mode: ParseMode) -> Result<HeaderParse, FatalParseError> {
    let doc = split_document(text)?;
    let lines: Vec<&str> = doc.header.lines().collect();
    let first_line = doc.header_first_line;
    if doc.header.trim().is_empty() {
        return Ok(parsed(Header::default(), Vec::new()));
    }

    let yaml_failure = match serde_yaml::from_str::<Value>(doc.header) {
        Ok(Value::Null) => {
            return Ok(parsed(Header::default(), Vec::new()));
        }
        Ok(Value::Mapping(map)) => match fields_from_mapping(&map, &lines, first_line) {
            Ok(fields) => {
                let header = Header { fields };
                let diagnostics = unknown_field_notes(&header);
                return Ok(parsed(header, diagnostics));
            }
            Err(reason) => reason,
        },
        Ok(_) => "frontmatter must be a mapping".to_string(),
        Err(e) => e.to_string(),
    };

    let (fields, malformed) = parse_lenient(&lines, first_line);
    match mode {
        ParseMode::Lenient => {
            tracing::debug!(reason = %yaml_failure, "falling back to lenient header parser");
            let mut diagnostics = vec![Diagnostic::warning(
                Component::Header,
                "header.yaml-fallback",
                format!("YAML frontmatter parse error: {}. Falling back to lenient parser", yaml_failure),
            )
            .at(Location::file(SKILL_FILE))];
            diagnostics.extend(malformed.into_iter().map(|m| {
                Diagnostic::warning(Component::Header, "header.malformed-line", m.message())
                    .at(Location::line(SKILL_FILE, m.line))
            }));
            let header = Header { fields };
            diagnostics.extend(unknown_field_notes(&header));
            Ok(HeaderParse::Parsed {
                header,
                diagnostics,
            })
        }
        ParseMode::Strict => {
            let mut diagnostics = vec![Diagnostic::error(
                Component::Header,
                "header.invalid-yaml",
                format!("YAML frontmatter parse error: {}", yaml_failure),
            )
            .at(Location::file(SKILL_FILE))];
            diagnostics.extend(malformed.into_iter().map(|m| {
                Diagnostic::error(Component::Header, "header.malformed-line", m.message())
                    .at(Location::line(SKILL_FILE, m.line))
            }));
            Ok(HeaderParse::Rejected { diagnostics })
        }
    }
}

fn parsed(header: Header, diagnostics: Vec<Diagnostic>) -> HeaderParse {
    HeaderParse::Parsed {
        header,
        diagnostics,
    }
}

fn unknown_field_notes(header: &Header) -> Vec<Diagnostic> {
    header
        .fields
        .iter()
        .filter(|f| !KNOWN_FIELDS.contains(&f.key.as_str()))
        .map(|f| {
            Diagnostic::info(
                Component::Header,
                "header.unknown-field",
                format!("Unknown frontmatter key '{}' (treated as an extension)", f.key),
            )
            .at(Location::line(SKILL_FILE, f.line))
        })
        .collect()
}

fn fields_from_mapping(
    map: &Mapping,
    lines: &[&str],
    first_line: usize,
) -> Result<Vec<Field>, String> {
    map.iter()
        .map(|(k, v)| {
            let key = match k {
                Value::String(s) => s.clone(),
                _ => return Err("frontmatter keys must be strings".to_string()),
            };
            let line = top_level_line(lines, &key).map_or(first_line, |i| first_line + i);
            Ok(Field {
                value: FieldValue::from_yaml(v),
                key,
                line,
            })
        })
        .collect()
}

/// Index of the unindented line declaring `key`
fn top_level_line(lines: &[&str], key: &str) -> Option<usize> {
    lines.iter().position(|line| {
        let rest = line
            .strip_prefix(key)
            .or_else(|| line.strip_prefix(&format!("\"{}\"", key)))
            .or_else(|| line.strip_prefix(&format!("'{}'", key)));
        rest.is_some_and(|r| r.trim_start().starts_with(':'))
    })
}

/// A header line the lenient parser could not interpret
#[derive(Debug, Clone, PartialEq, Eq)]
struct Malformed {
    line: usize,
    reason: &'static str,
    text: String,
}

impl Malformed {
    fn new(line: usize, reason: &'static str, text: &str) -> Self {
        Self {
            line,
            reason,
            text: text.trim().to_string(),
        }
    }

    fn message(&self) -> String {
        format!("Skipped frontmatter line ({}): {}", self.reason, self.text)
    }
}

fn is_indented(line: &str) -> bool {
    line.starts_with(' ') || line.starts_with('\t')
}

fn is_blank_or_comment(line: &str) -> bool {
    let t = line.trim();
    t.is_empty() || t.starts_with('#')
}

/// Line-oriented fallback for the YAML subset used in skill headers
fn parse_lenient(lines: &[&str], first_line: usize) -> (Vec<Field>, Vec<Malformed>) {
    let mut fields: Vec<Field> = Vec::new();
    let mut malformed = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let line_no = first_line + i;
        if is_blank_or_comment(line) {
            i += 1;
            continue;
        }
        if is_indented(line) {
            malformed.push(Malformed::new(line_no, "indented line outside a block", line));
            i += 1;
            continue;
        }
        let Some(caps) = KEY_LINE.captures(line) else {
            malformed.push(Malformed::new(line_no, "expected `key: value`", line));
            i += 1;
            continue;
        };
        let key = caps[1].to_string();
        let value = caps.get(2).map_or("", |m| m.as_str()).trim();

        let mut end = i + 1;
        while end < lines.len() && (lines[end].trim().is_empty() || is_indented(lines[end])) {
            end += 1;
        }
        let nested = &lines[i + 1..end];

        let parsed = match value {
            "|" | "|-" | "|+" => FieldValue::Text(literal_block(nested)),
            ">" | ">-" | ">+" => FieldValue::Text(folded_block(nested)),
            "" => nested_value(nested, line_no + 1, &mut malformed),
            _ => {
                // Plain scalars may continue on indented lines; an indented
                // `key: value` is a stray nested field instead
                let mut joined = value.to_string();
                for (offset, extra) in nested.iter().enumerate() {
                    let extra = extra.trim();
                    if extra.is_empty() {
                        continue;
                    }
                    if KEY_LINE.is_match(extra) {
                        malformed.push(Malformed::new(
                            line_no + 1 + offset,
                            "indented line outside a block",
                            extra,
                        ));
                        continue;
                    }
                    joined.push(' ');
                    joined.push_str(extra);
                }
                parse_scalar(&joined)
            }
        };

        if fields.iter().any(|f| f.key == key) {
            malformed.push(Malformed::new(line_no, "duplicate key", line));
        } else {
            fields.push(Field {
                key,
                value: parsed,
                line: line_no,
            });
        }
        i = end;
    }

    (fields, malformed)
}

fn literal_block(lines: &[&str]) -> String {
    lines
        .iter()
        .map(|l| l.trim())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn folded_block(lines: &[&str]) -> String {
    lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Indented list or mapping under an empty `key:` line
fn nested_value(lines: &[&str], first_line: usize, malformed: &mut Vec<Malformed>) -> FieldValue {
    let items: Vec<(usize, &str)> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| !is_blank_or_comment(l))
        .map(|(i, l)| (first_line + i, l.trim()))
        .collect();

    let Some((_, first)) = items.first() else {
        return FieldValue::Text(String::new());
    };

    if first.starts_with('-') {
        let mut list = Vec::new();
        for (line_no, item) in items {
            match item.strip_prefix('-') {
                Some(rest) => list.push(parse_scalar(rest)),
                None => malformed.push(Malformed::new(line_no, "expected `- item`", item)),
            }
        }
        return FieldValue::List(list);
    }

    let mut map = Vec::new();
    for (line_no, item) in items {
        match KEY_LINE.captures(item) {
            Some(caps) => {
                let value = caps.get(2).map_or("", |m| m.as_str());
                map.push((FieldValue::Text(caps[1].to_string()), parse_scalar(value)));
            }
            None => malformed.push(Malformed::new(line_no, "expected `key: value`", item)),
        }
    }
    FieldValue::Map(map)
}

fn parse_scalar(raw: &str) -> FieldValue {
    let raw = raw.trim();
    if let Some(inner) = raw.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
        return FieldValue::List(
            split_flow(inner)
                .into_iter()
                .filter(|s| !s.is_empty())
                .map(parse_scalar)
                .collect(),
        );
    }
    for quote in ['"', '\''] {
        if raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote) {
            let inner = &raw[1..raw.len() - 1];
            let unescaped = if quote == '"' {
                inner.replace("\\\"", "\"")
            } else {
                inner.replace("''", "'")
            };
            return FieldValue::Text(unescaped);
        }
    }
    match raw {
        "" | "~" | "null" => return FieldValue::Null,
        "true" => return FieldValue::Bool(true),
        "false" => return FieldValue::Bool(false),
        _ => {}
    }
    if let Ok(i) = raw.parse::<i64>() {
        return FieldValue::Integer(i);
    }
    if raw.contains('.') && raw.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '-') {
        if let Ok(f) = raw.parse::<f64>() {
            return FieldValue::Float(f);
        }
    }
    FieldValue::Text(raw.to_string())
}

/// Split a flow sequence on commas outside parentheses and quotes
fn split_flow(inner: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        match (c, quote) {
            ('"' | '\'', None) => quote = Some(c),
            (q, Some(open)) if q == open => quote = None,
            ('(', None) => depth += 1,
            (')', None) => depth = depth.saturating_sub(1),
            (',', None) if depth == 0 => {
                items.push(inner[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push(inner[start..].trim());
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(content: &str, mode: ParseMode) -> (Header, Vec<Diagnostic>) {
        match parse_header(content, mode).unwrap() {
            HeaderParse::Parsed {
                header,
                diagnostics,
            } => (header, diagnostics),
            HeaderParse::Rejected { diagnostics } => panic!("rejected: {:?}", diagnostics),
        }
    }

    #[test]
    fn test_parse_frontmatter() {
        let content = r#"---
name: safe-file-reader
description: Read files without making changes
allowed-tools: Read, Grep, Glob
---

Only inspect files; do not modify.
"#;
        let (header, diagnostics) = parse_ok(content, ParseMode::Strict);
        assert!(diagnostics.is_empty());
        assert_eq!(header.name(), Some("safe-file-reader"));
        assert_eq!(header.description(), Some("Read files without making changes"));
        assert_eq!(
            header.allowed_tools().unwrap(),
            vec!["Read", "Grep", "Glob"]
        );
        assert_eq!(header.line_of("name"), Some(2));
        assert_eq!(header.line_of("allowed-tools"), Some(4));
    }

    #[test]
    fn test_parse_frontmatter_yaml_list() {
        let content = r#"---
name: test-skill
description: A test skill
allowed-tools:
  - Read
  - Write
---

Instructions here.
"#;
        let (header, _) = parse_ok(content, ParseMode::Lenient);
        assert_eq!(header.allowed_tools().unwrap(), vec!["Read", "Write"]);
    }

    #[test]
    fn test_tool_list_keeps_scoped_patterns() {
        assert_eq!(
            parse_tool_list("Read, Bash(git diff:*) Grep"),
            vec!["Read", "Bash(git diff:*)", "Grep"]
        );
        assert_eq!(parse_tool_list("[Read, Write]"), vec!["Read", "Write"]);
        assert!(parse_tool_list("  ").is_empty());
    }

    #[test]
    fn test_missing_open_marker_is_fatal() {
        let err = parse_header("# Title\nname: x\n", ParseMode::Lenient).unwrap_err();
        assert_eq!(err, FatalParseError::MissingOpen);
    }

    #[test]
    fn test_missing_close_marker_is_fatal() {
        let err = parse_header("---\nname: x\ndescription: y\n", ParseMode::Strict).unwrap_err();
        assert_eq!(err, FatalParseError::MissingClose);
    }

    #[test]
    fn test_lenient_fallback_on_invalid_yaml() {
        // Unquoted ": " inside a plain scalar is invalid YAML
        let content = "---\nname: demo\ndescription: Formats code: use when asked\n---\nbody\n";
        let (header, diagnostics) = parse_ok(content, ParseMode::Lenient);
        assert_eq!(header.description(), Some("Formats code: use when asked"));
        assert!(diagnostics.iter().any(|d| d.code == "header.yaml-fallback"));
        assert!(diagnostics.iter().all(|d| !d.is_error()));
    }

    #[test]
    fn test_strict_rejects_invalid_yaml() {
        let content = "---\nname: demo\ndescription: Formats code: use when asked\n---\n";
        match parse_header(content, ParseMode::Strict).unwrap() {
            HeaderParse::Rejected { diagnostics } => {
                assert!(diagnostics.iter().any(|d| d.code == "header.invalid-yaml"));
                assert!(diagnostics.iter().all(|d| d.is_error()));
            }
            HeaderParse::Parsed { .. } => panic!("strict mode must reject invalid YAML"),
        }
    }

    #[test]
    fn test_malformed_lines_skipped_with_warning() {
        let content = "---\nname: demo\n  orphan: value\nthis is not a field\ndescription: ok: yes\n---\n";
        let (header, diagnostics) = parse_ok(content, ParseMode::Lenient);
        assert_eq!(header.name(), Some("demo"));
        let lines: Vec<Option<usize>> = diagnostics
            .iter()
            .filter(|d| d.code == "header.malformed-line")
            .map(|d| d.location.as_ref().and_then(|l| l.line))
            .collect();
        assert_eq!(lines, vec![Some(3), Some(4)]);
        assert_eq!(header.description(), Some("ok: yes"));
    }

    #[test]
    fn test_strict_reports_malformed_lines_as_errors() {
        let content = "---\nname: demo\nnot a field\ndescription: ok: yes\n---\n";
        match parse_header(content, ParseMode::Strict).unwrap() {
            HeaderParse::Rejected { diagnostics } => {
                let lines: Vec<Option<usize>> = diagnostics
                    .iter()
                    .filter(|d| d.code == "header.malformed-line")
                    .map(|d| d.location.as_ref().and_then(|l| l.line))
                    .collect();
                assert_eq!(lines, vec![Some(3)]);
            }
            HeaderParse::Parsed { .. } => panic!("expected rejection"),
        }
    }

    #[test]
    fn test_lenient_parser_blocks_and_maps() {
        let lines = vec![
            "description: >",
            "  Folded text",
            "  continues here",
            "metadata:",
            "  author: someone",
            "  team: tools",
            "allowed-tools: [Read, \"Bash(ls, -la)\"]",
        ];
        let (fields, malformed) = parse_lenient(&lines, 2);
        assert!(malformed.is_empty());
        assert_eq!(
            fields[0].value,
            FieldValue::Text("Folded text continues here".to_string())
        );
        assert_eq!(
            fields[1].value,
            FieldValue::Map(vec![
                (
                    FieldValue::Text("author".to_string()),
                    FieldValue::Text("someone".to_string())
                ),
                (
                    FieldValue::Text("team".to_string()),
                    FieldValue::Text("tools".to_string())
                ),
            ])
        );
        assert_eq!(fields[1].line, 5);
        assert_eq!(
            fields[2].value,
            FieldValue::List(vec![
                FieldValue::Text("Read".to_string()),
                FieldValue::Text("Bash(ls, -la)".to_string()),
            ])
        );
    }

    #[test]
    fn test_unknown_fields_are_noted() {
        let content = "---\nname: demo\ndescription: d\nowner: me\n---\n";
        let (_, diagnostics) = parse_ok(content, ParseMode::Strict);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, "header.unknown-field");
    }

    #[test]
    fn test_round_trip_preserves_required_fields() {
        let samples = [
            "---\nname: commit-helper\ndescription: Generate commit messages. Use when writing commits.\n---\n",
            "---\nname: a1-b2\ndescription: \"Quoted: with colon\"\nversion: \"1.0\"\n---\nbody",
            "---\ndescription: >\n  Folded\n  text\nname: x\nmetadata:\n  k: v\n---\n",
        ];
        for sample in samples {
            let (header, _) = parse_ok(sample, ParseMode::Lenient);
            let block = header.to_block().unwrap();
            let (again, _) = parse_ok(&block, ParseMode::Strict);
            assert_eq!(again.name(), header.name());
            assert_eq!(again.description(), header.description());
        }
    }

    #[test]
    fn test_empty_header_parses() {
        let (header, diagnostics) = parse_ok("---\n---\nbody\n", ParseMode::Strict);
        assert!(header.fields().is_empty());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_split_document_body() {
        let doc = split_document("---\nname: x\n---\n# Body\n").unwrap();
        assert_eq!(doc.header, "name: x\n");
        assert_eq!(doc.body, "# Body\n");
    }
}
