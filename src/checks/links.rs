//! Relative link integrity for Markdown files.

use crate::diagnostics::{Component, Diagnostic, Location};
use crate::skillpacks::package::resolve_relative;
use crate::skillpacks::Package;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::debug;

const ALLOWED_SCHEMES: &[&str] = &["http", "https", "mailto"];
const BASE_DIR: &str = "{baseDir}";

static LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\[[^\]]*\]\(\s*(<[^>]*>|[^)\s]+)(?:\s+"[^"]*")?\s*\)"#).unwrap());
static INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`[^`]*`").unwrap());
static SCHEME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9+.-]*):").unwrap());

/// A link target found in a Markdown file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRef {
    pub line: usize,
    pub target: String,
}

/// Links outside fenced code blocks and inline code spans
pub fn extract_links(text: &str) -> Vec<LinkRef> {
    let mut links = Vec::new();
    let mut fence: Option<&str> = None;
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim_start();
        if let Some(marker) = fence {
            if trimmed.starts_with(marker) {
                fence = None;
            }
            continue;
        }
        if trimmed.starts_with("```") {
            fence = Some("```");
            continue;
        }
        if trimmed.starts_with("~~~") {
            fence = Some("~~~");
            continue;
        }
        let visible = INLINE_CODE.replace_all(line, "");
        for cap in LINK.captures_iter(&visible) {
            let target = cap[1].trim_start_matches('<').trim_end_matches('>');
            links.push(LinkRef {
                line: idx + 1,
                target: target.to_string(),
            });
        }
    }
    links
}

/// Check every Markdown link in the package
pub fn check_links(package: &Package) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let markdown = package.files().filter(|p| {
        p.extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("md"))
    });
    for file in markdown {
        let text = match std::fs::read_to_string(package.absolute(file)) {
            Ok(text) => text,
            Err(e) => {
                diagnostics.push(
                    Diagnostic::warning(
                        Component::Structure,
                        "structure.unreadable-file",
                        format!("Cannot read Markdown file: {}", e),
                    )
                    .at(Location::file(file)),
                );
                continue;
            }
        };
        let links = extract_links(&text);
        debug!(file = %file.display(), links = links.len(), "Checking links");
        for link in links {
            if let Some(diagnostic) = check_link(package, file, &link) {
                diagnostics.push(diagnostic);
            }
        }
    }
    diagnostics
}

fn check_link(package: &Package, file: &Path, link: &LinkRef) -> Option<Diagnostic> {
    let target = link.target.as_str();
    if target.is_empty() || target.starts_with('#') {
        return None;
    }
    let location = Location::line(file, link.line);
    let error = |code: &'static str, message: String| {
        Some(Diagnostic::error(Component::Structure, code, message).at(location.clone()))
    };

    let (base, rest) = match target.strip_prefix(BASE_DIR) {
        Some(rest) => (Path::new(""), rest.trim_start_matches('/')),
        None => {
            if let Some(cap) = SCHEME.captures(target) {
                let scheme = cap[1].to_lowercase();
                if ALLOWED_SCHEMES.contains(&scheme.as_str()) {
                    return None;
                }
                return error(
                    "link.disallowed-scheme",
                    format!("Link '{}' uses disallowed scheme '{}'", target, scheme),
                );
            }
            (file.parent().unwrap_or(Path::new("")), target)
        }
    };

    let path = rest.split(['#', '?']).next().unwrap_or_default();
    if path.is_empty() {
        return None;
    }
    match resolve_relative(base, path) {
        None => error(
            "link.outside-package",
            format!("Link '{}' points outside the package", target),
        ),
        Some(rel) if !package.contains(&rel) => error(
            "link.broken",
            format!("Link '{}' points to missing file {}", target, rel.display()),
        ),
        Some(_) => None,
    }
}
