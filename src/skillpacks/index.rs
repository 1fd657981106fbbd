//! Skill package discovery for audits.

use super::parser::SKILL_FILE;
use std::path::{Path, PathBuf};

/// Default skills directory, relative to the project root
pub const DEFAULT_SKILLS_DIR: &str = ".claude/skills";

/// A package directory found under a skills directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageEntry {
    pub name: String,
    pub path: PathBuf,
    /// Whether SKILL.md exists; packages without one are still validated
    pub has_skill_file: bool,
}

/// Sorted index of the package directories under one skills directory
#[derive(Debug, Default)]
pub struct PackageIndex {
    packages: Vec<PackageEntry>,
}

impl PackageIndex {
    /// Index every immediate subdirectory of `dir`
    pub fn build(dir: &Path) -> std::io::Result<Self> {
        let mut index = PackageIndex::default();
        index.scan_dir(dir)?;
        index.packages.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(index)
    }

    fn scan_dir(&mut self, dir: &Path) -> std::io::Result<()> {
        for entry in std::fs::read_dir(dir)?.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            self.packages.push(PackageEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                has_skill_file: path.join(SKILL_FILE).is_file(),
                path,
            });
        }
        Ok(())
    }

    pub fn all(&self) -> impl Iterator<Item = &PackageEntry> {
        self.packages.iter()
    }

    pub fn count(&self) -> usize {
        self.packages.len()
    }
}
