//! On-disk view of a skill package.

use super::parser::SKILL_FILE;
use crate::error::{Result, SkillcheckError};
use std::path::{Component as PathComponent, Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Kind of a tree entry. Symlinks are never followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
}

#[derive(Debug, Clone)]
pub struct TreeEntry {
    /// Path relative to the package root
    pub path: PathBuf,
    pub kind: EntryKind,
}

/// Package-relative glob patterns skipped during tree walks
#[derive(Debug, Clone, Default)]
pub struct ExcludeSet {
    patterns: Vec<glob::Pattern>,
}

impl ExcludeSet {
    /// Invalid patterns are skipped with a warning
    pub fn new(globs: &[String]) -> Self {
        let patterns = globs
            .iter()
            .filter_map(|g| match glob::Pattern::new(g) {
                Ok(p) => Some(p),
                Err(e) => {
                    tracing::warn!(pattern = %g, error = %e, "Ignoring invalid exclude pattern");
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn is_excluded(&self, rel: &Path) -> bool {
        let text = rel.to_string_lossy().replace('\\', "/");
        self.patterns.iter().any(|p| {
            p.matches(&text)
                // "dir/**" should also drop "dir" itself
                || p.matches(&format!("{}/", text))
                || p.matches(&format!("{}/x", text))
        })
    }
}

/// A loaded package. Created per run and never mutated.
#[derive(Debug)]
pub struct Package {
    root: PathBuf,
    dir_name: String,
    entries: Vec<TreeEntry>,
    unreadable: Vec<(PathBuf, String)>,
    document: Option<std::result::Result<String, String>>,
}

impl Package {
    /// Walk the package tree and read SKILL.md.
    ///
    /// Fails only when `path` is not a readable directory.
    pub fn load(path: &Path, excludes: &ExcludeSet) -> Result<Self> {
        if !path.exists() {
            return Err(SkillcheckError::NotFound {
                path: path.to_path_buf(),
            });
        }
        if !path.is_dir() {
            return Err(SkillcheckError::NotADirectory {
                path: path.to_path_buf(),
            });
        }
        std::fs::read_dir(path).map_err(|source| SkillcheckError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let canonical = path
            .canonicalize()
            .map_err(|source| SkillcheckError::Unreadable {
                path: path.to_path_buf(),
                source,
            })?;
        let dir_name = canonical
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut entries = Vec::new();
        let mut unreadable = Vec::new();
        let walker = WalkDir::new(&canonical)
            .follow_links(false)
            .sort_by_file_name()
            .min_depth(1)
            .into_iter()
            .filter_entry(|e| match e.path().strip_prefix(&canonical) {
                Ok(rel) => !excludes.is_excluded(rel),
                Err(_) => true,
            });

        for item in walker {
            let entry = match item {
                Ok(entry) => entry,
                Err(e) => {
                    let rel = e
                        .path()
                        .and_then(|p| p.strip_prefix(&canonical).ok())
                        .map(Path::to_path_buf)
                        .unwrap_or_default();
                    unreadable.push((rel, e.to_string()));
                    continue;
                }
            };
            let Ok(rel) = entry.path().strip_prefix(&canonical) else {
                continue;
            };
            let file_type = entry.file_type();
            let kind = if file_type.is_symlink() {
                EntryKind::Symlink
            } else if file_type.is_dir() {
                EntryKind::Dir
            } else {
                EntryKind::File
            };
            entries.push(TreeEntry {
                path: rel.to_path_buf(),
                kind,
            });
        }

        let skill_path = canonical.join(SKILL_FILE);
        let document = if skill_path.is_file() {
            Some(std::fs::read_to_string(&skill_path).map_err(|e| e.to_string()))
        } else {
            None
        };

        debug!(
            path = %path.display(),
            entries = entries.len(),
            unreadable = unreadable.len(),
            "Loaded package"
        );

        Ok(Self {
            root: canonical,
            dir_name,
            entries,
            unreadable,
            document,
        })
    }

    /// Canonical package root
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir_name(&self) -> &str {
        &self.dir_name
    }

    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.entries_of(EntryKind::File)
    }

    pub fn symlinks(&self) -> impl Iterator<Item = &Path> {
        self.entries_of(EntryKind::Symlink)
    }

    fn entries_of(&self, kind: EntryKind) -> impl Iterator<Item = &Path> {
        self.entries
            .iter()
            .filter(move |e| e.kind == kind)
            .map(|e| e.path.as_path())
    }

    /// Tree entries the walk could not read
    pub fn unreadable(&self) -> &[(PathBuf, String)] {
        &self.unreadable
    }

    /// SKILL.md text: `None` when absent, `Some(Err)` when unreadable
    pub fn document(&self) -> Option<std::result::Result<&str, &str>> {
        self.document
            .as_ref()
            .map(|d| d.as_deref().map_err(String::as_str))
    }

    pub fn absolute(&self, rel: &Path) -> PathBuf {
        self.root.join(rel)
    }

    /// Whether a resolved package-relative path exists on disk
    pub fn contains(&self, rel: &Path) -> bool {
        self.root.join(rel).symlink_metadata().is_ok()
    }

    /// Whether an absolute path resolves inside the package
    pub fn is_inside(&self, path: &Path) -> bool {
        match path.canonicalize() {
            Ok(resolved) => resolved.starts_with(&self.root),
            Err(_) => false,
        }
    }
}

/// Lexically resolve `target` against the package-relative directory `base`.
///
/// Returns `None` when the result would climb above the package root or
/// `target` is absolute.
pub fn resolve_relative(base: &Path, target: &str) -> Option<PathBuf> {
    let mut parts: Vec<PathBuf> = Vec::new();
    let joined = base.join(target);
    for component in joined.components() {
        match component {
            PathComponent::Normal(part) => parts.push(PathBuf::from(part)),
            PathComponent::CurDir => {}
            PathComponent::ParentDir => {
                parts.pop()?;
            }
            PathComponent::RootDir | PathComponent::Prefix(_) => return None,
        }
    }
    Some(parts.iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn default_excludes() -> ExcludeSet {
        ExcludeSet::new(&crate::config::Config::with_defaults().scan.exclude)
    }

    #[test]
    fn test_load_lists_sorted_tree() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("demo-skill");
        fs::create_dir_all(root.join("scripts")).unwrap();
        fs::write(root.join("SKILL.md"), "---\nname: demo-skill\n---\n").unwrap();
        fs::write(root.join("scripts/run.sh"), "echo hi\n").unwrap();
        fs::write(root.join("README.md"), "readme\n").unwrap();

        let package = Package::load(&root, &default_excludes()).unwrap();
        assert_eq!(package.dir_name(), "demo-skill");
        let files: Vec<_> = package.files().map(Path::to_path_buf).collect();
        assert_eq!(
            files,
            vec![
                PathBuf::from("README.md"),
                PathBuf::from("SKILL.md"),
                PathBuf::from("scripts/run.sh"),
            ]
        );
        assert!(matches!(package.document(), Some(Ok(text)) if text.contains("demo-skill")));
    }

    #[test]
    fn test_load_usage_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            Package::load(&missing, &default_excludes()),
            Err(SkillcheckError::NotFound { .. })
        ));

        let file = dir.path().join("file.txt");
        fs::write(&file, "x").unwrap();
        assert!(matches!(
            Package::load(&file, &default_excludes()),
            Err(SkillcheckError::NotADirectory { .. })
        ));
    }

    #[test]
    fn test_excluded_directories_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("__pycache__")).unwrap();
        fs::write(dir.path().join("__pycache__/mod.pyc"), "x").unwrap();
        fs::create_dir_all(dir.path().join("lib/node_modules/pkg")).unwrap();
        fs::write(dir.path().join("lib/node_modules/pkg/index.js"), "x").unwrap();
        fs::write(dir.path().join("lib/keep.js"), "x").unwrap();

        let package = Package::load(dir.path(), &default_excludes()).unwrap();
        let files: Vec<_> = package.files().map(Path::to_path_buf).collect();
        assert_eq!(files, vec![PathBuf::from("lib/keep.js")]);
        assert!(package.document().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_not_followed() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("real")).unwrap();
        fs::write(dir.path().join("real/a.txt"), "x").unwrap();
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("link")).unwrap();

        let package = Package::load(dir.path(), &default_excludes()).unwrap();
        let links: Vec<_> = package.symlinks().map(Path::to_path_buf).collect();
        assert_eq!(links, vec![PathBuf::from("link")]);
        assert_eq!(package.files().count(), 1);
    }

    #[test]
    fn test_resolve_relative() {
        assert_eq!(
            resolve_relative(Path::new("docs"), "../scripts/run.sh"),
            Some(PathBuf::from("scripts/run.sh"))
        );
        assert_eq!(
            resolve_relative(Path::new(""), "./a/./b.md"),
            Some(PathBuf::from("a/b.md"))
        );
        assert_eq!(resolve_relative(Path::new(""), "../outside.md"), None);
        assert_eq!(resolve_relative(Path::new("docs"), "/etc/passwd"), None);
    }

    #[test]
    fn test_exclude_set_matches_directory_itself() {
        let excludes = ExcludeSet::new(&[".git/**".to_string()]);
        assert!(excludes.is_excluded(Path::new(".git")));
        assert!(excludes.is_excluded(Path::new(".git/HEAD")));
        assert!(!excludes.is_excluded(Path::new("src/git.rs")));
    }
}
