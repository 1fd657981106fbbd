//! Skill packs: folders with a SKILL.md entry file and an optional
//! skill.spec.json.
//!
//! SKILL.md carries a YAML frontmatter header declaring the skill's name,
//! description and tool restrictions.

pub mod index;
pub mod package;
pub mod parser;
pub mod spec;

pub use index::{PackageEntry, PackageIndex, DEFAULT_SKILLS_DIR};
pub use package::{EntryKind, ExcludeSet, Package};
pub use parser::{parse_header, FatalParseError, Header, HeaderParse, ParseMode};
pub use spec::{load_spec, Archetype, RiskLevel, Spec, SpecLoad, TriggerPhrase, SPEC_FILE};
