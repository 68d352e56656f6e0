//! Entity catalog: maps domain vocabulary onto the fixed repository-history schema.
//!
//! A catalog is built once (the built-in schema, or a YAML description of the
//! same shape) and only read afterwards. Entities are scanned in declaration
//! order, so when two entities share a synonym the earlier one wins.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CompileError, Result};
use crate::normalize::Normalized;

/// Column sets of one entity, partitioned by what the question asks for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnGroups {
    pub default: Vec<String>,
    pub stats: Vec<String>,
    pub detail: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnGroup {
    Default,
    Stats,
    Detail,
}

impl ColumnGroups {
    pub fn group(&self, group: ColumnGroup) -> &[String] {
        match group {
            ColumnGroup::Default => &self.default,
            ColumnGroup::Stats => &self.stats,
            ColumnGroup::Detail => &self.detail,
        }
    }

    /// Every column once, in default → stats → detail order.
    pub fn all(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.default
            .iter()
            .chain(&self.stats)
            .chain(&self.detail)
            .map(String::as_str)
            .filter(|c| seen.insert(*c))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityDescriptor {
    pub name: String,
    pub synonyms: Vec<String>,
    pub table: String,
    #[serde(default)]
    pub columns: ColumnGroups,
    /// Column that time-window filters apply to (`created_at` when absent).
    #[serde(default)]
    pub time_column: Option<String>,
}

impl EntityDescriptor {
    fn matches(&self, input: &Normalized) -> bool {
        self.synonyms.iter().any(|syn| input.mentions(syn))
    }
}

/// Projection chosen for the generic path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Columns {
    /// `*`
    Wildcard,
    /// `COUNT(*)`
    CountAll,
    Named(Vec<String>),
}

const AGGREGATE_CUES: &[&str] = &["count", "how many", "total"];
const STATS_CUES: &[&str] = &["stats", "statistics"];
const DETAIL_CUES: &[&str] = &["details", "detailed"];

/// Hand-picked projection per known table when the question names no columns.
fn fallback_columns(table: &str) -> Option<&'static [&'static str]> {
    match table {
        "repositories" => Some(&["repo_id", "name", "stars", "forks"]),
        "authors" => Some(&["author_id", "name", "email"]),
        "commits" => Some(&["commit_id", "hash", "timestamp"]),
        "files" => Some(&["file_id", "path", "type", "status"]),
        "diffs" => Some(&["diff_id", "lines_added", "lines_deleted"]),
        "bugs" => Some(&["bug_id", "description"]),
        "tests" => Some(&["test_id", "status", "runtime"]),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    entities: Vec<EntityDescriptor>,
}

#[derive(Debug, Clone)]
pub struct EntityCatalog {
    entities: Vec<EntityDescriptor>,
}

impl Default for EntityCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl EntityCatalog {
    /// The repository-history schema populated by the git extractor.
    pub fn builtin() -> Self {
        Self {
            entities: vec![
                entity(
                    "repository",
                    &["repository", "repositories", "repo", "repos", "project", "projects"],
                    "repositories",
                    (&["repo_id", "name", "url"], &["stars", "forks"], &["created_at"]),
                    None,
                ),
                entity(
                    "author",
                    &["author", "authors", "contributor", "contributors", "developer", "developers"],
                    "authors",
                    (&["author_id", "name", "email"], &[], &[]),
                    None,
                ),
                entity(
                    "commit",
                    &["commit", "commits", "change", "changes"],
                    "commits",
                    (
                        &["commit_id", "hash", "message"],
                        &[],
                        &["author_id", "repo_id", "timestamp"],
                    ),
                    Some("timestamp"),
                ),
                entity(
                    "file",
                    &["file", "files", "document", "documents", "code"],
                    "files",
                    (&["file_id", "path"], &[], &["repo_id", "type", "status"]),
                    None,
                ),
                entity(
                    "diff",
                    &["diff", "diffs", "difference", "differences", "modification", "modifications"],
                    "diffs",
                    (
                        &["diff_id", "commit_id", "file_id"],
                        &["lines_added", "lines_deleted"],
                        &["change_type"],
                    ),
                    None,
                ),
                entity(
                    "bug",
                    &["bug", "bugs", "issue", "issues"],
                    "bugs",
                    (
                        &["bug_id", "description"],
                        &[],
                        &["introduced_commit", "fixed_commit"],
                    ),
                    None,
                ),
                entity(
                    "test",
                    &["test", "tests"],
                    "tests",
                    (&["test_id", "status"], &["runtime"], &["commit_id", "error_log"]),
                    None,
                ),
            ],
        }
    }

    /// Build a catalog from explicit descriptors, in resolution order.
    pub fn new(entities: Vec<EntityDescriptor>) -> Result<Self> {
        let mut names = HashSet::new();
        let mut owners: HashMap<&str, &str> = HashMap::new();
        for e in &entities {
            if !names.insert(e.name.as_str()) {
                return Err(CompileError::Catalog(format!("duplicate entity {}", e.name)));
            }
            if e.table.trim().is_empty() {
                return Err(CompileError::Catalog(format!("entity {} has no table", e.name)));
            }
            for syn in &e.synonyms {
                if let Some(owner) = owners.get(syn.as_str()) {
                    tracing::warn!(
                        synonym = %syn,
                        winner = %owner,
                        shadowed = %e.name,
                        "synonym declared by more than one entity"
                    );
                } else {
                    owners.insert(syn.as_str(), e.name.as_str());
                }
            }
        }
        Ok(Self { entities })
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let file: CatalogFile = serde_yaml::from_str(yaml)?;
        Self::new(file.entities)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn entities(&self) -> &[EntityDescriptor] {
        &self.entities
    }

    pub fn get(&self, name: &str) -> Option<&EntityDescriptor> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// First entity, in declaration order, whose synonyms appear in the input.
    pub fn resolve_entity(&self, input: &Normalized) -> Option<&EntityDescriptor> {
        self.entities.iter().find(|e| e.matches(input))
    }

    /// Pick the projection for `entity` given the question.
    ///
    /// Aggregate cues win, then columns named explicitly, then a requested
    /// column group, then the table's fallback list, and finally `*`.
    pub fn columns_for(&self, entity: &EntityDescriptor, input: &Normalized) -> Columns {
        if AGGREGATE_CUES.iter().any(|cue| input.mentions(cue)) {
            return Columns::CountAll;
        }

        let projection = projection_tokens(&input.tokens);
        let named: Vec<String> = entity
            .columns
            .all()
            .into_iter()
            .filter(|col| projection.contains(base_name(col)))
            .map(str::to_string)
            .collect();
        if !named.is_empty() {
            return Columns::Named(named);
        }

        let requested = if STATS_CUES.iter().any(|cue| input.contains_token(cue)) {
            Some(ColumnGroup::Stats)
        } else if DETAIL_CUES.iter().any(|cue| input.contains_token(cue)) {
            Some(ColumnGroup::Detail)
        } else {
            None
        };
        if let Some(group) = requested {
            let cols = entity.columns.group(group);
            if !cols.is_empty() {
                return Columns::Named(cols.to_vec());
            }
        }

        match fallback_columns(&entity.table) {
            Some(cols) => Columns::Named(cols.iter().map(|c| c.to_string()).collect()),
            None => Columns::Wildcard,
        }
    }
}

fn entity(
    name: &str,
    synonyms: &[&str],
    table: &str,
    (default, stats, detail): (&[&str], &[&str], &[&str]),
    time_column: Option<&str>,
) -> EntityDescriptor {
    let owned = |cols: &[&str]| cols.iter().map(|c| c.to_string()).collect::<Vec<_>>();
    EntityDescriptor {
        name: name.to_string(),
        synonyms: owned(synonyms),
        table: table.to_string(),
        columns: ColumnGroups {
            default: owned(default),
            stats: owned(stats),
            detail: owned(detail),
        },
        time_column: time_column.map(str::to_string),
    }
}

/// `repo_id` → `id`, `lines_added` → `added`.
fn base_name(column: &str) -> &str {
    column.rsplit('_').next().unwrap_or(column)
}

/// Tokens that can name a column: a word right after a number ("1000 stars")
/// is a quantity, not a projection.
fn projection_tokens(tokens: &[String]) -> HashSet<&str> {
    tokens
        .iter()
        .enumerate()
        .filter(|(i, _)| *i == 0 || !tokens[i - 1].chars().all(|c| c.is_ascii_digit()))
        .map(|(_, t)| t.as_str())
        .collect()
}
