//! Hand-authored query shapes for the questions the product must answer reliably.
//!
//! Templates are tried in [`SpecialCase::ALL`] order against the lowercased
//! question; the first trigger that fires wins and no generic matching runs.
//! Every template scopes to one repository when a `repo_id` is supplied and
//! runs across all repositories otherwise.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

use crate::config::TemplateConfig;
use crate::error::Result;
use crate::matchers::{compiled, parse_count, LazyPattern};
use crate::sql_ast::{
    Aggregation, Function, Join, OrderItem, SelectItem, SelectQuery, SqlBinaryOperator, SqlExpr,
    SortDirection, TableRef,
};

static TOP_N: LazyPattern = Lazy::new(|| Regex::new(r"\btop\s+(\d+)\b"));
static BOTTOM_N: LazyPattern = Lazy::new(|| Regex::new(r"\bbottom\s+(\d+)\b"));

const PEOPLE: &[&str] = &["author", "contributor", "developer"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialCase {
    BugsIntroducedByAuthor,
    MostChangedFile,
    MostAddedFile,
    MostDeletedFile,
    TopFiles,
    TopContributor,
    TopContributors,
    BottomContributors,
    RecentCommits,
    MostActiveRecentDeveloper,
    CommitsPerRepository,
    CommitCount,
    ContributorCount,
    CommitWithMostChanges,
    TopBugFixer,
    RepositoryWithMostChanges,
}

/// Values a trigger pulled out of the question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TemplateParams {
    pub limit: Option<u64>,
    pub window_days: u32,
}

impl SpecialCase {
    /// Evaluation order; earlier entries shadow later ones.
    pub const ALL: [SpecialCase; 16] = [
        SpecialCase::BugsIntroducedByAuthor,
        SpecialCase::MostChangedFile,
        SpecialCase::MostAddedFile,
        SpecialCase::MostDeletedFile,
        SpecialCase::TopFiles,
        SpecialCase::TopContributor,
        SpecialCase::TopContributors,
        SpecialCase::BottomContributors,
        SpecialCase::RecentCommits,
        SpecialCase::MostActiveRecentDeveloper,
        SpecialCase::CommitsPerRepository,
        SpecialCase::CommitCount,
        SpecialCase::ContributorCount,
        SpecialCase::CommitWithMostChanges,
        SpecialCase::TopBugFixer,
        SpecialCase::RepositoryWithMostChanges,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SpecialCase::BugsIntroducedByAuthor => "bugs_introduced_by_author",
            SpecialCase::MostChangedFile => "most_changed_file",
            SpecialCase::MostAddedFile => "most_added_file",
            SpecialCase::MostDeletedFile => "most_deleted_file",
            SpecialCase::TopFiles => "top_files",
            SpecialCase::TopContributor => "top_contributor",
            SpecialCase::TopContributors => "top_contributors",
            SpecialCase::BottomContributors => "bottom_contributors",
            SpecialCase::RecentCommits => "recent_commits",
            SpecialCase::MostActiveRecentDeveloper => "most_active_recent_developer",
            SpecialCase::CommitsPerRepository => "commits_per_repository",
            SpecialCase::CommitCount => "commit_count",
            SpecialCase::ContributorCount => "contributor_count",
            SpecialCase::CommitWithMostChanges => "commit_with_most_changes",
            SpecialCase::TopBugFixer => "top_bug_fixer",
            SpecialCase::RepositoryWithMostChanges => "repository_with_most_changes",
        }
    }

    /// Check the trigger against lowercased text.
    pub fn trigger(self, text: &str, settings: &TemplateConfig) -> Option<TemplateParams> {
        let has = |needle: &str| text.contains(needle);
        let any = |needles: &[&str]| contains_any(text, needles);
        let counting =
            has("how many") || text.split(|c: char| !c.is_alphanumeric()).any(|w| w == "count");
        let fire = |matched: bool, limit: Option<u64>| {
            matched.then_some(TemplateParams {
                limit,
                window_days: settings.recent_window_days,
            })
        };
        let recent = format!("last {} days", settings.recent_window_days);

        match self {
            SpecialCase::BugsIntroducedByAuthor => fire(
                any(PEOPLE) && has("introduc") && has("bug"),
                Some(1),
            ),
            SpecialCase::MostChangedFile => fire(
                has("most") && has("file") && any(&["change", "lines"]),
                Some(1),
            ),
            SpecialCase::MostAddedFile => fire(
                has("most") && has("file") && any(&["addition", "added"]),
                Some(1),
            ),
            SpecialCase::MostDeletedFile => fire(
                has("most") && has("file") && any(&["deletion", "deleted"]),
                Some(1),
            ),
            SpecialCase::TopFiles => {
                let n = leading_count(&TOP_N, "top", text)?;
                fire(has("file"), Some(n))
            }
            SpecialCase::TopContributor => fire(
                has("which developer contributed the most")
                    || (has("most") && any(PEOPLE) && any(&["commit", "contributed"])),
                Some(1),
            ),
            SpecialCase::TopContributors => {
                if !has("contributor") {
                    return None;
                }
                match leading_count(&TOP_N, "top", text) {
                    Some(n) => fire(true, Some(n)),
                    None => fire(
                        has("top contributors"),
                        Some(settings.top_contributors_limit),
                    ),
                }
            }
            SpecialCase::BottomContributors => {
                if !(has("bottom") && any(PEOPLE)) {
                    return None;
                }
                let n = leading_count(&BOTTOM_N, "bottom", text)
                    .unwrap_or(settings.bottom_contributors_limit);
                fire(true, Some(n))
            }
            SpecialCase::RecentCommits => {
                fire(has(format!("commits from {recent}").as_str()), None)
            }
            SpecialCase::MostActiveRecentDeveloper => fire(
                has(recent.as_str()) && any(PEOPLE) && any(&["most", "top"]),
                Some(1),
            ),
            SpecialCase::CommitsPerRepository => fire(has("commits per repo"), None),
            SpecialCase::CommitCount => fire(counting && has("commit"), None),
            SpecialCase::ContributorCount => {
                fire(counting && any(PEOPLE), None)
            }
            SpecialCase::CommitWithMostChanges => fire(
                has("which commit") && has("most") && has("change"),
                Some(1),
            ),
            SpecialCase::TopBugFixer => fire(any(PEOPLE) && has("fix") && has("bug"), Some(1)),
            SpecialCase::RepositoryWithMostChanges => fire(
                has("repository") && has("most") && has("change"),
                Some(1),
            ),
        }
    }

    /// Build the query shape, scoped to `repo_id` when given.
    pub fn build(self, params: &TemplateParams, repo_id: Option<i64>) -> SelectQuery {
        let scope = |table: &str, column: &str| -> Vec<SqlExpr> {
            repo_id
                .map(|id| SqlExpr::eq(SqlExpr::col(table, column), SqlExpr::Param(json!(id))))
                .into_iter()
                .collect()
        };
        let limit = params.limit;

        match self {
            SpecialCase::BugsIntroducedByAuthor => SelectQuery {
                select: vec![
                    SelectItem::new(SqlExpr::col("authors", "name")),
                    SelectItem::aliased(count("bugs", "bug_id"), "bugs_introduced"),
                ],
                from: TableRef::new("bugs"),
                joins: vec![
                    Join::inner("commits", ("bugs", "introduced_commit"), ("commits", "commit_id")),
                    Join::inner("authors", ("commits", "author_id"), ("authors", "author_id")),
                ],
                filters: scope("commits", "repo_id"),
                group_by: group_by_author(),
                order_by: vec![desc("bugs_introduced")],
                limit,
            },
            SpecialCase::MostChangedFile | SpecialCase::TopFiles => {
                let path = SqlExpr::col("files", "path");
                let path = if self == SpecialCase::MostChangedFile {
                    SelectItem::aliased(path, "most_changed_file")
                } else {
                    SelectItem::new(path)
                };
                file_volume(
                    vec![path, SelectItem::aliased(lines_changed(), "total_changes")],
                    "total_changes",
                    scope("commits", "repo_id"),
                    limit,
                )
            }
            SpecialCase::MostAddedFile => file_volume(
                vec![
                    SelectItem::aliased(SqlExpr::col("files", "path"), "most_added_file"),
                    SelectItem::aliased(sum("diffs", "lines_added"), "total_additions"),
                ],
                "total_additions",
                scope("commits", "repo_id"),
                limit,
            ),
            SpecialCase::MostDeletedFile => file_volume(
                vec![
                    SelectItem::aliased(SqlExpr::col("files", "path"), "most_deleted_file"),
                    SelectItem::aliased(sum("diffs", "lines_deleted"), "total_deletions"),
                ],
                "total_deletions",
                scope("commits", "repo_id"),
                limit,
            ),
            SpecialCase::TopContributor => commit_leaders(
                "top_contributor",
                Vec::new(),
                scope("commits", "repo_id"),
                SortDirection::Desc,
                limit,
            ),
            SpecialCase::TopContributors => SelectQuery {
                select: vec![
                    SelectItem::new(SqlExpr::col("authors", "name")),
                    SelectItem::aliased(count("commits", "commit_id"), "commit_count"),
                ],
                from: TableRef::new("authors"),
                joins: vec![Join::inner(
                    "commits",
                    ("authors", "author_id"),
                    ("commits", "author_id"),
                )],
                filters: scope("commits", "repo_id"),
                group_by: group_by_author(),
                order_by: vec![desc("commit_count")],
                limit,
            },
            SpecialCase::BottomContributors => commit_leaders(
                "name",
                Vec::new(),
                scope("commits", "repo_id"),
                SortDirection::Asc,
                limit,
            ),
            SpecialCase::RecentCommits => {
                let mut filters = vec![since_days_ago(params.window_days)];
                filters.extend(scope("commits", "repo_id"));
                SelectQuery {
                    select: vec![
                        SelectItem::new(SqlExpr::col("commits", "commit_id")),
                        SelectItem::new(SqlExpr::col("authors", "name")),
                        SelectItem::aliased(SqlExpr::col("repositories", "name"), "repo_name"),
                        SelectItem::new(SqlExpr::col("commits", "message")),
                        SelectItem::new(SqlExpr::col("commits", "timestamp")),
                    ],
                    from: TableRef::new("commits"),
                    joins: vec![
                        Join::inner("authors", ("commits", "author_id"), ("authors", "author_id")),
                        Join::inner(
                            "repositories",
                            ("commits", "repo_id"),
                            ("repositories", "repo_id"),
                        ),
                    ],
                    filters,
                    group_by: Vec::new(),
                    order_by: vec![OrderItem {
                        expr: SqlExpr::col("commits", "timestamp"),
                        direction: SortDirection::Desc,
                    }],
                    limit,
                }
            }
            SpecialCase::MostActiveRecentDeveloper => commit_leaders(
                "top_contributor",
                vec![since_days_ago(params.window_days)],
                scope("commits", "repo_id"),
                SortDirection::Desc,
                limit,
            ),
            SpecialCase::CommitsPerRepository => SelectQuery {
                select: vec![
                    SelectItem::new(SqlExpr::col("repositories", "name")),
                    SelectItem::aliased(count("commits", "commit_id"), "commit_count"),
                ],
                from: TableRef::new("repositories"),
                joins: vec![Join::left(
                    "commits",
                    ("repositories", "repo_id"),
                    ("commits", "repo_id"),
                )],
                filters: scope("repositories", "repo_id"),
                group_by: group_by_repository(),
                order_by: vec![desc("commit_count")],
                limit,
            },
            SpecialCase::CommitCount => SelectQuery {
                select: vec![SelectItem::aliased(
                    SqlExpr::aggregate(Aggregation::Count, SqlExpr::Star),
                    "total_commits",
                )],
                from: TableRef::new("commits"),
                filters: repo_id
                    .map(|id| SqlExpr::eq(SqlExpr::bare("repo_id"), SqlExpr::Param(json!(id))))
                    .into_iter()
                    .collect(),
                limit,
                ..Default::default()
            },
            SpecialCase::ContributorCount => {
                // Scoped counts go through commits; global counts read authors directly.
                let (table, column) = if repo_id.is_some() {
                    ("commits", "author_id")
                } else {
                    ("authors", "author_id")
                };
                SelectQuery {
                    select: vec![SelectItem::aliased(
                        SqlExpr::aggregate(Aggregation::CountDistinct, SqlExpr::col(table, column)),
                        "contributors",
                    )],
                    from: TableRef::new(table),
                    filters: scope("commits", "repo_id"),
                    limit,
                    ..Default::default()
                }
            }
            SpecialCase::CommitWithMostChanges => SelectQuery {
                select: vec![
                    SelectItem::aliased(SqlExpr::col("commits", "hash"), "top_commit"),
                    SelectItem::aliased(lines_changed(), "total_changes"),
                ],
                from: TableRef::new("commits"),
                joins: vec![Join::inner(
                    "diffs",
                    ("commits", "commit_id"),
                    ("diffs", "commit_id"),
                )],
                filters: scope("commits", "repo_id"),
                group_by: vec![
                    SqlExpr::col("commits", "commit_id"),
                    SqlExpr::col("commits", "hash"),
                ],
                order_by: vec![desc("total_changes")],
                limit,
            },
            SpecialCase::TopBugFixer => SelectQuery {
                select: vec![
                    SelectItem::aliased(SqlExpr::col("authors", "name"), "top_fixer"),
                    SelectItem::aliased(count("bugs", "bug_id"), "bugs_fixed"),
                ],
                from: TableRef::new("bugs"),
                joins: vec![
                    Join::inner("commits", ("bugs", "fixed_commit"), ("commits", "commit_id")),
                    Join::inner("authors", ("commits", "author_id"), ("authors", "author_id")),
                ],
                filters: scope("commits", "repo_id"),
                group_by: group_by_author(),
                order_by: vec![desc("bugs_fixed")],
                limit,
            },
            SpecialCase::RepositoryWithMostChanges => SelectQuery {
                select: vec![
                    SelectItem::aliased(SqlExpr::col("repositories", "name"), "top_repository"),
                    SelectItem::aliased(lines_changed(), "total_changes"),
                ],
                from: TableRef::new("repositories"),
                joins: vec![
                    Join::inner(
                        "commits",
                        ("repositories", "repo_id"),
                        ("commits", "repo_id"),
                    ),
                    Join::inner("diffs", ("commits", "commit_id"), ("diffs", "commit_id")),
                ],
                filters: scope("repositories", "repo_id"),
                group_by: group_by_repository(),
                order_by: vec![desc("total_changes")],
                limit,
            },
        }
    }
}

impl fmt::Display for SpecialCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// First template, in evaluation order, whose trigger fires on `text`.
pub fn find_template(
    text: &str,
    settings: &TemplateConfig,
) -> Option<(SpecialCase, TemplateParams)> {
    SpecialCase::ALL
        .iter()
        .find_map(|case| case.trigger(text, settings).map(|params| (*case, params)))
}

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

/// `N` from `top N` / `bottom N`; a fault counts as no number.
fn leading_count(pattern: &LazyPattern, keyword: &str, text: &str) -> Option<u64> {
    match try_leading_count(pattern, keyword, text) {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!(keyword = %keyword, error = %e, "ignoring unusable count");
            None
        }
    }
}

fn try_leading_count(pattern: &LazyPattern, keyword: &str, text: &str) -> Result<Option<u64>> {
    let Some(caps) = compiled(pattern, keyword)?.captures(text) else {
        return Ok(None);
    };
    parse_count(&caps[1]).map(Some)
}

fn count(table: &str, column: &str) -> SqlExpr {
    SqlExpr::aggregate(Aggregation::Count, SqlExpr::col(table, column))
}

fn sum(table: &str, column: &str) -> SqlExpr {
    SqlExpr::aggregate(Aggregation::Sum, SqlExpr::col(table, column))
}

/// `SUM(diffs.lines_added + diffs.lines_deleted)`
fn lines_changed() -> SqlExpr {
    SqlExpr::aggregate(
        Aggregation::Sum,
        SqlExpr::binary(
            SqlBinaryOperator::Add,
            SqlExpr::col("diffs", "lines_added"),
            SqlExpr::col("diffs", "lines_deleted"),
        ),
    )
}

fn desc(alias: &str) -> OrderItem {
    OrderItem {
        expr: SqlExpr::bare(alias),
        direction: SortDirection::Desc,
    }
}

fn since_days_ago(days: u32) -> SqlExpr {
    SqlExpr::binary(
        SqlBinaryOperator::Gte,
        SqlExpr::col("commits", "timestamp"),
        SqlExpr::Function {
            func: Function::SubtractDays { days },
            args: vec![SqlExpr::Function {
                func: Function::CurrentDate,
                args: Vec::new(),
            }],
        },
    )
}

fn group_by_author() -> Vec<SqlExpr> {
    vec![
        SqlExpr::col("authors", "author_id"),
        SqlExpr::col("authors", "name"),
    ]
}

fn group_by_repository() -> Vec<SqlExpr> {
    vec![
        SqlExpr::col("repositories", "repo_id"),
        SqlExpr::col("repositories", "name"),
    ]
}

/// Per-file aggregate over diffs, ranked by `order_alias`.
fn file_volume(
    select: Vec<SelectItem>,
    order_alias: &str,
    filters: Vec<SqlExpr>,
    limit: Option<u64>,
) -> SelectQuery {
    SelectQuery {
        select,
        from: TableRef::new("files"),
        joins: vec![
            Join::inner("diffs", ("files", "file_id"), ("diffs", "file_id")),
            Join::inner("commits", ("diffs", "commit_id"), ("commits", "commit_id")),
        ],
        filters,
        group_by: vec![SqlExpr::col("files", "file_id"), SqlExpr::col("files", "path")],
        order_by: vec![desc(order_alias)],
        limit,
    }
}

/// Authors ranked by commit count, from `commits JOIN authors`.
fn commit_leaders(
    name_alias: &str,
    mut filters: Vec<SqlExpr>,
    scope: Vec<SqlExpr>,
    direction: SortDirection,
    limit: Option<u64>,
) -> SelectQuery {
    filters.extend(scope);
    SelectQuery {
        select: vec![
            SelectItem::aliased(SqlExpr::col("authors", "name"), name_alias),
            SelectItem::aliased(count("commits", "commit_id"), "commit_count"),
        ],
        from: TableRef::new("commits"),
        joins: vec![Join::inner(
            "authors",
            ("commits", "author_id"),
            ("authors", "author_id"),
        )],
        filters,
        group_by: group_by_author(),
        order_by: vec![OrderItem {
            expr: SqlExpr::bare("commit_count"),
            direction,
        }],
        limit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(text: &str) -> Option<(SpecialCase, TemplateParams)> {
        find_template(text, &TemplateConfig::default())
    }

    fn case(text: &str) -> Option<SpecialCase> {
        hit(text).map(|(case, _)| case)
    }

    #[test]
    fn triggers_in_order() {
        let cases = [
            ("which author introduced the most bugs", SpecialCase::BugsIntroducedByAuthor),
            ("what is the most changed file", SpecialCase::MostChangedFile),
            ("file with most lines added", SpecialCase::MostChangedFile),
            ("file with the most additions", SpecialCase::MostAddedFile),
            ("file with the most deletions", SpecialCase::MostDeletedFile),
            ("top 3 files", SpecialCase::TopFiles),
            ("which developer contributed the most", SpecialCase::TopContributor),
            ("author with the most commits", SpecialCase::TopContributor),
            ("top 5 contributors", SpecialCase::TopContributors),
            ("top contributors by commit", SpecialCase::TopContributors),
            ("bottom 2 developers", SpecialCase::BottomContributors),
            ("commits from last 30 days", SpecialCase::RecentCommits),
            ("most active developer in last 30 days", SpecialCase::MostActiveRecentDeveloper),
            ("count commits per repository", SpecialCase::CommitsPerRepository),
            ("how many commits", SpecialCase::CommitCount),
            ("how many contributors", SpecialCase::ContributorCount),
            ("which commit has the most changes", SpecialCase::CommitWithMostChanges),
            ("developer who fixed the most bugs", SpecialCase::TopBugFixer),
            ("repository with the most changes", SpecialCase::RepositoryWithMostChanges),
        ];
        for (text, expected) in cases {
            assert_eq!(case(text), Some(expected), "{text}");
        }
    }

    #[test]
    fn no_template_for_plain_questions() {
        assert_eq!(case("show repositories with more than 1000 stars"), None);
        assert_eq!(case("list all authors"), None);
        assert_eq!(case("top files"), None);
        assert_eq!(case("list authors by country"), None);
        assert_eq!(case("commits on the account page"), None);
    }

    #[test]
    fn limits_from_text_and_defaults() {
        assert_eq!(hit("top 7 files").unwrap().1.limit, Some(7));
        assert_eq!(hit("top contributors").unwrap().1.limit, Some(10));
        assert_eq!(hit("bottom contributors").unwrap().1.limit, Some(3));
        assert_eq!(hit("bottom 4 authors").unwrap().1.limit, Some(4));
        assert_eq!(hit("commits from last 30 days").unwrap().1.limit, None);
    }

    #[test]
    fn configured_defaults_apply() {
        let settings = TemplateConfig {
            top_contributors_limit: 25,
            bottom_contributors_limit: 1,
            recent_window_days: 7,
        };
        let (_, params) = find_template("top contributors", &settings).unwrap();
        assert_eq!(params.limit, Some(25));
        let (_, params) = find_template("bottom authors", &settings).unwrap();
        assert_eq!(params.limit, Some(1));
        let (case, params) = find_template("commits from last 7 days", &settings).unwrap();
        assert_eq!(case, SpecialCase::RecentCommits);
        assert_eq!(params.window_days, 7);
        assert_eq!(find_template("commits from last 30 days", &settings), None);
    }

    #[test]
    fn oversized_top_n_falls_back() {
        // Unparseable N: the files template needs a number and declines.
        assert_eq!(case("top 99999999999999999999999 files"), None);
        assert_eq!(
            hit("top 99999999999999999999999 contributors"),
            None,
            "no number and no 'top contributors' phrase"
        );
        assert_eq!(
            hit("the top contributors, top 99999999999999999999999")
                .unwrap()
                .1
                .limit,
            Some(10)
        );
    }

    #[test]
    fn scope_filter_follows_repo_id() {
        for case in SpecialCase::ALL {
            let params = TemplateParams {
                limit: Some(1),
                window_days: 30,
            };
            let global = case.build(&params, None);
            let scoped = case.build(&params, Some(7));
            assert_eq!(scoped.filters.len(), global.filters.len() + 1, "{case}");
        }
    }
}
