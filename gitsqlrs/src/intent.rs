//! Compiled intent and the generic assembler.
//!
//! When no special-case template claims a question, the detected action,
//! entity, projection and filters are combined here into a best-effort
//! single-table query (with at most one join hop off `commits`).

use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::catalog::{Columns, EntityDescriptor};
use crate::config::GenericConfig;
use crate::error::{CompileError, Result};
use crate::matchers::DEFAULT_TIME_COLUMN;
use crate::sql_ast::{
    Aggregation, Join, OrderItem, SelectItem, SelectQuery, SqlBinaryOperator, SqlExpr,
    SortDirection, TableRef,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Select,
    Count,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gte,
    Lte,
    Between,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Scalar(Value),
    Range(Value, Value),
}

/// A `(column, operator, value)` condition derived from the question.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    pub column: String,
    pub op: FilterOp,
    pub value: FilterValue,
}

impl FilterSpec {
    pub fn number(column: &str, op: FilterOp, n: u64) -> Self {
        Self {
            column: column.to_string(),
            op,
            value: FilterValue::Scalar(json!(n)),
        }
    }

    pub fn text(column: &str, op: FilterOp, value: &str) -> Self {
        Self {
            column: column.to_string(),
            op,
            value: FilterValue::Scalar(json!(value)),
        }
    }

    pub fn date(column: &str, cutoff: NaiveDate) -> Self {
        Self {
            column: column.to_string(),
            op: FilterOp::Gte,
            value: FilterValue::Scalar(json!(cutoff.format("%Y-%m-%d").to_string())),
        }
    }

    pub fn between(column: &str, lo: u64, hi: u64) -> Self {
        Self {
            column: column.to_string(),
            op: FilterOp::Between,
            value: FilterValue::Range(json!(lo), json!(hi)),
        }
    }

    pub fn to_sql(&self) -> SqlExpr {
        let column = SqlExpr::bare(&self.column);
        match (&self.op, &self.value) {
            (_, FilterValue::Range(lo, hi)) => SqlExpr::Between {
                expr: Box::new(column),
                low: Box::new(SqlExpr::Param(lo.clone())),
                high: Box::new(SqlExpr::Param(hi.clone())),
            },
            (op, FilterValue::Scalar(v)) => {
                let op = match op {
                    FilterOp::Gte => SqlBinaryOperator::Gte,
                    FilterOp::Lte => SqlBinaryOperator::Lte,
                    FilterOp::Eq | FilterOp::Between => SqlBinaryOperator::Eq,
                };
                SqlExpr::binary(op, column, SqlExpr::Param(v.clone()))
            }
        }
    }
}

/// One join hop: `JOIN <table> ON <from_table>.<from_column> = <table>.<to_column>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSpec {
    pub from_table: &'static str,
    pub from_column: &'static str,
    pub table: &'static str,
    pub to_column: &'static str,
}

/// Joins reachable from `commits`, keyed by the word that requests them.
const COMMIT_JOINS: &[(&str, JoinSpec)] = &[
    (
        "author",
        JoinSpec {
            from_table: "commits",
            from_column: "author_id",
            table: "authors",
            to_column: "author_id",
        },
    ),
    (
        "repository",
        JoinSpec {
            from_table: "commits",
            from_column: "repo_id",
            table: "repositories",
            to_column: "repo_id",
        },
    ),
];

const GROUPING_CUES: &[&str] = &["per", "group by", "count by"];
const SUPERLATIVE_CUES: &[&str] = &["top", "most", "highest"];
/// Text cue → column ordered by, first hit wins.
const ORDER_METRICS: &[(&str, &str)] = &[
    ("commit", "commit_count"),
    ("stars", "stars"),
    ("forks", "forks"),
];

/// Everything the generic path decided about one question.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledIntent<'a> {
    pub action: Action,
    pub entity: Option<&'a EntityDescriptor>,
    pub columns: Columns,
    pub filters: Vec<FilterSpec>,
    pub joins: Vec<JoinSpec>,
    pub group_by: Option<Vec<String>>,
    pub order_by: Option<(String, SortDirection)>,
}

/// Combine the detected pieces into a [`CompiledIntent`].
pub fn assemble<'a>(
    action: Action,
    entity: &'a EntityDescriptor,
    columns: Columns,
    mut filters: Vec<FilterSpec>,
    text: &str,
    settings: &GenericConfig,
) -> CompiledIntent<'a> {
    if let Some(time_column) = &entity.time_column {
        for f in filters.iter_mut().filter(|f| f.column == DEFAULT_TIME_COLUMN) {
            f.column = time_column.clone();
        }
    }

    let joins = if entity.table == "commits" {
        COMMIT_JOINS
            .iter()
            .filter(|(cue, _)| text.contains(cue))
            .map(|(_, join)| join.clone())
            .collect()
    } else {
        Vec::new()
    };

    let group_by = if settings.group_by && GROUPING_CUES.iter().any(|cue| text.contains(cue)) {
        group_columns(&entity.table)
    } else {
        None
    };

    // "at most" is an upper bound, not a ranking.
    let ranked = text.replace("at most", "");
    let order_by = if SUPERLATIVE_CUES.iter().any(|cue| ranked.contains(cue)) {
        ORDER_METRICS
            .iter()
            .find(|(cue, _)| text.contains(cue))
            .map(|(_, column)| (column.to_string(), SortDirection::Desc))
    } else {
        None
    };

    CompiledIntent {
        action,
        entity: Some(entity),
        columns,
        filters,
        joins,
        group_by,
        order_by,
    }
}

fn group_columns(table: &str) -> Option<Vec<String>> {
    let key = match table {
        "repositories" => "repo_id",
        "authors" => "author_id",
        _ => return None,
    };
    Some(vec![format!("{table}.{key}"), format!("{table}.name")])
}

impl CompiledIntent<'_> {
    pub fn to_select_query(&self) -> Result<SelectQuery> {
        let entity = self.entity.ok_or(CompileError::NoEntity)?;

        let select = match (&self.action, &self.columns) {
            (Action::Count, _) | (_, Columns::CountAll) => vec![SelectItem::new(
                SqlExpr::aggregate(Aggregation::Count, SqlExpr::Star),
            )],
            (_, Columns::Wildcard) => vec![SelectItem::new(SqlExpr::Star)],
            (_, Columns::Named(cols)) => cols
                .iter()
                .map(|c| SelectItem::new(SqlExpr::bare(c)))
                .collect(),
        };
        if select.is_empty() {
            return Err(CompileError::InternalFault(format!(
                "no columns selected for {}",
                entity.table
            )));
        }

        let joins = self
            .joins
            .iter()
            .map(|j| {
                Join::inner(
                    j.table,
                    (j.from_table, j.from_column),
                    (j.table, j.to_column),
                )
            })
            .collect();

        let group_by = self
            .group_by
            .iter()
            .flatten()
            .map(|qualified| match qualified.split_once('.') {
                Some((table, column)) => SqlExpr::col(table, column),
                None => SqlExpr::bare(qualified),
            })
            .collect();

        let order_by = self
            .order_by
            .iter()
            .map(|(column, direction)| OrderItem {
                expr: SqlExpr::bare(column),
                direction: *direction,
            })
            .collect();

        Ok(SelectQuery {
            select,
            from: TableRef::new(&entity.table),
            joins,
            filters: self.filters.iter().map(FilterSpec::to_sql).collect(),
            group_by,
            order_by,
            limit: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::EntityCatalog;
    use crate::dialect::MySqlDialect;
    use crate::sql_ast::SqlRenderer;

    fn render(intent: &CompiledIntent<'_>) -> String {
        let query = intent.to_select_query().unwrap();
        SqlRenderer::new(&MySqlDialect).render_statement(&query).sql
    }

    fn named(cols: &[&str]) -> Columns {
        Columns::Named(cols.iter().map(|c| c.to_string()).collect())
    }

    #[test]
    fn select_with_filters() {
        let catalog = EntityCatalog::builtin();
        let repo = catalog.get("repository").unwrap();
        let intent = assemble(
            Action::Select,
            repo,
            named(&["repo_id", "name"]),
            vec![
                FilterSpec::number("stars", FilterOp::Gte, 1000),
                FilterSpec::between("forks", 1, 9),
            ],
            "repos with more than 1000 stars",
            &GenericConfig::default(),
        );
        assert_eq!(
            render(&intent),
            "SELECT repo_id, name FROM repositories WHERE stars >= 1000 AND forks BETWEEN 1 AND 9;"
        );
    }

    #[test]
    fn count_action_overrides_projection() {
        let catalog = EntityCatalog::builtin();
        let file = catalog.get("file").unwrap();
        let intent = assemble(
            Action::Count,
            file,
            named(&["path"]),
            Vec::new(),
            "number of files",
            &GenericConfig::default(),
        );
        assert_eq!(render(&intent), "SELECT COUNT(*) FROM files;");
    }

    #[test]
    fn commits_join_authors_and_repositories() {
        let catalog = EntityCatalog::builtin();
        let commit = catalog.get("commit").unwrap();
        let intent = assemble(
            Action::Select,
            commit,
            Columns::Wildcard,
            Vec::new(),
            "commits by author in repository",
            &GenericConfig::default(),
        );
        assert_eq!(
            render(&intent),
            "SELECT * FROM commits JOIN authors ON commits.author_id = authors.author_id \
             JOIN repositories ON commits.repo_id = repositories.repo_id;"
        );
    }

    #[test]
    fn joins_only_hop_from_commits() {
        let catalog = EntityCatalog::builtin();
        let file = catalog.get("file").unwrap();
        let intent = assemble(
            Action::Select,
            file,
            Columns::Wildcard,
            Vec::new(),
            "files by author",
            &GenericConfig::default(),
        );
        assert!(intent.joins.is_empty());
    }

    #[test]
    fn time_filter_follows_entity_time_column() {
        let catalog = EntityCatalog::builtin();
        let commit = catalog.get("commit").unwrap();
        let cutoff = NaiveDate::from_ymd_opt(2026, 10, 1).unwrap();
        let intent = assemble(
            Action::Select,
            commit,
            Columns::Wildcard,
            vec![FilterSpec::date(DEFAULT_TIME_COLUMN, cutoff)],
            "commits this month",
            &GenericConfig::default(),
        );
        assert_eq!(
            render(&intent),
            "SELECT * FROM commits WHERE timestamp >= '2026-10-01';"
        );
    }

    #[test]
    fn superlative_orders_by_metric() {
        let catalog = EntityCatalog::builtin();
        let repo = catalog.get("repository").unwrap();
        let intent = assemble(
            Action::Select,
            repo,
            Columns::Wildcard,
            Vec::new(),
            "repos with the most forks",
            &GenericConfig::default(),
        );
        assert_eq!(intent.order_by, Some(("forks".to_string(), SortDirection::Desc)));
        assert!(render(&intent).ends_with("ORDER BY forks DESC;"));

        let intent = assemble(
            Action::Select,
            repo,
            Columns::Wildcard,
            Vec::new(),
            "the most popular repos",
            &GenericConfig::default(),
        );
        assert_eq!(intent.order_by, None);
    }

    #[test]
    fn upper_bound_is_not_a_superlative() {
        let catalog = EntityCatalog::builtin();
        let repo = catalog.get("repository").unwrap();
        let intent = assemble(
            Action::Select,
            repo,
            Columns::Wildcard,
            vec![FilterSpec::number("stars", FilterOp::Lte, 10)],
            "repositories with at most 10 stars",
            &GenericConfig::default(),
        );
        assert_eq!(intent.order_by, None);
        assert_eq!(render(&intent), "SELECT * FROM repositories WHERE stars <= 10;");

        let intent = assemble(
            Action::Select,
            repo,
            Columns::Wildcard,
            Vec::new(),
            "repos with at most 10 forks, most stars first",
            &GenericConfig::default(),
        );
        assert_eq!(intent.order_by, Some(("stars".to_string(), SortDirection::Desc)));
    }

    #[test]
    fn group_by_is_inert_unless_enabled() {
        let catalog = EntityCatalog::builtin();
        let author = catalog.get("author").unwrap();
        let text = "authors per repository";

        let inert = assemble(
            Action::Select,
            author,
            Columns::Wildcard,
            Vec::new(),
            text,
            &GenericConfig::default(),
        );
        assert_eq!(inert.group_by, None);

        let enabled = assemble(
            Action::Select,
            author,
            Columns::CountAll,
            Vec::new(),
            text,
            &GenericConfig { group_by: true },
        );
        assert_eq!(
            render(&enabled),
            "SELECT COUNT(*) FROM authors GROUP BY authors.author_id, authors.name;"
        );
    }

    #[test]
    fn missing_entity_is_reported() {
        let intent = CompiledIntent {
            action: Action::Select,
            entity: None,
            columns: Columns::Wildcard,
            filters: Vec::new(),
            joins: Vec::new(),
            group_by: None,
            order_by: None,
        };
        assert!(matches!(intent.to_select_query(), Err(CompileError::NoEntity)));
    }

    #[test]
    fn empty_projection_is_a_fault() {
        let catalog = EntityCatalog::builtin();
        let repo = catalog.get("repository").unwrap();
        let intent = assemble(
            Action::Select,
            repo,
            Columns::Named(Vec::new()),
            Vec::new(),
            "repos",
            &GenericConfig::default(),
        );
        assert!(matches!(
            intent.to_select_query(),
            Err(CompileError::InternalFault(_))
        ));
    }
}
