//! SQL dialect abstractions for the databases the extractor can populate.
//!
//! Identifiers are emitted bare; dialects only differ in bind placeholders
//! and in how date arithmetic is spelled.

use serde::{Deserialize, Serialize};

use crate::sql_ast::{Aggregation, Function};

/// Dialects render primitive expression pieces.
/// Expression tree walking lives in the renderer; the dialect
/// only maps logical constructs to SQL fragments.
pub trait Dialect: Send + Sync {
    fn placeholder(&self, _idx: usize) -> String {
        "?".to_string()
    }
    fn render_function(&self, func: &Function, args: Vec<String>) -> String;
    fn render_aggregation(&self, agg: &Aggregation, expr: &str) -> String {
        match agg {
            Aggregation::Sum => format!("SUM({expr})"),
            Aggregation::Count => format!("COUNT({expr})"),
            Aggregation::CountDistinct => format!("COUNT(DISTINCT {expr})"),
        }
    }
    /// Inline a bound value; only numbers and strings are ever bound.
    fn render_literal(&self, value: &serde_json::Value) -> String {
        match value {
            serde_json::Value::String(s) => format!("'{}'", s.replace('\'', "''")),
            other => other.to_string(),
        }
    }
}

/// Dialect selector as it appears in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    #[default]
    MySql,
    Postgres,
}

impl DialectKind {
    pub fn dialect(self) -> &'static dyn Dialect {
        match self {
            DialectKind::MySql => &MySqlDialect,
            DialectKind::Postgres => &PostgresDialect,
        }
    }
}

mod mysql;
pub use mysql::MySqlDialect;

mod postgres;
pub use postgres::PostgresDialect;
