use serde_json::Value;

use crate::dialect::Dialect;

#[derive(Debug, Clone, PartialEq)]
pub enum SqlExpr {
    Column {
        table: Option<String>,
        name: String,
    },
    /// `*`, only meaningful inside `COUNT(*)` or as the whole select list.
    Star,
    /// A caller- or text-derived scalar; inlined or bound depending on the renderer.
    Param(Value),
    Function {
        func: Function,
        args: Vec<SqlExpr>,
    },
    BinaryOp {
        op: SqlBinaryOperator,
        left: Box<SqlExpr>,
        right: Box<SqlExpr>,
    },
    Between {
        expr: Box<SqlExpr>,
        low: Box<SqlExpr>,
        high: Box<SqlExpr>,
    },
    Aggregate {
        agg: Aggregation,
        expr: Box<SqlExpr>,
    },
}

impl SqlExpr {
    pub fn col(table: &str, name: &str) -> Self {
        SqlExpr::Column {
            table: Some(table.to_string()),
            name: name.to_string(),
        }
    }

    pub fn bare(name: &str) -> Self {
        SqlExpr::Column {
            table: None,
            name: name.to_string(),
        }
    }

    pub fn eq(left: SqlExpr, right: SqlExpr) -> Self {
        SqlExpr::binary(SqlBinaryOperator::Eq, left, right)
    }

    pub fn binary(op: SqlBinaryOperator, left: SqlExpr, right: SqlExpr) -> Self {
        SqlExpr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn aggregate(agg: Aggregation, expr: SqlExpr) -> Self {
        SqlExpr::Aggregate {
            agg,
            expr: Box::new(expr),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlBinaryOperator {
    Add,
    Eq,
    Gte,
    Lte,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Sum,
    Count,
    CountDistinct,
}

/// Date helpers whose spelling differs between dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    CurrentDate,
    /// `args[0] - <days> days`
    SubtractDays { days: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expr: SqlExpr,
    pub alias: Option<String>,
}

impl SelectItem {
    pub fn new(expr: SqlExpr) -> Self {
        Self { expr, alias: None }
    }

    pub fn aliased(expr: SqlExpr, alias: &str) -> Self {
        Self {
            expr,
            alias: Some(alias.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRef {
    pub name: String,
}

impl TableRef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlJoinType {
    Inner,
    Left,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub join_type: SqlJoinType,
    pub table: TableRef,
    pub on: Vec<SqlExpr>,
}

impl Join {
    /// `JOIN <table> ON <left> = <right>` on two qualified columns.
    pub fn inner(table: &str, left: (&str, &str), right: (&str, &str)) -> Self {
        Self {
            join_type: SqlJoinType::Inner,
            table: TableRef::new(table),
            on: vec![SqlExpr::eq(
                SqlExpr::col(left.0, left.1),
                SqlExpr::col(right.0, right.1),
            )],
        }
    }

    pub fn left(table: &str, left: (&str, &str), right: (&str, &str)) -> Self {
        Self {
            join_type: SqlJoinType::Left,
            ..Self::inner(table, left, right)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub expr: SqlExpr,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    pub select: Vec<SelectItem>,
    pub from: TableRef,
    pub joins: Vec<Join>,
    pub filters: Vec<SqlExpr>,
    pub group_by: Vec<SqlExpr>,
    pub order_by: Vec<OrderItem>,
    pub limit: Option<u64>,
}

/// SQL text plus the bound values for its placeholders (empty when inlined).
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSql {
    pub sql: String,
    pub params: Vec<Value>,
}

pub struct SqlRenderer<'d> {
    dialect: &'d dyn Dialect,
    parameterize: bool,
}

impl<'d> SqlRenderer<'d> {
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self {
            dialect,
            parameterize: false,
        }
    }

    /// Render `Param` values as placeholders and collect them instead of inlining.
    pub fn parameterized(mut self, parameterize: bool) -> Self {
        self.parameterize = parameterize;
        self
    }

    /// Render a complete statement terminated with `;`.
    pub fn render_statement(&self, query: &SelectQuery) -> RenderedSql {
        let mut rendered = self.render_select(query);
        rendered.sql.push(';');
        rendered
    }

    pub fn render_select(&self, query: &SelectQuery) -> RenderedSql {
        let mut params = Vec::new();

        let select_items: Vec<String> = query
            .select
            .iter()
            .map(|item| {
                let expr_sql = self.render_expr(&item.expr, &mut params);
                match &item.alias {
                    Some(alias) => format!("{expr_sql} AS {alias}"),
                    None => expr_sql,
                }
            })
            .collect();

        let mut sql = format!(
            "SELECT {} FROM {}",
            select_items.join(", "),
            query.from.name
        );

        for join in &query.joins {
            let join_kw = match join.join_type {
                SqlJoinType::Inner => "JOIN",
                SqlJoinType::Left => "LEFT JOIN",
            };
            let on_clause: Vec<String> = join
                .on
                .iter()
                .map(|e| self.render_expr(e, &mut params))
                .collect();
            sql.push_str(&format!(
                " {join_kw} {} ON {}",
                join.table.name,
                on_clause.join(" AND ")
            ));
        }

        if !query.filters.is_empty() {
            let filters: Vec<String> = query
                .filters
                .iter()
                .map(|f| self.render_expr(f, &mut params))
                .collect();
            sql.push_str(&format!(" WHERE {}", filters.join(" AND ")));
        }

        if !query.group_by.is_empty() {
            let groups: Vec<String> = query
                .group_by
                .iter()
                .map(|g| self.render_expr(g, &mut params))
                .collect();
            sql.push_str(&format!(" GROUP BY {}", groups.join(", ")));
        }

        if !query.order_by.is_empty() {
            let orders: Vec<String> = query
                .order_by
                .iter()
                .map(|o| {
                    let expr = self.render_expr(&o.expr, &mut params);
                    let dir = match o.direction {
                        SortDirection::Asc => "ASC",
                        SortDirection::Desc => "DESC",
                    };
                    format!("{expr} {dir}")
                })
                .collect();
            sql.push_str(&format!(" ORDER BY {}", orders.join(", ")));
        }

        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        RenderedSql { sql, params }
    }

    fn render_expr(&self, expr: &SqlExpr, params: &mut Vec<Value>) -> String {
        match expr {
            SqlExpr::Column { table, name } => match table {
                Some(t) => format!("{t}.{name}"),
                None => name.clone(),
            },
            SqlExpr::Star => "*".to_string(),
            SqlExpr::Param(v) => {
                if self.parameterize {
                    let placeholder = self.dialect.placeholder(params.len());
                    params.push(v.clone());
                    placeholder
                } else {
                    self.dialect.render_literal(v)
                }
            }
            SqlExpr::Function { func, args } => {
                let rendered_args: Vec<String> =
                    args.iter().map(|a| self.render_expr(a, params)).collect();
                self.dialect.render_function(func, rendered_args)
            }
            SqlExpr::BinaryOp { op, left, right } => {
                let op_sql = match op {
                    SqlBinaryOperator::Add => "+",
                    SqlBinaryOperator::Eq => "=",
                    SqlBinaryOperator::Gte => ">=",
                    SqlBinaryOperator::Lte => "<=",
                };
                // Trees built here are at most one operator deep on each side.
                format!(
                    "{} {} {}",
                    self.render_expr(left, params),
                    op_sql,
                    self.render_expr(right, params)
                )
            }
            SqlExpr::Between { expr, low, high } => format!(
                "{} BETWEEN {} AND {}",
                self.render_expr(expr, params),
                self.render_expr(low, params),
                self.render_expr(high, params)
            ),
            SqlExpr::Aggregate { agg, expr } => {
                let inner = self.render_expr(expr, params);
                self.dialect.render_aggregation(agg, &inner)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySqlDialect, PostgresDialect};
    use serde_json::json;

    fn scoped_count() -> SelectQuery {
        SelectQuery {
            select: vec![SelectItem::aliased(
                SqlExpr::aggregate(Aggregation::Count, SqlExpr::Star),
                "total_commits",
            )],
            from: TableRef::new("commits"),
            filters: vec![SqlExpr::eq(SqlExpr::bare("repo_id"), SqlExpr::Param(json!(42)))],
            ..Default::default()
        }
    }

    #[test]
    fn inlines_params_by_default() {
        let rendered = SqlRenderer::new(&MySqlDialect).render_statement(&scoped_count());
        assert_eq!(
            rendered.sql,
            "SELECT COUNT(*) AS total_commits FROM commits WHERE repo_id = 42;"
        );
        assert!(rendered.params.is_empty());
    }

    #[test]
    fn binds_params_with_dialect_placeholders() {
        let mut query = scoped_count();
        query.filters.push(SqlExpr::eq(
            SqlExpr::bare("state"),
            SqlExpr::Param(json!("open")),
        ));

        let mysql = SqlRenderer::new(&MySqlDialect)
            .parameterized(true)
            .render_statement(&query);
        assert!(mysql.sql.ends_with("WHERE repo_id = ? AND state = ?;"));
        assert_eq!(mysql.params, vec![json!(42), json!("open")]);

        let pg = SqlRenderer::new(&PostgresDialect)
            .parameterized(true)
            .render_statement(&query);
        assert!(pg.sql.ends_with("WHERE repo_id = $1 AND state = $2;"));
    }

    #[test]
    fn renders_between_and_string_literals() {
        let query = SelectQuery {
            select: vec![SelectItem::new(SqlExpr::Star)],
            from: TableRef::new("repositories"),
            filters: vec![
                SqlExpr::Between {
                    expr: Box::new(SqlExpr::bare("stars")),
                    low: Box::new(SqlExpr::Param(json!(10))),
                    high: Box::new(SqlExpr::Param(json!(20))),
                },
                SqlExpr::eq(SqlExpr::bare("name"), SqlExpr::Param(json!("o'brien"))),
            ],
            ..Default::default()
        };
        let sql = SqlRenderer::new(&MySqlDialect).render_statement(&query).sql;
        assert_eq!(
            sql,
            "SELECT * FROM repositories WHERE stars BETWEEN 10 AND 20 AND name = 'o''brien';"
        );
    }
}
