//! PostgreSQL dialect implementation.

use crate::sql_ast::Function;

use super::Dialect;

#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn placeholder(&self, idx: usize) -> String {
        format!("${}", idx + 1) // PostgreSQL uses $1, $2, ...
    }

    fn render_function(&self, func: &Function, args: Vec<String>) -> String {
        match func {
            Function::CurrentDate => "CURRENT_DATE".to_string(),
            Function::SubtractDays { days } => match args.as_slice() {
                [date] => format!("{date} - INTERVAL '{days} days'"),
                _ => "NULL".to_string(),
            },
        }
    }
}
