//! MySQL dialect implementation.

use crate::sql_ast::Function;

use super::Dialect;

#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn render_function(&self, func: &Function, args: Vec<String>) -> String {
        match func {
            Function::CurrentDate => "CURRENT_DATE".to_string(),
            Function::SubtractDays { days } => match args.as_slice() {
                [date] => format!("{date} - INTERVAL {days} DAY"),
                _ => "NULL".to_string(),
            },
        }
    }
}
