//! Rule-based translation of natural-language questions about git
//! repositories into SQL.
//!
//! ```no_run
//! let sql = gitsql::compile_query("how many commits", Some(42))?;
//! assert_eq!(sql, "SELECT COUNT(*) AS total_commits FROM commits WHERE repo_id = 42;");
//! # Ok::<(), gitsql::CompileError>(())
//! ```

pub mod catalog;
pub mod compiler;
pub mod config;
pub mod dialect;
pub mod error;
pub mod intent;
pub mod matchers;
pub mod normalize;
pub mod sql_ast;
pub mod templates;

pub use catalog::{Columns, EntityCatalog, EntityDescriptor};
pub use compiler::{compile_query, CompiledQuery, Compiler, QuerySource};
pub use config::GitSqlConfig;
pub use dialect::{Dialect, DialectKind};
pub use error::{CompileError, CompileErrorKind, Result};
pub use intent::{Action, CompiledIntent, FilterOp, FilterSpec, FilterValue};
pub use normalize::{normalize, Normalized};
pub use templates::{find_template, SpecialCase, TemplateParams};
