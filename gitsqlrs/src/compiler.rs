use std::panic::{self, AssertUnwindSafe};

use chrono::{Local, NaiveDate};
use once_cell::sync::Lazy;
use serde_json::Value;

use crate::catalog::EntityCatalog;
use crate::config::GitSqlConfig;
use crate::error::{CompileError, Result};
use crate::intent::assemble;
use crate::matchers::{collect_filters, match_intent};
use crate::normalize::normalize;
use crate::sql_ast::{SelectQuery, SqlRenderer};
use crate::templates::{find_template, SpecialCase};

static DEFAULT: Lazy<Compiler> = Lazy::new(Compiler::default);

/// Which path produced a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuerySource {
    Template(SpecialCase),
    Generic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    /// Bound values in placeholder order; empty unless parameterized.
    pub params: Vec<Value>,
    pub source: QuerySource,
}

/// Natural-language to SQL compiler.
///
/// Holds only immutable catalogs and settings, so one instance can be shared
/// across threads and called concurrently.
#[derive(Debug, Clone)]
pub struct Compiler {
    catalog: EntityCatalog,
    config: GitSqlConfig,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(EntityCatalog::builtin(), GitSqlConfig::default())
    }
}

impl Compiler {
    pub fn new(catalog: EntityCatalog, config: GitSqlConfig) -> Self {
        Self { catalog, config }
    }

    pub fn catalog(&self) -> &EntityCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &GitSqlConfig {
        &self.config
    }

    /// Compile against today's local date.
    pub fn compile(&self, text: &str, repo_id: Option<i64>) -> Result<CompiledQuery> {
        self.compile_at(text, repo_id, Local::now().date_naive())
    }

    /// Compile with relative time phrases anchored at `today`.
    ///
    /// A panic anywhere in the pipeline is reported as
    /// [`CompileError::InternalFault`] instead of unwinding into the caller.
    pub fn compile_at(
        &self,
        text: &str,
        repo_id: Option<i64>,
        today: NaiveDate,
    ) -> Result<CompiledQuery> {
        contain_panics(|| self.run(text, repo_id, today))
    }

    fn run(&self, text: &str, repo_id: Option<i64>, today: NaiveDate) -> Result<CompiledQuery> {
        let limit = self.config.compiler.max_input_chars;
        let text = match text.char_indices().nth(limit) {
            Some((cut, _)) => {
                tracing::warn!(limit, "input truncated");
                &text[..cut]
            }
            None => text,
        };

        let input = normalize(text);
        tracing::trace!(text = %input.text, tokens = ?input.tokens, "normalized");

        if let Some((case, params)) = find_template(&input.text, &self.config.templates) {
            tracing::debug!(template = %case, ?repo_id, "template matched");
            let query = case.build(&params, repo_id);
            return Ok(self.render(&query, QuerySource::Template(case)));
        }

        if !input.has_tokens() {
            return Err(CompileError::EmptyInput);
        }

        let entity = self
            .catalog
            .resolve_entity(&input)
            .ok_or(CompileError::NoEntity)?;
        let action = match_intent(&input);
        let columns = self.catalog.columns_for(entity, &input);
        let filters = collect_filters(&input.text, today);
        tracing::debug!(
            entity = %entity.name,
            ?action,
            ?columns,
            filters = filters.len(),
            "generic path"
        );

        let intent = assemble(
            action,
            entity,
            columns,
            filters,
            &input.text,
            &self.config.generic,
        );
        let query = intent.to_select_query()?;
        Ok(self.render(&query, QuerySource::Generic))
    }

    fn render(&self, query: &SelectQuery, source: QuerySource) -> CompiledQuery {
        let settings = &self.config.compiler;
        let rendered = SqlRenderer::new(settings.dialect.dialect())
            .parameterized(settings.parameterize)
            .render_statement(query);
        tracing::trace!(sql = %rendered.sql, params = rendered.params.len(), "rendered");
        CompiledQuery {
            sql: rendered.sql,
            params: rendered.params,
            source,
        }
    }
}

/// Run `f`, turning a panic into [`CompileError::InternalFault`].
fn contain_panics<T>(f: impl FnOnce() -> Result<T>) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        tracing::error!(reason = %reason, "compiler panicked");
        Err(CompileError::InternalFault(reason))
    })
}

/// Compile `text` to inline SQL with the built-in catalog and default settings.
pub fn compile_query(text: &str, repo_id: Option<i64>) -> Result<String> {
    DEFAULT.compile(text, repo_id).map(|compiled| compiled.sql)
}
