//! Loading entity catalogs from YAML and compiling against them.

use chrono::NaiveDate;
use gitsql::{CompileErrorKind, Compiler, EntityCatalog, GitSqlConfig};

const CATALOG: &str = r#"
entities:
  - name: pull_request
    synonyms: [pr, prs, "pull request", "pull requests"]
    table: pull_requests
    columns:
      default: [pr_id, title, state]
      stats: [comments, reviews]
    time_column: opened_at
  - name: repository
    synonyms: [repository, repositories, repo]
    table: repositories
"#;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
}

fn compiler() -> Compiler {
    let catalog = EntityCatalog::from_yaml_str(CATALOG).unwrap();
    Compiler::new(catalog, GitSqlConfig::default())
}

#[test]
fn loads_entities_in_declaration_order() {
    let catalog = EntityCatalog::from_yaml_str(CATALOG).unwrap();
    let names: Vec<&str> = catalog.entities().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["pull_request", "repository"]);
    assert_eq!(
        catalog.get("pull_request").and_then(|e| e.time_column.as_deref()),
        Some("opened_at")
    );
}

#[test]
fn multi_word_synonym_and_time_column() {
    let sql = compiler()
        .compile_at("open pull requests in this repository from 3 days ago", None, today())
        .unwrap()
        .sql;
    // pull_requests has no fallback list, so the projection is `*`.
    assert_eq!(
        sql,
        "SELECT * FROM pull_requests WHERE opened_at >= '2026-10-15' AND state = 'open';"
    );
}

#[test]
fn stats_group_selects_its_columns() {
    let sql = compiler()
        .compile_at("pr stats", None, today())
        .unwrap()
        .sql;
    assert_eq!(sql, "SELECT comments, reviews FROM pull_requests;");
}

#[test]
fn entities_missing_from_catalog_are_no_entity() {
    let err = compiler()
        .compile_at("show all authors", None, today())
        .unwrap_err();
    assert_eq!(err.kind(), CompileErrorKind::NoEntity);
}

#[test]
fn from_file_and_bad_yaml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.yaml");
    std::fs::write(&path, CATALOG).unwrap();
    assert_eq!(EntityCatalog::from_file(&path).unwrap().entities().len(), 2);

    let err = EntityCatalog::from_yaml_str("entities:\n  - name: x\n    colour: red\n").unwrap_err();
    assert_eq!(err.kind(), CompileErrorKind::Catalog);

    let err = EntityCatalog::from_file(dir.path().join("missing.yaml")).unwrap_err();
    assert_eq!(err.kind(), CompileErrorKind::Catalog);
}
