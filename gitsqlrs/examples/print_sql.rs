use std::{
    env,
    io::{self, BufRead, Write},
    path::PathBuf,
};

use anyhow::{bail, Context};
use gitsql::{CompileError, Compiler, EntityCatalog, GitSqlConfig};
use tracing_subscriber::EnvFilter;

fn usage() {
    eprintln!("Usage: print_sql [--repo <id>] [--config <toml>] [question...]");
    eprintln!("Example: cargo run --example print_sql -- --repo 42 top 5 contributors");
    eprintln!("Without a question, reads one per line until `exit`.");
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let mut repo_id = None;
    let mut config_path: Option<PathBuf> = None;
    let mut words = Vec::new();

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--repo" => {
                let value = args.next().context("--repo needs a value")?;
                repo_id = Some(
                    value
                        .parse::<i64>()
                        .with_context(|| format!("invalid repo id {value}"))?,
                );
            }
            "--config" => {
                config_path = Some(PathBuf::from(args.next().context("--config needs a path")?));
            }
            "-h" | "--help" => {
                usage();
                return Ok(());
            }
            flag if flag.starts_with("--") => {
                usage();
                bail!("unknown flag {flag}");
            }
            _ => words.push(arg),
        }
    }

    let config = match config_path {
        Some(path) => GitSqlConfig::from_file(&path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => GitSqlConfig::load_default(),
    };
    let compiler = Compiler::new(EntityCatalog::builtin(), config);

    if !words.is_empty() {
        print(&compiler, &words.join(" "), repo_id);
        return Ok(());
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.eq_ignore_ascii_case("exit") {
            break;
        }
        print(&compiler, line, repo_id);
    }
    Ok(())
}

fn print(compiler: &Compiler, question: &str, repo_id: Option<i64>) {
    match compiler.compile(question, repo_id) {
        Ok(compiled) => {
            println!("{}", compiled.sql);
            if !compiled.params.is_empty() {
                println!("-- params: {}", serde_json::Value::from(compiled.params));
            }
        }
        Err(e @ (CompileError::EmptyInput | CompileError::NoEntity)) => {
            println!("-- {e}");
        }
        Err(e) => eprintln!("error: {e}"),
    }
}
