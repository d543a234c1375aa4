// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result, anyhow, bail};
use config::Config;
use runtime::{ApiRuntime, DemoRuntime, GridSettings};
use sqlpane_api::Client;
use sqlpane_app::{AppCommand, AppState, ConnectionId, SessionBus, TableRef};
use sqlpane_store::Store;
use sqlpane_testkit::{DEMO_SCHEMA, DemoDataset};
use std::env;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const DEFAULT_SCHEMA: &str = "public";
const DEFAULT_DEMO_TABLE: &str = "customers";
const DEMO_SEED: u64 = 42;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `sqlpane --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;
    init_logging(&config.log_path()?)?;

    if options.check_only {
        return run_check(&options, &config);
    }

    let mode = options.mode()?;
    let store = open_store(&config, options.demo)?;
    let page_size = match store.get_page_size() {
        Ok(saved) => saved.unwrap_or_else(|| config.page_size()),
        Err(error) => {
            tracing::warn!(error = %error, "ignoring saved page size");
            config.page_size()
        }
    };
    let settings = GridSettings {
        page_size,
        click_delay: config.click_delay()?,
        job_prune_after: config.job_prune_after()?,
    };
    let mut state = AppState::default();

    let (connection, target) = match mode {
        Mode::Demo { table } => {
            tracing::info!(table, "starting demo");
            let mut runtime =
                DemoRuntime::new(DemoDataset::generate(DEMO_SEED), store, settings, &table)?;
            return sqlpane_grid::run_app(&mut state, &mut runtime);
        }
        Mode::Server { connection, target } => (connection, target),
    };

    let session = SessionBus::new();
    let client = api_client(&config, &options.config_path)?.with_session_bus(session.clone());
    let jobs = config
        .jobs_enabled()
        .then(|| config.reconnect_policy())
        .transpose()?;
    if options.sync_schema {
        let job = client
            .start_schema_sync(connection)
            .context("start schema sync")?;
        tracing::info!(%job, "schema sync started");
        state.dispatch(AppCommand::SetStatus(format!(
            "schema sync started (job {job})"
        )));
    }

    let mut runtime = match target {
        Target::Table(table) => {
            let table = TableRef::new(connection, &options.schema, table);
            tracing::info!(%table, "opening table");
            ApiRuntime::for_table(client, &store, session, settings, table)
        }
        Target::Sql(sql) => {
            ApiRuntime::for_query(client, &store, session, settings, connection, sql)
        }
        Target::Ask(question) => {
            let sql = client
                .generate_sql(connection, &question)
                .context("generate SQL for the question")?;
            tracing::info!(%sql, "generated SQL");
            state.dispatch(AppCommand::SetStatus(format!("generated: {sql}")));
            ApiRuntime::for_query(client, &store, session, settings, connection, sql)
        }
    }
    .with_job_stream(jobs);
    sqlpane_grid::run_app(&mut state, &mut runtime)
}

/// Validates config and preferences; with `--connection`, also asks the
/// server for the schema's tables.
fn run_check(options: &CliOptions, config: &Config) -> Result<()> {
    open_store(config, options.demo)?;
    config.click_delay()?;
    config.job_prune_after()?;
    let client = api_client(config, &options.config_path)?;
    if let Some(connection) = options.connection {
        let tables = client.list_tables(connection, &options.schema)?;
        println!(
            "{}: {} tables in {}",
            client.base_url(),
            tables.len(),
            options.schema
        );
    }
    Ok(())
}

fn open_store(config: &Config, in_memory: bool) -> Result<Store> {
    let store = if in_memory {
        Store::open_memory()?
    } else {
        let db_path = config.db_path()?;
        Store::open(&db_path).with_context(|| {
            format!(
                "open preferences {} -- if this path is wrong, set [storage].db_path or SQLPANE_DB_PATH",
                db_path.display()
            )
        })?
    };
    store.bootstrap()?;
    Ok(store)
}

fn api_client(config: &Config, config_path: &Path) -> Result<Client> {
    let client = Client::new(config.api_base_url(), config.api_timeout()?).with_context(|| {
        format!(
            "invalid [api] config in {}; fix base_url/timeout values",
            config_path.display()
        )
    })?;
    Ok(client.with_token(config.api_token()))
}

/// The terminal belongs to the grid, so logs go to a file.
fn init_logging(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))?;
    let filter =
        EnvFilter::try_from_env("SQLPANE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|error| anyhow!("install log subscriber: {error}"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Table(String),
    Sql(String),
    Ask(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    Demo {
        table: String,
    },
    Server {
        connection: ConnectionId,
        target: Target,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    connection: Option<ConnectionId>,
    schema: String,
    table: Option<String>,
    sql: Option<String>,
    ask: Option<String>,
    sync_schema: bool,
    print_config_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

impl CliOptions {
    fn mode(&self) -> Result<Mode> {
        if self.sql.is_some() && self.ask.is_some() {
            bail!("--sql and --ask cannot be combined; pick one");
        }
        if self.demo {
            if self.sql.is_some() || self.ask.is_some() || self.sync_schema {
                bail!("--demo runs without a server; drop --sql/--ask/--sync-schema");
            }
            return Ok(Mode::Demo {
                table: self
                    .table
                    .clone()
                    .unwrap_or_else(|| DEFAULT_DEMO_TABLE.to_owned()),
            });
        }

        let target = match (&self.sql, &self.ask, &self.table) {
            (Some(sql), _, _) => Target::Sql(sql.clone()),
            (None, Some(question), _) => Target::Ask(question.clone()),
            (None, None, Some(table)) => Target::Table(table.clone()),
            (None, None, None) => {
                bail!("--table <name> is required; or use --sql, --ask, or --demo")
            }
        };
        let connection = self
            .connection
            .ok_or_else(|| anyhow!("--connection <id> is required unless --demo is given"))?;
        Ok(Mode::Server { connection, target })
    }
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        connection: None,
        schema: DEFAULT_SCHEMA.to_owned(),
        table: None,
        sql: None,
        ask: None,
        sync_schema: false,
        print_config_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let path = required_value(&mut iter, "--config", "a file path")?;
                options.config_path = PathBuf::from(path);
            }
            "--connection" => {
                let raw = required_value(&mut iter, "--connection", "a numeric id")?;
                let id = raw
                    .parse::<i64>()
                    .with_context(|| format!("--connection expects a numeric id, got {raw:?}"))?;
                options.connection = Some(ConnectionId::new(id));
            }
            "--schema" => {
                options.schema = required_value(&mut iter, "--schema", "a schema name")?;
            }
            "--table" => {
                options.table = Some(required_value(&mut iter, "--table", "a table name")?);
            }
            "--sql" => {
                options.sql = Some(required_value(&mut iter, "--sql", "a SQL statement")?);
            }
            "--ask" => options.ask = Some(required_value(&mut iter, "--ask", "a question")?),
            "--sync-schema" => options.sync_schema = true,
            "--print-config-path" => options.print_config_path = true,
            "--print-example-config" => options.print_example = true,
            "--demo" => options.demo = true,
            "--check" => options.check_only = true,
            "--help" | "-h" => options.show_help = true,
            unknown => {
                bail!("unknown argument {unknown:?}; run with --help to see supported options");
            }
        }
    }

    Ok(options)
}

fn required_value<I, S>(iter: &mut I, flag: &str, what: &str) -> Result<String>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    iter.next()
        .map(|value| value.as_ref().trim().to_owned())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| anyhow!("{flag} requires {what}"))
}

fn print_help() {
    println!("sqlpane - terminal data grid for a SQL backend");
    println!("  --config <path>          Use a specific config path");
    println!("  --connection <id>        Backend connection id");
    println!("  --schema <name>          Schema to browse (default {DEFAULT_SCHEMA})");
    println!("  --table <name>           Open a table with server-side paging");
    println!("  --sql <statement>        Run a statement and browse the result");
    println!("  --ask <question>         Generate SQL from a question and browse the result");
    println!("  --sync-schema            Start a schema sync job before opening the grid");
    println!("  --demo                   Browse generated sample data without a server");
    println!("  --check                  Validate config + preferences (+ server with --connection)");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --help                   Show this help");
    println!();
    println!("Demo tables live in schema {DEMO_SCHEMA}: customers, orders, plans.");
}
