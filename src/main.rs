use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use configuration::{DatabaseOverrides, DatabaseSettings};
use core_types::SearchTerm;
use database::CatalogRepository;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Fixture file loaded by `run` when no `--fixtures` path is given.
const DEFAULT_FIXTURES: &str = "test_data.json";

/// The main entry point for the bookstore catalog tool.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file, if there is one.
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout carries only the report.
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Parse command-line arguments
    let cli = Cli::parse();

    let config = configuration::load_config(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let settings = config.postgresql.with_overrides(&cli.db);

    // Execute the appropriate command
    match cli.command.unwrap_or_default() {
        Commands::Run(args) => handle_run(args, &settings).await,
        Commands::Check => check_database(&settings).await.map(|_| ()),
        Commands::Drop => handle_drop(&settings).await,
        Commands::Query(args) => handle_query(args, &settings).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Loads a bookstore catalog into PostgreSQL and reports a publisher's sales by shop.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file with the `[postgresql]` section.
    #[arg(long, global = true, default_value = configuration::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(flatten)]
    db: DatabaseOverrides,

    /// Defaults to `run` when omitted.
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Reset the schema, load fixtures, then report a publisher's sales.
    Run(RunArgs),
    /// Report whether the configured database exists.
    Check,
    /// Drop the configured database if it exists.
    Drop,
    /// Report a publisher's sales without touching the loaded data.
    Query(QueryArgs),
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Run(RunArgs::default())
    }
}

#[derive(Args)]
struct RunArgs {
    /// JSON fixture file to load.
    #[arg(long, default_value = DEFAULT_FIXTURES)]
    fixtures: PathBuf,

    /// Publisher id or name fragment. Read from stdin when omitted.
    #[arg(long)]
    search: Option<String>,

    /// Create the database when it does not exist yet.
    #[arg(long)]
    create: bool,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            fixtures: PathBuf::from(DEFAULT_FIXTURES),
            search: None,
            create: false,
        }
    }
}

#[derive(Args)]
struct QueryArgs {
    /// Publisher id or name fragment. Read from stdin when omitted.
    search: Option<String>,
}

// ==============================================================================
// Command Logic
// ==============================================================================

/// Check → install → load → query, on one connection.
async fn handle_run(args: RunArgs, settings: &DatabaseSettings) -> anyhow::Result<()> {
    let dsn = settings.dsn();

    if !check_database(settings).await? {
        if !args.create {
            return Ok(());
        }
        database::create_database(&dsn).await?;
        println!("Database \"{}\" has been created", settings.dbname);
    }

    let repo = CatalogRepository::new(database::connect(&dsn).await?);
    repo.install_schema().await?;
    repo.load_fixture_file(&args.fixtures).await?;

    for (table, rows) in repo.table_counts().await? {
        tracing::info!(%table, rows, "Table populated.");
    }

    let input = match args.search {
        Some(search) => search,
        None => prompt_search_term().await?,
    };
    print_sales(&repo, &input).await
}

async fn handle_query(args: QueryArgs, settings: &DatabaseSettings) -> anyhow::Result<()> {
    let repo = CatalogRepository::new(database::connect(&settings.dsn()).await?);
    let input = match args.search {
        Some(search) => search,
        None => prompt_search_term().await?,
    };
    print_sales(&repo, &input).await
}

/// Prints whether the configured database exists and returns the answer.
async fn check_database(settings: &DatabaseSettings) -> anyhow::Result<bool> {
    let exists = database::database_exists(&settings.dsn()).await?;
    if exists {
        println!("Database \"{}\" exists", settings.dbname);
    } else {
        println!(
            "Database \"{}\" does not exist (pass --create to `run` to create it)",
            settings.dbname
        );
    }
    Ok(exists)
}

async fn handle_drop(settings: &DatabaseSettings) -> anyhow::Result<()> {
    println!("{}", settings.redacted_dsn());
    if database::drop_database(&settings.dsn()).await? {
        println!("Database \"{}\" has been deleted", settings.dbname);
    } else {
        println!("Database \"{}\" does not exist, nothing to delete", settings.dbname);
    }
    Ok(())
}

async fn prompt_search_term() -> anyhow::Result<String> {
    print!("Enter a publisher name or id: ");
    std::io::stdout().flush()?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("reading the search term from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

async fn print_sales(repo: &CatalogRepository, input: &str) -> anyhow::Result<()> {
    let term = SearchTerm::parse(input);
    for line in repo.sales_for_publisher(&term).await? {
        println!("{line}");
    }
    Ok(())
}
