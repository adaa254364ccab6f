use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::{Row, SqlitePool};

use permission_seeder::config::{load_env, ManagerConfig, Settings};
use permission_seeder::stores::{InMemoryStore, SqliteStore};
use permission_seeder::{db, PermissionManager};

#[derive(Parser, Debug)]
#[command(author, version, about = "Seed permissions and roles from a declarative config", long_about = None)]
struct Cli {
    /// Permissions document (defaults to PERMISSIONS_CONFIG or config/permissions.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the resolved permission catalog as JSON
    Catalog {
        /// Print the flat permission list instead of the per-resource map
        #[arg(long)]
        flat: bool,
    },
    /// Print the compiled role permissions as JSON
    Roles,
    /// Print which of the given permission names exist in the catalog
    Pick { names: Vec<String> },
    /// Create missing permissions and resync role permissions
    Sync {
        /// Run against an in-memory store instead of DATABASE_URL
        #[arg(long)]
        dry_run: bool,
    },
    /// Apply pending migrations
    MigrateRun,
    /// Show migration status against the current database
    MigrateStatus,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env();
    init_tracing();

    let cli = Cli::parse();
    let settings = Settings::from_env();
    let config_path = cli.config.unwrap_or_else(|| settings.permissions_config.clone());

    match cli.command {
        Commands::Catalog { flat } => {
            let manager = load_manager(&config_path)?;
            if flat {
                print_json(&manager.all())?;
            } else {
                print_json(manager.get())?;
            }
        }
        Commands::Roles => {
            let manager = load_manager(&config_path)?;
            print_json(&manager.compiled_roles())?;
        }
        Commands::Pick { names } => {
            let manager = load_manager(&config_path)?;
            print_json(&manager.pick(&names))?;
        }
        Commands::Sync { dry_run } => {
            let mut manager = load_manager(&config_path)?;
            let report = if dry_run {
                let store = InMemoryStore::new();
                manager.sync(&store, &store, None).await?
            } else {
                let database_url = settings.require_database_url()?;
                let pool = db::init(database_url).await?;
                let store = SqliteStore::new(pool);
                manager.sync(&store, &store, None).await?
            };
            print_json(&report)?;
        }
        Commands::MigrateRun => {
            let database_url = settings.require_database_url()?;
            db::init(database_url).await?;
            println!("Migrations applied");
        }
        Commands::MigrateStatus => {
            let pool = connect(&settings).await?;
            print_status(&pool).await?;
        }
    }

    Ok(())
}

fn load_manager(path: &std::path::Path) -> anyhow::Result<PermissionManager> {
    let config = ManagerConfig::load(path)
        .with_context(|| format!("failed to load permissions config {}", path.display()))?;
    Ok(PermissionManager::from_config(&config))
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn connect(settings: &Settings) -> anyhow::Result<SqlitePool> {
    let database_url = settings.require_database_url()?;
    SqlitePool::connect(database_url)
        .await
        .context("failed to connect to database")
}

async fn print_status(pool: &SqlitePool) -> anyhow::Result<()> {
    let migrator = sqlx::migrate!();

    // If the migrations table doesn't exist, nothing is applied yet
    let table = sqlx::query("SELECT name FROM sqlite_master WHERE type='table' AND name='_sqlx_migrations'")
        .fetch_optional(pool)
        .await?;
    let applied_versions: HashSet<i64> = if table.is_some() {
        let rows = sqlx::query("SELECT version FROM _sqlx_migrations WHERE success = 1")
            .fetch_all(pool)
            .await?;
        rows.iter().filter_map(|row| row.try_get::<i64, _>("version").ok()).collect()
    } else {
        HashSet::new()
    };

    println!("{:<8} {:<20} {}", "Status", "Version", "Name");
    for migration in migrator.iter() {
        let status = if applied_versions.contains(&migration.version) { "applied" } else { "pending" };
        let desc = migration.description.as_ref().trim();
        let name = if desc.is_empty() { "unknown" } else { desc };
        println!("{:<8} {:<20} {}", status, migration.version, name);
    }

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    // stdout carries JSON output, so logs go to stderr
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
