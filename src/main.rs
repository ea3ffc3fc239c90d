use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use coursetrack::db::{migrate, Db};
use coursetrack::scanner::completion_stats;
use coursetrack::server::ApiServer;
use coursetrack::{cache, Config, DirectoryNode};

#[derive(Parser)]
#[command(name = "coursetrack", about = "Self-hosted personal course/media tracker")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the local HTTP server
    Serve,
    /// Scan a course directory and print its tree and completion stats
    Scan {
        path: PathBuf,
        /// Bypass the tree cache and rescan the filesystem
        #[arg(long)]
        force_rescan: bool,
    },
    /// Run migrations and verify the database schema (default)
    Verify,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", "info"),
    )
    .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Verify) {
        Command::Serve => run_server().await?,
        Command::Scan { path, force_rescan } => run_scan(path, force_rescan).await?,
        Command::Verify => run_schema_verification().await?,
    }

    Ok(())
}

/// Load config, open the database and run pending migrations
async fn init_db(config: &Config) -> Result<Db> {
    let db = Db::new(config.db_path());
    db.with_connection(|conn| migrate::run_migrations(conn)).await?;
    log::info!("Database initialized successfully");
    Ok(db)
}

async fn run_server() -> Result<()> {
    log::info!("Starting coursetrack v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    let db = init_db(&config).await?;

    let port = config.http_server.port;
    let server = ApiServer::new(db, config);
    server.run(port).await?;

    Ok(())
}

async fn run_scan(path: PathBuf, force_rescan: bool) -> Result<()> {
    let config = Config::load()?;
    let db = init_db(&config).await?;

    let course = cache::load_course_cached(&db, &path, force_rescan, config.max_cache_age_hours())
        .await?
        .ok_or_else(|| anyhow::anyhow!("Failed to load course: {}", path.display()))?;

    let stats = completion_stats(&course.root_node);

    println!("\nCourse: {}", course.name);
    println!("Path:   {}", course.path);
    println!(
        "Lessons: {} total, {} completed ({}%)\n",
        stats.total_lessons, stats.completed_lessons, stats.completion_percentage
    );
    print_tree(&course.root_node, 0);

    Ok(())
}

fn print_tree(node: &DirectoryNode, indent: usize) {
    let pad = "  ".repeat(indent);
    println!("{}{}/", pad, node.name);
    for lesson in &node.lessons {
        let marker = if lesson.completed { "x" } else { " " };
        println!("{}  [{}] {}", pad, marker, lesson.title);
    }
    for child in node.children.values() {
        print_tree(child, indent + 1);
    }
}

/// Verify that all expected database objects exist
async fn run_schema_verification() -> Result<()> {
    use coursetrack::error::CoursetrackError;

    log::info!("Starting coursetrack v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    log::info!("Database path: {}", config.db_path().display());

    let db = init_db(&config).await?;

    db.with_connection(|conn| {
        let mut stmt =
            conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        for table in ["library", "lesson_progress", "course_cache", "schema_migrations"] {
            if !tables.iter().any(|t| t == table) {
                return Err(CoursetrackError::Config(format!("Missing table: {}", table)));
            }
            log::debug!("Table exists: {}", table);
        }

        let journal_mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
        if journal_mode.to_uppercase() != "WAL" {
            return Err(CoursetrackError::Config(format!(
                "Journal mode is not WAL: {}",
                journal_mode
            )));
        }

        let integrity: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        if integrity != "ok" {
            return Err(CoursetrackError::Config(format!(
                "Database integrity check failed: {}",
                integrity
            )));
        }

        let applied = migrate::get_applied_migrations(conn)?;
        log::info!("{} migrations applied", applied.len());
        Ok(())
    })
    .await?;

    log::info!("Database schema verification complete");
    Ok(())
}
