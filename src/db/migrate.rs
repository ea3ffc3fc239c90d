use rusqlite::{Connection, params};
use crate::error::Result;

/// Migration metadata
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

/// All schema migrations, in order. Versions are append-only: never edit an
/// entry that has shipped, add a new one.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "001_library_and_progress",
        sql: "\
            CREATE TABLE IF NOT EXISTS library (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                path TEXT UNIQUE NOT NULL,
                load_mode TEXT DEFAULT 'course',
                total_lessons INTEGER DEFAULT 0,
                completed_lessons INTEGER DEFAULT 0,
                last_accessed DATETIME,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_library_path ON library(path);

            CREATE TABLE IF NOT EXISTS lesson_progress (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                library_id INTEGER NOT NULL,
                lesson_path TEXT NOT NULL,
                completed BOOLEAN DEFAULT FALSE,
                progress_seconds INTEGER DEFAULT 0,
                completed_at DATETIME,
                last_accessed DATETIME,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (library_id) REFERENCES library(id) ON DELETE CASCADE,
                UNIQUE(library_id, lesson_path)
            );
            CREATE INDEX IF NOT EXISTS idx_lesson_library ON lesson_progress(library_id);
            CREATE INDEX IF NOT EXISTS idx_lesson_path ON lesson_progress(lesson_path);",
    },
    Migration {
        version: 2,
        name: "002_course_cache",
        sql: "\
            CREATE TABLE IF NOT EXISTS course_cache (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                library_id INTEGER UNIQUE NOT NULL,
                course_name TEXT NOT NULL,
                course_path TEXT NOT NULL,
                root_node_json TEXT NOT NULL,
                total_lessons INTEGER DEFAULT 0,
                cached_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                file_count INTEGER DEFAULT 0,
                FOREIGN KEY (library_id) REFERENCES library(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_cache_library ON course_cache(library_id);",
    },
    Migration {
        version: 3,
        name: "003_library_tags",
        sql: "ALTER TABLE library ADD COLUMN tags TEXT DEFAULT '[]';",
    },
];

/// Create schema_migrations table if it doesn't exist
fn ensure_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    Ok(())
}

/// Get list of applied migrations
pub fn get_applied_migrations(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM schema_migrations ORDER BY version")?;
    let names: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(names)
}

/// Run all pending migrations
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    ensure_migrations_table(conn)?;

    let applied = get_applied_migrations(conn)?;

    for migration in MIGRATIONS {
        if applied.iter().any(|name| name == migration.name) {
            log::debug!("Migration {} already applied, skipping", migration.name);
            continue;
        }

        log::info!("Applying migration: {} (version {})", migration.name, migration.version);

        // Execute migration in a transaction
        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
            params![migration.version, migration.name],
        )?;
        tx.commit()?;

        log::info!("Migration {} applied successfully", migration.name);
    }

    log::debug!("All migrations completed");
    Ok(())
}
