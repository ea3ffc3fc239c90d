use coursetrack::{config::Config, db::Db, error::CoursetrackError};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load()?;
    let db = Db::new(config.db_path());

    println!("\n=== coursetrack Library Overview ===\n");

    let items = db
        .with_connection(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT
                    l.name,
                    l.total_lessons,
                    l.completed_lessons,
                    l.last_accessed,
                    c.cached_at
                FROM library l
                LEFT JOIN course_cache c ON c.library_id = l.id
                ORDER BY l.last_accessed IS NULL, l.last_accessed DESC
                "#,
            )?;

            let mut rows = stmt.query([])?;
            let mut results = Vec::new();

            while let Some(row) = rows.next()? {
                results.push((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?, // total_lessons
                    row.get::<_, i64>(2)?, // completed_lessons
                    row.get::<_, Option<String>>(3)?, // last_accessed
                    row.get::<_, Option<String>>(4)?, // cached_at
                ));
            }

            Ok::<Vec<_>, CoursetrackError>(results)
        })
        .await?;

    if items.is_empty() {
        println!("Library is empty.");
        println!("\nLoad a course to populate it.");
        return Ok(());
    }

    println!("{:-<90}", "");
    println!(
        "{:<40} {:>8} {:>10} {:>8} {:>10}",
        "Course", "Lessons", "Completed", "%", "Cached"
    );
    println!("{:-<90}", "");

    for (name, total, completed, _last_accessed, cached_at) in &items {
        let pct = if *total > 0 {
            (*completed as f64 / *total as f64 * 1000.0).round() / 10.0
        } else {
            0.0
        };
        let cached = if cached_at.is_some() { "yes" } else { "no" };

        let display_name: String = name.chars().take(38).collect();
        println!(
            "{:<40} {:>8} {:>10} {:>8} {:>10}",
            display_name, total, completed, pct, cached
        );
    }
    println!("{:-<90}", "");

    let total_courses = items.len();
    let finished = items
        .iter()
        .filter(|(_, total, completed, _, _)| *total > 0 && completed >= total)
        .count();

    println!("\nTotals:");
    println!("  Courses in library: {}", total_courses);
    println!("  Courses finished:   {}", finished);
    println!();

    Ok(())
}
