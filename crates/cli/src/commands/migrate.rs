//! Database migration command.
//!
//! Applies the SQL files in `crates/api/migrations/` in order. Already
//! applied migrations are skipped.
//!
//! # Usage
//!
//! ```bash
//! zaffira-cli migrate
//! ```

use super::connect;

/// Run pending migrations.
///
/// # Errors
///
/// Returns an error if the connection or a migration fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../api/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
