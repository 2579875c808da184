//! CLI subcommands.

pub mod admin;
pub mod migrate;
pub mod seed;

use secrecy::SecretString;
use sqlx::PgPool;

/// Connection string variables, in lookup order.
const DATABASE_URL_VARS: [&str; 2] = ["ZAFFIRA_DATABASE_URL", "DATABASE_URL"];

/// Error for a missing database URL.
#[derive(Debug, thiserror::Error)]
#[error("Missing environment variable: ZAFFIRA_DATABASE_URL (or DATABASE_URL)")]
pub struct MissingDatabaseUrl;

/// The database URL from the environment (after loading `.env`).
///
/// # Errors
///
/// Returns `MissingDatabaseUrl` if neither variable is set.
pub fn database_url() -> Result<SecretString, MissingDatabaseUrl> {
    dotenvy::dotenv().ok();
    DATABASE_URL_VARS
        .iter()
        .find_map(|name| std::env::var(name).ok().filter(|v| !v.is_empty()))
        .map(SecretString::from)
        .ok_or(MissingDatabaseUrl)
}

/// Connect to the storefront database.
///
/// # Errors
///
/// Returns an error if the URL is missing or the connection fails.
pub async fn connect() -> Result<PgPool, Box<dyn std::error::Error>> {
    let url = database_url()?;
    tracing::info!("Connecting to database...");
    let pool = zaffira_api::db::create_pool(&url).await?;
    Ok(pool)
}
