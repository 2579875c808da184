//! Seed the database with the demo catalog and the default admin account.
//!
//! Products are read from a YAML list of product inputs (the same shape the
//! create endpoint accepts) and validated before connecting. Products whose
//! name already exists are skipped, so seeding twice is harmless.
//!
//! # Environment Variables
//!
//! - `ADMIN_EMAIL` - Admin account email (default: admin@zaffira.com)
//! - `ADMIN_PASSWORD` - Admin account password (default: admin123)

use std::path::Path;

use tracing::{error, info, warn};

use zaffira_api::db::{ProductRepository, RepositoryError, UserRepository};
use zaffira_api::services::auth::Registration;
use zaffira_core::product::{NewProduct, ProductInput};
use zaffira_core::{Email, Role};

use super::connect;

/// Catalog bundled with the repository.
pub const DEFAULT_PRODUCTS_FILE: &str = "crates/cli/seed/products.yaml";

const DEFAULT_ADMIN_EMAIL: &str = "admin@zaffira.com";
const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// Parse and validate a YAML product list.
///
/// # Errors
///
/// Returns every validation failure, one line per product.
pub fn load_products(yaml: &str) -> Result<Vec<NewProduct>, Box<dyn std::error::Error>> {
    let inputs: Vec<ProductInput> = serde_yaml::from_str(yaml)?;

    let mut products = Vec::with_capacity(inputs.len());
    let mut errors = Vec::new();
    for input in inputs {
        let name = input.name.clone();
        match input.validate() {
            Ok(product) => products.push(product),
            Err(e) => errors.push(format!("{name}: {e}")),
        }
    }

    if errors.is_empty() {
        Ok(products)
    } else {
        for err in &errors {
            error!("  - {err}");
        }
        Err(format!("{} invalid products", errors.len()).into())
    }
}

/// The seeded admin account, from `ADMIN_EMAIL` / `ADMIN_PASSWORD`.
fn admin_registration() -> Registration {
    let env_or = |name: &str, default: &str| {
        std::env::var(name)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| default.to_owned())
    };

    Registration {
        first_name: "Admin".to_owned(),
        last_name: "User".to_owned(),
        username: Some("admin".to_owned()),
        email: env_or("ADMIN_EMAIL", DEFAULT_ADMIN_EMAIL),
        password: env_or("ADMIN_PASSWORD", DEFAULT_ADMIN_PASSWORD),
        phone: Some("+91-9999999999".to_owned()),
    }
}

/// Seed products (and the admin account unless `skip_admin`).
///
/// # Errors
///
/// Returns an error if the file is missing or invalid, or a database
/// operation fails.
pub async fn run(
    file_path: &str,
    reset: bool,
    skip_admin: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading products from file");
    let content = tokio::fs::read_to_string(path).await?;
    let products = load_products(&content)?;
    info!(products = products.len(), "Catalog validated");

    let pool = connect().await?;

    if reset {
        warn!("Deleting existing data");
        sqlx::query("TRUNCATE order_items, orders, appointments, products, profiles")
            .execute(&pool)
            .await?;
    }

    let repo = ProductRepository::new(&pool);
    let mut created = 0_usize;
    for product in &products {
        if repo.exists_by_name(&product.name).await? {
            info!(name = %product.name, "Product exists, skipping");
            continue;
        }
        let stored = repo.create(product).await?;
        info!(id = %stored.id, name = %stored.name, "Product created");
        created += 1;
    }
    info!(created, skipped = products.len() - created, "Products seeded");

    if !skip_admin {
        seed_admin(&UserRepository::new(&pool)).await?;
    }

    info!("Seeding complete!");
    Ok(())
}

async fn seed_admin(users: &UserRepository<'_>) -> Result<(), Box<dyn std::error::Error>> {
    let registration = admin_registration();
    let email = Email::parse(&registration.email)?;

    if users.exists_by_email(&email).await? {
        let user = users.set_role_by_email(&email, Role::Admin).await?;
        info!(id = %user.id, email = %user.email, "Admin account exists, role ensured");
        return Ok(());
    }

    let new_user = registration.into_new_user(Role::Admin)?;
    match users.create(&new_user).await {
        Ok(user) => {
            info!(id = %user.id, email = %user.email, "Admin account created");
            Ok(())
        }
        Err(RepositoryError::Conflict(message)) => {
            Err(format!("Admin account conflicts with an existing one: {message}").into())
        }
        Err(e) => Err(e.into()),
    }
}
