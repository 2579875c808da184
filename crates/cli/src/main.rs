//! Zaffira CLI - Database migrations, demo data and admin accounts.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! zaffira-cli migrate
//!
//! # Load the demo catalog and the default admin account
//! zaffira-cli seed
//!
//! # Wipe the catalog and accounts first
//! zaffira-cli seed --reset
//!
//! # Create an admin account
//! zaffira-cli admin create -e owner@zaffira.com -p 'long password' -f Asha -l Verma
//!
//! # Grant admin rights to an existing customer
//! zaffira-cli admin promote -e asha@example.com
//! ```
//!
//! # Environment Variables
//!
//! - `ZAFFIRA_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `ADMIN_EMAIL` / `ADMIN_PASSWORD` - Seeded admin credentials

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "zaffira-cli")]
#[command(author, version, about = "Zaffira storefront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Load demo products and the default admin account
    Seed {
        /// Product catalog YAML file
        #[arg(short, long, default_value = commands::seed::DEFAULT_PRODUCTS_FILE)]
        file: String,

        /// Delete existing products, appointments, orders and accounts first
        #[arg(long)]
        reset: bool,

        /// Do not create the default admin account
        #[arg(long)]
        skip_admin: bool,
    },
    /// Manage admin accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin account
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password (at least 6 characters)
        #[arg(short, long)]
        password: String,

        /// First name
        #[arg(short, long, default_value = "Admin")]
        first_name: String,

        /// Last name
        #[arg(short, long, default_value = "User")]
        last_name: String,

        /// Username
        #[arg(short, long)]
        username: Option<String>,
    },
    /// Grant the admin role to an existing account
    Promote {
        /// Email address of the account
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed {
            file,
            reset,
            skip_admin,
        } => commands::seed::run(&file, reset, skip_admin).await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                password,
                first_name,
                last_name,
                username,
            } => {
                let account = commands::admin::NewAdmin {
                    email,
                    password,
                    first_name,
                    last_name,
                    username,
                };
                commands::admin::create_user(account).await?;
            }
            AdminAction::Promote { email } => commands::admin::promote(&email).await?,
        },
    }
    Ok(())
}
