//! Veblyss CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! vb-cli migrate
//!
//! # Create a user (password hashed like a signup)
//! vb-cli user create -e asha@example.com -n "Asha" -p 'correct horse'
//!
//! # Issue a bearer token for local testing
//! vb-cli token issue --user-id 1 --ttl-days 1
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run storefront database migrations
//! - `user create` - Create a storefront user
//! - `token issue` - Print a signed bearer token for a user id

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "vb-cli")]
#[command(author, version, about = "Veblyss CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Manage storefront users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Issue auth tokens
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Password (at least 6 characters)
        #[arg(short, long)]
        password: String,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Print a signed token for a user id
    Issue {
        /// User id the token is issued for
        #[arg(long)]
        user_id: i64,

        /// Token lifetime in days
        #[arg(long, default_value_t = 1)]
        ttl_days: i64,
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
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::User { action } => match action {
            UserAction::Create {
                email,
                name,
                password,
            } => {
                commands::user::create_user(&email, &name, &password).await?;
            }
        },
        Commands::Token { action } => match action {
            TokenAction::Issue { user_id, ttl_days } => {
                commands::token::issue(user_id, ttl_days)?;
            }
        },
    }
    Ok(())
}
