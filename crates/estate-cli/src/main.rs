use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use estate_application::ListingError;
use estate_core::EstateError;
use estate_infrastructure::AppConfig;

mod backend;
mod commands;
mod logging;
mod render;

use backend::Backend;
use commands::browse::ListView;

#[derive(Parser)]
#[command(name = "estate")]
#[command(about = "Estate - browse listings, view history and favorites", long_about = None)]
struct Cli {
    /// Use the in-memory demo catalogue instead of the hosted backend
    #[arg(long, global = true)]
    offline: bool,

    /// Page of the history or favorites list to show
    #[arg(long, global = true, default_value_t = 1)]
    page: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every property
    Properties,
    /// Browse as a guest with seeded sample data
    Guest {
        #[arg(value_enum, default_value_t = ListView::History)]
        view: ListView,
    },
    /// Sign in and show your recently viewed properties
    History {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
        /// Record a view of this property first
        #[arg(long, value_name = "ID")]
        view: Option<String>,
        /// Remove this property from the history first
        #[arg(long, value_name = "ID", conflicts_with = "view")]
        remove: Option<String>,
    },
    /// Sign in and show your favorites
    Favorites {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
        /// Add or remove this property first
        #[arg(long, value_name = "ID")]
        toggle: Option<String>,
    },
    /// Create an account
    SignUp {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{}", error_message(&e).red());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load()?;
    let _log_guard = logging::init(&config.logging)?;
    let backend = Backend::connect(&config, cli.offline)?;
    let page_size = config.browse.page_size;

    match cli.command {
        Commands::Properties => {
            let session = commands::open_session(&backend, page_size).await;
            commands::properties::list(&session).await?;
        }
        Commands::Guest { view } => {
            let session = commands::open_session(&backend, page_size).await;
            commands::browse::guest(&session, view, cli.page).await?;
        }
        Commands::History {
            email,
            password,
            view,
            remove,
        } => {
            let (email, password) = commands::credentials(&backend, email, password)?;
            let session = commands::open_session(&backend, page_size).await;
            commands::browse::history(&session, &email, &password, view, remove, cli.page)
                .await?;
        }
        Commands::Favorites {
            email,
            password,
            toggle,
        } => {
            let (email, password) = commands::credentials(&backend, email, password)?;
            let session = commands::open_session(&backend, page_size).await;
            commands::browse::favorites(&session, &email, &password, toggle, cli.page).await?;
        }
        Commands::SignUp { email, password } => {
            commands::sign_up::run(&backend, page_size, &email, &password).await?;
        }
    }

    Ok(())
}

/// Service wording for auth and backend failures, the full chain otherwise.
fn error_message(error: &anyhow::Error) -> String {
    if let Some(e) = error.downcast_ref::<EstateError>() {
        return e.user_message();
    }
    if let Some(ListingError::Remote(e)) = error.downcast_ref::<ListingError>() {
        return e.user_message();
    }
    format!("{:#}", error)
}
