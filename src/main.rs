use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use shopfloor::auth::hash_password;
use shopfloor::config::{AppConfig, ConfigFile};
use shopfloor::db::TrackerDb;
use shopfloor::models::PersonRole;
use shopfloor::server;

#[derive(Parser)]
#[command(name = "shopfloor")]
#[command(version, about = "Factory work-order tracking server")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = "shopfloor.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Listen address, e.g. 0.0.0.0:8080
        #[arg(long, env = "SHOPFLOOR_LISTEN")]
        listen: Option<String>,

        /// SQLite database path
        #[arg(long, env = "SHOPFLOOR_DB")]
        db_path: Option<PathBuf>,

        /// Directory for uploaded workbooks
        #[arg(long, env = "SHOPFLOOR_UPLOADS")]
        uploads_dir: Option<PathBuf>,
    },
    /// Create the database and a default configuration file
    Init {
        /// SQLite database path (overrides the configuration file)
        #[arg(long)]
        db_path: Option<PathBuf>,
    },
    /// Add a person directly to the database (bootstrap the first admin)
    AddPerson {
        #[arg(long)]
        name: String,

        #[arg(long)]
        surname: String,

        /// Login identifier; must be unique
        #[arg(long)]
        phone_number: String,

        #[arg(long)]
        password: String,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        section_id: Option<i64>,

        /// admin or worker
        #[arg(long, default_value = "worker")]
        role: PersonRole,

        /// SQLite database path (overrides the configuration file)
        #[arg(long)]
        db_path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shopfloor=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve {
            listen,
            db_path,
            uploads_dir,
        } => {
            let config = AppConfig::with_cli_args(&cli.config, listen, db_path, uploads_dir)?;
            server::start_server(&config).await?;
        }
        Commands::Init { db_path } => cmd_init(&cli.config, db_path)?,
        Commands::AddPerson {
            name,
            surname,
            phone_number,
            password,
            email,
            section_id,
            role,
            db_path,
        } => {
            let config = AppConfig::new(&cli.config)?;
            let db_path = db_path.unwrap_or_else(|| config.db_path());
            cmd_add_person(
                &db_path,
                &name,
                &surname,
                &phone_number,
                &password,
                email.as_deref(),
                section_id,
                role,
            )?;
        }
    }
    Ok(())
}

fn cmd_init(config_path: &Path, db_path: Option<PathBuf>) -> Result<()> {
    if config_path.exists() {
        println!("Configuration already exists at {}", config_path.display());
    } else {
        ConfigFile::default().save(config_path)?;
        println!("Wrote default configuration to {}", config_path.display());
    }

    let config = AppConfig::new(config_path)?;
    let db_path = db_path.unwrap_or_else(|| config.db_path());
    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }
    TrackerDb::new(&db_path).context("Failed to initialize database")?;
    println!("Database ready at {}", db_path.display());

    for warning in config.validate() {
        println!("warning: {}", warning);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_add_person(
    db_path: &Path,
    name: &str,
    surname: &str,
    phone_number: &str,
    password: &str,
    email: Option<&str>,
    section_id: Option<i64>,
    role: PersonRole,
) -> Result<()> {
    let db = TrackerDb::new(db_path).context("Failed to open database")?;
    if db.get_person_by_phone(phone_number)?.is_some() {
        anyhow::bail!("Phone number {} is already registered", phone_number);
    }
    let person = db.create_person(
        name,
        surname,
        phone_number,
        email,
        section_id,
        role,
        &hash_password(password),
    )?;
    println!(
        "Added {} {} (id {}, role {})",
        person.name, person.surname, person.id, person.role
    );
    Ok(())
}
