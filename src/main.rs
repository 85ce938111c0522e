use anyhow::{Context, Result, anyhow};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use school_registry::{Exec, Identity, Registry, RegistryConfig, Role, Student, Teacher};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "school-registry")]
#[command(about = "Maintenance tooling for the school registry database")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create any missing tables.
    Init,
    /// Bootstrap an exec account directly, without an existing admin session.
    CreateExec {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
        #[arg(long, default_value = "admin")]
        role: String,
    },
    /// Print records as JSON.
    List {
        kind: Kind,
        /// Equality filter, e.g. `--filter class=5A`.
        #[arg(long = "filter")]
        filters: Vec<String>,
        /// Ordering, e.g. `--sort lastName:asc`.
        #[arg(long = "sort")]
        sorts: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Execs,
    Students,
    Teachers,
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = RegistryConfig::from_env().context("failed to load registry configuration")?;
    let registry = Registry::open(config).context("failed to open registry database")?;

    match cli.command {
        Command::Init => {
            info!(path = %registry.database().path().display(), "schema initialised");
            Ok(())
        }
        Command::CreateExec {
            username,
            password,
            email,
            first_name,
            last_name,
            role,
        } => {
            let exec = Exec {
                first_name,
                last_name,
                email,
                username,
                password,
                role,
                ..Exec::default()
            };
            let created = registry
                .accounts()
                .create_execs(&bootstrap_identity(), vec![exec])
                .context("failed to create exec")?;
            print_json(&created)
        }
        Command::List {
            kind,
            filters,
            sorts,
        } => {
            let params = query_params(&filters, &sorts)?;
            match kind {
                Kind::Execs => print_json(&registry.repository::<Exec>().list(&params)?),
                Kind::Students => print_json(&registry.repository::<Student>().list(&params)?),
                Kind::Teachers => print_json(&registry.repository::<Teacher>().list(&params)?),
            }
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("school_registry=info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

// Local operators already own the database file.
fn bootstrap_identity() -> Identity {
    Identity::new(0, "bootstrap", Role::Admin, Utc::now() + Duration::minutes(1))
}

fn query_params(filters: &[String], sorts: &[String]) -> Result<Vec<(String, String)>> {
    let mut params = Vec::with_capacity(filters.len() + sorts.len());
    for filter in filters {
        let (key, value) = filter
            .split_once('=')
            .ok_or_else(|| anyhow!("filter '{filter}' must look like field=value"))?;
        params.push((key.to_string(), value.to_string()));
    }
    for sort in sorts {
        params.push(("sortBy".to_string(), sort.clone()));
    }
    Ok(params)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
