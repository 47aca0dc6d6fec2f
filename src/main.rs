//! conceptdb CLI: load and check schema definitions.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use conceptdb::database::{Database, DatabaseConfig, TransactionType};
use conceptdb::schema::SchemaDefinition;

#[derive(Parser)]
#[command(name = "conceptdb", version, about = "Embedded typed concept database")]
struct Cli {
    /// Database configuration file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a schema definition to a fresh database and commit it.
    Check {
        /// Path to the schema TOML file.
        schema: PathBuf,

        /// Print the summary as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the configuration and the bootstrapped types.
    Info,
}

fn load_config(path: Option<&Path>) -> Result<DatabaseConfig> {
    match path {
        Some(path) => Ok(DatabaseConfig::from_file(path)?),
        None => Ok(DatabaseConfig::default()),
    }
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Check { schema, json } => {
            let definition = SchemaDefinition::from_file(&schema)?;
            let db = Database::open(config)?;
            let tx = db.transaction(TransactionType::Write)?;
            let summary = definition.apply(&tx)?;
            tx.commit()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary).into_diagnostic()?);
            } else {
                println!("Schema {} is valid.", schema.display());
                println!("  attribute types: {}", summary.attribute_types);
                println!("  entity types:    {}", summary.entity_types);
                println!("  relation types:  {}", summary.relation_types);
                println!("  ownerships:      {}", summary.ownerships);
            }
        }

        Commands::Info => {
            let db = Database::open(config)?;
            print!("{}", db.config().to_toml_string()?);
            let snapshot = db.snapshot();
            let mut types = snapshot.types().vertices();
            types.sort_by(|a, b| a.label.cmp(&b.label));
            println!("\nTypes ({}):", types.len());
            for ty in types {
                println!(
                    "  {:<12} {}{}",
                    ty.label,
                    ty.encoding,
                    if ty.is_abstract { " (abstract)" } else { "" }
                );
            }
        }
    }

    Ok(())
}
