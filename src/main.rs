use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use rust_sqlsnap::apply::ConnectionSettings;
use rust_sqlsnap::{
    compare_models, create_database, script_model, CompareOptions, CreateOptions, ScriptOptions,
};

#[derive(Parser)]
#[command(name = "sqlsnap")]
#[command(author, version, about = "Snapshot, compare and recreate SQL Server schemas")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two saved models and print the synchronization script
    Compare {
        /// Model of the desired state
        #[arg(short, long)]
        source: PathBuf,

        /// Model of the current state
        #[arg(short, long)]
        target: PathBuf,

        /// Write the script to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print a change summary instead of the script
        #[arg(long)]
        summary: bool,

        /// Include object names in the summary
        #[arg(long)]
        names: bool,
    },

    /// Write a saved model out as a snapshot directory
    Script {
        /// Saved model (JSON)
        #[arg(short, long)]
        model: PathBuf,

        /// Snapshot directory to write
        #[arg(short, long)]
        dir: PathBuf,

        /// Replace an existing snapshot directory
        #[arg(long)]
        overwrite: bool,
    },

    /// Create a database from a snapshot directory
    Create {
        /// Snapshot directory to read
        #[arg(short, long)]
        dir: PathBuf,

        /// Name of the database to create
        #[arg(long)]
        database: String,

        /// Drop the database first if it exists
        #[arg(long)]
        overwrite: bool,

        #[arg(long, env = "SQL_SERVER_HOST", default_value = "localhost")]
        host: String,

        #[arg(long, env = "SQL_SERVER_PORT", default_value_t = 1433)]
        port: u16,

        #[arg(long, env = "SQL_SERVER_USER", default_value = "sa")]
        user: String,

        #[arg(long, env = "SQL_SERVER_PASSWORD", hide_env_values = true)]
        password: String,

        /// Validate the server certificate instead of trusting it
        #[arg(long)]
        verify_cert: bool,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Compare {
            source,
            target,
            output,
            summary,
            names,
        } => {
            let to_stdout = output.is_none();
            let options = CompareOptions {
                source,
                target,
                output,
                include_names: names,
            };
            let outcome = compare_models(&options)?;
            if !outcome.is_diff {
                println!("Databases are identical.");
            } else if summary {
                print!("{}", outcome.summary);
            } else if to_stdout {
                print!("{}", outcome.script);
            }
        }
        Commands::Script {
            model,
            dir,
            overwrite,
        } => {
            let options = ScriptOptions {
                model,
                dir,
                overwrite,
            };
            let count = script_model(&options)?;
            println!("Scripted {} files to {}", count, options.dir.display());
        }
        Commands::Create {
            dir,
            database,
            overwrite,
            host,
            port,
            user,
            password,
            verify_cert,
        } => {
            let options = CreateOptions {
                dir,
                database,
                connection: ConnectionSettings {
                    host,
                    port,
                    user,
                    password,
                    trust_cert: !verify_cert,
                },
                overwrite,
            };
            let report = create_database(&options)?;
            println!(
                "Database {} created ({} scripts applied)",
                options.database, report.applied
            );
        }
    }

    Ok(())
}
