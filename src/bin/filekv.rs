//! filekv CLI
//!
//! Command-line interface for inspecting and editing a filekv store.

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use filekv::{Config, OpenMode, Store, ValueSource};
use tracing_subscriber::{fmt, EnvFilter};

/// filekv CLI
#[derive(Parser, Debug)]
#[command(name = "filekv")]
#[command(about = "One-file-per-key persistent key-value store")]
#[command(version)]
struct Args {
    /// Store directory
    db: PathBuf,

    /// Open flag: r (read only), w (read/write), c (create), n (new)
    #[arg(short, long)]
    mode: Option<OpenMode>,

    /// Expire entries older than this many seconds
    #[arg(short, long)]
    ttl: Option<u64>,

    /// Width of the key length field in bytes
    #[arg(long, default_value = "2")]
    key_width: u8,

    /// Width of the value length field in bytes
    #[arg(long, default_value = "4")]
    value_width: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Store a value
    Put {
        /// The key to set
        key: String,

        /// The value to set
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        value: Option<String>,

        /// Read the value from a file instead
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Write a value to stdout
    Get {
        /// The key to get
        key: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Check whether a key exists
    Has {
        /// The key to check
        key: String,
    },

    /// List keys
    Ls {
        /// Also print value sizes
        #[arg(short, long)]
        values: bool,
    },

    /// Count entries
    Count,

    /// Delete every entry
    Clear,
}

impl Commands {
    /// Mode used when none is given on the command line
    fn default_mode(&self) -> OpenMode {
        match self {
            Commands::Put { .. } => OpenMode::Create,
            Commands::Del { .. } | Commands::Clear => OpenMode::ReadWrite,
            _ => OpenMode::ReadOnly,
        }
    }
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,filekv=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> filekv::Result<ExitCode> {
    let mode = args.mode.unwrap_or_else(|| args.command.default_mode());

    let config = Config::builder()
        .key_len_width(args.key_width)
        .value_len_width(args.value_width)
        .ttl(args.ttl.map(std::time::Duration::from_secs))
        .build();

    tracing::debug!(db = %args.db.display(), %mode, "opening store");
    let store = Store::open(&args.db, mode, config)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match args.command {
        Commands::Put { key, value, file } => {
            match (value, file) {
                (_, Some(path)) => store.put(&key, ValueSource::from_file(File::open(path)?)?)?,
                (Some(value), None) => store.put(&key, value.into_bytes())?,
                (None, None) => {
                    return Err(filekv::FileKvError::InvalidArgument(
                        "put needs a value or --file".to_string(),
                    ))
                }
            }
        }
        Commands::Get { key } => match store.get(&key)? {
            Some(mut value) => {
                value.copy_to(&mut out)?;
                out.flush()?;
            }
            None => {
                tracing::warn!(key = %key, "key not found");
                return Ok(ExitCode::FAILURE);
            }
        },
        Commands::Del { key } => store.delete(&key)?,
        Commands::Has { key } => {
            let found = store.contains(&key)?;
            writeln!(out, "{}", found)?;
            if !found {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Ls { values } => {
            for entry in store.iter(true, values)? {
                let entry = entry?;
                let key = entry.key.unwrap_or_default();
                match entry.value {
                    Some(value) => writeln!(out, "{}\t{}", key, value.len())?,
                    None => writeln!(out, "{}", key)?,
                }
            }
        }
        Commands::Count => writeln!(out, "{}", store.count()?)?,
        Commands::Clear => store.clear()?,
    }

    Ok(ExitCode::SUCCESS)
}
