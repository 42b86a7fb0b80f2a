//! flatkv CLI
//!
//! Inspect and write database files, or run the backup rotator.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use flatkv::{BackupRotator, Config, DbHandle, DbReader, DbWriter, Record};
use tracing_subscriber::{fmt, EnvFilter};

/// flatkv CLI
#[derive(Parser, Debug)]
#[command(name = "flatkv")]
#[command(about = "Flat-file record store with dated backups")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = ".")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the header and every record of a database
    Dump {
        /// Database file, relative to the data directory
        file: PathBuf,
    },

    /// Write a new generation holding one block of records
    Write {
        /// Database file, relative to the data directory
        file: PathBuf,

        /// Header version for the new generation
        #[arg(long, default_value = "1")]
        core_version: u32,

        /// Records as KEY=VALUE
        #[arg(value_parser = parse_record)]
        records: Vec<Record>,
    },

    /// Run the backup rotator on a fixed tick
    Backup {
        /// Databases to rotate, relative to the data directory
        #[arg(long = "db")]
        databases: Vec<PathBuf>,

        /// Directory receiving dated backups
        #[arg(long, default_value = "backups")]
        backup_dir: PathBuf,

        /// Days to keep each backup
        #[arg(long, default_value = "7")]
        keep_for: u32,

        /// Seconds between ticks
        #[arg(long, default_value = "60")]
        interval: u64,
    },
}

fn parse_record(raw: &str) -> Result<Record, String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    Ok(Record::new(key, value))
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,flatkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let args = Args::parse();

    tracing::info!("flatkv v{}", flatkv::VERSION);

    let result = match args.command {
        Commands::Dump { file } => dump(&args.data_dir.join(file)),
        Commands::Write {
            file,
            core_version,
            records,
        } => write(&args.data_dir.join(file), core_version, &records),
        Commands::Backup {
            databases,
            backup_dir,
            keep_for,
            interval,
        } => {
            let mut builder = Config::builder()
                .data_dir(&args.data_dir)
                .backup_dir(backup_dir)
                .keep_backups_for(keep_for)
                .tick_interval_secs(interval);
            if !databases.is_empty() {
                builder = builder.databases(databases);
            }
            backup(builder.build())
        }
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn dump(path: &std::path::Path) -> flatkv::Result<()> {
    let Some(mut reader) = DbReader::open(path)? else {
        println!("{}: no such database", path.display());
        return Ok(());
    };

    println!("{} (version {})", reader.paths().primary.display(), reader.format_version());
    for (index, block) in reader.read_all()?.iter().enumerate() {
        println!("-- block {} ({} records)", index, block.len());
        for record in block {
            println!("{} = {}", record.key_str(), record.value_str());
        }
    }
    reader.close()
}

fn write(path: &std::path::Path, core_version: u32, records: &[Record]) -> flatkv::Result<()> {
    let mut writer = DbWriter::create(path, core_version)?;
    writer.write_block(records)?;
    writer.sync()?;
    writer.close()?;
    println!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

fn backup(config: Config) -> flatkv::Result<()> {
    config.validate()?;

    tracing::info!("Backup directory: {}", config.backup_path().display());
    tracing::info!("Retention: {} days", config.keep_backups_for);

    let interval = Duration::from_secs(config.tick_interval_secs);
    let mut rotator = BackupRotator::new(&config);
    loop {
        if let Some(report) = rotator.on_tick() {
            for failed in &report.failed {
                tracing::warn!("Not rotated: {}", failed.display());
            }
        }
        thread::sleep(interval);
    }
}
