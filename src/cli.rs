//! Command-line inspection of baseline files.
//!
//! The store is binary, so this is the way to look inside one:
//!
//! ```text
//! perf-baseline list [--json]
//! perf-baseline show NAME
//! perf-baseline record NAME SECONDS
//! perf-baseline verify
//! ```
//!
//! Every command takes `--file PATH`; without it the path comes from
//! `PERF_BASELINE_FILE` or the default `.perf-baseline`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::BaselineConfig;
use crate::record::BaselineRecord;
use crate::store::BaselineStore;

#[derive(Debug, Parser)]
#[command(name = "perf-baseline")]
#[command(version, about = "Inspect and seed perf-baseline store files", long_about = None)]
pub struct Cli {
    /// Baseline store file
    #[arg(long, short, global = true, value_name = "PATH")]
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List every baseline in name order
    List {
        /// Print a JSON array instead of one line per record
        #[arg(long)]
        json: bool,
    },
    /// Print one baseline
    Show {
        name: String,
    },
    /// Commit a baseline unless one already exists for NAME
    Record {
        name: String,
        /// Seconds per call
        seconds: f64,
    },
    /// Check that the file decodes cleanly
    Verify,
}

impl Cli {
    /// Store settings from the environment, with `--file` taking precedence. The
    /// threshold plays no part in inspection and is not read.
    pub fn store_config(&self) -> Result<BaselineConfig, String> {
        let config = BaselineConfig::default()
            .apply_store_env()
            .map_err(|e| e.to_string())?;
        Ok(match &self.file {
            Some(path) => config.with_path(path),
            None => config,
        })
    }

    pub fn execute(&self) -> Result<(), String> {
        let config = self.store_config()?;
        let path = &config.path;
        let mut store =
            BaselineStore::open_with(path, config.store_options()).map_err(|e| e.to_string())?;

        match &self.command {
            Commands::List { json } => {
                let records: Vec<&BaselineRecord> = store.records().collect();
                if *json {
                    let out = serde_json::to_string_pretty(&records).map_err(|e| e.to_string())?;
                    println!("{out}");
                } else {
                    for record in records {
                        println!("{}", record.summary());
                    }
                }
                Ok(())
            }
            Commands::Show { name } => {
                let record = store
                    .get(name)
                    .ok_or_else(|| format!("no baseline named '{name}' in {}", path.display()))?;
                println!("{}", record.summary());
                Ok(())
            }
            Commands::Record { name, seconds } => {
                let insertion = store
                    .insert_if_absent(name, *seconds)
                    .map_err(|e| e.to_string())?;
                let status = if insertion.committed {
                    "committed"
                } else {
                    "existing"
                };
                println!("{status}\t{}\t{}", insertion.record.name, insertion.value());
                Ok(())
            }
            Commands::Verify => {
                println!("{}: ok ({} records)", path.display(), store.len());
                Ok(())
            }
        }
    }
}
