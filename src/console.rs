//! Handling the poptics CLI
//!
//! This module handles the command line parsing as well as basic information (e.g. help dialog, version information, etc.).
use std::path::{Path, PathBuf};

use clap::Parser;
use log::LevelFilter;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::{PopError, PopResult};

/// Verbosity of the log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum LogLevel {
    /// progress information only
    #[default]
    Info,
    /// beam parameters per surface
    Debug,
    /// every operation applied to the wavefront
    Trace,
}
impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Info => Self::Info,
            LogLevel::Debug => Self::Debug,
            LogLevel::Trace => Self::Trace,
        }
    }
}

/// Validated command line arguments of the poptics application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    /// file path of the simulation document
    pub config: PathBuf,
    /// verbosity of the log output
    pub loglevel: LogLevel,
    /// number of worker threads
    pub n_jobs: usize,
    /// file path of the CSV summary. Defaults to the document path with `csv` extension.
    pub output: PathBuf,
    /// perform a diagnostic ray trace before the propagation
    pub raytrace: bool,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct PartialArgs {
    /// file path of the simulation document (.yaml)
    #[arg(short, long)]
    config: String,

    /// log level (info, debug or trace)
    #[arg(short, long, default_value = "info")]
    loglevel: String,

    /// number of worker threads
    #[arg(short, long, default_value_t = 1)]
    n_jobs: usize,

    /// file path of the CSV summary
    #[arg(short, long)]
    output: Option<String>,

    /// perform a diagnostic ray trace
    #[arg(short, long)]
    raytrace: bool,
}

/// Checks if the passed file path points to an existing YAML file.
fn file_path_is_valid(path: &Path) -> bool {
    path.is_file() && matches!(path.extension().and_then(|e| e.to_str()), Some("yaml" | "yml"))
}

fn eval_loglevel_input(loglevel: &str) -> PopResult<LogLevel> {
    loglevel.parse().map_err(|_| {
        let levels: Vec<String> = LogLevel::iter().map(|l| l.to_string()).collect();
        PopError::Console(format!(
            "invalid log level '{loglevel}'. Use one of {}",
            levels.join(", ")
        ))
    })
}

impl TryFrom<PartialArgs> for Args {
    type Error = PopError;

    fn try_from(part_args: PartialArgs) -> PopResult<Self> {
        let config = PathBuf::from(&part_args.config);
        if !file_path_is_valid(&config) {
            return Err(PopError::Console(format!(
                "{} is not a valid simulation document",
                config.display()
            )));
        }
        let loglevel = eval_loglevel_input(&part_args.loglevel)?;
        if part_args.n_jobs == 0 {
            return Err(PopError::Console(
                "number of jobs must be positive".into(),
            ));
        }
        let output = part_args
            .output
            .map_or_else(|| config.with_extension("csv"), PathBuf::from);
        Ok(Self {
            config,
            loglevel,
            n_jobs: part_args.n_jobs,
            output,
            raytrace: part_args.raytrace,
        })
    }
}

/// Show the program name and version.
pub fn show_intro() {
    println!(
        "{: ^80}\n{: ^80}\n",
        "poptics - paraxial physical optics propagation",
        format!("version {}", env!("CARGO_PKG_VERSION"))
    );
}
