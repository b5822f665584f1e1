use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only show critical errors
    Quiet,
    /// Show standard information
    #[default]
    Normal,
    /// Show detailed information
    Verbose,
    /// Show all available debugging information
    Debug,
}

impl VerbosityLevel {
    /// Log level handed to the logger
    pub fn level_filter(self) -> LevelFilter {
        match self {
            VerbosityLevel::Quiet => LevelFilter::Error,
            VerbosityLevel::Normal => LevelFilter::Warn,
            VerbosityLevel::Verbose => LevelFilter::Info,
            VerbosityLevel::Debug => LevelFilter::Debug,
        }
    }
}

/// How results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

/// OAI-PMH response builder, validator and request checker
#[derive(Parser, Debug, Clone)]
#[command(name = "oai-pmh")]
#[command(about = "Build, validate and decode OAI-PMH 2.0 documents")]
#[command(version)]
pub struct Cli {
    /// Configuration file (TOML or JSON)
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Repository base URL, overriding the configuration
    #[arg(long = "base-url", global = true)]
    pub base_url: Option<String>,

    /// Increase log output (repeat for more)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only report errors
    #[arg(short = 'q', long = "quiet", global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output format
    #[arg(long = "format", value_enum, global = true)]
    pub format: Option<OutputFormat>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Build the Identify response from the repository configuration
    Identify {
        /// Check the document against the OAI-PMH schema before printing it
        #[arg(long)]
        validate: bool,

        /// Write the document to a file instead of stdout
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },

    /// Check request arguments against the verb grammar
    CheckRequest {
        /// Arguments as key=value, e.g. verb=ListRecords metadataPrefix=oai_dc
        #[arg(value_parser = parse_key_value)]
        params: Vec<(String, String)>,
    },

    /// Validate a document against the OAI-PMH schema
    Validate {
        path: PathBuf,

        /// Use this XSD instead of the embedded one
        #[arg(long)]
        schema: Option<PathBuf>,
    },

    /// Decode any OAI-PMH response and print its contents
    Decode { path: PathBuf },
}

fn parse_key_value(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{arg}'")),
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        match (self.quiet, self.verbose) {
            (true, _) => VerbosityLevel::Quiet,
            (false, 0) => VerbosityLevel::Normal,
            (false, 1) => VerbosityLevel::Verbose,
            (false, _) => VerbosityLevel::Debug,
        }
    }
}
