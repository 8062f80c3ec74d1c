use crate::pom::DEFAULT_POM_PATH;
use crate::version::IncrementLevel;
use clap::Parser;
use clap::error::ErrorKind;
use std::ffi::OsString;
use std::path::PathBuf;
use thiserror::Error;

pub const BIN_NAME: &str = "upv";

#[derive(Debug, Parser)]
#[command(author, version, about, bin_name = BIN_NAME)]
pub struct Arguments {
    /// Path to the POM whose version is bumped
    #[arg(long, short, default_value = DEFAULT_POM_PATH)]
    pub path: PathBuf,
    #[arg(long, short)]
    pub verbose: bool,
    /// Increment level: patch, minor or major
    #[arg(value_name = "LEVEL")]
    pub levels: Vec<String>,
}

/// A fully validated command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub level: IncrementLevel,
    pub path: PathBuf,
    pub verbose: bool,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Usage: {} [patch|minor|major]", BIN_NAME)]
    Usage,
    #[error("Invalid increment level. Use one of: patch, minor, major")]
    InvalidLevel(String),
    /// `--help` or `--version`, which print clap's output and exit 0 instead
    /// of being treated as an invalid level.
    #[error(transparent)]
    Display(clap::Error),
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Display(e) => e.exit_code() as u8,
            CliError::Usage | CliError::InvalidLevel(_) => 1,
        }
    }
}

impl Arguments {
    /// Parses `argv` and checks it against the `upv <level>` contract: exactly
    /// one positional, and it must name a level.
    pub fn resolve<I, T>(argv: I) -> Result<Invocation, CliError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let args = Arguments::try_parse_from(argv).map_err(|e| match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => CliError::Display(e),
            _ => CliError::Usage,
        })?;

        let [level] = args.levels.as_slice() else {
            return Err(CliError::Usage);
        };
        let level = level
            .parse::<IncrementLevel>()
            .map_err(|_| CliError::InvalidLevel(level.clone()))?;

        Ok(Invocation { level, path: args.path, verbose: args.verbose })
    }
}
