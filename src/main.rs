use anyhow::Result;
use log::LevelFilter;
use std::process::ExitCode;
use update_parent_version::{
    arguments::{Arguments, CliError},
    pom::{UpdateOutcome, update_parent_version},
};

fn main() -> Result<ExitCode> {
    let invocation = match Arguments::resolve(std::env::args_os()) {
        Ok(invocation) => invocation,
        Err(CliError::Display(e)) => e.exit(),
        Err(e) => {
            // stdout on purpose: callers capture it
            println!("{e}");
            return Ok(ExitCode::from(e.exit_code()));
        }
    };

    pretty_env_logger::env_logger::builder()
        .filter_level(if invocation.verbose { LevelFilter::Debug } else { LevelFilter::Info })
        .format_timestamp(None)
        .init();

    match update_parent_version(&invocation.path, invocation.level)? {
        UpdateOutcome::Updated { current, .. } => println!("{current}"),
        UpdateOutcome::VersionNotFound => println!("Parent version not found."),
    }

    Ok(ExitCode::SUCCESS)
}
