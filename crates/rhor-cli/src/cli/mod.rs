mod commands;
mod helpers;

use clap::Parser;
use rhor_core::domain::RhorError;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let error = error.as_rhor_error();
            eprintln!("{}", error.diagnostic_line());
            error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("wrf-rhor".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => dispatch_parsed(cli.command),
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(
    name = "wrf-rhor",
    version,
    about = "Capsule areal density from wedge range filter proton spectra"
)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Run the full analysis described by a JSON request
    Analyze(commands::AnalyzeArgs),
    /// Fit a Gaussian to a JSON spectrum
    Fit(commands::FitArgs),
    /// Wall thickness along a line-of-sight angle range
    Thickness(commands::ThicknessArgs),
    /// Areal density and shell radius for a mean proton energy
    Rhor(commands::RhorArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Analyze(args) => commands::run_analyze_command(args),
        CliCommand::Fit(args) => commands::run_fit_command(args),
        CliCommand::Thickness(args) => commands::run_thickness_command(args),
        CliCommand::Rhor(args) => commands::run_rhor_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(RhorError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<RhorError> for CliError {
    fn from(error: RhorError) -> Self {
        Self::Compute(error)
    }
}

impl CliError {
    fn as_rhor_error(&self) -> RhorError {
        match self {
            Self::Usage(message) => RhorError::input_validation("INPUT.CLI_USAGE", message.clone()),
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => RhorError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
