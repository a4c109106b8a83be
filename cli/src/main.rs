use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use smf_cli::{Cli, CliError, run};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = cli.log_level() {
        logger.filter_level(level);
    }
    logger.init();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let result = run(&cli.command, &mut out).and_then(|()| out.flush().map_err(CliError::from));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
