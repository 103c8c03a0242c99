//! vg - vaultgate command-line entry point.

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("vaultgate=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = vaultgate::cli::Cli::parse_args();
    init_tracing(cli.debug);

    match vaultgate::cli::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            vaultgate::ui::output::error(format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}
