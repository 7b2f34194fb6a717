use clap::Parser;
use tdxtrader::cli::{Cli, run};
use tdxtrader::logging::init_tracing;

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("warning: logging disabled: {e}");
    }
    run(cli)
}
