use clap::Parser;
use tickdesk::cli::{Cli, run};
use tickdesk::logging::{LogConfig, init_logging};

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_logging(&LogConfig::for_verbosity(cli.verbose)) {
        eprintln!("warning: logging disabled: {e}");
    }
    run(cli)
}
