use colored::Colorize;
use tracing_subscriber::EnvFilter;

use schema_flatten::cli::CommandLineInterface;

fn main() {
    let command_line_interface = CommandLineInterface::load();
    init_tracing(command_line_interface.verbose);
    if let Err(error) = command_line_interface.run() {
        eprintln!("{} {error:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
