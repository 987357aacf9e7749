use clap::Parser;
use simple_console_mcp::cli::Cli;
use simple_console_mcp::logging;

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let code = simple_console_mcp::run_stdio(cli.into_config()).await;
	std::process::exit(code);
}
