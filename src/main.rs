//! eoap-tools CLI entrypoint

use clap::Parser;

use eoap_tools::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    eoap_tools::logging::init(cli.verbose, cli.quiet);

    if let Err(e) = cli.execute().await {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}
