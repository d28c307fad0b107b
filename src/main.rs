use clap::{Parser, Subcommand};
use lifeplan::api::{Cli, run_http_server, run_projection_cli};
use tracing::error;

#[derive(Parser, Debug)]
#[command(
    name = "lifeplan",
    about = "Year-by-year UK personal finance projection (tax, NI, pensions, mortgage, savings)"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the JSON API
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Run one projection and print it as JSON
    Project(Cli),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Args::parse().command {
        Command::Serve { port } => {
            if let Err(e) = run_http_server(port).await {
                error!("Server error: {e}");
                std::process::exit(1);
            }
        }
        Command::Project(cli) => match run_projection_cli(cli) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                error!("{e}");
                std::process::exit(1);
            }
        },
    }
}
