use std::process::ExitCode;

use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

use coral::config::Config;
use coral::server::Server;

#[tokio::main]
async fn main() -> ExitCode {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    let config = match Config::from_args(std::env::args()) {
        Ok(config) => config,
        Err(error) => {
            error!(%error, "invalid command line");
            return ExitCode::FAILURE;
        }
    };

    let server = match Server::initialize(config).await {
        Ok(server) => server,
        Err(error) => {
            error!(%error, "failed to start server");
            return ExitCode::FAILURE;
        }
    };

    match server.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(%error, "server terminated");
            ExitCode::FAILURE
        }
    }
}
