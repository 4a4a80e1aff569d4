use clap::Parser;
use reloj_client::{Cli, run};

#[tokio::main]
async fn main() -> Result<(), reloj_client::AppError> {
    run(Cli::parse()).await
}
