mod cli;
mod demo;
mod infra;
mod routes;
mod server;

use work_permit::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
