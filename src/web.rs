#![cfg(not(tarpaulin_include))]

use todo_web::app;
use todo_web::config::Config;

/// Main entry point for the todo web server
///
/// # Arguments
/// * Optional first argument: address to listen on, overriding `TODO_ADDR`
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error object
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let config = Config::from_env().with_args(&args);
    log::debug!("Starting with {:?}", config);

    app::run(config).await
}
