mod api_doc;
mod auth;
mod error;
mod handlers;
mod services;
mod setup;
mod state;

use arca_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    setup::init_tracing();

    let config = Config::from_env()?;

    let (_state, router) = setup::initialize_app(config.clone()).await?;

    setup::server::start_server(&config, router).await?;

    Ok(())
}
