use relaymq::broker::Broker;
use relaymq::config::load_config;
use relaymq::persistence::sled_store::DurableLog;
use relaymq::utils::logging;
use tracing::info;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = load_config().expect("Failed to load configuration");
    logging::init(&config.log.level);

    let log = DurableLog::open(&config.log.path).expect("Failed to open durable log");
    let broker = Broker::start(config.broker, log).expect("Failed to start broker engine");

    info!(path = %config.log.path, "broker engine running");

    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received. Exiting gracefully.");
    }
    broker.shutdown().await;
}
