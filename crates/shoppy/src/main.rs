use std::sync::Arc;

use shoppy_core::{config::Config, ports::SystemClock, store};

#[tokio::main]
async fn main() -> Result<(), shoppy_core::Error> {
    shoppy_core::logging::init("shoppy")?;

    let cfg = Arc::new(Config::load()?);

    let pool = store::connect(&cfg.database_path, cfg.database_max_connections).await?;
    tracing::info!(path = %cfg.database_path.display(), "database ready");
    let stores = store::Stores::new(pool.clone(), Arc::new(SystemClock));

    let result = shoppy_telegram::router::run_polling(cfg, stores)
        .await
        .map_err(|e| shoppy_core::Error::External(format!("telegram bot failed: {e}")));

    pool.close().await;
    result
}
