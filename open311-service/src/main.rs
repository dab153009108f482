use std::sync::Arc;

use open311_service::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    init_tracing(&config)?;

    let registry = open311_registry()?;

    #[cfg(feature = "surrealdb")]
    let store = Arc::new(SurrealStore::connect(&config.store).await?);

    #[cfg(not(feature = "surrealdb"))]
    let store = {
        tracing::warn!("Using the in-process document store; data is lost on shutdown");
        Arc::new(MemoryStore::new())
    };

    let state = AppState::new(config.clone(), store, registry).await?;
    let app = router(state);

    let result = Server::new(config).serve(app).await;
    shutdown_tracing();
    result
}
