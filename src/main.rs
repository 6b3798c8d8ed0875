use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use moviemate_api::{
    config::Config,
    db::{self, CatalogCache},
    routes::{create_router, AppState},
    services::{
        party::PartyRoomManager,
        providers::{CatalogProvider, TmdbProvider},
        recommendations::RecommendationEngine,
        reviews::{Ai21Provider, ReviewService},
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "moviemate_api=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let pool = db::create_pool(&config.database_url).await?;
    db::migrations::run(&pool).await?;

    let cache = CatalogCache::new();
    let catalog: Arc<dyn CatalogProvider> = Arc::new(TmdbProvider::new(&config, cache.clone())?);
    let reviews = Arc::new(ReviewService::new(Arc::new(Ai21Provider::new(&config)?)));
    let recommendations = Arc::new(RecommendationEngine::new(catalog.clone()));
    let party = Arc::new(PartyRoomManager::new(pool.clone()));

    let state = AppState {
        db: pool,
        cache,
        catalog,
        reviews,
        recommendations,
        party,
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "MovieMate API listening");
    axum::serve(listener, app).await?;

    Ok(())
}
