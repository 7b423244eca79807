use std::sync::Arc;

use tracing::{info, warn};

use super::{
    config::Config,
    database::Database,
    error::AppError,
    sessions::{SessionStore, init_redis},
};

pub struct AppState {
    pub config: Config,
    pub db: Arc<Database>,
    pub sessions: SessionStore,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Arc<Self>, AppError> {
        let db = Arc::new(Database::open(&config.database_path)?);
        info!("Opened database at {}", config.database_path.display());

        Self::with_database(config, db).await
    }

    /// Sessions go to Redis when configured, to the database otherwise.
    pub async fn with_database(config: Config, db: Arc<Database>) -> Result<Arc<Self>, AppError> {
        let sessions = match &config.redis_url {
            Some(url) => SessionStore::Redis(init_redis(url).await?),
            None => {
                warn!("REDIS_URL not set, keeping sessions in the database");
                SessionStore::Database(db.clone())
            }
        };

        tokio::fs::create_dir_all(&config.media_root).await?;

        Ok(Arc::new(Self {
            config,
            db,
            sessions,
        }))
    }
}
