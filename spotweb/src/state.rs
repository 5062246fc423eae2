use crate::EnvConfig;
use anyhow::{Context, Result};
use libspot::Database;
use std::sync::Arc;
use tracing::{debug, trace};

#[derive(Debug)]
pub struct SharedState {
    pub db: Database,
    pub config: EnvConfig,
}

impl SharedState {
    pub async fn new(env: EnvConfig) -> Result<Self> {
        trace!("Creating shared app state");
        debug!(database = env.database, "Opening database");
        Ok(Self {
            db: Database::open(&env.database)
                .await
                .with_context(|| format!("Unable to open database {}", &env.database))?,
            config: env,
        })
    }

    #[cfg(test)]
    pub fn test(pool: sqlx::Pool<sqlx::Sqlite>) -> Self {
        debug!("Creating test shared app state");
        Self {
            db: pool.into(),
            config: EnvConfig {
                listen: crate::ListenConfig {
                    host: "127.0.0.1".to_string(),
                    port: 4000,
                },
                database: "test-database.sqlite".to_string(),
                expose_error_details: false,
                static_dir: None,
            },
        }
    }
}

pub type AppState = Arc<SharedState>;
