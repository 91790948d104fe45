use std::sync::Arc;

use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::PgConnection;

use crate::auth::jwt::JwtService;
use crate::config::AppConfig;
use crate::db::PgPool;
use crate::error::{AppError, AppResult};
use crate::storage::ObjectStorage;

type PooledPg = PooledConnection<ConnectionManager<PgConnection>>;

/// Shared handles threaded into every handler: the connection pool, the
/// resolved configuration, the upload store and the JWT signer.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn ObjectStorage>,
    pub jwt: JwtService,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        config: AppConfig,
        storage: Arc<dyn ObjectStorage>,
        jwt: JwtService,
    ) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            storage,
            jwt,
        }
    }

    /// Checks a connection out of the pool; exhaustion surfaces as a 500.
    pub fn db(&self) -> AppResult<PooledPg> {
        self.pool
            .get()
            .map_err(|err| AppError::internal(format!("database pool error: {err}")))
    }
}
