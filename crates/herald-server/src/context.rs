//! Per-request context handed to every resolver.

use herald_content::ContentError;
use herald_db::DbPool;
use herald_events::Bus;
use herald_schema::Providers;
use herald_types::AuthContext;
use rusqlite::Connection;
use std::any::Any;
use std::sync::Arc;

use crate::error::ApiError;
use crate::gateway::MutationGateway;

/// Everything an operation may touch, passed explicitly.
#[derive(Clone)]
pub struct RequestContext {
    pub pool: DbPool,
    pub gateway: MutationGateway,
    pub bus: Bus,
    pub auth: AuthContext,
    pub providers: Arc<Providers>,
}

impl RequestContext {
    /// The caller's user ID, or `Unauthorized` for anonymous callers.
    pub fn require_user(&self) -> Result<i64, ApiError> {
        self.auth.user_id().ok_or_else(ApiError::login_required)
    }

    /// Fetches a provider exported by one of the assembled modules.
    pub fn provider<T: Any + Send + Sync>(&self) -> Result<Arc<T>, ApiError> {
        self.providers.get::<T>().ok_or_else(|| {
            tracing::error!(provider = std::any::type_name::<T>(), "provider not assembled");
            ApiError::InternalServerError("service unavailable".to_string())
        })
    }

    /// Runs a read against the store on the blocking pool.
    pub async fn read<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, ContentError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            f(&conn).map_err(ApiError::from)
        })
        .await?
    }
}
