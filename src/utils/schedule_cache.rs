use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use crate::model::ids::SessionId;
use crate::model::session::{ScheduleDay, Session};
use crate::repository::{ScheduleCatalog, StoreResult};

/// TTL cache in front of a [`ScheduleCatalog`].
///
/// Only hits are stored: a session created after a miss is visible on the
/// next lookup. Day listings always go to the inner catalog.
pub struct CachedScheduleCatalog {
    inner: Arc<dyn ScheduleCatalog>,
    sessions: Cache<SessionId, Session>,
}

impl CachedScheduleCatalog {
    pub fn new(inner: Arc<dyn ScheduleCatalog>, ttl: Duration) -> Self {
        Self {
            inner,
            sessions: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(ttl)
                .build(),
        }
    }
}

#[async_trait]
impl ScheduleCatalog for CachedScheduleCatalog {
    async fn get_session(&self, id: SessionId) -> StoreResult<Option<Session>> {
        if let Some(session) = self.sessions.get(&id).await {
            return Ok(Some(session));
        }

        let session = self.inner.get_session(id).await?;
        if let Some(session) = &session {
            self.sessions.insert(id, session.clone()).await;
        }
        Ok(session)
    }

    async fn list_sessions_by_day(&self, day: ScheduleDay) -> StoreResult<Vec<Session>> {
        self.inner.list_sessions_by_day(day).await
    }
}
