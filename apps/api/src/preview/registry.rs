use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::preview::session::PreviewSession;

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

struct Entry {
    session: Arc<PreviewSession>,
    last_access: Instant,
}

/// Live preview sessions, by id. Sessions untouched for longer than the idle
/// timeout are closed by [`SessionRegistry::evict_idle`].
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Entry>>,
    idle_timeout: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_TIMEOUT)
    }
}

impl SessionRegistry {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
        }
    }

    pub fn insert(&self, session: Arc<PreviewSession>) {
        let id = session.id();
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                Entry {
                    session,
                    last_access: Instant::now(),
                },
            );
        info!(session = %id, "Preview session opened");
    }

    /// Looks a session up and marks it as used.
    pub fn get(&self, id: Uuid) -> Result<Arc<PreviewSession>, AppError> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let entry = sessions
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Preview session {id} not found")))?;
        entry.last_access = Instant::now();
        Ok(entry.session.clone())
    }

    /// Removes a session and cancels its pending recomputations.
    pub fn remove(&self, id: Uuid) -> Result<(), AppError> {
        let entry = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .ok_or_else(|| AppError::NotFound(format!("Preview session {id} not found")))?;
        entry.session.close();
        info!(session = %id, "Preview session closed");
        Ok(())
    }

    /// Closes every session idle for at least the timeout. Returns how many
    /// were evicted.
    pub fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let evicted: Vec<Entry> = {
            let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
            let idle: Vec<Uuid> = sessions
                .iter()
                .filter(|(_, entry)| now.duration_since(entry.last_access) >= self.idle_timeout)
                .map(|(id, _)| *id)
                .collect();
            idle.iter().filter_map(|id| sessions.remove(id)).collect()
        };

        for entry in &evicted {
            entry.session.close();
            info!(session = %entry.session.id(), "Evicted idle preview session");
        }
        evicted.len()
    }

    /// Runs [`evict_idle`](Self::evict_idle) every `period` until the
    /// registry is dropped.
    pub fn spawn_reaper(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let registry: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                let evicted = registry.evict_idle();
                if evicted > 0 {
                    debug!(evicted, open = registry.len(), "Session sweep finished");
                }
            }
        })
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::fakes::{FakeLibrary, ScriptedEngine};
    use crate::preview::session::{OrchestratorConfig, PreviewInputs};
    use crate::reconcile::fixtures::{auto_preview, library};

    const MINUTE: Duration = Duration::from_secs(60);

    fn session() -> Arc<PreviewSession> {
        PreviewSession::new(
            OrchestratorConfig::default(),
            Arc::new(FakeLibrary::new(library())),
            Arc::new(ScriptedEngine::new(auto_preview(vec![], vec![]))),
            PreviewInputs::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_get_remove() {
        let registry = SessionRegistry::default();
        let session = session();
        let id = session.id();

        registry.insert(session);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(id).unwrap().id(), id);

        registry.remove(id).unwrap();
        assert!(matches!(registry.get(id), Err(AppError::NotFound(_))));
        assert!(matches!(registry.remove(id), Err(AppError::NotFound(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_access_keeps_session_alive() {
        let registry = SessionRegistry::new(30 * MINUTE);
        let active = session();
        let idle = session();
        let (active_id, idle_id) = (active.id(), idle.id());
        registry.insert(active);
        registry.insert(idle);

        tokio::time::sleep(20 * MINUTE).await;
        registry.get(active_id).unwrap();
        tokio::time::sleep(15 * MINUTE).await;

        assert_eq!(registry.evict_idle(), 1);
        assert!(registry.get(active_id).is_ok());
        assert!(matches!(registry.get(idle_id), Err(AppError::NotFound(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reaper_closes_abandoned_sessions() {
        let registry = Arc::new(SessionRegistry::new(30 * MINUTE));
        let session = session();
        session.start().await;
        registry.insert(session.clone());
        let reaper = registry.spawn_reaper(MINUTE);

        tokio::time::sleep(10 * MINUTE).await;
        assert_eq!(registry.len(), 1);

        tokio::time::sleep(25 * MINUTE).await;
        assert_eq!(registry.len(), 0);
        // Only the test's handle is left once the registry has let go.
        assert_eq!(Arc::strong_count(&session), 1);

        reaper.abort();
    }
}
