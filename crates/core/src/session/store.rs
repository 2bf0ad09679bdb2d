//! In-memory session store.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::{Session, SessionConfig, SessionError};
use crate::config::MAX_SESSION_TTL_SECS;

/// Sessions keyed by random id, expiring a fixed time after creation.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    ttl: TimeDelta,
}

impl SessionStore {
    /// `ttl_secs` is clamped to [`MAX_SESSION_TTL_SECS`].
    pub fn new(ttl_secs: u64) -> Self {
        let secs = ttl_secs.min(MAX_SESSION_TTL_SECS) as i64;
        let ttl = TimeDelta::try_seconds(secs).unwrap_or_else(|| TimeDelta::days(365));
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Store a sanitized copy of `config` under a fresh id.
    pub async fn create(&self, config: SessionConfig) -> Session {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().simple().to_string(),
            config: config.sanitized(),
            created_at: now,
            expires_at: now
                .checked_add_signed(self.ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        info!(id = %session.id, service = %session.config.service, "Session created");
        session
    }

    /// Fetch a live session.
    pub async fn get(&self, id: &str) -> Result<Session, SessionError> {
        let sessions = self.sessions.read().await;
        let session = sessions
            .get(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        if session.is_expired_at(Utc::now()) {
            debug!(id = %id, "Session expired");
            return Err(SessionError::Expired(id.to_string()));
        }
        Ok(session.clone())
    }

    /// Drop expired sessions. Returns how many were removed.
    pub async fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired_at(now));
        let removed = before - sessions.len();
        if removed > 0 {
            info!(removed, remaining = sessions.len(), "Expired sessions swept");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::DownloadOption;

    fn config() -> SessionConfig {
        SessionConfig {
            service: "torbox".to_string(),
            api_key: "secret".to_string(),
            download_option: DownloadOption::Download,
            prepare_next_episode: true,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = SessionStore::new(3600);
        let session = store.create(config()).await;

        assert_eq!(session.id.len(), 32);
        assert!(session.id.chars().all(|c| c.is_ascii_hexdigit()));

        let fetched = store.get(&session.id).await.unwrap();
        assert_eq!(fetched.config.service, "torbox");
        assert!(fetched.config.prepare_next_episode);
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let store = SessionStore::new(3600);
        let a = store.create(config()).await;
        let b = store.create(config()).await;
        assert_ne!(a.id, b.id);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_unknown_id() {
        let store = SessionStore::new(3600);
        assert_eq!(
            store.get("missing").await.unwrap_err(),
            SessionError::NotFound("missing".to_string())
        );
    }

    #[test]
    fn test_expired_sessions_rejected_and_swept() {
        tokio_test::block_on(async {
            let store = SessionStore::new(0);
            let session = store.create(config()).await;

            assert!(matches!(
                store.get(&session.id).await,
                Err(SessionError::Expired(_))
            ));
            assert_eq!(store.sweep_expired().await, 1);
            assert!(store.is_empty().await);
            assert!(matches!(
                store.get(&session.id).await,
                Err(SessionError::NotFound(_))
            ));
        });
    }

    #[tokio::test]
    async fn test_sweep_keeps_live_sessions() {
        let store = SessionStore::new(3600);
        store.create(config()).await;
        assert_eq!(store.sweep_expired().await, 0);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_huge_ttl_is_clamped() {
        let store = SessionStore::new(1_000_000_000_000_000);
        let session = store.create(config()).await;

        let lifetime = session.expires_at - session.created_at;
        assert_eq!(lifetime.num_seconds(), MAX_SESSION_TTL_SECS as i64);
        assert!(store.get(&session.id).await.is_ok());

        let store = SessionStore::new(u64::MAX);
        assert!(store.create(config()).await.expires_at > Utc::now());
    }
}
