//! Background cleanup of in-memory state
//!
//! Login sessions and kiosk sessions are only dropped lazily on lookup, so a
//! periodic sweep removes the ones nobody comes back for.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use camp_auth::SessionStore;
use camp_services::KioskRegistry;

pub const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub sessions: usize,
    pub kiosks: usize,
}

/// Remove expired login and kiosk sessions
pub fn sweep(
    sessions: &dyn SessionStore,
    kiosks: &KioskRegistry,
    now: DateTime<Utc>,
) -> SweepReport {
    SweepReport {
        sessions: sessions.cleanup_expired(),
        kiosks: kiosks.purge_expired(now),
    }
}

/// Sweep on a fixed interval until the returned handle is aborted
pub fn spawn_sweeper(
    sessions: Arc<dyn SessionStore>,
    kiosks: Arc<KioskRegistry>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let report = sweep(sessions.as_ref(), &kiosks, Utc::now());
            if report.sessions > 0 || report.kiosks > 0 {
                info!(
                    sessions = report.sessions,
                    kiosks = report.kiosks,
                    "Expired sessions removed"
                );
            } else {
                debug!("Session sweep found nothing to remove");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use camp_auth::{MemorySessionStore, Session};

    #[test]
    fn test_sweep_drops_abandoned_state() {
        let sessions = MemorySessionStore::new();
        sessions.insert(Session::new(1, chrono::Duration::seconds(-1)));
        sessions.insert(Session::new(2, chrono::Duration::hours(1)));

        let kiosks = KioskRegistry::new();
        let now = Utc::now();
        for _ in 0..50 {
            kiosks.open(Some(10), 3, now - chrono::Duration::hours(48));
        }
        let live = kiosks.open(Some(10), 3, now);

        let report = sweep(&sessions, &kiosks, now);
        assert_eq!(report, SweepReport { sessions: 1, kiosks: 50 });
        assert_eq!(sessions.len(), 1);
        assert_eq!(kiosks.len(), 1);
        assert!(kiosks.get(live.id, now).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_runs_on_interval() {
        let kiosks = Arc::new(KioskRegistry::new());
        kiosks.open(Some(10), 3, Utc::now() - chrono::Duration::hours(48));

        let handle = spawn_sweeper(
            Arc::new(MemorySessionStore::new()),
            kiosks.clone(),
            Duration::from_secs(60),
        );
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(kiosks.is_empty());

        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
    }
}
