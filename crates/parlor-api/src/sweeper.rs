use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use parlor_db::queries::EvictionBatch;

use crate::service::AppState;

/// Default period between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(15);

/// Default idle time after which a participant is evicted.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy)]
pub struct SweepSettings {
    pub interval: Duration,
    pub stale_after: Duration,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SWEEP_INTERVAL,
            stale_after: DEFAULT_STALE_AFTER,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepFailure {
    pub participant: String,
    pub cause: String,
}

/// Aggregate outcome of one sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Names evicted and announced.
    pub evicted: Vec<String>,
    /// Candidates that sent a heartbeat before their eviction ran.
    pub refreshed: Vec<String>,
    pub failures: Vec<SweepFailure>,
}

impl SweepReport {
    pub fn success_count(&self) -> usize {
        self.evicted.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }
}

impl From<EvictionBatch> for SweepReport {
    fn from(batch: EvictionBatch) -> Self {
        Self {
            evicted: batch.evicted.into_iter().map(|p| p.name).collect(),
            refreshed: batch.refreshed,
            failures: batch
                .failed
                .into_iter()
                .map(|(participant, e)| SweepFailure {
                    participant,
                    cause: format!("{:#}", e),
                })
                .collect(),
        }
    }
}

/// Background task that evicts idle participants.
///
/// The first sweep runs one interval after start. Cancellation is only
/// observed between sweeps, so a sweep in flight always finishes.
pub async fn run_sweep_loop(chat: AppState, settings: SweepSettings, shutdown: CancellationToken) {
    let mut interval = tokio::time::interval(settings.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // The first tick completes immediately
    interval.tick().await;

    info!(
        "Sweeper started (every {:?}, stale after {:?})",
        settings.interval, settings.stale_after
    );

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => {}
        }

        match chat.sweep(settings.stale_after).await {
            Ok(report) => log_report(&report),
            Err(e) => warn!("Sweep error: {}", e),
        }
    }

    info!("Sweeper stopped");
}

fn log_report(report: &SweepReport) {
    for name in &report.evicted {
        info!(participant = %name, "Evicted idle participant");
    }
    for failure in &report.failures {
        warn!(
            participant = %failure.participant,
            "Eviction failed: {}", failure.cause
        );
    }

    if report.evicted.is_empty() && report.failures.is_empty() {
        debug!("Sweep: nothing to evict");
    } else {
        info!(
            "Sweep: evicted {}, failed {}, refreshed {}",
            report.success_count(),
            report.failure_count(),
            report.refreshed.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::clock::ManualClock;
    use crate::service::ChatService;
    use parlor_db::Database;
    use parlor_types::api::RegisterRequest;
    use parlor_types::models::Participant;

    fn service(clock: Arc<ManualClock>) -> AppState {
        let db = Arc::new(Database::open_in_memory().unwrap());
        Arc::new(ChatService::new(db, clock, Duration::from_secs(2)))
    }

    async fn register(chat: &AppState, name: &str) {
        chat.register(&RegisterRequest { name: Some(name.into()) })
            .await
            .unwrap();
    }

    #[test]
    fn report_from_batch() {
        let batch = EvictionBatch {
            evicted: vec![Participant { name: "alice".into(), last_seen: 0 }],
            refreshed: vec!["bob".into()],
            failed: vec![("carol".into(), anyhow::anyhow!("disk full"))],
        };

        let report = SweepReport::from(batch);
        assert_eq!(report.evicted, vec!["alice"]);
        assert_eq!(report.refreshed, vec!["bob"]);
        assert_eq!(report.success_count(), 1);
        assert_eq!(report.failure_count(), 1);
        assert_eq!(report.failures[0].participant, "carol");
        assert_eq!(report.failures[0].cause, "disk full");
    }

    #[tokio::test]
    async fn sweep_twice_announces_once() {
        let clock = Arc::new(ManualClock::new(0));
        let chat = service(clock.clone());
        register(&chat, "alice").await;

        clock.set(11_000);
        let first = chat.sweep(DEFAULT_STALE_AFTER).await.unwrap();
        let second = chat.sweep(DEFAULT_STALE_AFTER).await.unwrap();
        assert_eq!(first.evicted, vec!["alice"]);
        assert!(second.evicted.is_empty());

        let departures = chat
            .list_messages(Some("alice"), None)
            .await
            .unwrap()
            .into_iter()
            .filter(|m| m.text == "left the room")
            .count();
        assert_eq!(departures, 1);
    }

    #[tokio::test]
    async fn failed_eviction_is_reported_and_others_proceed() {
        let clock = Arc::new(ManualClock::new(0));
        let db = Arc::new(Database::open_in_memory().unwrap());
        let chat: AppState = Arc::new(ChatService::new(db.clone(), clock.clone(), Duration::from_secs(2)));
        for name in ["alice", "bob", "carol"] {
            register(&chat, name).await;
        }
        db.with_conn(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER reject_bob_departure BEFORE INSERT ON messages
                 WHEN NEW.sender = 'bob' AND NEW.kind = 'status' AND NEW.body = 'left the room'
                 BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
            )?;
            Ok(())
        })
        .unwrap();

        clock.set(11_000);
        let report = chat.sweep(DEFAULT_STALE_AFTER).await.unwrap();
        assert_eq!(report.evicted, vec!["alice", "carol"]);
        assert_eq!(report.failure_count(), 1);
        assert_eq!(report.failures[0].participant, "bob");
        assert!(report.failures[0].cause.contains("disk full"), "{}", report.failures[0].cause);

        // bob stays, with no departure announced
        let remaining: Vec<String> = chat
            .list_participants()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(remaining, vec!["bob"]);
        let log = chat.list_messages(None, None).await.unwrap();
        assert!(!log.iter().any(|m| m.from == "bob" && m.text == "left the room"));
        assert_eq!(log.iter().filter(|m| m.text == "left the room").count(), 2);
    }

    #[tokio::test]
    async fn loop_evicts_and_stops_on_cancel() {
        let clock = Arc::new(ManualClock::new(0));
        let chat = service(clock.clone());
        register(&chat, "alice").await;
        register(&chat, "bob").await;

        // Everyone is stale as soon as the loop looks
        clock.set(60_000);
        chat.heartbeat(Some("bob")).await.unwrap();

        let settings = SweepSettings {
            interval: Duration::from_millis(20),
            stale_after: DEFAULT_STALE_AFTER,
        };
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(run_sweep_loop(chat.clone(), settings, shutdown.clone()));

        let mut remaining = Vec::new();
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            remaining = chat.list_participants().await.unwrap();
            if remaining.len() == 1 {
                break;
            }
        }
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name, "bob");

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("sweeper did not stop")
            .unwrap();
    }
}
